// Decision coordinator: one pass per alert delivery.
//
// Per (service, direction) the decide -> actuate -> record sequence runs under
// an exclusive lock, so a redelivered alert waits for the first delivery and
// then sees its cooldown. At most one actuator call per key is in flight or
// inside its cooldown window at any time. Services never share a lock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::collaborators::{ActuationRequest, Actuator, FleetInventory, Silencer};
use crate::config_store::ConfigStore;
use crate::cooldown::CooldownTracker;
use crate::error::{CollaboratorError, ObserveError, StoreError};
use crate::hysteresis::HysteresisSwitch;
use crate::locks::KeyedLocks;
use crate::models::{
    AlertmanagerPayload, AutoscalingConfig, DecisionReason, Direction, HysteresisSwitchState,
    ScaleDecision, SideEffect,
};

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub actuator_timeout: Duration,
    pub silence_duration: Duration,
}

/// Result of refreshing the switch from a known fleet size.
#[derive(Debug, Clone)]
pub struct FleetObservation {
    pub state: HysteresisSwitchState,
    pub silence: Option<SideEffect>,
}

pub struct CoordinatorDeps {
    pub configs: Arc<ConfigStore>,
    pub cooldowns: Arc<CooldownTracker>,
    pub switch: Arc<HysteresisSwitch>,
    pub actuator: Arc<dyn Actuator>,
    pub fleet: Arc<dyn FleetInventory>,
    pub silencer: Option<Arc<dyn Silencer>>,
}

pub struct DecisionCoordinator {
    configs: Arc<ConfigStore>,
    cooldowns: Arc<CooldownTracker>,
    switch: Arc<HysteresisSwitch>,
    actuator: Arc<dyn Actuator>,
    fleet: Arc<dyn FleetInventory>,
    silencer: Option<Arc<dyn Silencer>>,
    settings: CoordinatorSettings,
    locks: KeyedLocks,
}

/// Fleet size plus the clamped step to actuate with.
struct Eligible {
    current_vm_count: u32,
    step: u32,
}

impl DecisionCoordinator {
    pub fn new(deps: CoordinatorDeps, settings: CoordinatorSettings) -> Self {
        let CoordinatorDeps {
            configs,
            cooldowns,
            switch,
            actuator,
            fleet,
            silencer,
        } = deps;
        Self {
            configs,
            cooldowns,
            switch,
            actuator,
            fleet,
            silencer,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    /// Decide on one alert delivery. Denies are `Ok`; only a config store
    /// fault is an `Err`.
    #[instrument(skip(self, payload), fields(service = service_name, alert = payload.alert_name()))]
    pub async fn decide(
        &self,
        service_name: &str,
        payload: &AlertmanagerPayload,
    ) -> Result<ScaleDecision, StoreError> {
        let config = match self.configs.find_by_service(service_name).await? {
            Some(c) if c.enabled => c,
            _ => {
                info!("no enabled autoscaling config; ignoring alert");
                return Ok(ScaleDecision::deny(
                    service_name,
                    payload.direction(),
                    DecisionReason::ConfigMissingOrDisabled,
                ));
            }
        };
        if let Some(label_id) = payload.config_id()
            && label_id != config.id
        {
            debug!(label_id, config_id = %config.id, "alert carries a stale config id");
        }

        if payload.is_resolved() {
            return Ok(ScaleDecision::deny(
                service_name,
                payload.direction(),
                DecisionReason::AlertResolved,
            ));
        }
        let Some(direction) = payload.direction() else {
            info!("alert does not map to a scale direction");
            return Ok(ScaleDecision::deny(
                service_name,
                None,
                DecisionReason::UnrecognizedAlert {
                    alert_name: payload.alert_name().to_string(),
                },
            ));
        };

        let _guard = self
            .locks
            .lock(&format!("{}/{}", service_name, direction))
            .await;

        let eligible = match self.evaluate(&config, direction).await {
            Ok(e) => e,
            Err(denied) => return Ok(denied),
        };
        Ok(self.actuate(&config, direction, eligible, payload).await)
    }

    /// Gate checks in order. `Err` carries the deny decision.
    async fn evaluate(
        &self,
        config: &AutoscalingConfig,
        direction: Direction,
    ) -> Result<Eligible, ScaleDecision> {
        let service = config.service_name.as_str();
        let deny = |reason: DecisionReason| {
            info!(direction = %direction, reason = %reason, "scale denied");
            ScaleDecision::deny(service, Some(direction), reason)
        };

        if direction == Direction::ScaleIn && !self.switch.is_enabled(service).await {
            // Expected steady state at the floor; cooldown is not consulted.
            let state = self.switch.state(service).await;
            return Err(deny(DecisionReason::FloorReached {
                detail: state.reason.unwrap_or_else(|| "minimum fleet size".into()),
            }));
        }

        let cooldown = self.cooldowns.check_cooldown(service, direction).await;
        if cooldown.in_cooldown {
            return Err(deny(DecisionReason::CooldownActive {
                remaining_seconds: cooldown.remaining_seconds,
            }));
        }

        let current = match self.fleet.current_size(config).await {
            Ok(n) => n,
            Err(e) => {
                warn!(direction = %direction, error = %e, "fleet size unavailable");
                return Err(ScaleDecision::deny(
                    service,
                    Some(direction),
                    DecisionReason::FleetUnavailable {
                        error: e.to_string(),
                    },
                ));
            }
        };

        let scaling = &config.scaling;
        match direction {
            Direction::ScaleOut => {
                if current >= scaling.max_vms {
                    let silence = self.observe(config, current).await;
                    let mut denied = deny(DecisionReason::CeilingReached {
                        current_vm_count: current,
                        max_vms: scaling.max_vms,
                    });
                    denied.silence = silence;
                    return Err(denied);
                }
                Ok(Eligible {
                    current_vm_count: current,
                    step: scaling.scale_out_step.min(scaling.max_vms - current),
                })
            }
            Direction::ScaleIn => {
                if current <= scaling.min_vms {
                    let silence = self.observe(config, current).await;
                    let mut denied = deny(DecisionReason::AtOrBelowFloor {
                        current_vm_count: current,
                        min_vms: scaling.min_vms,
                    });
                    denied.silence = silence;
                    return Err(denied);
                }
                Ok(Eligible {
                    current_vm_count: current,
                    step: scaling.scale_in_step.min(current - scaling.min_vms),
                })
            }
        }
    }

    async fn actuate(
        &self,
        config: &AutoscalingConfig,
        direction: Direction,
        eligible: Eligible,
        payload: &AlertmanagerPayload,
    ) -> ScaleDecision {
        let service = config.service_name.as_str();
        let cooldown_period = self.cooldowns.resolve_period(config.scaling.cooldown_period);
        let request = ActuationRequest {
            service_name: service.to_string(),
            direction,
            step: eligible.step,
            cooldown_period,
            config: config.clone(),
            alerts: payload.alerts.clone(),
        };

        let result = match tokio::time::timeout(
            self.settings.actuator_timeout,
            self.actuator.actuate(&request),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(CollaboratorError::Timeout(self.settings.actuator_timeout)),
        };
        let operation = match result {
            Ok(op) => op,
            Err(e) => {
                // Nothing happened, so no cooldown: the next delivery may retry.
                warn!(direction = %direction, error = %e, "actuator failed");
                return ScaleDecision::deny(
                    service,
                    Some(direction),
                    DecisionReason::ActuatorFailed {
                        error: e.to_string(),
                    },
                );
            }
        };
        info!(
            direction = %direction,
            step = eligible.step,
            from = eligible.current_vm_count,
            operation = %operation,
            "actuator triggered"
        );

        if let Err(e) = self
            .cooldowns
            .start_cooldown(service, direction, Some(cooldown_period))
            .await
        {
            error!(direction = %direction, error = %e, "actuated but cooldown could not be recorded");
        }

        let projected = match direction {
            Direction::ScaleOut => eligible.current_vm_count + eligible.step,
            Direction::ScaleIn => eligible.current_vm_count - eligible.step,
        };
        let silence = self.observe(config, projected).await;

        let mut decision = ScaleDecision::proceed(
            service,
            direction,
            DecisionReason::Actuated {
                operation,
                step: eligible.step,
            },
        );
        decision.silence = silence;
        decision
    }

    /// Refresh the switch from a known fleet size and silence or unsilence the
    /// scale-in alert when it flips.
    async fn observe(&self, config: &AutoscalingConfig, vm_count: u32) -> Option<SideEffect> {
        let update = match self
            .switch
            .update(&config.service_name, vm_count, config.scaling.min_vms)
            .await
        {
            Ok(u) => u,
            Err(e) => {
                warn!(service = %config.service_name, error = %e, "scale-in switch not persisted");
                return None;
            }
        };
        if update.just_disabled() {
            Some(self.silence_scale_in(config).await)
        } else if update.just_enabled() {
            Some(self.lift_scale_in(config).await)
        } else {
            None
        }
    }

    async fn silence_scale_in(&self, config: &AutoscalingConfig) -> SideEffect {
        let Some(silencer) = &self.silencer else {
            return SideEffect::Skipped {
                detail: "no silencer configured".into(),
            };
        };
        let alert_name = config.scale_in_alert_name();
        match silencer
            .silence(&config.service_name, &alert_name, self.settings.silence_duration)
            .await
        {
            Ok(id) => {
                info!(service = %config.service_name, silence_id = %id, "scale-in alert silenced");
                SideEffect::Applied {
                    detail: format!("silence {id}"),
                }
            }
            Err(e) => {
                warn!(service = %config.service_name, error = %e, "could not silence scale-in alert");
                SideEffect::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn lift_scale_in(&self, config: &AutoscalingConfig) -> SideEffect {
        let Some(silencer) = &self.silencer else {
            return SideEffect::Skipped {
                detail: "no silencer configured".into(),
            };
        };
        match silencer
            .lift(&config.service_name, &config.scale_in_alert_name())
            .await
        {
            Ok(n) => SideEffect::Applied {
                detail: format!("{n} silence(s) lifted"),
            },
            Err(e) => {
                warn!(service = %config.service_name, error = %e, "could not lift scale-in silence");
                SideEffect::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Explicit status probe or actuator callback. With `vm_count` absent the
    /// fleet inventory is asked.
    #[instrument(skip(self), fields(service = service_name))]
    pub async fn observe_fleet(
        &self,
        service_name: &str,
        vm_count: Option<u32>,
    ) -> Result<FleetObservation, ObserveError> {
        let config = self
            .configs
            .find_by_service(service_name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("service '{service_name}'")))?;
        let count = match vm_count {
            Some(n) => n,
            None => self.fleet.current_size(&config).await?,
        };
        let silence = self.observe(&config, count).await;
        Ok(FleetObservation {
            state: self.switch.state(service_name).await,
            silence,
        })
    }
}
