// Scale direction, decision outcome and side-effect results

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    ScaleOut,
    ScaleIn,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ScaleOut => "scale-out",
            Direction::ScaleIn => "scale-in",
        }
    }

    /// `<service>_HighResourceUsage` grows the fleet, `<service>_LowResourceUsage` shrinks it.
    pub fn from_alert_name(alert_name: &str) -> Option<Self> {
        if alert_name.ends_with("HighResourceUsage") {
            Some(Direction::ScaleOut)
        } else if alert_name.ends_with("LowResourceUsage") {
            Some(Direction::ScaleIn)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scale-out" => Ok(Direction::ScaleOut),
            "scale-in" => Ok(Direction::ScaleIn),
            other => Err(format!("unknown scale direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Proceed,
    Deny,
}

/// Why a decision came out the way it did. Serialized with a `code` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum DecisionReason {
    #[serde(rename_all = "camelCase")]
    Actuated { operation: String, step: u32 },
    ConfigMissingOrDisabled,
    #[serde(rename_all = "camelCase")]
    UnrecognizedAlert { alert_name: String },
    AlertResolved,
    #[serde(rename_all = "camelCase")]
    CooldownActive { remaining_seconds: u64 },
    #[serde(rename_all = "camelCase")]
    CeilingReached { current_vm_count: u32, max_vms: u32 },
    /// Hysteresis switch is off; cooldown was not consulted.
    #[serde(rename_all = "camelCase")]
    FloorReached { detail: String },
    #[serde(rename_all = "camelCase")]
    AtOrBelowFloor { current_vm_count: u32, min_vms: u32 },
    #[serde(rename_all = "camelCase")]
    FleetUnavailable { error: String },
    #[serde(rename_all = "camelCase")]
    ActuatorFailed { error: String },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Actuated { operation, step } => {
                write!(f, "actuator triggered ({operation}, step {step})")
            }
            DecisionReason::ConfigMissingOrDisabled => f.write_str("config missing or disabled"),
            DecisionReason::UnrecognizedAlert { alert_name } => {
                write!(f, "alert '{alert_name}' does not map to a scale direction")
            }
            DecisionReason::AlertResolved => f.write_str("alert resolved"),
            DecisionReason::CooldownActive { remaining_seconds } => {
                write!(f, "cooldown active ({remaining_seconds}s remaining)")
            }
            DecisionReason::CeilingReached {
                current_vm_count,
                max_vms,
            } => write!(f, "ceiling reached ({current_vm_count}/{max_vms} VMs)"),
            DecisionReason::FloorReached { detail } => write!(f, "floor reached: {detail}"),
            DecisionReason::AtOrBelowFloor {
                current_vm_count,
                min_vms,
            } => write!(
                f,
                "at or below floor ({current_vm_count} VMs, minimum {min_vms})"
            ),
            DecisionReason::FleetUnavailable { error } => {
                write!(f, "fleet size unavailable: {error}")
            }
            DecisionReason::ActuatorFailed { error } => write!(f, "actuator failed: {error}"),
        }
    }
}

/// Result of a best-effort call to an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SideEffect {
    Applied { detail: String },
    Skipped { detail: String },
    Failed { error: String },
}

impl SideEffect {
    pub fn is_failed(&self) -> bool {
        matches!(self, SideEffect::Failed { .. })
    }
}

/// Synchronous outcome of one webhook delivery. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDecision {
    pub service_name: String,
    pub direction: Option<Direction>,
    pub outcome: Outcome,
    pub reason: DecisionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence: Option<SideEffect>,
}

impl ScaleDecision {
    pub fn deny(service_name: &str, direction: Option<Direction>, reason: DecisionReason) -> Self {
        Self {
            service_name: service_name.to_string(),
            direction,
            outcome: Outcome::Deny,
            reason,
            silence: None,
        }
    }

    pub fn proceed(service_name: &str, direction: Direction, reason: DecisionReason) -> Self {
        Self {
            service_name: service_name.to_string(),
            direction: Some(direction),
            outcome: Outcome::Proceed,
            reason,
            silence: None,
        }
    }

    pub fn is_proceed(&self) -> bool {
        self.outcome == Outcome::Proceed
    }
}
