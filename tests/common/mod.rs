// Shared test helpers: stub collaborators and a fully wired coordinator over a temp database
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fleetscaler::clock::{Clock, ManualClock};
use fleetscaler::collaborators::{
    ActuationRequest, Actuator, FleetInventory, Provisioner, Silencer,
};
use fleetscaler::config_store::ConfigStore;
use fleetscaler::cooldown::CooldownTracker;
use fleetscaler::coordinator::{CoordinatorDeps, CoordinatorSettings, DecisionCoordinator};
use fleetscaler::db::Database;
use fleetscaler::error::CollaboratorError;
use fleetscaler::hysteresis::HysteresisSwitch;
use fleetscaler::models::*;
use serde_json::json;
use tempfile::TempDir;

pub const START_EPOCH: i64 = 1_760_000_000;

/// Tracker default; sample configs set their own 300s period.
pub const DEFAULT_COOLDOWN_SECS: u64 = 600;

pub async fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetscaler.db");
    let db = Database::connect(path.to_str().unwrap(), 4).await.unwrap();
    db.init().await.unwrap();
    (dir, db)
}

/// Enabled config: 1..=5 VMs, step 1 both ways, 300s cooldown.
pub fn sample_config(service_name: &str) -> NewAutoscalingConfig {
    NewAutoscalingConfig {
        id: None,
        service_name: service_name.to_string(),
        template_id: "tmpl-ubuntu-2404".into(),
        vm_prefix: format!("{service_name}-vm"),
        monitoring: MonitoringSettings {
            cpu_threshold: 80.0,
            memory_threshold: 85.0,
            duration: 5,
            scale_in_cpu_threshold: 20.0,
            scale_in_memory_threshold: 30.0,
            scale_in_duration: 10,
            prometheus_job_name: format!("{service_name}-nodes"),
        },
        scaling: ScalingSettings {
            min_vms: 1,
            max_vms: 5,
            scale_out_step: 1,
            scale_in_step: 1,
            cooldown_period: Some(300),
        },
        enabled: true,
        created_at: None,
    }
}

pub fn firing(service_name: &str, suffix: &str) -> AlertmanagerPayload {
    alert_payload(service_name, suffix, "firing")
}

pub fn alert_payload(service_name: &str, suffix: &str, status: &str) -> AlertmanagerPayload {
    serde_json::from_value(json!({
        "receiver": "fleetscaler",
        "status": status,
        "alerts": [{
            "status": status,
            "labels": {
                "alertname": format!("{service_name}_{suffix}"),
                "service": service_name,
                "severity": "warning"
            },
            "annotations": { "summary": "resource usage" },
            "startsAt": "2026-10-19T10:00:00Z"
        }],
        "commonLabels": { "alertname": format!("{service_name}_{suffix}") },
        "version": "4"
    }))
    .unwrap()
}

#[derive(Default)]
pub struct StubActuator {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    requests: Mutex<Vec<ActuationRequest>>,
}

impl StubActuator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<ActuationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Actuator for StubActuator {
    async fn actuate(&self, request: &ActuationRequest) -> Result<String, CollaboratorError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Status {
                status: 503,
                body: "jenkins unavailable".into(),
            });
        }
        Ok(format!("autoscale-{}#{n}", request.direction))
    }
}

pub struct StubFleet {
    size: AtomicU32,
    failing: AtomicBool,
    probes: AtomicUsize,
}

impl StubFleet {
    pub fn new(size: u32) -> Self {
        Self {
            size: AtomicU32::new(size),
            failing: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, size: u32) {
        self.size.store(size, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FleetInventory for StubFleet {
    async fn current_size(&self, _config: &AutoscalingConfig) -> Result<u32, CollaboratorError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Other("prometheus unreachable".into()));
        }
        Ok(self.size.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct RecordingSilencer {
    pub silenced: Mutex<Vec<String>>,
    pub lifted: Mutex<Vec<String>>,
}

impl RecordingSilencer {
    pub fn silenced(&self) -> Vec<String> {
        self.silenced.lock().unwrap().clone()
    }

    pub fn lifted(&self) -> Vec<String> {
        self.lifted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Silencer for RecordingSilencer {
    async fn silence(
        &self,
        _service_name: &str,
        alert_name: &str,
        _duration: Duration,
    ) -> Result<String, CollaboratorError> {
        let mut silenced = self.silenced.lock().unwrap();
        silenced.push(alert_name.to_string());
        Ok(format!("silence-{}", silenced.len()))
    }

    async fn lift(&self, _service_name: &str, alert_name: &str) -> Result<usize, CollaboratorError> {
        self.lifted.lock().unwrap().push(alert_name.to_string());
        Ok(1)
    }
}

/// Keeps a set of wired services, so repeated `ensure` is an upsert.
#[derive(Default)]
pub struct RecordingProvisioner {
    wired: Mutex<HashSet<String>>,
    ensure_calls: AtomicUsize,
    teardown_calls: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingProvisioner {
    pub fn wired(&self) -> Vec<String> {
        let mut v: Vec<_> = self.wired.lock().unwrap().iter().cloned().collect();
        v.sort();
        v
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    pub fn teardown_calls(&self) -> usize {
        self.teardown_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn ensure(&self, config: &AutoscalingConfig) -> Result<String, CollaboratorError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Other("rule api down".into()));
        }
        self.wired
            .lock()
            .unwrap()
            .insert(config.service_name.clone());
        Ok(format!("wired {}", config.service_name))
    }

    async fn teardown(&self, config: &AutoscalingConfig) -> Result<String, CollaboratorError> {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Other("rule api down".into()));
        }
        self.wired.lock().unwrap().remove(&config.service_name);
        Ok(format!("unwired {}", config.service_name))
    }
}

/// Everything wired together with stubs and a manual clock.
pub struct Harness {
    _dir: TempDir,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub configs: Arc<ConfigStore>,
    pub cooldowns: Arc<CooldownTracker>,
    pub switch: Arc<HysteresisSwitch>,
    pub coordinator: Arc<DecisionCoordinator>,
    pub actuator: Arc<StubActuator>,
    pub fleet: Arc<StubFleet>,
    pub silencer: Arc<RecordingSilencer>,
    pub provisioner: Arc<RecordingProvisioner>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_actuator_timeout(Duration::from_secs(5)).await
    }

    pub async fn with_actuator_timeout(actuator_timeout: Duration) -> Self {
        let (dir, db) = test_db().await;
        let clock = Arc::new(ManualClock::new(START_EPOCH));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let provisioner = Arc::new(RecordingProvisioner::default());
        let configs = Arc::new(ConfigStore::new(&db, provisioner.clone(), dyn_clock.clone()));
        let cooldowns = Arc::new(CooldownTracker::new(
            &db,
            dyn_clock.clone(),
            DEFAULT_COOLDOWN_SECS,
        ));
        let switch = Arc::new(HysteresisSwitch::load(&db, dyn_clock).await.unwrap());
        let actuator = Arc::new(StubActuator::default());
        let fleet = Arc::new(StubFleet::new(2));
        let silencer = Arc::new(RecordingSilencer::default());

        let coordinator = Arc::new(DecisionCoordinator::new(
            CoordinatorDeps {
                configs: configs.clone(),
                cooldowns: cooldowns.clone(),
                switch: switch.clone(),
                actuator: actuator.clone(),
                fleet: fleet.clone(),
                silencer: Some(silencer.clone()),
            },
            CoordinatorSettings {
                actuator_timeout,
                silence_duration: Duration::from_secs(30 * 60),
            },
        ));

        Self {
            _dir: dir,
            db,
            clock,
            configs,
            cooldowns,
            switch,
            coordinator,
            actuator,
            fleet,
            silencer,
            provisioner,
        }
    }

    pub async fn with_config(config: NewAutoscalingConfig) -> Self {
        let harness = Self::new().await;
        harness.configs.create(config).await.unwrap();
        harness
    }
}
