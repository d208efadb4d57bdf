// External collaborators: actuator, silencer, fleet inventory, provisioner.
// Each sits behind a trait so the coordinator can be driven with stubs.

mod alertmanager;
mod jenkins;
mod prometheus;
mod provisioner;

pub use alertmanager::AlertmanagerSilencer;
pub use jenkins::JenkinsActuator;
pub use prometheus::PrometheusFleet;
pub use provisioner::LoggingProvisioner;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::models::{Alert, AutoscalingConfig, Direction};

/// Everything the actuator needs to grow or shrink one fleet.
#[derive(Debug, Clone)]
pub struct ActuationRequest {
    pub service_name: String,
    pub direction: Direction,
    pub step: u32,
    /// Resolved cooldown the action will be held to, in seconds.
    pub cooldown_period: u64,
    pub config: AutoscalingConfig,
    pub alerts: Vec<Alert>,
}

/// Triggers a fleet resize. Returns an operation reference.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn actuate(&self, request: &ActuationRequest) -> Result<String, CollaboratorError>;
}

/// Time-bounded alert suppression keyed by (service, alertname).
#[async_trait]
pub trait Silencer: Send + Sync {
    /// Returns the silence id. An existing active silence for the key is reused.
    async fn silence(
        &self,
        service_name: &str,
        alert_name: &str,
        duration: Duration,
    ) -> Result<String, CollaboratorError>;

    /// Expires active silences for the key. Returns how many were lifted.
    async fn lift(&self, service_name: &str, alert_name: &str) -> Result<usize, CollaboratorError>;
}

/// Current fleet size for a service.
#[async_trait]
pub trait FleetInventory: Send + Sync {
    async fn current_size(&self, config: &AutoscalingConfig) -> Result<u32, CollaboratorError>;
}

/// Alert-rule and routing wiring for an enabled config.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create-or-verify. Calling it twice must not duplicate anything.
    async fn ensure(&self, config: &AutoscalingConfig) -> Result<String, CollaboratorError>;

    /// Idempotent removal.
    async fn teardown(&self, config: &AutoscalingConfig) -> Result<String, CollaboratorError>;
}

/// Non-2xx responses become `CollaboratorError::Status` with the body attached.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        status: status.as_u16(),
        body,
    })
}
