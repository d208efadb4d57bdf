// Scale-in hysteresis switch state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HysteresisSwitchState {
    pub service_name: String,
    pub enabled: bool,
    pub reason: Option<String>,
    pub current_vm_count: Option<u32>,
    pub min_vms: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl HysteresisSwitchState {
    /// No observation yet: a freshly configured service is assumed scalable.
    pub fn unobserved(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            enabled: true,
            reason: None,
            current_vm_count: None,
            min_vms: None,
            updated_at: None,
        }
    }

    pub fn observed(
        service_name: &str,
        current_vm_count: u32,
        min_vms: u32,
        at: DateTime<Utc>,
    ) -> Self {
        let enabled = current_vm_count > min_vms;
        let reason = if enabled {
            format!("above floor (current: {current_vm_count}, minimum: {min_vms})")
        } else {
            format!("floor reached (current: {current_vm_count}, minimum: {min_vms})")
        };
        Self {
            service_name: service_name.to_string(),
            enabled,
            reason: Some(reason),
            current_vm_count: Some(current_vm_count),
            min_vms: Some(min_vms),
            updated_at: Some(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchUpdate {
    pub state: HysteresisSwitchState,
    pub previously_enabled: bool,
}

impl SwitchUpdate {
    pub fn transitioned(&self) -> bool {
        self.previously_enabled != self.state.enabled
    }

    pub fn just_disabled(&self) -> bool {
        self.previously_enabled && !self.state.enabled
    }

    pub fn just_enabled(&self) -> bool {
        !self.previously_enabled && self.state.enabled
    }
}
