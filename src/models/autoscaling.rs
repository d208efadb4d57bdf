// Per-service autoscaling configuration, creation input and merge patch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert thresholds the monitoring system evaluates. Durations are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSettings {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub duration: u32,
    pub scale_in_cpu_threshold: f64,
    pub scale_in_memory_threshold: f64,
    pub scale_in_duration: u32,
    /// Scrape job whose active targets make up the fleet.
    #[serde(default)]
    pub prometheus_job_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSettings {
    pub min_vms: u32,
    pub max_vms: u32,
    pub scale_out_step: u32,
    pub scale_in_step: u32,
    /// Seconds between two actions of the same direction. Falls back to
    /// `autoscaling.default_cooldown_secs` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<u64>,
}

/// One per managed service; `service_name` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingConfig {
    pub id: String,
    pub service_name: String,
    pub template_id: String,
    #[serde(default)]
    pub vm_prefix: String,
    pub monitoring: MonitoringSettings,
    pub scaling: ScalingSettings,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutoscalingConfig {
    /// Alert name the monitoring system fires for low usage on this service.
    pub fn scale_in_alert_name(&self) -> String {
        format!("{}_LowResourceUsage", self.service_name)
    }

    /// Apply a patch one level deep. Nested sections are replaced wholly.
    pub fn apply(&mut self, patch: AutoscalingConfigPatch) {
        if let Some(v) = patch.service_name {
            self.service_name = v;
        }
        if let Some(v) = patch.template_id {
            self.template_id = v;
        }
        if let Some(v) = patch.vm_prefix {
            self.vm_prefix = v;
        }
        if let Some(v) = patch.monitoring {
            self.monitoring = v;
        }
        if let Some(v) = patch.scaling {
            self.scaling = v;
        }
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
    }
}

/// Create request. `id` and `created_at` are generated when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAutoscalingConfig {
    #[serde(default)]
    pub id: Option<String>,
    pub service_name: String,
    pub template_id: String,
    #[serde(default)]
    pub vm_prefix: String,
    pub monitoring: MonitoringSettings,
    pub scaling: ScalingSettings,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Merge-update request.
///
/// Only top-level fields are merged: sending `monitoring` or `scaling`
/// replaces that whole section, so callers must send every field of a
/// section they touch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingConfigPatch {
    pub service_name: Option<String>,
    pub template_id: Option<String>,
    pub vm_prefix: Option<String>,
    pub monitoring: Option<MonitoringSettings>,
    pub scaling: Option<ScalingSettings>,
    pub enabled: Option<bool>,
}

impl AutoscalingConfigPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }
}

/// List filter (query string of GET /api/autoscaling/configs).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFilter {
    pub enabled: Option<bool>,
    pub service_name: Option<String>,
}
