// Alertmanager webhook notification (version 4 payload)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Direction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub starts_at: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerPayload {
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub group_labels: HashMap<String, String>,
    #[serde(default)]
    pub common_labels: HashMap<String, String>,
    #[serde(default)]
    pub common_annotations: HashMap<String, String>,
    #[serde(default, rename = "externalURL")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub group_key: Option<String>,
}

impl AlertmanagerPayload {
    /// Label from the first alert, falling back to the group's common labels.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.alerts
            .first()
            .and_then(|a| a.labels.get(name))
            .or_else(|| self.common_labels.get(name))
            .map(String::as_str)
    }

    pub fn alert_name(&self) -> &str {
        self.label("alertname").unwrap_or_default()
    }

    /// An explicit `scaleAction` label wins over the alert-name suffix.
    pub fn direction(&self) -> Option<Direction> {
        if let Some(action) = self.label("scaleAction")
            && let Ok(direction) = action.parse()
        {
            return Some(direction);
        }
        Direction::from_alert_name(self.alert_name())
    }

    pub fn is_resolved(&self) -> bool {
        self.status.eq_ignore_ascii_case("resolved")
    }

    /// `autoscaleConfigId` label, used to correlate the alert with a config.
    pub fn config_id(&self) -> Option<&str> {
        self.label("autoscaleConfigId")
    }
}
