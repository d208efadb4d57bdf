// Silencer backed by the Alertmanager v2 silences API

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{Silencer, check_status};
use crate::error::CollaboratorError;

const CREATED_BY: &str = "fleetscaler";

pub struct AlertmanagerSilencer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Matcher {
    name: String,
    value: String,
    is_regex: bool,
    #[serde(default = "default_true")]
    is_equal: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SilenceStatus {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GettableSilence {
    id: String,
    matchers: Vec<Matcher>,
    #[serde(default)]
    created_by: String,
    status: SilenceStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostSilenceResponse {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

impl AlertmanagerSilencer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn matchers(service_name: &str, alert_name: &str) -> Vec<Matcher> {
        vec![
            Matcher {
                name: "service".into(),
                value: service_name.into(),
                is_regex: false,
                is_equal: true,
            },
            Matcher {
                name: "alertname".into(),
                value: alert_name.into(),
                is_regex: false,
                is_equal: true,
            },
        ]
    }

    /// Active silences this process created for (service, alertname).
    async fn active_for(
        &self,
        service_name: &str,
        alert_name: &str,
    ) -> Result<Vec<String>, CollaboratorError> {
        let url = format!("{}/api/v2/silences", self.base_url);
        let response = check_status(self.client.get(&url).send().await?).await?;
        let silences: Vec<GettableSilence> = response.json().await?;
        let matches = |s: &GettableSilence, name: &str, value: &str| {
            s.matchers
                .iter()
                .any(|m| m.name == name && m.value == value && !m.is_regex && m.is_equal)
        };
        Ok(silences
            .into_iter()
            .filter(|s| s.status.state == "active" && s.created_by == CREATED_BY)
            .filter(|s| matches(s, "service", service_name) && matches(s, "alertname", alert_name))
            .map(|s| s.id)
            .collect())
    }
}

#[async_trait]
impl Silencer for AlertmanagerSilencer {
    async fn silence(
        &self,
        service_name: &str,
        alert_name: &str,
        duration: Duration,
    ) -> Result<String, CollaboratorError> {
        if let Some(existing) = self
            .active_for(service_name, alert_name)
            .await?
            .into_iter()
            .next()
        {
            return Ok(existing);
        }

        let starts_at = Utc::now();
        let ends_at = starts_at
            + chrono::Duration::from_std(duration)
                .map_err(|e| CollaboratorError::Other(e.to_string()))?;
        let body = serde_json::json!({
            "matchers": Self::matchers(service_name, alert_name),
            "startsAt": starts_at.to_rfc3339(),
            "endsAt": ends_at.to_rfc3339(),
            "createdBy": CREATED_BY,
            "comment": format!("{service_name} is at its minimum fleet size"),
        });
        let url = format!("{}/api/v2/silences", self.base_url);
        let response = check_status(self.client.post(&url).json(&body).send().await?).await?;
        let created: PostSilenceResponse = response.json().await?;
        Ok(created.silence_id)
    }

    async fn lift(&self, service_name: &str, alert_name: &str) -> Result<usize, CollaboratorError> {
        let ids = self.active_for(service_name, alert_name).await?;
        for id in &ids {
            let url = format!("{}/api/v2/silence/{}", self.base_url, id);
            check_status(self.client.delete(&url).send().await?).await?;
        }
        Ok(ids.len())
    }
}
