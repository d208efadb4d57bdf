// Actuator backed by Jenkins generic-webhook-trigger jobs (one token per direction)

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ActuationRequest, Actuator, check_status};
use crate::config::ActuatorConfig;
use crate::error::CollaboratorError;
use crate::models::Direction;

pub struct JenkinsActuator {
    client: reqwest::Client,
    config: ActuatorConfig,
}

#[derive(Debug, Default, Deserialize)]
struct TriggerResponse {
    #[serde(default)]
    jobs: Option<HashMap<String, TriggeredJob>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TriggeredJob {
    #[serde(default)]
    triggered: bool,
    #[serde(default)]
    id: Option<u64>,
}

impl JenkinsActuator {
    pub fn new(config: ActuatorConfig, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn token(&self, direction: Direction) -> &str {
        match direction {
            Direction::ScaleOut => &self.config.scale_out_token,
            Direction::ScaleIn => &self.config.scale_in_token,
        }
    }

    fn payload(request: &ActuationRequest) -> serde_json::Value {
        let c = &request.config;
        json!({
            // The job's trigger filter matches ^firing$.
            "status": "firing",
            "alerts": request.alerts,
            "scaleAction": request.direction,
            "config": {
                "serviceName": request.service_name,
                "templateId": c.template_id,
                "vmPrefix": c.vm_prefix,
                "step": request.step,
                "scaling": c.scaling,
                "cooldownPeriod": request.cooldown_period,
                "monitoring": {
                    "prometheusJobName": c.monitoring.prometheus_job_name,
                },
            },
        })
    }
}

#[async_trait]
impl Actuator for JenkinsActuator {
    async fn actuate(&self, request: &ActuationRequest) -> Result<String, CollaboratorError> {
        let url = format!(
            "{}/generic-webhook-trigger/invoke",
            self.config.url.trim_end_matches('/')
        );
        let mut builder = self
            .client
            .post(&url)
            .query(&[("token", self.token(request.direction))])
            .json(&Self::payload(request));
        if let Some(user) = &self.config.username {
            builder = builder.basic_auth(user, self.config.password.as_deref());
        }
        let response = check_status(builder.send().await?).await?;
        let body: TriggerResponse = response.json().await?;

        // A 200 only means the token was accepted; the job filter may still
        // have rejected the payload.
        let mut triggered: Vec<String> = body
            .jobs
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, job)| job.triggered)
            .map(|(name, job)| match job.id {
                Some(id) => format!("{name}#{id}"),
                None => name,
            })
            .collect();
        triggered.sort();
        if triggered.is_empty() {
            return Err(CollaboratorError::Other(format!(
                "no job triggered for {} ({})",
                request.direction,
                body.message.as_deref().unwrap_or("no message")
            )));
        }
        Ok(triggered.join(","))
    }
}
