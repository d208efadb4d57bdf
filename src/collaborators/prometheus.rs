// Fleet inventory: active Prometheus scrape targets of the service's job

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FleetInventory, check_status};
use crate::error::CollaboratorError;
use crate::models::AutoscalingConfig;

pub struct PrometheusFleet {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TargetsResponse {
    status: String,
    data: TargetsData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetsData {
    #[serde(default)]
    active_targets: Vec<ActiveTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveTarget {
    #[serde(default)]
    labels: std::collections::HashMap<String, String>,
    #[serde(default)]
    scrape_pool: String,
}

impl PrometheusFleet {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Distinct instances scraped by `job`.
fn count_job_targets(targets: &[ActiveTarget], job: &str) -> u32 {
    let instances: HashSet<&str> = targets
        .iter()
        .filter(|t| t.labels.get("job").map(String::as_str) == Some(job) || t.scrape_pool == job)
        .filter_map(|t| t.labels.get("instance").map(String::as_str))
        .collect();
    instances.len() as u32
}

#[async_trait]
impl FleetInventory for PrometheusFleet {
    async fn current_size(&self, config: &AutoscalingConfig) -> Result<u32, CollaboratorError> {
        let job = config.monitoring.prometheus_job_name.as_str();
        if job.is_empty() {
            return Err(CollaboratorError::Unconfigured(format!(
                "{} has no prometheusJobName",
                config.service_name
            )));
        }
        let url = format!("{}/api/v1/targets", self.base_url);
        let response = check_status(
            self.client
                .get(&url)
                .query(&[("state", "active")])
                .send()
                .await?,
        )
        .await?;
        let body: TargetsResponse = response.json().await?;
        if body.status != "success" {
            return Err(CollaboratorError::Other(format!(
                "prometheus returned status {}",
                body.status
            )));
        }
        Ok(count_job_targets(&body.data.active_targets, job))
    }
}
