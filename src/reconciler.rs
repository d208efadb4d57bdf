// Background reconciler: re-probes fleet size for every enabled service and
// refreshes its scale-in switch.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::time::{Duration, interval};

use crate::config_store::ConfigStore;
use crate::coordinator::DecisionCoordinator;
use crate::models::ConfigFilter;

pub struct ReconcilerDeps {
    pub configs: Arc<ConfigStore>,
    pub coordinator: Arc<DecisionCoordinator>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub observed: usize,
    pub failed: usize,
}

/// One pass over all enabled configs.
pub async fn run_once(configs: &ConfigStore, coordinator: &DecisionCoordinator) -> PassSummary {
    let filter = ConfigFilter {
        enabled: Some(true),
        service_name: None,
    };
    let enabled = match configs.list(&filter).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, operation = "list_configs", "reconcile pass skipped");
            return PassSummary::default();
        }
    };

    let results = join_all(
        enabled
            .iter()
            .map(|c| coordinator.observe_fleet(&c.service_name, None)),
    )
    .await;

    let mut summary = PassSummary::default();
    for (config, result) in enabled.iter().zip(results) {
        match result {
            Ok(_) => summary.observed += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    service = %config.service_name,
                    error = %e,
                    operation = "observe_fleet",
                    "fleet probe failed"
                );
            }
        }
    }
    summary
}

pub fn spawn(deps: ReconcilerDeps, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    let ReconcilerDeps {
        configs,
        coordinator,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let summary = run_once(&configs, &coordinator).await;
                    tracing::debug!(
                        observed = summary.observed,
                        failed = summary.failed,
                        "reconcile pass complete"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Reconciler shutting down");
                    break;
                }
            }
        }
    })
}
