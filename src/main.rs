use anyhow::Result;
use fleetscaler::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use fleetscaler::clock::{Clock, SystemClock};
use fleetscaler::collaborators::{
    AlertmanagerSilencer, JenkinsActuator, LoggingProvisioner, PrometheusFleet, Silencer,
};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let database =
        db::Database::connect(&app_config.database.path, app_config.database.max_pool_size).await?;
    database.init().await?;

    let configs = Arc::new(config_store::ConfigStore::new(
        &database,
        Arc::new(LoggingProvisioner),
        clock.clone(),
    ));
    let cooldowns = Arc::new(cooldown::CooldownTracker::new(
        &database,
        clock.clone(),
        app_config.autoscaling.default_cooldown_secs,
    ));
    let switch = Arc::new(hysteresis::HysteresisSwitch::load(&database, clock.clone()).await?);

    let actuator_timeout = Duration::from_secs(app_config.autoscaling.actuator_timeout_secs);
    let actuator = Arc::new(JenkinsActuator::new(
        app_config.actuator.clone(),
        actuator_timeout,
    )?);
    let fleet = Arc::new(PrometheusFleet::new(
        &app_config.prometheus.url,
        Duration::from_secs(app_config.prometheus.request_timeout_secs),
    )?);
    let silencer: Option<Arc<dyn Silencer>> = match &app_config.alertmanager {
        Some(am) => Some(Arc::new(AlertmanagerSilencer::new(
            &am.url,
            Duration::from_secs(am.request_timeout_secs),
        )?)),
        None => {
            tracing::warn!("No [alertmanager] section; scale-in alerts will not be silenced");
            None
        }
    };

    let coordinator = Arc::new(coordinator::DecisionCoordinator::new(
        coordinator::CoordinatorDeps {
            configs: configs.clone(),
            cooldowns: cooldowns.clone(),
            switch: switch.clone(),
            actuator,
            fleet,
            silencer,
        },
        coordinator::CoordinatorSettings {
            actuator_timeout,
            silence_duration: Duration::from_secs(app_config.autoscaling.silence_minutes * 60),
        },
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let reconciler_handle = if app_config.reconciler.enabled {
        Some(reconciler::spawn(
            reconciler::ReconcilerDeps {
                configs: configs.clone(),
                coordinator: coordinator.clone(),
                shutdown_rx,
            },
            app_config.reconciler.interval_secs,
        ))
    } else {
        None
    };

    let app = routes::app(routes::AppState {
        configs,
        cooldowns,
        switch,
        coordinator,
    });
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            if let Some(handle) = reconciler_handle {
                let _ = handle.await;
            }
        }
    }

    database.close().await;
    Ok(())
}
