// HTTP routes: alert webhook, actuator callbacks, config admin API, status

mod configs;
mod error;
mod status;
mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::config_store::ConfigStore;
use crate::cooldown::CooldownTracker;
use crate::coordinator::DecisionCoordinator;
use crate::hysteresis::HysteresisSwitch;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub configs: Arc<ConfigStore>,
    pub cooldowns: Arc<CooldownTracker>,
    pub switch: Arc<HysteresisSwitch>,
    pub coordinator: Arc<DecisionCoordinator>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(status::health_handler)) // GET /health
        .route("/version", get(status::version_handler)) // GET /version
        .route(
            "/api/webhook/autoscale/{service_name}",
            post(webhook::autoscale_handler),
        ) // POST alertmanager notification
        .route(
            "/api/webhook/fleet/{service_name}",
            post(webhook::fleet_event_handler),
        ) // POST actuator callback (vm-created / vm-deleted)
        .route(
            "/api/autoscaling/configs",
            get(configs::list_handler).post(configs::create_handler),
        )
        .route(
            "/api/autoscaling/configs/{id}",
            get(configs::get_handler)
                .put(configs::update_handler)
                .delete(configs::delete_handler),
        )
        .route(
            "/api/autoscaling/configs/{id}/enable",
            post(configs::enable_handler),
        )
        .route(
            "/api/autoscaling/configs/{id}/disable",
            post(configs::disable_handler),
        )
        .route(
            "/api/autoscaling/cooldowns/{service_name}/{direction}",
            get(status::cooldown_handler).delete(status::clear_cooldown_handler),
        )
        .route("/api/autoscaling/switches", get(status::switches_handler))
        .route(
            "/api/autoscaling/switches/{service_name}",
            get(status::switch_handler),
        )
        .route(
            "/api/autoscaling/switches/{service_name}/refresh",
            post(status::refresh_switch_handler),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
