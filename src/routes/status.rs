// Health, version, cooldown and scale-in switch status

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::{Value, json};

use super::{AppState, ApiError};
use crate::models::Direction;

/// Package name and version from Cargo.toml.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(super) async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn parse_direction(raw: &str) -> Result<Direction, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

pub(super) async fn cooldown_handler(
    State(state): State<AppState>,
    Path((service_name, direction)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let direction = parse_direction(&direction)?;
    let status = state.cooldowns.check_cooldown(&service_name, direction).await;
    Ok(Json(json!({
        "serviceName": service_name,
        "direction": direction,
        "cooldown": status,
    })))
}

pub(super) async fn clear_cooldown_handler(
    State(state): State<AppState>,
    Path((service_name, direction)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let direction = parse_direction(&direction)?;
    let cleared = state
        .cooldowns
        .clear_cooldown(&service_name, direction)
        .await?;
    Ok(Json(json!({ "success": true, "cleared": cleared })))
}

pub(super) async fn switches_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "switches": state.switch.all().await }))
}

pub(super) async fn switch_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Json<Value> {
    Json(json!({ "switchState": state.switch.state(&service_name).await }))
}

/// Probe the fleet now and recompute the switch.
pub(super) async fn refresh_switch_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let observation = state.coordinator.observe_fleet(&service_name, None).await?;
    Ok(Json(json!({
        "switchState": observation.state,
        "silence": observation.silence,
    })))
}
