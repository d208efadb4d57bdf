// Inbound webhooks. A legitimate deny is a 200 so Alertmanager does not retry it.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, ApiError};
use crate::models::AlertmanagerPayload;

/// POST /api/webhook/autoscale/{service_name}
pub(super) async fn autoscale_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
    body: Result<Json<AlertmanagerPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    tracing::debug!(service = %service_name, receiver = %payload.receiver, "webhook received");
    let decision = state.coordinator.decide(&service_name, &payload).await?;
    Ok(Json(json!({
        "success": decision.is_proceed(),
        "decision": decision.outcome,
        "reason": decision.reason.to_string(),
        "details": decision,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FleetEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    current_vm_count: Option<u32>,
}

/// POST /api/webhook/fleet/{service_name}: the actuator reports a VM it
/// created or deleted. Without `currentVmCount` the fleet inventory is asked.
pub(super) async fn fleet_event_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
    body: Result<Json<FleetEvent>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(event) = body?;
    tracing::info!(
        service = %service_name,
        event = event.event.as_deref().unwrap_or("unspecified"),
        current_vm_count = event.current_vm_count,
        "fleet event received"
    );
    let observation = state
        .coordinator
        .observe_fleet(&service_name, event.current_vm_count)
        .await?;
    Ok(Json(json!({
        "success": true,
        "switchState": observation.state,
        "silence": observation.silence,
    })))
}
