// Config admin API. PUT merges one level deep: a `monitoring` or `scaling`
// section in the body replaces the stored section wholly. Renaming or deleting
// a service drops its scale-in switch state.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde_json::{Value, json};

use super::{AppState, ApiError};
use crate::config_store::ConfigChange;
use crate::models::{AutoscalingConfigPatch, ConfigFilter, NewAutoscalingConfig};

fn change_body(change: ConfigChange) -> Json<Value> {
    Json(json!({
        "success": true,
        "config": change.config,
        "provisioning": change.provisioning,
    }))
}

pub(super) async fn list_handler(
    State(state): State<AppState>,
    Query(filter): Query<ConfigFilter>,
) -> Result<Json<Value>, ApiError> {
    let configs = state.configs.list(&filter).await?;
    Ok(Json(json!({ "success": true, "configs": configs })))
}

pub(super) async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let config = state.configs.get(&id).await?;
    Ok(Json(json!({ "success": true, "config": config })))
}

pub(super) async fn create_handler(
    State(state): State<AppState>,
    body: Result<Json<NewAutoscalingConfig>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(new) = body?;
    let change = state.configs.create(new).await?;
    Ok(change_body(change))
}

pub(super) async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AutoscalingConfigPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = body?;
    let change = state.configs.update(&id, patch).await?;
    if let Some(old_name) = &change.renamed_from {
        // Cooldown rows under the old name are left to expire on their own.
        if let Err(e) = state.switch.forget(old_name).await {
            tracing::warn!(service = %old_name, error = %e, "could not drop scale-in switch state");
        }
    }
    Ok(change_body(change))
}

pub(super) async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deletion = state.configs.delete(&id).await?;
    if let Err(e) = state.switch.forget(&deletion.config.service_name).await {
        tracing::warn!(error = %e, "could not drop scale-in switch state");
    }
    Ok(Json(json!({
        "success": true,
        "configId": deletion.config.id,
        "teardown": deletion.teardown,
    })))
}

pub(super) async fn enable_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(change_body(state.configs.set_enabled(&id, true).await?))
}

pub(super) async fn disable_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(change_body(state.configs.set_enabled(&id, false).await?))
}
