// Integration tests: HTTP endpoints

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{Harness, sample_config};
use fleetscaler::routes::{self, AppState};
use serde_json::{Value, json};

fn test_server(h: &Harness) -> TestServer {
    let app = routes::app(AppState {
        configs: h.configs.clone(),
        cooldowns: h.cooldowns.clone(),
        switch: h.switch.clone(),
        coordinator: h.coordinator.clone(),
    });
    TestServer::new(app)
}

fn webhook_body(service: &str, suffix: &str) -> Value {
    json!({
        "receiver": "fleetscaler",
        "status": "firing",
        "alerts": [{
            "status": "firing",
            "labels": { "alertname": format!("{service}_{suffix}"), "service": service },
            "annotations": {},
            "startsAt": "2026-10-19T10:00:00Z"
        }],
        "commonLabels": {},
        "version": "4"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new().await;
    let server = test_server(&h);
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_version_endpoint() {
    let h = Harness::new().await;
    let server = test_server(&h);
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("fleetscaler")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_webhook_proceeds_then_cooldown_denies() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);

    let first = server
        .post("/api/webhook/autoscale/web")
        .json(&webhook_body("web", "HighResourceUsage"))
        .await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["decision"], json!("proceed"));
    assert_eq!(body["details"]["reason"]["code"], json!("actuated"));

    let second = server
        .post("/api/webhook/autoscale/web")
        .json(&webhook_body("web", "HighResourceUsage"))
        .await;
    second.assert_status_ok();
    let body: Value = second.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["decision"], json!("deny"));
    assert_eq!(body["details"]["reason"]["code"], json!("cooldown-active"));
    assert_eq!(body["details"]["reason"]["remainingSeconds"], json!(300));
    assert!(body["reason"].as_str().unwrap().contains("cooldown"));
    assert_eq!(h.actuator.calls(), 1);
}

#[tokio::test]
async fn test_webhook_for_unknown_service_is_a_soft_deny() {
    let h = Harness::new().await;
    let server = test_server(&h);

    let response = server
        .post("/api/webhook/autoscale/ghost")
        .json(&webhook_body("ghost", "HighResourceUsage"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["details"]["reason"]["code"],
        json!("config-missing-or-disabled")
    );
}

#[tokio::test]
async fn test_webhook_rejects_malformed_body() {
    let h = Harness::new().await;
    let server = test_server(&h);

    let response = server
        .post("/api/webhook/autoscale/web")
        .json(&json!({ "alerts": "not-a-list" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_crud() {
    let h = Harness::new().await;
    let server = test_server(&h);

    let created = server
        .post("/api/autoscaling/configs")
        .json(&sample_config("web"))
        .await;
    created.assert_status_ok();
    let body: Value = created.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["provisioning"]["status"], json!("applied"));
    let id = body["config"]["id"].as_str().unwrap().to_string();

    let fetched: Value = server
        .get(&format!("/api/autoscaling/configs/{id}"))
        .await
        .json();
    assert_eq!(fetched["config"]["serviceName"], json!("web"));
    assert_eq!(fetched["config"]["scaling"]["cooldownPeriod"], json!(300));

    let updated = server
        .put(&format!("/api/autoscaling/configs/{id}"))
        .json(&json!({ "templateId": "tmpl-debian-13" }))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["config"]["templateId"], json!("tmpl-debian-13"));
    assert_eq!(body["config"]["scaling"]["maxVms"], json!(5));

    let listed: Value = server
        .get("/api/autoscaling/configs")
        .add_query_param("enabled", "true")
        .await
        .json();
    assert_eq!(listed["configs"].as_array().unwrap().len(), 1);

    server
        .delete(&format!("/api/autoscaling/configs/{id}"))
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/autoscaling/configs/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_config_returns_all_violations() {
    let h = Harness::new().await;
    let server = test_server(&h);
    let mut bad = sample_config("web");
    bad.scaling.min_vms = 10;
    bad.monitoring.scale_in_memory_threshold = 95.0;

    let response = server.post("/api/autoscaling/configs").json(&bad).await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    let fields: Vec<_> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["field"].as_str().unwrap().to_string())
        .collect();
    assert!(fields.contains(&"scaling.minVms".to_string()));
    assert!(fields.contains(&"monitoring.scaleInMemoryThreshold".to_string()));
}

#[tokio::test]
async fn test_duplicate_service_conflicts() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);

    server
        .post("/api/autoscaling/configs")
        .json(&sample_config("web"))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_enable_disable_endpoints() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);
    let id = h.configs.find_by_service("web").await.unwrap().unwrap().id;

    let disabled: Value = server
        .post(&format!("/api/autoscaling/configs/{id}/disable"))
        .await
        .json();
    assert_eq!(disabled["config"]["enabled"], json!(false));

    let response = server
        .post("/api/webhook/autoscale/web")
        .json(&webhook_body("web", "HighResourceUsage"))
        .await;
    let body: Value = response.json();
    assert_eq!(body["decision"], json!("deny"));

    let enabled: Value = server
        .post(&format!("/api/autoscaling/configs/{id}/enable"))
        .await
        .json();
    assert_eq!(enabled["config"]["enabled"], json!(true));

    server
        .post("/api/autoscaling/configs/config-missing/enable")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cooldown_status_and_clear() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);
    server
        .post("/api/webhook/autoscale/web")
        .json(&webhook_body("web", "HighResourceUsage"))
        .await
        .assert_status_ok();

    let status: Value = server
        .get("/api/autoscaling/cooldowns/web/scale-out")
        .await
        .json();
    assert_eq!(status["cooldown"]["inCooldown"], json!(true));

    let cleared: Value = server
        .delete("/api/autoscaling/cooldowns/web/scale-out")
        .await
        .json();
    assert_eq!(cleared["cleared"], json!(true));

    server
        .get("/api/autoscaling/cooldowns/web/sideways")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fleet_callback_and_switch_status() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);

    let deleted: Value = server
        .post("/api/webhook/fleet/web")
        .json(&json!({ "event": "vm-deleted", "currentVmCount": 1 }))
        .await
        .json();
    assert_eq!(deleted["switchState"]["enabled"], json!(false));
    assert_eq!(deleted["silence"]["status"], json!("applied"));

    let one: Value = server.get("/api/autoscaling/switches/web").await.json();
    assert_eq!(one["switchState"]["enabled"], json!(false));

    h.fleet.set(3);
    let refreshed: Value = server
        .post("/api/autoscaling/switches/web/refresh")
        .await
        .json();
    assert_eq!(refreshed["switchState"]["enabled"], json!(true));

    let all: Value = server.get("/api/autoscaling/switches").await.json();
    assert_eq!(all["switches"].as_array().unwrap().len(), 1);

    server
        .post("/api/webhook/fleet/ghost")
        .json(&json!({ "event": "vm-created" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    h.fleet.set_failing(true);
    server
        .post("/api/autoscaling/switches/web/refresh")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_rename_drops_switch_state_of_old_name() {
    let h = Harness::with_config(sample_config("web")).await;
    let server = test_server(&h);
    let id = h.configs.find_by_service("web").await.unwrap().unwrap().id;
    h.coordinator.observe_fleet("web", Some(1)).await.unwrap();
    assert!(!h.switch.is_enabled("web").await);

    server
        .put(&format!("/api/autoscaling/configs/{id}"))
        .json(&json!({ "serviceName": "frontend" }))
        .await
        .assert_status_ok();

    assert!(h.switch.is_enabled("web").await);
    let all: Value = server.get("/api/autoscaling/switches").await.json();
    assert!(all["switches"].as_array().unwrap().is_empty());

    // A new config under the old name starts from the enabled default.
    h.configs.create(sample_config("web")).await.unwrap();
    let one: Value = server.get("/api/autoscaling/switches/web").await.json();
    assert_eq!(one["switchState"]["enabled"], json!(true));
}
