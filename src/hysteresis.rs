// Scale-in hysteresis switch. Durable in SQLite, cached in memory:
// loaded once at startup, written through on every update.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::db::Database;
use crate::error::StoreError;
use crate::models::{HysteresisSwitchState, SwitchUpdate};

pub struct HysteresisSwitch {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    states: RwLock<HashMap<String, HysteresisSwitchState>>,
}

impl HysteresisSwitch {
    /// Loads every persisted state so a restart keeps services at their floor.
    pub async fn load(db: &Database, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let pool = db.pool().clone();
        let rows = sqlx::query(
            "SELECT service_name, enabled, reason, current_vm_count, min_vms, updated_at FROM hysteresis_switch",
        )
        .fetch_all(&pool)
        .await?;

        let mut states = HashMap::with_capacity(rows.len());
        for row in rows {
            let service_name: String = row.try_get("service_name")?;
            let updated_at: Option<String> = row.try_get("updated_at")?;
            let current: Option<i64> = row.try_get("current_vm_count")?;
            let min: Option<i64> = row.try_get("min_vms")?;
            let state = HysteresisSwitchState {
                service_name: service_name.clone(),
                enabled: row.try_get("enabled")?,
                reason: row.try_get("reason")?,
                current_vm_count: current.map(|v| v.max(0) as u32),
                min_vms: min.map(|v| v.max(0) as u32),
                updated_at: updated_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|t| t.with_timezone(&Utc)),
            };
            states.insert(service_name, state);
        }
        debug!(count = states.len(), "hysteresis switch states loaded");

        Ok(Self {
            pool,
            clock,
            states: RwLock::new(states),
        })
    }

    /// Recompute from the latest fleet size. Logs only when the switch flips.
    #[instrument(skip(self), fields(store = "hysteresis", operation = "update"))]
    pub async fn update(
        &self,
        service_name: &str,
        current_vm_count: u32,
        min_vms: u32,
    ) -> Result<SwitchUpdate, StoreError> {
        let state = HysteresisSwitchState::observed(
            service_name,
            current_vm_count,
            min_vms,
            self.clock.now(),
        );

        let mut states = self.states.write().await;
        let previously_enabled = states.get(service_name).is_none_or(|s| s.enabled);

        sqlx::query(
            "INSERT OR REPLACE INTO hysteresis_switch (service_name, enabled, reason, current_vm_count, min_vms, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(service_name)
        .bind(state.enabled)
        .bind(state.reason.as_deref())
        .bind(i64::from(current_vm_count))
        .bind(i64::from(min_vms))
        .bind(state.updated_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        states.insert(service_name.to_string(), state.clone());
        drop(states);

        let update = SwitchUpdate {
            state,
            previously_enabled,
        };
        if update.transitioned() {
            info!(
                service = service_name,
                enabled = update.state.enabled,
                reason = update.state.reason.as_deref().unwrap_or_default(),
                "scale-in switch changed"
            );
        }
        Ok(update)
    }

    /// `true` until the first observation says otherwise.
    pub async fn is_enabled(&self, service_name: &str) -> bool {
        self.states
            .read()
            .await
            .get(service_name)
            .is_none_or(|s| s.enabled)
    }

    pub async fn state(&self, service_name: &str) -> HysteresisSwitchState {
        self.states
            .read()
            .await
            .get(service_name)
            .cloned()
            .unwrap_or_else(|| HysteresisSwitchState::unobserved(service_name))
    }

    pub async fn all(&self) -> Vec<HysteresisSwitchState> {
        let mut states: Vec<_> = self.states.read().await.values().cloned().collect();
        states.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        states
    }

    /// Drops a service's state, e.g. after its config is deleted.
    pub async fn forget(&self, service_name: &str) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        sqlx::query("DELETE FROM hysteresis_switch WHERE service_name = $1")
            .bind(service_name)
            .execute(&self.pool)
            .await?;
        states.remove(service_name);
        Ok(())
    }
}
