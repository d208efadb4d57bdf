// Cooldown tracker: per (service, direction) time since the last successful action.
//
// Reads fail open: an unreadable store reports the window as inactive and
// logs at WARN. A storage outage can therefore let repeated actions through.

use std::sync::Arc;

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::db::Database;
use crate::error::StoreError;
use crate::models::{CooldownStarted, CooldownStatus, CooldownWindow, Direction};

pub struct CooldownTracker {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    default_period_secs: u64,
}

impl CooldownTracker {
    pub fn new(db: &Database, clock: Arc<dyn Clock>, default_period_secs: u64) -> Self {
        Self {
            pool: db.pool().clone(),
            clock,
            default_period_secs,
        }
    }

    /// Records `now` as the last action; overwrites any earlier window.
    #[instrument(skip(self), fields(store = "cooldown", operation = "start_cooldown"))]
    pub async fn start_cooldown(
        &self,
        service_name: &str,
        direction: Direction,
        period_override: Option<u64>,
    ) -> Result<CooldownStarted, StoreError> {
        let period = self.resolve_period(period_override);
        let now = self.clock.epoch_secs();
        sqlx::query(
            "INSERT OR REPLACE INTO cooldowns (service_name, direction, last_action_time, cooldown_period_seconds) VALUES ($1, $2, $3, $4)",
        )
        .bind(service_name)
        .bind(direction.as_str())
        .bind(now)
        .bind(period as i64)
        .execute(&self.pool)
        .await?;
        info!(service = service_name, direction = %direction, period_secs = period, "cooldown started");
        Ok(CooldownStarted {
            start_time: now,
            end_time: now + period as i64,
            cooldown_period_seconds: period,
        })
    }

    /// Per-service period, or the configured default.
    pub fn resolve_period(&self, period_override: Option<u64>) -> u64 {
        period_override.unwrap_or(self.default_period_secs)
    }

    /// Pure read. Fails open.
    pub async fn check_cooldown(&self, service_name: &str, direction: Direction) -> CooldownStatus {
        match self.window(service_name, direction).await {
            Ok(Some(window)) => CooldownStatus::from_window(&window, self.clock.epoch_secs()),
            Ok(None) => CooldownStatus::idle(),
            Err(e) => {
                warn!(
                    service = service_name,
                    direction = %direction,
                    error = %e,
                    "cooldown store unreadable; treating window as inactive"
                );
                CooldownStatus::idle()
            }
        }
    }

    pub async fn window(
        &self,
        service_name: &str,
        direction: Direction,
    ) -> Result<Option<CooldownWindow>, StoreError> {
        let row = sqlx::query(
            "SELECT last_action_time, cooldown_period_seconds FROM cooldowns WHERE service_name = $1 AND direction = $2",
        )
        .bind(service_name)
        .bind(direction.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let last_action_time: i64 = row.try_get("last_action_time")?;
        let period: i64 = row.try_get("cooldown_period_seconds")?;
        Ok(Some(CooldownWindow {
            service_name: service_name.to_string(),
            direction,
            last_action_time,
            cooldown_period_seconds: period.max(0) as u64,
        }))
    }

    /// Removes the window. Ops/testing utility; returns whether one existed.
    pub async fn clear_cooldown(
        &self,
        service_name: &str,
        direction: Direction,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cooldowns WHERE service_name = $1 AND direction = $2")
            .bind(service_name)
            .bind(direction.as_str())
            .execute(&self.pool)
            .await?;
        let cleared = result.rows_affected() > 0;
        if cleared {
            info!(service = service_name, direction = %direction, "cooldown cleared");
        }
        Ok(cleared)
    }
}
