// Autoscaling config store (SQLite). Writes are serialized per config id and
// guarded by an optimistic version check. External wiring follows `enabled`
// best-effort; its outcome is reported and never undoes a write.

pub mod validation;

use std::sync::Arc;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::collaborators::Provisioner;
use crate::db::Database;
use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::models::{
    AutoscalingConfig, AutoscalingConfigPatch, ConfigFilter, NewAutoscalingConfig, SideEffect,
};

/// A stored config plus what happened to its external wiring.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub config: AutoscalingConfig,
    pub provisioning: SideEffect,
    /// Previous service name when this change renamed the service.
    pub renamed_from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConfigDeletion {
    pub config: AutoscalingConfig,
    pub teardown: SideEffect,
}

pub struct ConfigStore {
    pool: SqlitePool,
    provisioner: Arc<dyn Provisioner>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

fn map_unique(err: sqlx::Error, service_name: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!(
            "a config for service '{service_name}' already exists"
        )),
        _ => StoreError::Database(err),
    }
}

fn parse_row(row: &SqliteRow) -> Result<(AutoscalingConfig, i64), StoreError> {
    let data: String = row.try_get("data")?;
    let version: i64 = row.try_get("version")?;
    Ok((serde_json::from_str(&data)?, version))
}

impl ConfigStore {
    pub fn new(db: &Database, provisioner: Arc<dyn Provisioner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool: db.pool().clone(),
            provisioner,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    #[instrument(skip(self, new), fields(store = "config", operation = "create", service = %new.service_name))]
    pub async fn create(&self, new: NewAutoscalingConfig) -> Result<ConfigChange, StoreError> {
        let now = self.clock.now();
        let config = AutoscalingConfig {
            id: new
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("config-{}", Uuid::new_v4())),
            service_name: new.service_name,
            template_id: new.template_id,
            vm_prefix: new.vm_prefix,
            monitoring: new.monitoring,
            scaling: new.scaling,
            enabled: new.enabled,
            created_at: new.created_at.unwrap_or(now),
            updated_at: now,
        };
        validation::validate(&config)?;

        let _guard = self.locks.lock(&config.id).await;
        if self.load(&config.id).await?.is_some() {
            return Err(StoreError::Conflict(format!(
                "config '{}' already exists",
                config.id
            )));
        }

        sqlx::query(
            "INSERT INTO autoscaling_configs (id, service_name, enabled, version, created_at, updated_at, data) VALUES ($1, $2, $3, 1, $4, $5, $6)",
        )
        .bind(&config.id)
        .bind(&config.service_name)
        .bind(config.enabled)
        .bind(config.created_at.to_rfc3339())
        .bind(config.updated_at.to_rfc3339())
        .bind(serde_json::to_string(&config)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &config.service_name))?;
        info!(id = %config.id, enabled = config.enabled, "autoscaling config created");

        let provisioning = if config.enabled {
            self.provision(&config).await
        } else {
            SideEffect::Skipped {
                detail: "config created disabled".into(),
            }
        };
        Ok(ConfigChange {
            config,
            provisioning,
            renamed_from: None,
        })
    }

    pub async fn get(&self, id: &str) -> Result<AutoscalingConfig, StoreError> {
        self.load(id)
            .await?
            .map(|(config, _)| config)
            .ok_or_else(|| StoreError::NotFound(format!("config '{id}'")))
    }

    pub async fn find_by_service(
        &self,
        service_name: &str,
    ) -> Result<Option<AutoscalingConfig>, StoreError> {
        let row = sqlx::query("SELECT data, version FROM autoscaling_configs WHERE service_name = $1")
            .bind(service_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(parse_row)
            .transpose()
            .map(|r| r.map(|(config, _)| config))
    }

    pub async fn list(&self, filter: &ConfigFilter) -> Result<Vec<AutoscalingConfig>, StoreError> {
        let rows = sqlx::query(
            "SELECT data, version FROM autoscaling_configs
             WHERE ($1 IS NULL OR enabled = $1) AND ($2 IS NULL OR service_name = $2)
             ORDER BY created_at ASC, id ASC",
        )
        .bind(filter.enabled)
        .bind(filter.service_name.as_deref())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| parse_row(row).map(|(config, _)| config))
            .collect()
    }

    /// Merge `patch` one level deep; `monitoring`/`scaling` are replaced wholly.
    #[instrument(skip(self, patch), fields(store = "config", operation = "update"))]
    pub async fn update(
        &self,
        id: &str,
        patch: AutoscalingConfigPatch,
    ) -> Result<ConfigChange, StoreError> {
        let _guard = self.locks.lock(id).await;
        let (before, version) = self
            .load(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("config '{id}'")))?;

        let mut after = before.clone();
        after.apply(patch);
        after.updated_at = self.clock.now();
        validation::validate(&after)?;

        let result = sqlx::query(
            "UPDATE autoscaling_configs
             SET service_name = $1, enabled = $2, version = version + 1, updated_at = $3, data = $4
             WHERE id = $5 AND version = $6",
        )
        .bind(&after.service_name)
        .bind(after.enabled)
        .bind(after.updated_at.to_rfc3339())
        .bind(serde_json::to_string(&after)?)
        .bind(id)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &after.service_name))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "config '{id}' was modified concurrently"
            )));
        }
        info!(id, service = %after.service_name, enabled = after.enabled, "autoscaling config updated");

        let provisioning = self.reconcile_wiring(&before, &after).await;
        let renamed_from =
            (before.service_name != after.service_name).then_some(before.service_name);
        Ok(ConfigChange {
            config: after,
            provisioning,
            renamed_from,
        })
    }

    /// Enabling is an upsert against the provisioner, so repeating it is harmless.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<ConfigChange, StoreError> {
        self.update(id, AutoscalingConfigPatch::enabled(enabled))
            .await
    }

    #[instrument(skip(self), fields(store = "config", operation = "delete"))]
    pub async fn delete(&self, id: &str) -> Result<ConfigDeletion, StoreError> {
        let _guard = self.locks.lock(id).await;
        let (config, _) = self
            .load(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("config '{id}'")))?;
        sqlx::query("DELETE FROM autoscaling_configs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!(id, service = %config.service_name, "autoscaling config deleted");

        let teardown = self.unprovision(&config).await;
        Ok(ConfigDeletion { config, teardown })
    }

    async fn load(&self, id: &str) -> Result<Option<(AutoscalingConfig, i64)>, StoreError> {
        let row = sqlx::query("SELECT data, version FROM autoscaling_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_row).transpose()
    }

    async fn reconcile_wiring(
        &self,
        before: &AutoscalingConfig,
        after: &AutoscalingConfig,
    ) -> SideEffect {
        match (before.enabled, after.enabled) {
            (_, true) => {
                if before.enabled && before.service_name != after.service_name {
                    self.unprovision(before).await;
                }
                self.provision(after).await
            }
            (true, false) => self.unprovision(before).await,
            (false, false) => SideEffect::Skipped {
                detail: "config disabled".into(),
            },
        }
    }

    async fn provision(&self, config: &AutoscalingConfig) -> SideEffect {
        match self.provisioner.ensure(config).await {
            Ok(detail) => SideEffect::Applied { detail },
            Err(e) => {
                warn!(service = %config.service_name, error = %e, "provisioning failed; config kept");
                SideEffect::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn unprovision(&self, config: &AutoscalingConfig) -> SideEffect {
        match self.provisioner.teardown(config).await {
            Ok(detail) => SideEffect::Applied { detail },
            Err(e) => {
                warn!(service = %config.service_name, error = %e, "teardown failed; local change kept");
                SideEffect::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
