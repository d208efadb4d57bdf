use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub autoscaling: AutoscalingDefaults,
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub alertmanager: Option<AlertmanagerConfig>,
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoscalingDefaults {
    /// Used when a cooldown is started without a per-service period.
    #[serde(default = "default_cooldown_secs")]
    pub default_cooldown_secs: u64,
    /// Upper bound on one actuator call; a timeout counts as failure.
    #[serde(default = "default_actuator_timeout_secs")]
    pub actuator_timeout_secs: u64,
    /// How long the scale-in alert stays silenced once the floor is reached.
    #[serde(default = "default_silence_minutes")]
    pub silence_minutes: u64,
}

impl Default for AutoscalingDefaults {
    fn default() -> Self {
        Self {
            default_cooldown_secs: default_cooldown_secs(),
            actuator_timeout_secs: default_actuator_timeout_secs(),
            silence_minutes: default_silence_minutes(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_actuator_timeout_secs() -> u64 {
    30
}

fn default_silence_minutes() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorConfig {
    /// Jenkins base URL.
    pub url: String,
    pub scale_out_token: String,
    pub scale_in_token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Silencing is skipped entirely when this section is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertmanagerConfig {
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often every enabled service's fleet size is re-probed.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reconcile_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_reconcile_interval_secs() -> u64 {
    120
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.autoscaling.default_cooldown_secs > 0,
            "autoscaling.default_cooldown_secs must be > 0, got {}",
            self.autoscaling.default_cooldown_secs
        );
        anyhow::ensure!(
            self.autoscaling.actuator_timeout_secs > 0,
            "autoscaling.actuator_timeout_secs must be > 0, got {}",
            self.autoscaling.actuator_timeout_secs
        );
        anyhow::ensure!(
            self.autoscaling.silence_minutes > 0,
            "autoscaling.silence_minutes must be > 0, got {}",
            self.autoscaling.silence_minutes
        );
        anyhow::ensure!(!self.actuator.url.is_empty(), "actuator.url must be non-empty");
        anyhow::ensure!(
            !self.actuator.scale_out_token.is_empty() && !self.actuator.scale_in_token.is_empty(),
            "actuator.scale_out_token and actuator.scale_in_token must be non-empty"
        );
        if let Some(am) = &self.alertmanager {
            anyhow::ensure!(!am.url.is_empty(), "alertmanager.url must be non-empty");
        }
        anyhow::ensure!(
            !self.prometheus.url.is_empty(),
            "prometheus.url must be non-empty"
        );
        anyhow::ensure!(
            self.reconciler.interval_secs > 0,
            "reconciler.interval_secs must be > 0, got {}",
            self.reconciler.interval_secs
        );
        Ok(())
    }
}
