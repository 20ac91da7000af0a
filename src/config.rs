use tracing::trace;

/// Prober backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProberConfig {
    /// Simulated probes, no network I/O (default)
    Simulated {
        /// Fraction of probes reported as lost, in [0, 1]
        #[serde(default = "default_loss_rate")]
        loss_rate: f64,
    },

    /// TCP connect probe against a fixed port
    Tcp {
        #[serde(default = "default_probe_port")]
        port: u16,
    },
}

impl Default for ProberConfig {
    fn default() -> Self {
        ProberConfig::Simulated {
            loss_rate: default_loss_rate(),
        }
    }
}

fn default_loss_rate() -> f64 {
    0.05
}

fn default_probe_port() -> u16 {
    80
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Alert handling configuration (optional)
    pub alerts: Option<AlertsConfig>,

    /// Devices registered at startup
    #[serde(default)]
    pub devices: Vec<DeviceSeed>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    /// Seconds between probe cycles
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Upper bound for a single probe before it counts as failed
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Cap on concurrent probes within one cycle
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,

    /// Probe results retained per device
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub prober: ProberConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            probe_timeout_secs: default_probe_timeout(),
            max_concurrent_probes: default_max_concurrent_probes(),
            history_limit: default_history_limit(),
            prober: ProberConfig::default(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlertsConfig {
    /// Webhook URL to POST new alerts to
    pub webhook: Option<String>,

    /// Alerts older than this are removed by cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeviceSeed {
    pub address: String,
    pub label: String,
}

fn default_ping_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_max_concurrent_probes() -> usize {
    64
}

fn default_history_limit() -> usize {
    100
}

fn default_retention_days() -> u32 {
    30
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))?;

    if config.monitor.ping_interval_secs == 0 {
        anyhow::bail!("ping_interval_secs must be positive");
    }
    if config.monitor.probe_timeout_secs == 0 {
        anyhow::bail!("probe_timeout_secs must be positive");
    }
    if config.monitor.max_concurrent_probes == 0 {
        anyhow::bail!("max_concurrent_probes must be positive");
    }

    trace!("loaded config: {config:?}");
    Ok(config)
}
