//! storage::config — ticketgate configuration loader (TOML)
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetCfg {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetCfg {
    fn default() -> Self { Self { path: default_dataset_path() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for OverlayCfg {
    fn default() -> Self { Self { enabled: true, dir: default_data_dir() } }
}

/// Exactly one of `pin` and `encoded_pin` must be set.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminCfg {
    #[serde(default)]
    pub pin: Option<String>,
    /// Base32 (RFC 4648, unpadded) form of the PIN.
    #[serde(default)]
    pub encoded_pin: Option<String>,
}

impl Default for AdminCfg {
    fn default() -> Self { Self { pin: Some(DEFAULT_PIN.to_string()), encoded_pin: None } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditCfg {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_rotate_bytes")]
    pub rotate_bytes: u64,
}

impl Default for AuditCfg {
    fn default() -> Self { Self { path: Some(default_data_dir().join("audit.jsonl")), rotate_bytes: default_rotate_bytes() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogCfg {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogCfg {
    fn default() -> Self { Self { level: default_level() } }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TicketgateConfig {
    #[serde(default)]
    pub dataset: DatasetCfg,
    #[serde(default)]
    pub overlay: OverlayCfg,
    #[serde(default)]
    pub admin: AdminCfg,
    #[serde(default)]
    pub audit: AuditCfg,
    #[serde(default)]
    pub log: LogCfg,
}

/// The well-known door PIN shipped with the sample dataset.
pub const DEFAULT_PIN: &str = "2050";

fn default_dataset_path() -> PathBuf { PathBuf::from("tickets.csv") }
fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_rotate_bytes() -> u64 { 1024 * 1024 }
fn default_level() -> String { "info".into() }
fn default_true() -> bool { true }

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Load TOML config from path
pub fn load_config(path: &str) -> Result<TicketgateConfig, ConfigError> {
    let txt = std::fs::read_to_string(path)?;
    parse_config(&txt)
}

pub fn parse_config(txt: &str) -> Result<TicketgateConfig, ConfigError> {
    let cfg: TicketgateConfig = toml::from_str(txt)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &TicketgateConfig) -> Result<(), ConfigError> {
    if cfg.dataset.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("dataset.path must not be empty".into()));
    }
    if cfg.overlay.enabled && cfg.overlay.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("overlay.dir must not be empty when the overlay is enabled".into()));
    }
    match (&cfg.admin.pin, &cfg.admin.encoded_pin) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation("set only one of admin.pin and admin.encoded_pin".into()));
        }
        (None, None) => {
            return Err(ConfigError::Validation("admin.pin or admin.encoded_pin is required".into()));
        }
        (Some(p), None) | (None, Some(p)) if p.trim().is_empty() => {
            return Err(ConfigError::Validation("admin PIN must not be empty".into()));
        }
        _ => {}
    }
    if let Some(enc) = &cfg.admin.encoded_pin {
        let valid = enc.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c));
        if !valid {
            return Err(ConfigError::Validation("admin.encoded_pin must be unpadded RFC 4648 base32".into()));
        }
    }
    Ok(())
}
