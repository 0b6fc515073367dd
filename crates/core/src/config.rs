use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::flows::{ApprovalMode, WorkflowPolicy};

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub links: LinkConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    /// Base URL share and approval links are built on.
    pub base_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowConfig {
    pub approval_mode: ApprovalMode,
    pub require_slot_approval: bool,
    pub hold_timeout_minutes: i64,
}

impl WorkflowConfig {
    pub fn policy(&self) -> WorkflowPolicy {
        WorkflowPolicy {
            approval_mode: self.approval_mode,
            require_slot_approval: self.require_slot_approval,
            hold_timeout_minutes: self.hold_timeout_minutes,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub base_url: Option<String>,
    pub approval_mode: Option<ApprovalMode>,
    pub require_slot_approval: Option<bool>,
    pub hold_timeout_minutes: Option<i64>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://matchslot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            links: LinkConfig { base_url: "https://matchslot.app".to_string() },
            workflow: WorkflowConfig {
                approval_mode: ApprovalMode::OfferFirst,
                require_slot_approval: true,
                hold_timeout_minutes: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for ApprovalMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "offer_first" => Ok(Self::OfferFirst),
            "slot_only" => Ok(Self::SlotOnly),
            other => Err(ConfigError::Validation(format!(
                "unsupported approval mode `{other}` (expected offer_first|slot_only)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then `MATCHSLOT_*` environment
    /// variables, then programmatic overrides; validated at the end.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("matchslot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_from(|key| env::var(key).ok())?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(links) = patch.links {
            if let Some(base_url) = links.base_url {
                self.links.base_url = base_url;
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(approval_mode) = workflow.approval_mode {
                self.workflow.approval_mode = approval_mode;
            }
            if let Some(require_slot_approval) = workflow.require_slot_approval {
                self.workflow.require_slot_approval = require_slot_approval;
            }
            if let Some(hold_timeout_minutes) = workflow.hold_timeout_minutes {
                self.workflow.hold_timeout_minutes = hold_timeout_minutes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_from<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("MATCHSLOT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(base_url) = get("MATCHSLOT_BASE_URL") {
            self.links.base_url = base_url;
        }
        if let Some(mode) = get("MATCHSLOT_APPROVAL_MODE") {
            self.workflow.approval_mode = mode.parse()?;
        }
        if let Some(value) = get("MATCHSLOT_REQUIRE_SLOT_APPROVAL") {
            self.workflow.require_slot_approval =
                parse_env_bool("MATCHSLOT_REQUIRE_SLOT_APPROVAL", &value)?;
        }
        if let Some(value) = get("MATCHSLOT_HOLD_TIMEOUT_MINUTES") {
            self.workflow.hold_timeout_minutes = value.trim().parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "MATCHSLOT_HOLD_TIMEOUT_MINUTES".to_string(),
                    value,
                }
            })?;
        }
        if let Some(level) = get("MATCHSLOT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = get("MATCHSLOT_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(base_url) = overrides.base_url {
            self.links.base_url = base_url;
        }
        if let Some(approval_mode) = overrides.approval_mode {
            self.workflow.approval_mode = approval_mode;
        }
        if let Some(require_slot_approval) = overrides.require_slot_approval {
            self.workflow.require_slot_approval = require_slot_approval;
        }
        if let Some(hold_timeout_minutes) = overrides.hold_timeout_minutes {
            self.workflow.hold_timeout_minutes = hold_timeout_minutes;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.links.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("links.base_url must not be empty".to_string()));
        }
        if self.workflow.hold_timeout_minutes < 1 {
            return Err(ConfigError::Validation(
                "workflow.hold_timeout_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        return None;
    }

    if let Ok(path) = env::var("MATCHSLOT_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let default = PathBuf::from("matchslot.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    links: Option<LinksPatch>,
    workflow: Option<WorkflowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LinksPatch {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    approval_mode: Option<ApprovalMode>,
    require_slot_approval: Option<bool>,
    hold_timeout_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
