use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid value for {key}: {message}")]
    InvalidEnv { key: &'static str, message: String },

    #[error("LRW type '{0}' not supported (expected 'unizin' or 'ltitool')")]
    UnsupportedDestination(String),

    #[error("LRW type is not configured (set LRW_TYPE to 'unizin' or 'ltitool')")]
    MissingDestination,
}

/// Load the effective configuration: defaults, then the YAML file (if any),
/// then process environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.database.path = expand_tilde(&config.database.path);

    validate_config(&config)?;
    Ok(config)
}

/// Parse a YAML config file without applying environment overrides or validation
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);
    check_unexpanded_vars(&yaml_string)?;

    if yaml_string.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(&yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        ))
    })?;

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded = unexpanded_env_vars(yaml_string);
    if unexpanded.is_empty() {
        return Ok(());
    }

    Err(ConfigError::Validation(format!(
        "environment variables referenced by the config are not set: {}",
        unexpanded.join(", ")
    )))
}

/// Layer environment-style keys over `config`.
///
/// `lookup` returns the value for a key, or `None` when the key is unset.
/// Empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(path) = get("DB_PATH") {
        config.database.path = path.into();
    }
    if let Some(table) = get("EVENT_TABLE") {
        config.source.table = table;
    }
    if let Some(types) = get("EVENT_TYPES") {
        config.source.event_types = split_list(&types);
    }
    if let Some(types) = get("ACTION_TYPES") {
        config.source.action_types = split_list(&types);
    }

    if let Some(job) = get("JOB_NAME") {
        config.pipeline.job_name = job;
    }
    if let Some(first) = get("FIRST_RUNTIME") {
        config.pipeline.first_runtime = first;
    }
    if let Some(size) = get("BATCH_SIZE") {
        config.pipeline.batch_size =
            size.trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                    key: "BATCH_SIZE",
                    message: e.to_string(),
                })?;
    }

    if let Some(lrw_type) = get("LRW_TYPE") {
        config.lrw.lrw_type = Some(lrw_type);
    }
    if let Some(server) = get("LRW_SERVER") {
        config.lrw.server = server;
    }
    if let Some(token) = get("LRW_TOKEN") {
        config.lrw.token = token;
    }
    if let Some(sensor_id) = get("SENSOR_ID") {
        config.lrw.sensor_id = Some(sensor_id);
    }
    if let Some(organization) = get("ORGANIZATION") {
        config.lrw.organization = organization;
    }
    if let Some(timeout) = get("LRW_TIMEOUT") {
        config.lrw.timeout = parse_duration("LRW_TIMEOUT", &timeout)?;
    }
    if let Some(retries) = get("LRW_RETRIES") {
        config.lrw.retries =
            retries
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                    key: "LRW_RETRIES",
                    message: e.to_string(),
                })?;
    }

    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| {
        ConfigError::InvalidEnv {
            key,
            message: e.to_string(),
        }
    })
}

/// Parse a watermark timestamp such as `2019-02-01 19:53:23` or
/// `2019-02-01T19:53:23`. Naive values are taken as UTC.
pub fn parse_runtime(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let normalized = value.replacen('T', " ", 1);
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(ConfigError::Validation(format!(
        "invalid first runtime '{}': expected YYYY-MM-DD HH:MM:SS",
        value
    )))
}

fn table_identifier_pattern() -> Regex {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table identifier pattern is valid")
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.pipeline.batch_size == 0 {
        errors.push("pipeline.batch_size must be a positive integer".to_string());
    }

    if config.pipeline.job_name.trim().is_empty() {
        errors.push("pipeline.job_name cannot be empty".to_string());
    }

    if let Err(e) = parse_runtime(&config.pipeline.first_runtime) {
        errors.push(format!("pipeline.first_runtime: {}", e));
    }

    if !table_identifier_pattern().is_match(&config.source.table) {
        errors.push(format!(
            "source.table '{}' is not a valid table identifier",
            config.source.table
        ));
    }

    if config.source.event_types.is_empty() || config.source.action_types.is_empty() {
        tracing::warn!("source.event_types or source.action_types is empty, no events will be fetched");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
