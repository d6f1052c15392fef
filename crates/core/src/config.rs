use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `LEADCENTER__` and an optional `leadcenter.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Client whose reporting records are read and written.
    #[serde(default = "default_owner_id")]
    pub owner_id: String,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// JSON file replacing the built-in field schema.
    #[serde(default)]
    pub schema_path: Option<String>,
    /// JSON file replacing the built-in formula table.
    #[serde(default)]
    pub formulas_path: Option<String>,
    /// Reject edits for weeks that have not started yet.
    #[serde(default = "default_lock_future_weeks")]
    pub lock_future_weeks: bool,
    /// Reject edits for weeks that ended more than this many weeks ago.
    #[serde(default)]
    pub lock_after_weeks: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

// Default functions
fn default_owner_id() -> String {
    "local".to_string()
}
fn default_lock_future_weeks() -> bool {
    true
}
fn default_log_filter() -> String {
    "leadcenter=info".to_string()
}
fn default_log_json() -> bool {
    true
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            formulas_path: None,
            lock_future_weeks: default_lock_future_weeks(),
            lock_after_weeks: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner_id(),
            reporting: ReportingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file and environment
    /// variables. Environment values win over file values.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(
                config::File::with_name(file.unwrap_or("leadcenter"))
                    .format(config::FileFormat::Toml)
                    .required(file.is_some()),
            )
            .add_source(
                config::Environment::with_prefix("LEADCENTER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.owner_id, "local");
        assert!(config.reporting.lock_future_weeks);
        assert!(config.reporting.lock_after_weeks.is_none());
        assert_eq!(config.log.filter, "leadcenter=info");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig = serde_json::from_str(
            r#"{"owner_id": "client-7", "reporting": {"lock_after_weeks": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.owner_id, "client-7");
        assert_eq!(config.reporting.lock_after_weeks, Some(4));
        assert!(config.reporting.lock_future_weeks);
        assert!(config.log.json);
    }
}
