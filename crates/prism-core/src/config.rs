//! Configuration system for the Prism presentation foundation

use crate::error::{PrismError, Result};
use crate::logging::{self, LogLevel};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Global configuration for Prism
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Template instantiation policies
    pub instantiation: InstantiationConfig,
    /// Style sheet and trigger policies
    pub styling: StylingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used for categories without an explicit entry
    pub default_level: String,
    /// Category-specific log levels (category name -> level string)
    pub category_levels: HashMap<String, String>,
    /// Rate limiting duration in seconds
    pub rate_limit_seconds: u64,
    /// Maximum number of messages before rate limiting kicks in
    pub max_rate_limit_count: u32,
}

/// What a standard-property mutator does when its target property is missing or read-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidTargetPolicy {
    /// Fail the whole instantiation
    Abort,
    /// Log a warning and continue with the next mutator
    Skip,
}

/// Template instantiation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantiationConfig {
    pub invalid_target_policy: InvalidTargetPolicy,
    /// Check every type name against the factory registry before instantiating
    pub validate_templates: bool,
}

/// Styling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylingConfig {
    /// Force the global style sheet in when the UI subsystem rejects it
    pub retry_failed_validation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut category_levels = HashMap::new();

        category_levels.insert("core".to_string(), "info".to_string());
        category_levels.insert("properties".to_string(), "info".to_string());
        category_levels.insert("uvml".to_string(), "info".to_string());
        category_levels.insert("styles".to_string(), "info".to_string());
        category_levels.insert("triggers".to_string(), "warn".to_string()); // Fires every frame
        category_levels.insert("content".to_string(), "info".to_string());

        Self {
            default_level: "info".to_string(),
            category_levels,
            rate_limit_seconds: 5,
            max_rate_limit_count: 10,
        }
    }
}

impl Default for InstantiationConfig {
    fn default() -> Self {
        Self {
            invalid_target_policy: InvalidTargetPolicy::Abort,
            validate_templates: true,
        }
    }
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            retry_failed_validation: true,
        }
    }
}

impl PrismConfig {
    /// Parse a configuration from JSON. Missing sections fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PrismError::configuration(format!("Invalid configuration: {}", e)))
    }

    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PrismError::configuration(format!("Cannot serialize configuration: {}", e)))
    }
}

/// Global configuration manager
#[derive(Debug)]
pub struct ConfigManager {
    config: Arc<RwLock<PrismConfig>>,
}

impl ConfigManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self::with_config(PrismConfig::default())
    }

    /// Create a configuration manager with custom config
    pub fn with_config(config: PrismConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Get a copy of the current configuration
    pub fn get_config(&self) -> PrismConfig {
        self.config.read().clone()
    }

    /// Update the configuration
    pub fn update_config<F>(&self, updater: F)
    where
        F: FnOnce(&mut PrismConfig),
    {
        updater(&mut self.config.write());
    }

    /// Get the current logging configuration
    pub fn get_logging_config(&self) -> LoggingConfig {
        self.config.read().logging.clone()
    }

    /// Get the current instantiation configuration
    pub fn get_instantiation_config(&self) -> InstantiationConfig {
        self.config.read().instantiation.clone()
    }

    /// Get the current styling configuration
    pub fn get_styling_config(&self) -> StylingConfig {
        self.config.read().styling.clone()
    }

    /// Set log level for a specific category
    ///
    /// Changes to the global manager take effect on the running logger.
    pub fn set_category_level(&self, category: &str, level: &str) -> Result<()> {
        let level: LogLevel = level.parse()?;
        self.update_config(|config| {
            config
                .logging
                .category_levels
                .insert(category.to_string(), level.to_string());
        });

        if get_config_manager().is_some_and(|global| std::ptr::eq(global, self)) {
            logging::reconfigure(&self.get_logging_config())?;
        }
        Ok(())
    }

    /// Get log level for a specific category
    pub fn get_category_level(&self, category: &str) -> Option<String> {
        self.config.read().logging.category_levels.get(category).cloned()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Global configuration instance
static CONFIG_MANAGER: OnceLock<ConfigManager> = OnceLock::new();

/// Initialize the global configuration manager
pub fn init_config() -> &'static ConfigManager {
    CONFIG_MANAGER.get_or_init(ConfigManager::new)
}

/// Initialize the global configuration manager with custom config
pub fn init_config_with(config: PrismConfig) -> &'static ConfigManager {
    CONFIG_MANAGER.get_or_init(|| ConfigManager::with_config(config))
}

/// Get the global configuration manager
pub fn get_config_manager() -> Option<&'static ConfigManager> {
    CONFIG_MANAGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrismConfig::default();

        assert_eq!(
            config.instantiation.invalid_target_policy,
            InvalidTargetPolicy::Abort
        );
        assert!(config.instantiation.validate_templates);
        assert!(config.styling.retry_failed_validation);
        assert_eq!(
            config.logging.category_levels.get("triggers"),
            Some(&"warn".to_string())
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PrismConfig::from_json_str(
            r#"{ "instantiation": { "invalid_target_policy": "Skip" } }"#,
        )
        .unwrap();

        assert_eq!(
            config.instantiation.invalid_target_policy,
            InvalidTargetPolicy::Skip
        );
        assert!(config.instantiation.validate_templates);
        assert_eq!(config.logging.default_level, "info");
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = PrismConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, PrismError::Configuration { .. }));
    }

    #[test]
    fn test_config_manager() {
        let manager = ConfigManager::new();

        manager.set_category_level("uvml", "TRACE").unwrap();
        assert!(manager.set_category_level("uvml", "loud").is_err());
        assert_eq!(manager.get_category_level("uvml"), Some("trace".to_string()));

        manager.update_config(|c| c.styling.retry_failed_validation = false);
        assert!(!manager.get_styling_config().retry_failed_validation);
    }
}
