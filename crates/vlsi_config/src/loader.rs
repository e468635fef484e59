//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::PhysicalDesignConfig;
use std::path::Path;

/// Loads and validates a `vlsi.toml` configuration from a project directory.
///
/// Reads `<project_dir>/vlsi.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<PhysicalDesignConfig, ConfigError> {
    let config_path = project_dir.join("vlsi.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `vlsi.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PhysicalDesignConfig, ConfigError> {
    let config: PhysicalDesignConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &PhysicalDesignConfig) -> Result<(), ConfigError> {
    if config.verilog_file.is_empty() {
        return Err(ConfigError::MissingField("verilog_file".to_string()));
    }
    if config.liberty_file.is_empty() {
        return Err(ConfigError::MissingField("liberty_file".to_string()));
    }
    if !(config.utilization > 0.0 && config.utilization <= 1.0) {
        return Err(ConfigError::ValidationError(
            "utilization must be in (0.0, 1.0]".to_string(),
        ));
    }
    if config.row_height <= 0.0 {
        return Err(ConfigError::ValidationError(
            "row_height must be positive".to_string(),
        ));
    }
    if config.site_width <= 0.0 {
        return Err(ConfigError::ValidationError(
            "site_width must be positive".to_string(),
        ));
    }
    if config.routing_pitch <= 0.0 {
        return Err(ConfigError::ValidationError(
            "routing_pitch must be positive".to_string(),
        ));
    }
    if config.clock_period <= 0.0 {
        return Err(ConfigError::ValidationError(
            "clock_period must be positive".to_string(),
        ));
    }
    if !(config.target_density > 0.0 && config.target_density <= 1.0) {
        return Err(ConfigError::ValidationError(
            "target_density must be in (0.0, 1.0]".to_string(),
        ));
    }
    if config.max_placement_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "max_placement_iterations must be at least 1".to_string(),
        ));
    }
    Ok(())
}
