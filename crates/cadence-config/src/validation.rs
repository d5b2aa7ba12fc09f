// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, sane dispatcher bounds, and
//! channel credentials that arrive as a complete set.

use crate::diagnostic::ConfigError;
use crate::model::CadenceConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CadenceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.engine.tick_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.tick_interval_secs must be at least 1".to_string(),
        });
    }

    let level = config.engine.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.log_level must be one of trace/debug/info/warn/error, got `{level}`"
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.dispatch.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.max_attempts must be at least 1".to_string(),
        });
    }

    if config.dispatch.campaign_batch == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.campaign_batch must be at least 1".to_string(),
        });
    }

    if config.dispatch.send_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.send_timeout_secs must be at least 1".to_string(),
        });
    }

    // SMTP credentials arrive as a set: a host without a from address (or the
    // reverse) cannot send anything.
    if config.smtp.host.is_some() && config.smtp.from_address.is_none() {
        errors.push(ConfigError::Validation {
            message: "smtp.from_address is required when smtp.host is set".to_string(),
        });
    }
    if config.smtp.from_address.is_some() && config.smtp.host.is_none() {
        errors.push(ConfigError::Validation {
            message: "smtp.host is required when smtp.from_address is set".to_string(),
        });
    }

    if config.network.api_base.is_some() && config.network.api_token.is_none() {
        errors.push(ConfigError::Validation {
            message: "network.api_token is required when network.api_base is set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
