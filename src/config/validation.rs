//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that related limits are consistent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("rpc.mount_path must start with '/', got {0:?}")]
    MountPath(String),

    #[error("limits.max_field_bytes ({field}) exceeds limits.max_request_bytes ({request})")]
    FieldLimitAboveRequestLimit { field: usize, request: usize },

    #[error("observability.log_level must be one of trace/debug/info/warn/error, got {0:?}")]
    LogLevel(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_connections",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    if !config.rpc.mount_path.starts_with('/') {
        errors.push(ValidationError::MountPath(config.rpc.mount_path.clone()));
    }

    let limits = &config.limits;
    if limits.max_request_bytes > 0
        && limits.max_field_bytes > 0
        && limits.max_field_bytes > limits.max_request_bytes
    {
        errors.push(ValidationError::FieldLimitAboveRequestLimit {
            field: limits.max_field_bytes,
            request: limits.max_request_bytes,
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "localhost".into();
        config.listener.max_connections = 0;
        config.rpc.mount_path = "api".into();
        config.limits.max_request_bytes = 10;
        config.limits.max_field_bytes = 20;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::MountPath("api".into())));
        assert!(errors.contains(&ValidationError::FieldLimitAboveRequestLimit {
            field: 20,
            request: 10
        }));
    }

    #[test]
    fn test_unlimited_request_allows_any_field_limit() {
        let mut config = ServerConfig::default();
        config.limits.max_request_bytes = 0;
        config.limits.max_field_bytes = usize::MAX;
        assert!(validate_config(&config).is_ok());
    }
}
