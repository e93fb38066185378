//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate parameter names in the parameters file
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::Uri;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "function_host.bind_address", &config.function_host.bind_address);

    if config.function.name.trim().is_empty() {
        errors.push(ValidationError::new("function.name", "must not be empty"));
    } else if !config.function.name.chars().all(is_function_name_char) {
        errors.push(ValidationError::new(
            "function.name",
            "may only contain ASCII letters, digits, '-', '_', '.' and ':'",
        ));
    }

    match config.function.endpoint.parse::<Uri>() {
        Ok(uri) if uri.scheme_str() == Some("http") && uri.authority().is_some() => {}
        _ => errors.push(ValidationError::new(
            "function.endpoint",
            format!("{:?} is not an http:// URL", config.function.endpoint),
        )),
    }

    for (field, value) in [
        ("function.invoke_timeout_secs", config.function.invoke_timeout_secs),
        ("function_host.upstream_timeout_secs", config.function_host.upstream_timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.parameters.page_size == 0 {
        errors.push(ValidationError::new("parameters.page_size", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every name must be absolute, e.g. `/prod/example.com/headers/x-api-key`.
pub fn validate_parameters(parameters: &BTreeMap<String, String>) -> Result<(), Vec<ValidationError>> {
    let errors: Vec<_> = parameters
        .keys()
        .filter(|name| !name.starts_with('/') || name.len() < 2)
        .map(|name| ValidationError::new(format!("parameters.{name:?}"), "name must be an absolute path"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Function names go into the invoke path unescaped.
fn is_function_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("{value:?} is not a socket address")));
    }
}
