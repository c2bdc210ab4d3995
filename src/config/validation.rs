//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every cluster has a usable host list
//! - Validate value ranges (workers > 0, threshold within (0, 1])
//! - Detect webhooks and TLS settings that are enabled but incomplete
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PingerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::{ClusterConfig, ConnectionMode, PingerConfig, WebhookConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PingerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.clusters.is_empty() {
        errors.push(ValidationError::new("clusters", "at least one cluster is required"));
    }

    let mut names = HashSet::new();
    for (i, cluster) in config.clusters.iter().enumerate() {
        if !names.insert(cluster.name.as_str()) {
            errors.push(ValidationError::new(
                format!("clusters[{}].name", i),
                format!("duplicate cluster name '{}'", cluster.name),
            ));
        }
        validate_cluster(cluster, &mut errors);
    }

    if config.api.enabled && ConnectionMode::parse_or_default(&config.api.mode).needs_tls() {
        if config.api.cert_path.as_deref().unwrap_or("").is_empty() {
            errors.push(ValidationError::new("api.cert_path", "required for https mode"));
        }
        if config.api.key_path.as_deref().unwrap_or("").is_empty() {
            errors.push(ValidationError::new("api.key_path", "required for https mode"));
        }
    }

    if config.retention.enabled && config.retention.keep_hours == 0 {
        errors.push(ValidationError::new("retention.keep_hours", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_cluster(cluster: &ClusterConfig, errors: &mut Vec<ValidationError>) {
    let prefix = format!("clusters.{}", cluster.name);

    if cluster.name.trim().is_empty() {
        errors.push(ValidationError::new(format!("{}.name", prefix), "must not be empty"));
    }

    if cluster.failover.host_list.is_empty() {
        errors.push(ValidationError::new(
            format!("{}.failover.host_list", prefix),
            "at least one endpoint is required",
        ));
    }

    let mut urls = HashSet::new();
    for (i, host) in cluster.failover.host_list.iter().enumerate() {
        let field = format!("{}.failover.host_list[{}]", prefix, i);
        if let Err(e) = url::Url::parse(&host.endpoint) {
            errors.push(ValidationError::new(
                format!("{}.endpoint", field),
                format!("invalid URL '{}': {}", host.endpoint, e),
            ));
        }
        if !urls.insert(host.endpoint.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.endpoint", field),
                format!("duplicate endpoint '{}'", host.endpoint),
            ));
        }
        if host.max_retry == 0 {
            errors.push(ValidationError::new(
                format!("{}.max_retry", field),
                "must be greater than 0",
            ));
        }
    }

    let ping = &cluster.ping;
    if ping.enabled {
        if ping.num_workers == 0 {
            errors.push(ValidationError::new(format!("{}.ping.num_workers", prefix), "must be greater than 0"));
        }
        if ping.batch_count == 0 {
            errors.push(ValidationError::new(format!("{}.ping.batch_count", prefix), "must be greater than 0"));
        }
        if ping.tx_timeout == 0 {
            errors.push(ValidationError::new(format!("{}.ping.tx_timeout", prefix), "must be greater than 0"));
        }
        if ping.wait_confirmation_timeout == 0 {
            errors.push(ValidationError::new(
                format!("{}.ping.wait_confirmation_timeout", prefix),
                "must be greater than 0",
            ));
        }
        if let Some(receiver) = &ping.receiver {
            if receiver.parse::<alloy::primitives::Address>().is_err() {
                errors.push(ValidationError::new(
                    format!("{}.ping.receiver", prefix),
                    format!("invalid address '{}'", receiver),
                ));
            }
        }
    }

    let threshold = cluster.report.loss_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        errors.push(ValidationError::new(
            format!("{}.report.loss_threshold", prefix),
            "must be within (0, 1]",
        ));
    }

    let hooks: [(&str, &WebhookConfig); 6] = [
        ("failover.slack_alert", &cluster.failover.slack_alert),
        ("failover.discord_alert", &cluster.failover.discord_alert),
        ("report.slack.report", &cluster.report.slack.report),
        ("report.slack.alert", &cluster.report.slack.alert),
        ("report.discord.report", &cluster.report.discord.report),
        ("report.discord.alert", &cluster.report.discord.alert),
    ];
    for (name, hook) in hooks {
        if hook.enabled && hook.webhook.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.{}.webhook", prefix, name),
                "enabled webhook needs a URL",
            ));
        }
    }
}
