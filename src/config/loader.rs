//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::PingerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PingerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<PingerConfig, ConfigError> {
    let config: PingerConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [database]
        url = "postgres://pinger@localhost/pinger"

        [retention]
        keep_hours = 24
        update_interval_sec = 600

        [[clusters]]
        name = "mainnet"
        chain_id = 1

        [clusters.ping]
        num_workers = 4
        batch_count = 2
        compute_fee_dual_mode = true

        [[clusters.failover.host_list]]
        endpoint = "https://primary.example.com"
        access_token = "secret"
        priority = 1
        max_retry = 5

        [[clusters.failover.host_list]]
        endpoint = "https://backup.example.com"
        priority = 2
        max_retry = 10

        [clusters.report]
        enabled = true
        interval = 300
        loss_threshold = 0.2
    "#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        let mainnet = config.cluster("mainnet").unwrap();
        assert_eq!(mainnet.ping.num_workers, 4);
        assert!(mainnet.ping.compute_fee_dual_mode);
        assert_eq!(mainnet.failover.host_list.len(), 2);
        assert_eq!(mainnet.failover.host_list[0].access_token.as_deref(), Some("secret"));
        assert_eq!(mainnet.report.loss_threshold, 0.2);
        assert_eq!(config.retention.keep_hours, 24);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.clusters.len(), 1);
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[[clusters]]\nname = \"devnet\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("host_list"));
    }

    #[test]
    fn test_shipped_example_is_valid() {
        let config = parse_config(include_str!("../../config.example.toml")).unwrap();
        let mainnet = config.cluster("mainnet").unwrap();
        assert_eq!(mainnet.failover.host_list.len(), 2);
        assert_eq!(mainnet.report.discord.bot_name, "rpc-pinger");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("clusters = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
