// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::CollectorError;

/// Process configuration for the exporter, consumed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Namespace prefix applied to every metric name.
    pub namespace: String,
    /// Path serving the Prometheus text exposition.
    pub metrics_path: String,
    /// Path accepting delivery-log batches.
    pub collector_path: String,
    /// Optional access-log destination; `None` disables the sink entirely.
    pub access_log_path: Option<PathBuf>,
    /// Mirror access-log lines with a 5xx status to stderr.
    pub mirror_server_errors: bool,
    /// Log level for the tracing subscriber (e.g. trace, debug, info).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9143)),
            namespace: "edgestats".to_string(),
            metrics_path: "/metrics".to_string(),
            collector_path: "/collector".to_string(),
            access_log_path: None,
            mirror_server_errors: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, CollectorError> {
        let defaults = Config::default();

        let listen_addr = match env::var("EDGESTATS_LISTEN_ADDR") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|_| {
                CollectorError::InvalidConfig(format!("EDGESTATS_LISTEN_ADDR {raw:?} is not a socket address"))
            })?,
            Err(_) => defaults.listen_addr,
        };
        let namespace = env::var("EDGESTATS_NAMESPACE").unwrap_or(defaults.namespace);
        let metrics_path = env::var("EDGESTATS_METRICS_PATH").unwrap_or(defaults.metrics_path);
        let collector_path = env::var("EDGESTATS_COLLECTOR_PATH").unwrap_or(defaults.collector_path);
        let access_log_path = env::var("EDGESTATS_ACCESS_LOG")
            .ok()
            .filter(|val| !val.is_empty())
            .map(PathBuf::from);
        let mirror_server_errors = env::var("EDGESTATS_MIRROR_SERVER_ERRORS")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let log_level = env::var("EDGESTATS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            listen_addr,
            namespace,
            metrics_path,
            collector_path,
            access_log_path,
            mirror_server_errors,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if !self.metrics_path.starts_with('/') {
            return Err(CollectorError::InvalidConfig(format!(
                "metrics path {:?} must start with '/'",
                self.metrics_path
            )));
        }
        if !self.collector_path.starts_with('/') {
            return Err(CollectorError::InvalidConfig(format!(
                "collector path {:?} must start with '/'",
                self.collector_path
            )));
        }
        if self.metrics_path == self.collector_path {
            return Err(CollectorError::InvalidConfig(
                "metrics path and collector path must differ".to_string(),
            ));
        }

        // Prometheus rejects namespaces outside [a-zA-Z_][a-zA-Z0-9_]* at
        // registration time; fail earlier with a clearer message.
        let mut chars = self.namespace.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !self.namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CollectorError::InvalidConfig(format!(
                "namespace {:?} is not a valid metric name prefix",
                self.namespace
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(CollectorError::InvalidConfig(format!(
                "invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr.port(), 9143);
        assert!(config.access_log_path.is_none());
        assert!(!config.mirror_server_errors);
    }

    #[test]
    fn test_validate_relative_paths() {
        let config = Config {
            metrics_path: "metrics".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            collector_path: "collector".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_colliding_paths() {
        let config = Config {
            metrics_path: "/ingest".to_string(),
            collector_path: "/ingest".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_namespace() {
        for bad in ["", "9lives", "has-dash", "has space"] {
            let config = Config {
                namespace: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "namespace {bad:?} should be rejected");
        }

        let config = Config {
            namespace: "_edge_stats2".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var("EDGESTATS_LISTEN_ADDR", "127.0.0.1:19143");
        env::set_var("EDGESTATS_NAMESPACE", "delivery");
        env::set_var("EDGESTATS_ACCESS_LOG", "/tmp/access.log");
        env::set_var("EDGESTATS_MIRROR_SERVER_ERRORS", "TRUE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:19143");
        assert_eq!(config.namespace, "delivery");
        assert_eq!(config.access_log_path, Some(PathBuf::from("/tmp/access.log")));
        assert!(config.mirror_server_errors);

        env::remove_var("EDGESTATS_LISTEN_ADDR");
        env::remove_var("EDGESTATS_NAMESPACE");
        env::remove_var("EDGESTATS_ACCESS_LOG");
        env::remove_var("EDGESTATS_MIRROR_SERVER_ERRORS");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_listen_addr() {
        env::set_var("EDGESTATS_LISTEN_ADDR", "not-an-address");
        let config = Config::from_env();
        assert!(config.is_err());
        env::remove_var("EDGESTATS_LISTEN_ADDR");
    }

    #[test]
    #[serial]
    fn test_from_env_empty_access_log_disables_sink() {
        env::set_var("EDGESTATS_ACCESS_LOG", "");
        let config = Config::from_env().unwrap();
        assert!(config.access_log_path.is_none());
        env::remove_var("EDGESTATS_ACCESS_LOG");
    }
}
