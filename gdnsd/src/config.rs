use serde::Deserialize;
use std::fs::File;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("port cannot be 0")]
    InvalidPort,
    #[error("management API URL cannot be empty")]
    EmptyManagementApiUrl,
    #[error("impersonation header cannot be empty")]
    EmptyImpersonationHeader,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ManagementApiConfig {
    /// Base URL of the management API serving records and listers
    pub url: String,
    /// Header carrying the caller identity, when the deployment's proxy
    /// uses something other than the default `Impersonate-User`
    pub impersonation_header: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the action endpoints
    pub listener: Listener,
    /// Listener for health/readiness endpoints
    pub admin_listener: Listener,
    pub management_api: ManagementApiConfig,
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        if self.management_api.url.is_empty() {
            return Err(ConfigError::EmptyManagementApiUrl);
        }
        if let Some(header) = &self.management_api.impersonation_header
            && header.is_empty()
        {
            return Err(ConfigError::EmptyImpersonationHeader);
        }
        Ok(())
    }
}
