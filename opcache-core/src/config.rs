// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict validation.
//!
//! Values come from three layers: built-in defaults, an optional YAML file,
//! and command-line overrides. Everything is validated once, at startup.
//! Any invalid field results in a HardValidationError that prevents startup.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HardValidationError, OpcacheError, OpcacheResult};
use crate::fastcgi::FastCgiClient;
use crate::types::{Endpoint, ListenAddress, ScriptPath, TelemetryPath};

/// Upper bound for the FastCGI timeout.
const MAX_FCGI_TIMEOUT_MS: u64 = 300_000;

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub web: RawWebConfig,
    #[serde(default)]
    pub opcache: RawOpcacheConfig,
}

/// Raw HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWebConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:9101".to_string()
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

impl Default for RawWebConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            telemetry_path: default_telemetry_path(),
        }
    }
}

/// Raw backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOpcacheConfig {
    #[serde(default = "default_fcgi_uri")]
    pub fcgi_uri: String,
    #[serde(default)]
    pub script_path: Option<String>,
    #[serde(default)]
    pub fcgi_timeout_ms: Option<u64>,
}

fn default_fcgi_uri() -> String {
    "127.0.0.1:9000".to_string()
}

impl Default for RawOpcacheConfig {
    fn default() -> Self {
        Self {
            fcgi_uri: default_fcgi_uri(),
            script_path: None,
            fcgi_timeout_ms: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen_address: Option<String>,
    pub telemetry_path: Option<String>,
    pub fcgi_uri: Option<String>,
    pub script_path: Option<String>,
    pub fcgi_timeout_ms: Option<u64>,
}

impl RawConfig {
    /// Apply command-line overrides on top of file values.
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.listen_address {
            self.web.listen_address = v;
        }
        if let Some(v) = overrides.telemetry_path {
            self.web.telemetry_path = v;
        }
        if let Some(v) = overrides.fcgi_uri {
            self.opcache.fcgi_uri = v;
        }
        if let Some(v) = overrides.script_path {
            self.opcache.script_path = Some(v);
        }
        if let Some(v) = overrides.fcgi_timeout_ms {
            self.opcache.fcgi_timeout_ms = Some(v);
        }
        self
    }
}

/// Validated HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub listen_address: ListenAddress,
    pub telemetry_path: TelemetryPath,
}

/// Validated backend configuration.
#[derive(Debug, Clone)]
pub struct OpcacheConfig {
    pub endpoint: Endpoint,
    /// `None` means a temporary script is provisioned at startup.
    pub script_path: Option<ScriptPath>,
    pub fcgi_timeout: Option<Duration>,
}

impl OpcacheConfig {
    /// FastCGI client for this backend.
    pub fn client(&self) -> FastCgiClient {
        FastCgiClient::new(self.endpoint.clone()).with_timeout(self.fcgi_timeout)
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub opcache: OpcacheConfig,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read a YAML file into its raw form.
    pub fn read_file(path: impl AsRef<Path>) -> OpcacheResult<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpcacheError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| OpcacheError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::read_string(&content)
    }

    /// Parse a YAML string into its raw form. An empty document yields defaults.
    pub fn read_string(content: &str) -> OpcacheResult<RawConfig> {
        if content.trim().is_empty() {
            return Ok(RawConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| OpcacheError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })
    }

    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> OpcacheResult<Config> {
        Self::validate(Self::read_file(path)?)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> OpcacheResult<Config> {
        Self::validate(Self::read_string(content)?)
    }

    /// Resolve the effective configuration: defaults, then the optional
    /// file, then overrides.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> OpcacheResult<Config> {
        let raw = match file {
            Some(path) => Self::read_file(path)?,
            None => RawConfig::default(),
        };
        Self::validate(raw.merge(overrides))
    }

    /// Validate raw configuration and convert to validated types.
    pub fn validate(raw: RawConfig) -> OpcacheResult<Config> {
        let web = WebConfig {
            listen_address: ListenAddress::parse(&raw.web.listen_address)?,
            telemetry_path: TelemetryPath::new(raw.web.telemetry_path)?,
        };

        let opcache = Self::validate_opcache(raw.opcache)?;

        Ok(Config { web, opcache })
    }

    fn validate_opcache(raw: RawOpcacheConfig) -> OpcacheResult<OpcacheConfig> {
        let endpoint = Endpoint::parse(&raw.fcgi_uri)?;

        // An empty path means "provision one", matching the CLI default.
        let script_path = match raw.script_path {
            Some(path) if !path.trim().is_empty() => Some(ScriptPath::new(path.trim())?),
            _ => None,
        };

        let fcgi_timeout = match raw.fcgi_timeout_ms {
            None => None,
            Some(ms) if ms == 0 || ms > MAX_FCGI_TIMEOUT_MS => {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "fcgi_timeout_ms",
                    value: ms.to_string(),
                    reason: format!("Must be between 1 and {}", MAX_FCGI_TIMEOUT_MS),
                }
                .into());
            }
            Some(ms) => Some(Duration::from_millis(ms)),
        };

        Ok(OpcacheConfig {
            endpoint,
            script_path,
            fcgi_timeout,
        })
    }
}
