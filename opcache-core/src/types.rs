// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time, so the collector
//! and the HTTP layer never see a malformed address or path.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use crate::error::HardValidationError;

const TCP_SCHEME: &str = "tcp://";
const UNIX_SCHEME: &str = "unix://";

/// Liveness endpoint of the HTTP listener.
pub const HEALTH_PATH: &str = "/healthz";

/// Address of the PHP-FPM FastCGI listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `host:port`, resolved at connect time.
    Tcp(String),
    /// Path to a Unix domain socket.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse an endpoint from `host:port`, `tcp://host:port`,
    /// `unix:///path/to/socket` or a bare absolute socket path.
    pub fn parse(value: &str) -> Result<Self, HardValidationError> {
        let value = value.trim();

        if let Some(path) = value.strip_prefix(UNIX_SCHEME) {
            return Self::unix(value, path);
        }
        if value.starts_with('/') {
            return Self::unix(value, value);
        }

        let addr = value.strip_prefix(TCP_SCHEME).unwrap_or(value);
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| HardValidationError::InvalidEndpoint {
                value: value.to_string(),
                reason: "expected host:port".to_string(),
            })?;

        if host.is_empty() {
            return Err(HardValidationError::InvalidEndpoint {
                value: value.to_string(),
                reason: "host cannot be empty".to_string(),
            });
        }

        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(HardValidationError::InvalidEndpoint {
                value: value.to_string(),
                reason: format!("invalid port '{}'", port),
            }),
            Ok(_) => Ok(Endpoint::Tcp(addr.to_string())),
        }
    }

    fn unix(original: &str, path: &str) -> Result<Self, HardValidationError> {
        if !path.starts_with('/') {
            return Err(HardValidationError::InvalidEndpoint {
                value: original.to_string(),
                reason: "unix socket path must be absolute".to_string(),
            });
        }
        Ok(Endpoint::Unix(PathBuf::from(path)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{}", addr),
            Endpoint::Unix(path) => write!(f, "{}{}", UNIX_SCHEME, path.display()),
        }
    }
}

/// Absolute path of the PHP script executed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPath(PathBuf);

impl ScriptPath {
    /// Create a new ScriptPath. The file lives on the backend's filesystem,
    /// so only the shape of the path is checked here.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, HardValidationError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(HardValidationError::ScriptPathNotAbsolute { path });
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ScriptPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// HTTP path the metrics are served on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPath(String);

impl TelemetryPath {
    pub fn new(path: impl Into<String>) -> Result<Self, HardValidationError> {
        let path = path.into();

        if !path.starts_with('/') {
            return Err(HardValidationError::InvalidFieldValue {
                field: "telemetry_path",
                value: path,
                reason: "must start with '/'".to_string(),
            });
        }

        // Served by the exporter itself
        if path == "/" || path == HEALTH_PATH {
            return Err(HardValidationError::InvalidFieldValue {
                field: "telemetry_path",
                value: path,
                reason: "path is reserved".to_string(),
            });
        }

        if path.chars().any(char::is_whitespace) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "telemetry_path",
                value: path,
                reason: "cannot contain whitespace".to_string(),
            });
        }

        // Must be a literal route: no captures, wildcards or legacy `:param`
        let has_pattern = path.contains(['{', '}'])
            || path
                .split('/')
                .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
        if has_pattern {
            return Err(HardValidationError::InvalidFieldValue {
                field: "telemetry_path",
                value: path,
                reason: "cannot contain route parameters or wildcards".to_string(),
            });
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TelemetryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Socket address the HTTP listener binds to.
/// Accepts the `:port` shorthand for all interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenAddress(SocketAddr);

impl ListenAddress {
    pub fn parse(value: &str) -> Result<Self, HardValidationError> {
        let value = value.trim();
        let expanded = if value.starts_with(':') {
            format!("0.0.0.0{}", value)
        } else {
            value.to_string()
        };

        let addr = expanded
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| HardValidationError::InvalidFieldValue {
                field: "listen_address",
                value: value.to_string(),
                reason: "expected [host]:port".to_string(),
            })?;

        Ok(Self(addr))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
