// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for the OPcache exporter.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the exporter.
#[derive(Debug, Error)]
pub enum OpcacheError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Scrape Errors - masked by the collector, surfaced only by one-shot tools
    // =========================================================================
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    // =========================================================================
    // Exposition Errors
    // =========================================================================
    #[error("Metric encoding error: {0}")]
    Encoding(#[from] prometheus::Error),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors prevent startup.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid endpoint: {value} - {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("Script path must be absolute: {path}")]
    ScriptPathNotAbsolute { path: PathBuf },
}

/// Failures of a single fetch/parse cycle against the PHP backend.
///
/// None of these ever reaches a scrape caller: the collector replaces the
/// status with the zero entity and logs the error.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Cannot connect to FastCGI backend {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("FastCGI transport failure: {reason}")]
    Transport { reason: String },

    /// The backend answered with something that is not a status document.
    /// Usually a PHP warning or error page. The field keeps the whole body;
    /// the message shows only its start.
    #[error("Unparseable status document: {}", excerpt(.payload))]
    Parse { payload: String },
}

impl ScrapeError {
    pub(crate) fn transport(reason: impl Into<String>) -> Self {
        ScrapeError::Transport {
            reason: reason.into(),
        }
    }
}

/// Bytes of a rejected payload shown in error messages.
const PAYLOAD_EXCERPT_LEN: usize = 256;

fn excerpt(payload: &str) -> Cow<'_, str> {
    if payload.len() <= PAYLOAD_EXCERPT_LEN {
        return Cow::Borrowed(payload);
    }
    let mut end = PAYLOAD_EXCERPT_LEN;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!(
        "{}... ({} bytes total)",
        &payload[..end],
        payload.len()
    ))
}

/// Result type alias using OpcacheError.
pub type OpcacheResult<T> = Result<T, OpcacheError>;
