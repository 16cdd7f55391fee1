// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Temporary status script for backends without a deployed one.
//!
//! The file only works when PHP-FPM shares this host's filesystem. It is
//! removed when the [`StatusScript`] is dropped.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

use crate::error::{OpcacheError, OpcacheResult};
use crate::types::ScriptPath;

/// Script body: prints the status document as JSON.
pub const STATUS_SCRIPT: &str = "<?php\necho json_encode(opcache_get_status(false));\n";

/// A provisioned status script. Keep it alive for as long as it is scraped.
#[derive(Debug)]
pub struct StatusScript {
    _file: TempPath,
    path: ScriptPath,
}

impl StatusScript {
    /// Write the script into the system temp directory.
    pub fn provision() -> OpcacheResult<Self> {
        Self::provision_in(std::env::temp_dir())
    }

    /// Write the script into `dir`, which must be absolute.
    pub fn provision_in(dir: impl AsRef<Path>) -> OpcacheResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("opcache-status-")
            .suffix(".php")
            .tempfile_in(dir.as_ref())
            .map_err(|e| OpcacheError::Io {
                context: "creating status script",
                source: e,
            })?;

        file.write_all(STATUS_SCRIPT.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| OpcacheError::Io {
                context: "writing status script",
                source: e,
            })?;

        // PHP-FPM workers usually run as a different user
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644))
                .map_err(|e| OpcacheError::Io {
                    context: "setting status script permissions",
                    source: e,
                })?;
        }

        let path = ScriptPath::new(file.path())?;

        tracing::info!(script = %path, "Provisioned temporary status script");

        Ok(Self {
            _file: file.into_temp_path(),
            path,
        })
    }

    pub fn path(&self) -> &ScriptPath {
        &self.path
    }
}
