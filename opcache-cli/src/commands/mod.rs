// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod scrape;
pub mod serve;
pub mod validate;

use opcache_core::{Config, OpcacheResult, ScriptPath, StatusScript};

/// Script to execute on the backend. When none is configured a temporary one
/// is provisioned; the caller keeps the returned guard alive while scraping.
pub fn resolve_script(config: &Config) -> OpcacheResult<(ScriptPath, Option<StatusScript>)> {
    match &config.opcache.script_path {
        Some(path) => Ok((path.clone(), None)),
        None => {
            let script = StatusScript::provision()?;
            Ok((script.path().clone(), Some(script)))
        }
    }
}
