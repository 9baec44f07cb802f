// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension materialization adapter.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Outcome of materializing one extension. Failures are reported per
/// extension and never abort the batch.
#[derive(Debug, Clone)]
pub struct ExtensionOutcome {
    pub extension: String,
    pub result: Result<(), String>,
}

/// Mutates an instance's data directory to install editor extensions.
#[async_trait]
pub trait ExtensionMaterializer: Send + Sync {
    async fn materialize(&self, data_path: &Path, extensions: &[String]) -> Vec<ExtensionOutcome>;
}

/// Default materializer: drives the editor's own CLI installer with the
/// instance's data root as `XDG_DATA_HOME`, so extension state lands under
/// the instance and never leaks into the daemon's environment.
pub struct CliMaterializer {
    editor_bin: String,
}

impl CliMaterializer {
    pub fn new(editor_bin: impl Into<String>) -> Self {
        Self { editor_bin: editor_bin.into() }
    }
}

#[async_trait]
impl ExtensionMaterializer for CliMaterializer {
    async fn materialize(&self, data_path: &Path, extensions: &[String]) -> Vec<ExtensionOutcome> {
        let mut outcomes = Vec::with_capacity(extensions.len());
        for extension in extensions {
            let result = Command::new(&self.editor_bin)
                .args(["--install-extension", extension])
                .env("XDG_DATA_HOME", data_path)
                .output()
                .await;
            let result = match result {
                Ok(output) if output.status.success() => Ok(()),
                Ok(output) => {
                    Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            outcomes.push(ExtensionOutcome { extension: extension.clone(), result });
        }
        outcomes
    }
}
