// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace seeding adapter.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

/// What to populate a fresh workspace from.
#[derive(Debug, Clone)]
pub enum WorkspaceSeed {
    /// An uploaded zip archive
    Archive(Vec<u8>),
    /// A remote git repository URL
    Repository(String),
}

/// Errors from seeding a workspace. Seed failure is fatal to create.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive extraction failed: {0}")]
    Extract(String),

    #[error("repository clone failed: {0}")]
    Fetch(String),
}

/// Populates an instance's workspace directory before first start.
#[async_trait]
pub trait WorkspaceSeeder: Send + Sync {
    async fn seed(&self, workspace: &Path, seed: &WorkspaceSeed) -> Result<(), SeedError>;
}

/// Default seeder: `unzip` for archives, `git clone` for repositories.
pub struct CommandSeeder;

#[async_trait]
impl WorkspaceSeeder for CommandSeeder {
    async fn seed(&self, workspace: &Path, seed: &WorkspaceSeed) -> Result<(), SeedError> {
        match seed {
            WorkspaceSeed::Archive(bytes) => {
                let staging = workspace.join(".seed.zip");
                tokio::fs::write(&staging, bytes).await?;
                let output = Command::new("unzip")
                    .args(["-q", "-o"])
                    .arg(&staging)
                    .arg("-d")
                    .arg(workspace)
                    .output()
                    .await;
                let _ = tokio::fs::remove_file(&staging).await;
                let output = output?;
                if !output.status.success() {
                    return Err(SeedError::Extract(
                        String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    ));
                }
                Ok(())
            }
            WorkspaceSeed::Repository(url) => {
                let output = Command::new("git")
                    .args(["clone", "--depth", "1", url, "."])
                    .current_dir(workspace)
                    .output()
                    .await?;
                if !output.status.success() {
                    return Err(SeedError::Fetch(
                        String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
