// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced by the supervisor core.

use thiserror::Error;
use wb_store::StoreError;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a root directory (set WB_ROOT)")]
    NoRootDir,

    #[error("invalid WB_LISTEN address: {0}")]
    BadListenAddr(String),

    #[error("invalid port range: {start}..={end}")]
    BadPortRange { start: u16, end: u16 },
}

/// Error kinds surfaced by supervisor operations.
///
/// The control API owns the mapping to HTTP status codes; background loops
/// never propagate these; they log and continue.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("instance not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("no free port in {start}..={end}")]
    Exhausted { start: u16, end: u16 },

    #[error("failed to spawn editor: {0}")]
    SpawnFailed(String),

    #[error("workspace seeding failed: {0}")]
    SeedFailed(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for SupervisorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => SupervisorError::NotFound(what),
            StoreError::Conflict(what) => SupervisorError::Conflict(what),
            StoreError::Exhausted { start, end } => SupervisorError::Exhausted { start, end },
            other => SupervisorError::Internal(other.to_string()),
        }
    }
}
