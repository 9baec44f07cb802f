// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Resolve root directory: WB_ROOT > XDG_STATE_HOME/workbench > ~/.local/state/workbench
pub fn root_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("WB_ROOT") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("workbench"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/workbench"))
        .ok_or(ConfigError::NoRootDir)
}

/// Control API bind address (default `0.0.0.0:8000`)
pub fn listen_addr() -> Result<SocketAddr, ConfigError> {
    let raw = std::env::var("WB_LISTEN").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    raw.parse().map_err(|_| ConfigError::BadListenAddr(raw))
}

/// Instance port range (defaults 8500..=8999)
pub fn port_range() -> (u16, u16) {
    let start = std::env::var("WB_PORT_START")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8500);
    let end = std::env::var("WB_PORT_END")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8999);
    (start, end)
}

/// The supervised editor binary (default `code-server`)
pub fn editor_bin() -> String {
    std::env::var("WB_EDITOR_BIN").unwrap_or_else(|_| "code-server".to_string())
}

/// Reverse-proxy path prefix (default `proxy`)
pub fn proxy_prefix() -> String {
    std::env::var("WB_PROXY_PREFIX")
        .ok()
        .map(|p| p.trim_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "proxy".to_string())
}

/// Health loop cadence (default 30s)
pub fn health_interval() -> Duration {
    secs_var("WB_HEALTH_INTERVAL_SECS", 30)
}

/// Metrics loop cadence (default 1s)
pub fn metrics_interval() -> Duration {
    secs_var("WB_METRICS_INTERVAL_SECS", 1)
}

fn secs_var(name: &str, default: u64) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}
