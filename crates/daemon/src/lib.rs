// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workbench daemon library.
//!
//! Supervises a pool of long-running editor children behind a control-plane
//! HTTP/WebSocket API and a path-prefixed reverse proxy. The binary entry
//! point is `wbd`; everything is exposed as a library so the workspace
//! specs can drive the daemon in-process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod api;
pub mod config;
pub mod env;
pub mod error;
pub mod instance_log;
pub mod logbus;
pub mod proxy;
pub mod supervisor;

pub use api::AppState;
pub use config::Config;
pub use error::SupervisorError;
pub use logbus::{DaemonLogSink, LogBus};
pub use supervisor::{CreateRequest, DaemonSupervisor, Supervisor};
