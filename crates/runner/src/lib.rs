// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process spawning, output capture, and PID probing.
//!
//! This crate knows nothing about instances or the store: it spawns what
//! it is told, reports how the child exited, publishes captured output to
//! a [`wb_core::LogSink`], and answers liveness/resource questions about
//! arbitrary PIDs.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod capture;
pub mod free_port;
pub mod probe;
pub mod spawn;

pub use capture::capture_stream;
pub use free_port::free_port;
pub use probe::{ProcProbe, ProcSample};
pub use spawn::{spawn, ExitDisposition, Launch, RunningChild, SpawnError};
