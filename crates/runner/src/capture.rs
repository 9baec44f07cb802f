// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented output capture for child streams.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use wb_core::{InstanceId, LogLevel, LogRecord, LogSink, LogSource};

/// Read one child stream line-by-line, publishing non-empty lines.
///
/// stdout lines publish at INFO, stderr at WARN, read errors at ERROR.
/// Returns on EOF or read error; termination is not an exit signal; the
/// supervisor waits on the process handle separately.
pub async fn capture_stream<R>(
    stream: R,
    source: LogSource,
    id: InstanceId,
    name: String,
    sink: Arc<dyn LogSink>,
) where
    R: AsyncRead + Unpin,
{
    let level = match source {
        LogSource::Stderr => LogLevel::Warn,
        _ => LogLevel::Info,
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                sink.publish(
                    LogRecord::new(level, source, line).for_instance(id.clone(), name.clone()),
                );
            }
            Ok(None) => break,
            Err(e) => {
                sink.publish(
                    LogRecord::new(LogLevel::Error, source, format!("stream read error: {}", e))
                        .for_instance(id.clone(), name.clone()),
                );
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
