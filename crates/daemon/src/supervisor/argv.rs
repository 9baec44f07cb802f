// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Editor child command-line and environment construction.

use wb_core::Instance;
use wb_runner::Launch;

use crate::config::Config;

/// Build the launch for an instance's editor child.
///
/// The child contract is three-fold: a bind-address flag, a user-data-dir
/// flag, and the workspace path as the positional argument. Everything
/// else rides on the environment: `XDG_DATA_HOME` points at the instance's
/// private data root so extension state stays inside it, and the telemetry
/// knobs keep supervised editors quiet.
pub(crate) fn build_launch(config: &Config, instance: &Instance) -> Launch {
    let editor_dir = instance.data_path.join(config.editor_name());

    let argv = vec![
        config.editor_bin.clone(),
        "--bind-addr".to_string(),
        format!("0.0.0.0:{}", instance.port),
        "--user-data-dir".to_string(),
        editor_dir.display().to_string(),
        instance.workspace_path.display().to_string(),
    ];

    let env = vec![
        ("XDG_DATA_HOME".to_string(), instance.data_path.display().to_string()),
        ("DISABLE_TELEMETRY".to_string(), "true".to_string()),
        ("DISABLE_UPDATE_CHECK".to_string(), "true".to_string()),
    ];

    Launch { argv, env, cwd: instance.workspace_path.clone() }
}

#[cfg(test)]
#[path = "argv_tests.rs"]
mod tests;
