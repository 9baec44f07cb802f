// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn own_process_is_alive() {
    let probe = ProcProbe::new();
    assert!(probe.is_alive(std::process::id()));
}

#[test]
fn bogus_pid_is_not_alive() {
    let probe = ProcProbe::new();
    // Far above any realistic pid_max
    assert!(!probe.is_alive(999_999_999));
}

#[test]
fn sample_of_own_process_reports_memory() {
    let probe = ProcProbe::new();
    let sample = probe.sample(std::process::id()).expect("own process should sample");
    assert!(sample.memory_mb > 0.0);
    assert!(sample.cpu_percent >= 0.0);
}

#[test]
fn sample_of_dead_pid_is_none() {
    let probe = ProcProbe::new();
    assert!(probe.sample(999_999_999).is_none());
}

#[tokio::test]
async fn exited_child_stops_being_alive() {
    let child = crate::spawn(&crate::Launch {
        argv: vec!["true".into()],
        env: vec![],
        cwd: std::env::temp_dir(),
    })
    .unwrap();
    let pid = child.pid;
    child.wait().await;

    let probe = ProcProbe::new();
    assert!(!probe.is_alive(pid));
}
