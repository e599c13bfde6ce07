//! Shared fixtures for integration tests.
#![allow(dead_code)]

use codebox::judge::{CommandTemplate, LanguagePlan, PlanRegistry, SourceNaming, Toolchain};
use codebox::{Executor, ExecutorConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Plans backed by `/bin/sh` so results do not depend on installed compilers.
pub fn shell_plans() -> Vec<LanguagePlan> {
    vec![
        LanguagePlan::interpreted(
            "shell",
            SourceNaming::Fixed("solution.sh"),
            "sh",
            CommandTemplate::new(["sh", "{source}"]),
        ),
        // "Compiles" by syntax-checking and copying the script to the artifact.
        LanguagePlan::compiled(
            "shellc",
            SourceNaming::Fixed("solution.sh"),
            "sh",
            CommandTemplate::new(["sh", "-c", "sh -n {source} && cp {source} {artifact}"]),
            CommandTemplate::new(["sh", "{artifact}"]),
        ),
        LanguagePlan::interpreted(
            "ghost",
            SourceNaming::Fixed("main.ghost"),
            "ghost",
            CommandTemplate::new(["codebox-no-such-tool", "{source}"]),
        ),
    ]
}

pub fn config(root: &Path, run_timeout_secs: u64) -> ExecutorConfig {
    ExecutorConfig {
        workspace_root: Some(root.to_path_buf()),
        run_timeout_secs,
        compile_timeout_secs: 10,
        kill_grace_ms: 100,
        ..Default::default()
    }
}

pub fn shell_executor(root: &Path, run_timeout_secs: u64) -> Executor {
    let registry = PlanRegistry::with_plans(shell_plans()).unwrap();
    Executor::with_registry(config(root, run_timeout_secs), Arc::new(registry)).unwrap()
}

pub fn builtin_executor(root: &Path, run_timeout_secs: u64) -> Executor {
    Executor::new(config(root, run_timeout_secs)).unwrap()
}

pub fn entries(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

/// True when every tool is on the host PATH; prints a skip note otherwise.
pub fn require(tools: &[&str]) -> bool {
    let toolchain = Toolchain::from_host();
    let missing: Vec<&str> = tools
        .iter()
        .copied()
        .filter(|tool| toolchain.resolve(tool).is_none())
        .collect();
    if missing.is_empty() {
        true
    } else {
        eprintln!("skipping: {} not installed", missing.join(", "));
        false
    }
}

/// Live (non-zombie) process check via procfs.
pub fn is_alive(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

/// Poll until `pid` is gone or `timeout` elapses.
pub fn wait_gone(pid: i32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    !is_alive(pid)
}
