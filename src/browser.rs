// src/browser.rs
use crate::error::{PreviewError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Opens `target` (a URL or file path) with `command`.
///
/// `command` may carry arguments, e.g. `"firefox --new-tab"`; `target` is
/// appended as the last argument. Waits for the command to exit.
pub async fn open(command: &str, target: &str) -> Result<()> {
    let failed = |reason: String| PreviewError::Browser {
        command: command.to_string(),
        target: target.to_string(),
        reason,
    };

    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| failed("no open command configured".to_string()))?;

    debug!("Opening {} with {}", target, command);
    let status = Command::new(program)
        .args(parts)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(failed(format!("exited with {}", status)))
    }
}
