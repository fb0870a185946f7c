use std::{process::Stdio, time::Duration};

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::*;

/// Run an external tool, capturing its trimmed stdout.
///
/// Every invocation is bounded by `timeout`; a tool that hangs is killed and
/// reported as an error, it can never stall a request handler.
#[instrument(level = "debug", skip(envs))]
pub async fn run(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    timeout: Duration,
) -> Result<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in envs {
        command.env(key, value);
    }

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| anyhow!("{program:?} timed out after {timeout:?}"))?
        .with_context(|| format!("Failed to spawn {program:?}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{program:?} exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Environment needed to reach the kiosk user's graphical session from a
/// system service: X display, session bus, and X authority.
pub fn kiosk_session_env() -> Vec<(String, String)> {
    vec![
        ("DISPLAY".to_string(), ":0.0".to_string()),
        (
            "DBUS_SESSION_BUS_ADDRESS".to_string(),
            "unix:path=/run/user/1000/bus".to_string(),
        ),
        (
            "XAUTHORITY".to_string(),
            "/run/user/1000/gdm/Xauthority".to_string(),
        ),
    ]
}

pub fn kiosk_session_env_refs(env: &[(String, String)]) -> Vec<(&str, &str)> {
    env.iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}
