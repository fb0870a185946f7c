pub mod parser;

use std::time::Duration;

use serde::Serialize;
use tracing::*;

use crate::{helper::command, settings};

/// Connection and mode report for the kiosk display.
///
/// Absence of a signal is a valid terminal state: fields stay `"unknown"`
/// when the topology tool did not report them.
#[derive(Clone, Debug, Serialize)]
pub struct DisplayStatus {
    pub connected: bool,
    pub resolution: String,
    pub refresh_rate: String,
    pub rotation: String,
    pub scale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for DisplayStatus {
    fn default() -> Self {
        Self {
            connected: false,
            resolution: "unknown".to_string(),
            refresh_rate: "unknown".to_string(),
            rotation: "unknown".to_string(),
            scale: "unknown".to_string(),
            error: None,
        }
    }
}

/// Query the display topology tool and parse its report.
///
/// Display status is best-effort telemetry: a missing script, a dead session
/// bus or a timeout all degrade to a disconnected status carrying the error
/// message, never to a failed request.
#[instrument(level = "debug")]
pub async fn status() -> DisplayStatus {
    let settings = settings::manager::settings();
    let script = settings::manager::display_script();
    let script = script.to_string_lossy();
    let env = command::kiosk_session_env();
    let envs = command::kiosk_session_env_refs(&env);

    match command::run(
        &settings.python_binary,
        &[script.as_ref()],
        &envs,
        Duration::from_secs(settings.probe_timeout_seconds),
    )
    .await
    {
        Ok(raw) => parser::parse(&raw, &settings.display_output),
        Err(error) => {
            warn!("Display topology query failed: {error:#}");
            DisplayStatus {
                error: Some(format!("{error:#}")),
                ..Default::default()
            }
        }
    }
}
