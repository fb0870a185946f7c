use std::collections::HashMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sysinfo::{PidExt, ProcessExt, System, SystemExt};
use tracing::*;

use crate::{
    display::{self, DisplayStatus},
    probe::service::{self, ServiceInfo},
    settings,
};

lazy_static! {
    static ref RELEASE_REGEX: Regex = Regex::new(r"ExecStart=(\S+)/dist/linux/").unwrap();
}

#[derive(Clone, Debug, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub start_time: String,
}

/// Live player state: the service unit, the browser process actually running
/// the player, and the display it should be painting on. `healthy` is the
/// conjunction of the three.
#[derive(Clone, Debug, Serialize)]
pub struct PlayerStatus {
    pub service_active: bool,
    pub player_running: bool,
    pub display_connected: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeploymentInfo {
    pub status: String,
    pub version: String,
    pub release_path: String,
    pub last_update: String,
    pub last_reboot: String,
    pub services: HashMap<String, ServiceInfo>,
    pub display: DisplayStatus,
}

/// Check whether the player is actually up. Not cached: callers want the
/// real-time answer.
#[instrument(level = "debug")]
pub async fn status() -> PlayerStatus {
    let config = settings::manager::settings();

    let service_active = service::is_active(&config.player_service).await;
    let display = display::status().await;

    let (player_running, process) = if service_active {
        let browser = config.browser_process.clone();
        let marker = config.player_process_marker.clone();
        tokio::task::spawn_blocking(move || find_player_process(&browser, &marker))
            .await
            .unwrap_or_else(|error| {
                warn!("Player process scan panicked: {error:#?}");
                (false, None)
            })
    } else {
        (false, None)
    };

    let healthy = service_active && player_running && display.connected;

    PlayerStatus {
        service_active,
        player_running,
        display_connected: display.connected,
        healthy,
        process,
    }
}

/// Deployment report for the fleet dashboard: which release is live, the
/// state of every kiosk unit, and when the device last rebooted.
#[instrument(level = "debug")]
pub async fn deployment() -> DeploymentInfo {
    let config = settings::manager::settings();

    let (slideshow, watchdog, hide_cursor, display) = tokio::join!(
        service::info(&config.player_service),
        service::info(&config.watchdog_service),
        service::info(&config.hide_cursor_service),
        display::status(),
    );

    let services: HashMap<String, ServiceInfo> = HashMap::from([
        ("slideshow".to_string(), slideshow),
        ("watchdog".to_string(), watchdog),
        ("hide_cursor".to_string(), hide_cursor),
    ]);

    let release = current_release();
    let release_path = settings::manager::player_root().join(&release);

    let version = std::fs::read_to_string(release_path.join("version.txt"))
        .map(|raw| raw.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let all_services_active = services
        .values()
        .all(|service| service.status == "active");
    let status = if all_services_active && display.connected {
        "active"
    } else {
        "inactive"
    };

    let now = Utc::now();
    let last_reboot = DateTime::<Utc>::from_timestamp(System::new().boot_time() as i64, 0)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| now.to_rfc3339());

    DeploymentInfo {
        status: status.to_string(),
        version,
        release_path: release_path.to_string_lossy().to_string(),
        last_update: now.to_rfc3339(),
        last_reboot,
        services,
        display,
    }
}

/// The player unit's ExecStart points into the live release directory;
/// its basename names the release.
fn current_release() -> String {
    let unit_path = format!(
        "/etc/systemd/system/{}",
        settings::manager::settings().player_service
    );

    std::fs::read_to_string(unit_path)
        .ok()
        .and_then(|content| parse_release(&content))
        .unwrap_or_else(|| "unknown".to_string())
}

fn parse_release(unit_content: &str) -> Option<String> {
    RELEASE_REGEX
        .captures(unit_content)
        .and_then(|captures| {
            std::path::Path::new(&captures[1])
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
        })
}

fn find_player_process(browser: &str, marker: &str) -> (bool, Option<ProcessInfo>) {
    let mut system = System::new_all();
    system.refresh_processes();

    let total_memory = system.total_memory();

    for (pid, process) in system.processes() {
        if !process.name().contains(browser) {
            continue;
        }
        if !process.cmd().iter().any(|arg| arg.contains(marker)) {
            continue;
        }

        let start_time = DateTime::<Utc>::from_timestamp(process.start_time() as i64, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        let memory_usage = if total_memory > 0 {
            process.memory() as f32 / total_memory as f32 * 100.0
        } else {
            0.0
        };

        return (
            true,
            Some(ProcessInfo {
                pid: pid.as_u32(),
                cpu_usage: process.cpu_usage(),
                memory_usage,
                start_time,
            }),
        );
    }

    (false, None)
}
