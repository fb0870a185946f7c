use std::time::Duration;

use serde::Serialize;
use tracing::*;

use crate::{helper::command, settings};

#[derive(Clone, Debug, Serialize)]
pub struct ServiceInfo {
    pub status: String,
    pub mainpid: String,
    pub activestate: String,
    pub substate: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            status: "unknown".to_string(),
            mainpid: "unknown".to_string(),
            activestate: "unknown".to_string(),
            substate: "unknown".to_string(),
        }
    }
}

/// Detailed state of a systemd unit, best effort: a failing `systemctl` just
/// leaves the corresponding fields at their defaults.
pub async fn info(service_name: &str) -> ServiceInfo {
    let settings = settings::manager::settings();
    let timeout = Duration::from_secs(settings.probe_timeout_seconds);

    let mut info = ServiceInfo::default();

    // `is-active` exits non-zero for anything but "active"
    match command::run(
        &settings.systemctl_binary,
        &["is-active", service_name],
        &[],
        timeout,
    )
    .await
    {
        Ok(status) if !status.is_empty() => info.status = status,
        Ok(_) => info.status = "inactive".to_string(),
        Err(error) => {
            debug!("systemctl is-active failed for {service_name}: {error:#}");
            info.status = "inactive".to_string();
        }
    }

    match command::run(
        &settings.systemctl_binary,
        &["show", service_name],
        &[],
        timeout,
    )
    .await
    {
        Ok(output) => parse_show_output(&mut info, &output),
        Err(error) => debug!("systemctl show failed for {service_name}: {error:#}"),
    }

    info
}

pub async fn is_active(service_name: &str) -> bool {
    info(service_name).await.status == "active"
}

fn parse_show_output(info: &mut ServiceInfo, output: &str) {
    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "MainPID" => info.mainpid = value.to_string(),
            "ActiveState" => info.activestate = value.to_lowercase(),
            "SubState" => info.substate = value.to_lowercase(),
            _ => {}
        }
    }
}
