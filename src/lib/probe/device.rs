use cached::proc_macro::cached;
use regex::Regex;
use serde::Serialize;
use sysinfo::{System, SystemExt};

use crate::settings;

lazy_static! {
    /// Fleet hostnames follow `<series><number>`, e.g. `lobby0042`
    static ref SERIES_REGEX: Regex = Regex::new(r"^([a-z]+)(\d+)$").unwrap();
}

#[derive(Clone, Debug, Serialize)]
pub struct DeviceInfo {
    pub device_type: String,
    pub series: String,
    pub hostname: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VersionInfo {
    pub agent: String,
    pub sha: String,
    pub build_date: String,
    pub os: String,
    pub kernel: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Device identity derived from the hostname. Static per boot, cached to
/// avoid re-reading host info on every request.
#[cached(time = 60)]
pub fn device_info() -> DeviceInfo {
    let hostname = System::new()
        .host_name()
        .unwrap_or_else(|| "unknown".to_string())
        .to_lowercase();

    let series = SERIES_REGEX
        .captures(&hostname)
        .map(|captures| captures[1].to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    DeviceInfo {
        device_type: "SBC".to_string(),
        series,
        hostname,
    }
}

#[cached(time = 60)]
pub fn version_info() -> VersionInfo {
    let system = System::new();

    VersionInfo {
        agent: env!("CARGO_PKG_VERSION").to_string(),
        sha: option_env!("VERGEN_GIT_SHA").unwrap_or("?").to_string(),
        build_date: env!("VERGEN_BUILD_TIMESTAMP").to_string(),
        os: format!(
            "{} {}",
            system.name().unwrap_or_else(|| "unknown".to_string()),
            system.os_version().unwrap_or_else(|| "unknown".to_string())
        ),
        kernel: system
            .kernel_version()
            .unwrap_or_else(|| "unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
        player: player_version(),
    }
}

fn player_version() -> Option<String> {
    let version_file = settings::manager::player_root().join("version.txt");
    std::fs::read_to_string(version_file)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|version| !version.is_empty())
}
