use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::cli;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HeaderSettingsFile {
    pub name: String,
    pub version: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SettingsStruct {
    pub header: HeaderSettingsFile,
    /// Root of the deployed slideshow player tree
    pub player_root: String,
    /// Directory holding captured screenshots and the rate-limit stamp file
    pub screenshot_dir: String,
    /// Connector name the kiosk display is attached to
    pub display_output: String,
    /// Interpreter and script (relative to `player_root`) that reports display topology
    pub python_binary: String,
    pub display_script: String,
    /// External screenshot binary used by the capture pipeline
    pub capture_binary: String,
    pub systemctl_binary: String,
    pub reboot_binary: String,
    /// Systemd units making up the kiosk deployment
    pub player_service: String,
    pub watchdog_service: String,
    pub hide_cursor_service: String,
    /// Process names identifying the player inside the browser
    pub browser_process: String,
    pub player_process_marker: String,
    pub cache_ttl_seconds: u64,
    pub screenshot_rate_limit_seconds: u64,
    pub screenshot_max_history: usize,
    pub capture_timeout_seconds: u64,
    pub probe_timeout_seconds: u64,
}

impl Default for SettingsStruct {
    fn default() -> Self {
        SettingsStruct {
            header: HeaderSettingsFile {
                name: "Kiosk Health Agent".to_string(),
                version: 0,
            },
            player_root: "/opt/kiosk/player".to_string(),
            screenshot_dir: "/tmp/screenshots".to_string(),
            display_output: "HDMI-1".to_string(),
            python_binary: "/usr/bin/python3".to_string(),
            display_script: "util-scripts/gnome-randr.py".to_string(),
            capture_binary: "/usr/bin/gnome-screenshot".to_string(),
            systemctl_binary: "/usr/bin/systemctl".to_string(),
            reboot_binary: "sreboot".to_string(),
            player_service: "slideshow-player.service".to_string(),
            watchdog_service: "watchdog.service".to_string(),
            hide_cursor_service: "hide-cursor.service".to_string(),
            browser_process: "chromium-browser".to_string(),
            player_process_marker: "slideshow-player".to_string(),
            cache_ttl_seconds: 5,
            screenshot_rate_limit_seconds: 5,
            screenshot_max_history: 50,
            capture_timeout_seconds: 10,
            probe_timeout_seconds: 5,
        }
    }
}

#[derive(Debug)]
struct ManagerStruct {
    pub file_name: String,
    pub config: SettingsStruct,
}

#[derive(Debug, Default)]
struct Manager {
    pub content: Option<ManagerStruct>,
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Manager>> = Default::default();
}

impl Manager {
    fn new(file_name: &str) -> ManagerStruct {
        let file_name = resolve_file_name(file_name);

        debug!("Using settings file: {file_name}");

        let settings = ManagerStruct {
            file_name: file_name.clone(),
            config: load_settings_from_file(&file_name),
        };

        if let Err(error) = save_settings_to_file(&settings.file_name, &settings.config) {
            error!("Failed to save settings file: {error:#?}");
        }

        settings
    }
}

fn resolve_file_name(file_name: &str) -> String {
    let expanded = shellexpand::full(file_name)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| file_name.to_string());

    if Path::new(&expanded).is_absolute() {
        return expanded;
    }

    match ProjectDirs::from("dev", "kiosk", env!("CARGO_PKG_NAME")) {
        Some(project) => {
            let folder_path = Path::new(project.config_dir());
            if let Err(error) = std::fs::create_dir_all(folder_path) {
                error!("Failed to create settings folder: {folder_path:?}, reason: {error:#?}");
            }
            folder_path.join(&expanded).to_string_lossy().to_string()
        }
        None => expanded,
    }
}

// Init settings manager with the desired settings file,
// will be created if it does not exist
pub fn init(file_name: Option<&str>) {
    let mut manager = MANAGER.lock().unwrap();
    let file_name = file_name.unwrap_or("settings.json");
    manager.content = Some(Manager::new(file_name));
}

fn load_settings_from_file(file_name: &str) -> SettingsStruct {
    if cli::manager::is_reset() {
        return SettingsStruct::default();
    }

    let Ok(raw) = std::fs::read_to_string(file_name) else {
        return SettingsStruct::default();
    };

    serde_json::from_str(&raw).unwrap_or_else(|error| {
        warn!("Settings file {file_name} is not parseable, using defaults: {error}");
        SettingsStruct::default()
    })
}

fn save_settings_to_file(file_name: &str, content: &SettingsStruct) -> std::io::Result<()> {
    let mut file = std::fs::File::create(file_name)?;
    let value = serde_json::to_string_pretty(content)?;
    file.write_all(value.as_bytes())
}

// Save the latest state of the settings
pub fn save() {
    let manager = MANAGER.lock().unwrap();
    if let Some(content) = &manager.content {
        if let Err(error) = save_settings_to_file(&content.file_name, &content.config) {
            error!(
                "Failed to save settings: file: {:#?}, error: {error:#?}",
                &content.file_name
            );
        }
    }
}

/// Snapshot of the whole configuration. Falls back to defaults when the
/// manager was not initialized (unit tests, library use).
pub fn settings() -> SettingsStruct {
    let manager = MANAGER.lock().unwrap();
    manager
        .content
        .as_ref()
        .map(|content| content.config.clone())
        .unwrap_or_default()
}

pub fn header() -> HeaderSettingsFile {
    settings().header
}

pub fn player_root() -> PathBuf {
    let root = settings().player_root;
    PathBuf::from(
        shellexpand::full(&root)
            .map(|v| v.to_string())
            .unwrap_or(root),
    )
}

pub fn screenshot_dir() -> PathBuf {
    PathBuf::from(settings().screenshot_dir)
}

pub fn display_script() -> PathBuf {
    player_root().join(settings().display_script)
}

pub fn set_screenshot_dir(dir: &str) {
    {
        let mut manager = MANAGER.lock().unwrap();
        if let Some(content) = manager.content.as_mut() {
            content.config.screenshot_dir = dir.into();
        }
    }
    save();
}
