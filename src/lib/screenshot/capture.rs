use std::{path::Path, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{helper::command, settings};

/// Seam between the pipeline and whatever produces the raw frame: the
/// external screenshot binary in production, synthetic frames in tests.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Produce a frame at `destination`. Implementations must be bounded in
    /// time; a partial file on failure is fine, the pipeline cleans it up.
    async fn capture(&self, destination: &Path) -> Result<()>;
}

/// Captures the kiosk session through the external screenshot binary.
#[derive(Debug)]
pub struct ScreenshotBinary {
    binary: String,
    timeout: Duration,
}

impl ScreenshotBinary {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_settings() -> Self {
        let settings = settings::manager::settings();
        Self::new(
            settings.capture_binary,
            Duration::from_secs(settings.capture_timeout_seconds),
        )
    }
}

#[async_trait]
impl CaptureBackend for ScreenshotBinary {
    async fn capture(&self, destination: &Path) -> Result<()> {
        let env = command::kiosk_session_env();
        let envs = command::kiosk_session_env_refs(&env);
        let destination_str = destination.to_string_lossy();

        command::run(
            &self.binary,
            &["--window", "--include-border", "-f", destination_str.as_ref()],
            &envs,
            self.timeout,
        )
        .await?;

        let size = std::fs::metadata(destination).map(|meta| meta.len()).ok();
        if size.unwrap_or(0) == 0 {
            return Err(anyhow!("Capture tool produced no output file"));
        }

        Ok(())
    }
}
