use std::{
    collections::VecDeque,
    path::PathBuf,
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::*;

use super::{
    capture::{CaptureBackend, ScreenshotBinary},
    frame, CaptureError, ScreenshotRecord,
};
use crate::settings;

/// A persisted stamp older than this is a leftover from a previous session
/// and must not keep blocking captures.
const STALE_STAMP_SECONDS: i64 = 3600;
const STAMP_FILE: &str = ".last_capture_time";

#[derive(Clone, Debug)]
pub struct Config {
    pub directory: PathBuf,
    pub rate_limit: Duration,
    pub max_history: usize,
}

impl Config {
    pub fn from_settings() -> Self {
        let settings = settings::manager::settings();
        Self {
            directory: settings::manager::screenshot_dir(),
            rate_limit: Duration::from_secs(settings.screenshot_rate_limit_seconds),
            max_history: settings.screenshot_max_history,
        }
    }
}

/// The capture pipeline. Owns the screenshot directory, the persisted
/// rate-limit stamp and the bounded in-memory history — nothing else writes
/// them. Constructed once and handed to the HTTP layer.
pub struct Manager {
    directory: PathBuf,
    rate_limit: Duration,
    max_history: usize,
    backend: Box<dyn CaptureBackend>,
    history: Mutex<VecDeque<ScreenshotRecord>>,
}

impl Manager {
    pub fn new(config: Config, backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            directory: config.directory,
            rate_limit: config.rate_limit,
            max_history: config.max_history.max(1),
            backend,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_settings() -> Self {
        Self::new(
            Config::from_settings(),
            Box::new(ScreenshotBinary::from_settings()),
        )
    }

    /// Run one capture attempt through the whole pipeline: rate limit,
    /// external capture, validation, normalization, history rotation.
    ///
    /// Only a successful validated capture advances the rate-limit clock —
    /// a rejected or failed capture leaves the window open for retry.
    #[instrument(level = "debug", skip(self))]
    pub async fn capture(&self) -> Result<ScreenshotRecord, CaptureError> {
        // One capture in flight per device; latecomers are turned away
        // instead of racing on the stamp file
        let Ok(mut history) = self.history.try_lock() else {
            return Err(CaptureError::Busy);
        };

        let now = Utc::now();
        if let Some(last) = self.last_capture_time(now) {
            let elapsed = (now - last).to_std().unwrap_or_default();
            if elapsed < self.rate_limit {
                let retry_after_seconds = (self.rate_limit - elapsed).as_secs_f64();
                debug!("Capture rate limited, retry in {retry_after_seconds:.1}s");
                return Err(CaptureError::RateLimited {
                    retry_after_seconds,
                });
            }
        }

        if let Err(error) = std::fs::create_dir_all(&self.directory) {
            return Err(CaptureError::CaptureFailed(format!(
                "Cannot create screenshot directory {:?}: {error}",
                self.directory
            )));
        }

        let filename = format!("screenshot_{}.jpg", now.format("%Y%m%d_%H%M%S"));
        let path = self.directory.join(&filename);

        // Every early exit below must leave no partial file behind
        let cleanup = scopeguard::guard(path.clone(), |path| {
            let _ = std::fs::remove_file(path);
        });

        if let Err(error) = self.backend.capture(&path).await {
            warn!("Capture failed: {error:#}");
            return Err(CaptureError::CaptureFailed(format!("{error:#}")));
        }

        let process_path = path.clone();
        let resolution =
            match tokio::task::spawn_blocking(move || frame::process(&process_path)).await {
                Ok(Ok(resolution)) => resolution,
                Ok(Err(frame::ProcessError::Defect(defect))) => {
                    info!("Captured frame rejected: {defect}");
                    return Err(CaptureError::InvalidCapture(defect));
                }
                Ok(Err(frame::ProcessError::Other(error))) => {
                    return Err(CaptureError::CaptureFailed(format!("{error:#}")));
                }
                Err(error) => {
                    return Err(CaptureError::CaptureFailed(format!(
                        "Frame processing task failed: {error}"
                    )));
                }
            };

        let size_bytes = std::fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);

        // From here the file belongs to the history
        let path = scopeguard::ScopeGuard::into_inner(cleanup);

        let record = ScreenshotRecord {
            timestamp: now.to_rfc3339(),
            filename,
            path: path.to_string_lossy().to_string(),
            resolution,
            size_bytes,
        };

        history.push_back(record.clone());
        while history.len() > self.max_history {
            if let Some(oldest) = history.pop_front() {
                debug!("Evicting {} from screenshot history", oldest.filename);
                let _ = std::fs::remove_file(&oldest.path);
            }
        }

        self.persist_capture_time(now);

        info!(
            "Captured {} at {}x{} ({} bytes)",
            record.filename, resolution.0, resolution.1, record.size_bytes
        );
        Ok(record)
    }

    /// Current history, oldest first.
    pub async fn history(&self) -> Vec<ScreenshotRecord> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn latest(&self) -> Option<ScreenshotRecord> {
        self.history.lock().await.back().cloned()
    }

    fn stamp_file(&self) -> PathBuf {
        self.directory.join(STAMP_FILE)
    }

    /// Read the persisted capture stamp. Corrupt or stale stamps are deleted
    /// and reported as absent so they can never block captures forever;
    /// an unreadable stamp means "no prior capture".
    fn last_capture_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let stamp_file = self.stamp_file();
        let raw = std::fs::read_to_string(&stamp_file).ok()?;

        let Some(last) = parse_stamp(&raw) else {
            warn!("Discarding corrupt capture stamp: {raw:?}");
            let _ = std::fs::remove_file(&stamp_file);
            return None;
        };

        if (now - last).num_seconds() > STALE_STAMP_SECONDS {
            info!("Discarding stale capture stamp from {last}");
            let _ = std::fs::remove_file(&stamp_file);
            return None;
        }

        Some(last)
    }

    fn persist_capture_time(&self, at: DateTime<Utc>) {
        let stamp = format!("{:.6}", at.timestamp_micros() as f64 / 1e6);
        if let Err(error) = std::fs::write(self.stamp_file(), stamp) {
            // Worst case the next capture comes early; not worth failing over
            warn!("Failed to persist capture stamp: {error}");
        }
    }
}

fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp(
        seconds.trunc() as i64,
        (seconds.fract().abs() * 1e9) as u32,
    )
}
