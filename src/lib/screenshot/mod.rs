pub mod capture;
pub mod frame;
pub mod manager;

use serde::Serialize;

/// One captured frame. The record and its backing file are created and
/// destroyed together; the history in `manager::Manager` owns both.
#[derive(Clone, Debug, Serialize)]
pub struct ScreenshotRecord {
    pub timestamp: String,
    pub filename: String,
    pub path: String,
    pub resolution: (u32, u32),
    pub size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture attempted too soon, retry in {retry_after_seconds:.1}s")]
    RateLimited { retry_after_seconds: f64 },

    #[error("Another capture is already in flight")]
    Busy,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Captured frame rejected: {0}")]
    InvalidCapture(frame::FrameDefect),
}
