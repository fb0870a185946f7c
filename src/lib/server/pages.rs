use std::time::Duration;

use actix_web::{
    rt,
    web::{self, Json},
    HttpRequest, HttpResponse,
};
use anyhow::anyhow;
use chrono::Utc;
use serde::Serialize;
use tracing::*;

use crate::{
    cache::CacheInfo,
    display::{self, DisplayStatus},
    health::{self, HealthScore, HealthSummary},
    helper::command,
    player::{self, DeploymentInfo, PlayerStatus},
    probe::{
        device::{self, VersionInfo},
        metrics::{self, MetricsSnapshot},
    },
    screenshot::ScreenshotRecord,
    server::{
        error::{Error, Result},
        manager::AppState,
    },
    settings,
};

#[derive(Debug, Serialize)]
pub struct Info {
    pub name: String,
    pub version: String,
    pub sha: String,
    pub build_date: String,
    pub authors: String,
}

#[derive(Debug, Serialize)]
pub struct SystemVersion {
    #[serde(rename = "type")]
    pub device_type: String,
    pub series: String,
    #[serde(flatten)]
    pub version: VersionInfo,
}

#[derive(Debug, Serialize)]
pub struct CacheInfoBlock {
    pub metrics: CacheInfo,
    pub display: CacheInfo,
    pub deployment: CacheInfo,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub hostname: String,
    pub timestamp: String,
    pub timestamp_epoch: i64,
    pub version: SystemVersion,
    pub metrics: MetricsSnapshot,
    pub deployment: DeploymentInfo,
    pub player: PlayerStatus,
    pub display: DisplayStatus,
    pub health_scores: HealthScore,
    #[serde(rename = "_cache_info")]
    pub cache_info: CacheInfoBlock,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub screenshot: ScreenshotRecord,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub details: String,
}

pub fn new_info() -> Info {
    Info {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        sha: option_env!("VERGEN_GIT_SHA").unwrap_or("?").into(),
        build_date: env!("VERGEN_BUILD_TIMESTAMP").into(),
        authors: env!("CARGO_PKG_AUTHORS").into(),
    }
}

/// Provide information about the running service
pub async fn info() -> Result<Json<Info>> {
    Ok(Json(new_info()))
}

async fn cached_metrics(state: &AppState) -> anyhow::Result<MetricsSnapshot> {
    state
        .metrics_cache
        .get_with(|| async {
            tokio::task::spawn_blocking(metrics::collect)
                .await
                .map_err(|error| anyhow!("Metrics probe panicked: {error}"))
        })
        .await
}

async fn cached_display(state: &AppState) -> DisplayStatus {
    let result = state
        .display_cache
        .get_with(|| async { Ok::<_, std::convert::Infallible>(display::status().await) })
        .await;
    match result {
        Ok(status) => status,
        Err(never) => match never {},
    }
}

async fn cached_deployment(state: &AppState) -> DeploymentInfo {
    let result = state
        .deployment_cache
        .get_with(|| async { Ok::<_, std::convert::Infallible>(player::deployment().await) })
        .await;
    match result {
        Ok(deployment) => deployment,
        Err(never) => match never {},
    }
}

/// Full health snapshot: rollup status, cached probes, real-time player
/// state and the weighted health scores
pub async fn health(state: web::Data<AppState>) -> Result<Json<HealthResponse>> {
    let metrics = cached_metrics(&state)
        .await
        .map_err(|error| Error::Internal(format!("{error:#}")))?;
    let deployment = cached_deployment(&state).await;
    let display_status = cached_display(&state).await;
    // Player state is intentionally not cached: dashboards use it for
    // remote-action decisions and need the real-time answer
    let player_status = player::status().await;
    let device = device::device_info();

    let health_scores = health::score(&metrics, &player_status, &display_status);

    let status = if player_status.healthy {
        "online"
    } else if player_status.service_active {
        "maintenance"
    } else {
        "offline"
    };

    let now = Utc::now();
    Ok(Json(HealthResponse {
        status,
        hostname: device.hostname,
        timestamp: now.to_rfc3339(),
        timestamp_epoch: now.timestamp(),
        version: SystemVersion {
            device_type: device.device_type,
            series: device.series,
            version: device::version_info(),
        },
        metrics,
        deployment,
        player: player_status,
        display: display_status,
        health_scores,
        cache_info: CacheInfoBlock {
            metrics: state.metrics_cache.info().await,
            display: state.display_cache.info().await,
            deployment: state.deployment_cache.info().await,
        },
    }))
}

/// Health summary with warnings and remediation recommendations
pub async fn health_summary(state: web::Data<AppState>) -> Result<Json<HealthSummary>> {
    let metrics = cached_metrics(&state)
        .await
        .map_err(|error| Error::Internal(format!("{error:#}")))?;
    let display_status = cached_display(&state).await;
    let player_status = player::status().await;

    Ok(Json(health::summary(
        &metrics,
        &player_status,
        &display_status,
    )))
}

/// Capture a new screenshot, bypassing the caches: a capture is single-shot
pub async fn capture_screenshot(state: web::Data<AppState>) -> Result<Json<CaptureResponse>> {
    let record = state.screenshots.capture().await?;
    Ok(Json(CaptureResponse {
        status: "success",
        message: "Screenshot captured successfully",
        screenshot: record,
    }))
}

/// Screenshot history, oldest first
pub async fn screenshots_history(
    state: web::Data<AppState>,
) -> Result<Json<Vec<ScreenshotRecord>>> {
    Ok(Json(state.screenshots.history().await))
}

/// Serve the most recent screenshot file
pub async fn latest_screenshot(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(latest) = state.screenshots.latest().await else {
        return Err(Error::NotFound("No screenshots available".to_string()));
    };

    let file = actix_files::NamedFile::open_async(&latest.path)
        .await
        .map_err(|error| {
            warn!("Screenshot file {} is gone: {error}", latest.path);
            Error::NotFound("Screenshot file not found".to_string())
        })?;

    Ok(file.into_response(&req))
}

/// Reboot the device through the fleet reboot wrapper
pub async fn reboot() -> Result<Json<ActionResponse>> {
    let config = settings::manager::settings();
    match command::run(
        &config.reboot_binary,
        &[],
        &[],
        Duration::from_secs(config.probe_timeout_seconds),
    )
    .await
    {
        Ok(details) => Ok(Json(ActionResponse {
            status: "success",
            message: "Reboot initiated",
            details,
        })),
        Err(error) => Err(Error::Internal(format!(
            "Failed to reboot device: {error:#}"
        ))),
    }
}

/// Restart the slideshow player service
pub async fn restart_player() -> Result<Json<ActionResponse>> {
    let config = settings::manager::settings();
    match command::run(
        &config.systemctl_binary,
        &["restart", &config.player_service],
        &[],
        Duration::from_secs(config.probe_timeout_seconds),
    )
    .await
    {
        Ok(details) => Ok(Json(ActionResponse {
            status: "success",
            message: "Player restart initiated",
            details,
        })),
        Err(error) => Err(Error::Internal(format!(
            "Failed to restart player: {error:#}"
        ))),
    }
}

/// Stream the in-memory log history, then live log lines, over a websocket
pub async fn log(req: HttpRequest, stream: web::Payload) -> Result<HttpResponse> {
    let (response, mut session, _stream) =
        actix_ws::handle(&req, stream).map_err(|error| Error::Internal(format!("{error:?}")))?;

    rt::spawn(async move {
        let (mut receiver, history) = crate::logger::manager::HISTORY.lock().unwrap().subscribe();

        for message in history {
            if session.text(message).await.is_err() {
                return;
            }
        }

        while let Ok(message) = receiver.recv().await {
            if session.text(message).await.is_err() {
                return;
            }
        }
    });

    Ok(response)
}
