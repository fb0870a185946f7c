use std::time::Duration;

use actix_cors::Cors;
use actix_extensible_rate_limit::{
    backend::{memory::InMemoryBackend, SimpleInputFunctionBuilder},
    RateLimiter,
};
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use tracing::*;
use tracing_actix_web::TracingLogger;

use super::pages;
use crate::{
    cache::TtlCache,
    display::DisplayStatus,
    player::DeploymentInfo,
    probe::metrics::MetricsSnapshot,
    screenshot,
    settings,
};

/// Everything the handlers need, owned here and injected into actix.
/// The TTL caches and the capture pipeline have an explicit lifecycle tied
/// to the server instead of living as process-wide state.
pub struct AppState {
    pub metrics_cache: TtlCache<MetricsSnapshot>,
    pub display_cache: TtlCache<DisplayStatus>,
    pub deployment_cache: TtlCache<DeploymentInfo>,
    pub screenshots: screenshot::manager::Manager,
}

impl AppState {
    pub fn from_settings() -> Self {
        let ttl = Duration::from_secs(settings::manager::settings().cache_ttl_seconds);
        Self {
            metrics_cache: TtlCache::new("metrics", ttl),
            display_cache: TtlCache::new("display", ttl),
            deployment_cache: TtlCache::new("deployment", ttl),
            screenshots: screenshot::manager::Manager::from_settings(),
        }
    }
}

fn json_error_handler(error: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    warn!("Problem with json: {error}");
    error.into()
}

// Start REST API server with the desired address
pub async fn run(server_address: &str) -> Result<(), std::io::Error> {
    let server_address = server_address.to_string();
    let state = web::Data::new(AppState::from_settings());

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .send_wildcard()
                    .max_age(3600),
            )
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            // Versioned API routes (canonical)
            .service(web::scope("/v1").configure(configure_api_routes))
            // Backward-compatible flat routes (same handlers, for existing clients)
            .configure(configure_api_routes)
    })
    .bind(server_address)
    .expect("Failed starting web API")
    .run()
    .await
}

/// Register all API routes on a `ServiceConfig`.
/// Used for both the `/v1` scope and the backward-compatible flat routes.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/info", web::get().to(pages::info))
        .route("/health", web::get().to(pages::health))
        .route("/health/summary", web::get().to(pages::health_summary))
        .route(
            "/screenshots/history",
            web::get().to(pages::screenshots_history),
        )
        .route(
            "/screenshots/latest",
            web::get().to(pages::latest_screenshot),
        )
        .service(
            web::scope("/screenshots/capture")
                // Add a rate limiter to prevent flood; the capture pipeline
                // applies its own persisted rate limit behind this
                .wrap(
                    RateLimiter::builder(
                        InMemoryBackend::builder().build(),
                        SimpleInputFunctionBuilder::new(std::time::Duration::from_secs(1), 4)
                            .real_ip_key()
                            .build(),
                    )
                    .add_headers()
                    .build(),
                )
                .route("", web::post().to(pages::capture_screenshot)),
        )
        .route("/actions/reboot", web::post().to(pages::reboot))
        .route(
            "/actions/restart-player",
            web::post().to(pages::restart_player),
        )
        .route("/log", web::get().to(pages::log));
}
