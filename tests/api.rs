use std::{path::Path, time::Duration};

use actix_web::{http::StatusCode, test, web, App};
use anyhow::Result;
use async_trait::async_trait;
use image::{Rgb, RgbImage};

use kiosk_health_agent::{
    cache::TtlCache,
    screenshot::{capture::CaptureBackend, manager as screenshot_manager},
    server::manager::{configure_api_routes, AppState},
};

/// Stands in for the external screenshot binary.
struct GradientBackend;

#[async_trait]
impl CaptureBackend for GradientBackend {
    async fn capture(&self, destination: &Path) -> Result<()> {
        let image = RgbImage::from_fn(1280, 720, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        image.save_with_format(destination, image::ImageFormat::Png)?;
        Ok(())
    }
}

fn test_state(directory: &Path) -> web::Data<AppState> {
    let ttl = Duration::from_secs(5);
    web::Data::new(AppState {
        metrics_cache: TtlCache::new("metrics", ttl),
        display_cache: TtlCache::new("display", ttl),
        deployment_cache: TtlCache::new("deployment", ttl),
        screenshots: screenshot_manager::Manager::new(
            screenshot_manager::Config {
                directory: directory.to_path_buf(),
                rate_limit: Duration::from_secs(5),
                max_history: 5,
            },
            Box::new(GradientBackend),
        ),
    })
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .service(web::scope("/v1").configure(configure_api_routes))
                .configure(configure_api_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_info_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app!(test_state(dir.path()));

    for uri in ["/info", "/v1/info"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "kiosk-health-agent");
        assert!(body["version"].as_str().is_some());
    }
}

#[actix_web::test]
async fn test_health_endpoint_reports_scores_and_cache_info() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app!(test_state(dir.path()));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let status = body["status"].as_str().unwrap();
    assert!(["online", "maintenance", "offline"].contains(&status));
    assert!(body["hostname"].as_str().is_some());
    assert!(body["timestamp_epoch"].as_i64().unwrap() > 0);

    let overall = body["health_scores"]["overall"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&overall));

    let levels = &body["health_scores"]["status"];
    let set: usize = ["critical", "warning", "healthy"]
        .iter()
        .filter(|level| levels[**level].as_bool().unwrap())
        .count();
    assert_eq!(set, 1);

    assert!(body["_cache_info"]["metrics"]["misses"].as_u64().unwrap() >= 1);

    // A second request within the TTL is served from the cache
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["_cache_info"]["metrics"]["hits"].as_u64().unwrap() >= 1);
    assert!(body["_cache_info"]["metrics"]["last_lookup_was_hit"]
        .as_bool()
        .unwrap());
}

#[actix_web::test]
async fn test_health_summary_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app!(test_state(dir.path()));

    let req = test::TestRequest::get().uri("/health/summary").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert!(body["needs_attention"].as_bool().is_some());
    assert!(body["warnings"].as_array().is_some());
    assert!(body["scores"]["overall"].as_f64().is_some());
}

#[actix_web::test]
async fn test_screenshot_capture_history_latest_and_rate_limit() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app!(test_state(dir.path()));

    // Nothing captured yet
    let req = test::TestRequest::get()
        .uri("/screenshots/latest")
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/screenshots/history")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    // First capture succeeds and is normalized into the landscape envelope
    // (the HTTP flood limiter keys on the peer address, so set one)
    let req = test::TestRequest::post()
        .uri("/screenshots/capture")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["screenshot"]["resolution"][0].as_u64().unwrap(), 1920);
    assert_eq!(body["screenshot"]["resolution"][1].as_u64().unwrap(), 1080);
    let path = body["screenshot"]["path"].as_str().unwrap().to_string();
    assert!(Path::new(&path).exists());

    // It shows up in history and as the latest file
    let req = test::TestRequest::get()
        .uri("/screenshots/history")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/screenshots/latest")
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("image/jpeg"));

    // An immediate retry hits the persisted rate limit
    let req = test::TestRequest::post()
        .uri("/screenshots/capture")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
