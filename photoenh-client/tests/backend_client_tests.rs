//! Contract tests for BackendClient against an in-process mock backend
//!
//! Tests cover:
//! - Multipart enhancement and night conversion requests
//! - Photo list mapping and pagination
//! - Non-success statuses and `success: false` bodies
//! - Auth, stats and deletion endpoints
//! - Payment status and checkout session validation
//! - Binary asset download

use axum::{
    extract::{Multipart, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use photoenh_client::api::{
    AccountService, AssetFetcher, BackendClient, EnhancementBackend, PaymentService, PhotoSource,
};
use photoenh_client::upload::UploadFile;
use photoenh_client::ClientError;
use photoenh_common::models::{ChangeIntensity, ConversionKind, EnhanceSettings};
use photoenh_common::{PhotoAccess, PhotoId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Test helper: serve `router` on an ephemeral port and return its origin
async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, cookie: Option<&str>) -> BackendClient {
    BackendClient::new(base_url, Duration::from_secs(5), cookie).unwrap()
}

fn jpeg(name: &str) -> UploadFile {
    UploadFile::new(name, vec![0xff, 0xd8, 0xff], "image/jpeg")
}

async fn enhance_handler(mut multipart: Multipart) -> impl IntoResponse {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        let value = file_name.unwrap_or_else(|| String::from_utf8_lossy(&data).into_owned());
        fields.insert(name, value);
    }

    if fields.get("image").map(String::as_str) == Some("broken.jpg") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Enhancement failed"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "enhanced_image_url": "data:image/jpeg;base64,AQID",
            "original_image_url": "data:image/jpeg;base64,AAAA",
            "enhancements": {
                "change_intensity": fields.get("change_intensity"),
                "detail_level": fields.get("detail_level"),
            },
            "image_id": 31,
            "requires_login": false
        })),
    )
}

async fn night_handler(mut multipart: Multipart) -> Json<Value> {
    while multipart.next_field().await.unwrap().is_some() {}
    Json(json!({
        "enhanced_image_url": "data:image/jpeg;base64,AQID",
        "original_image_url": "data:image/jpeg;base64,AAAA",
        "enhancements": {},
        "conversion_type": "night_conversion",
        "requires_login": true
    }))
}

async fn photos_handler(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: Option<u32> = params.get("per_page").and_then(|p| p.parse().ok());
    match page {
        1 => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "photos": [
                    {"id": 4, "original_filename": "lake.jpg", "enhancement_settings": {"brightness": 1.1},
                     "conversion_type": "enhancement", "created_at": "2024-05-01T08:00:00.123456"},
                    {"id": 3, "original_filename": "city.jpg", "enhancement_settings": null,
                     "conversion_type": "night_conversion", "created_at": "2024-04-30T22:10:00"}
                ],
                "pagination": {"page": 1, "per_page": per_page,
                               "pages": 2, "total": 3, "has_next": true, "has_prev": false}
            })),
        )
            .into_response(),
        2 => (StatusCode::OK, Json(json!({"success": false}))).into_response(),
        3 => (StatusCode::BAD_GATEWAY, Json(json!({}))).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Internal Server Error</h1>").into_response(),
    }
}

async fn delete_handler(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 4 {
        (
            StatusCode::OK,
            Json(json!({"success": true, "message": "Photo deleted successfully"})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "Photo not found"})))
    }
}

async fn check_auth_handler(headers: HeaderMap) -> Json<Value> {
    let authenticated = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("session=abc"))
        .unwrap_or(false);
    Json(json!({ "authenticated": authenticated }))
}

async fn stats_handler(headers: HeaderMap) -> impl IntoResponse {
    if headers.get("cookie").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Login required"})));
    }
    (
        StatusCode::OK,
        Json(json!({"username": "demo", "images_processed": 9})),
    )
}

async fn check_status_handler(Json(body): Json<Value>) -> Json<Value> {
    let ids = body["photo_ids"].as_array().cloned().unwrap_or_default();
    let paid = !ids.is_empty() && ids.iter().all(|id| id.as_i64() == Some(1));
    Json(json!({"success": true, "paid": paid}))
}

async fn checkout_handler(Json(body): Json<Value>) -> impl IntoResponse {
    let first = body["photo_ids"][0].as_i64().unwrap_or_default();
    match first {
        7 => (StatusCode::BAD_REQUEST, Json(json!({"error": "Photos not found"}))),
        8 => (StatusCode::OK, Json(json!({"success": true}))),
        _ => (
            StatusCode::OK,
            Json(json!({"success": true, "sessionId": "cs_1", "url": "https://checkout.example/cs_1"})),
        ),
    }
}

async fn enhanced_asset_handler(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 4 {
        (StatusCode::OK, vec![9u8, 8, 7]).into_response()
    } else {
        (StatusCode::FORBIDDEN, Json(json!({"error": "Payment required"}))).into_response()
    }
}

fn mock_backend() -> Router {
    Router::new()
        .route("/api/enhance", post(enhance_handler))
        .route("/api/convert-to-night", post(night_handler))
        .route("/api/photos", get(photos_handler))
        .route("/api/photos/:id", delete(delete_handler))
        .route("/api/photos/:id/enhanced", get(enhanced_asset_handler))
        .route("/api/check-auth", get(check_auth_handler))
        .route("/api/user/stats", get(stats_handler))
        .route("/api/payment/check-status", post(check_status_handler))
        .route("/api/payment/create-checkout-session", post(checkout_handler))
}

// =============================================================================
// Enhancement
// =============================================================================

#[tokio::test]
async fn enhance_sends_settings_and_maps_response() {
    let base = spawn_backend(mock_backend()).await;
    let settings = EnhanceSettings {
        change_intensity: ChangeIntensity::Strong,
        ..Default::default()
    };

    let response = client(&base, None).enhance(&jpeg("beach.jpg"), &settings).await.unwrap();

    assert_eq!(response.id(), Some(PhotoId(31)));
    assert!(!response.requires_login());
    let photo = response.into_photo("beach.jpg".to_string(), ConversionKind::Standard);
    assert_eq!(photo.access, PhotoAccess::Gated(PhotoId(31)));
    assert_eq!(photo.enhancement_params["change_intensity"], "strong");
    assert_eq!(photo.enhancement_params["detail_level"], "moderate");
}

#[tokio::test]
async fn enhance_error_body_becomes_api_error() {
    let base = spawn_backend(mock_backend()).await;

    let err = client(&base, None)
        .enhance(&jpeg("broken.jpg"), &EnhanceSettings::default())
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Enhancement failed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn night_conversion_sets_kind() {
    let base = spawn_backend(mock_backend()).await;

    let response = client(&base, None).convert_to_night(&jpeg("street.jpg")).await.unwrap();

    assert!(response.requires_login());
    let photo = response.into_photo("street.jpg".to_string(), ConversionKind::Night);
    assert_eq!(photo.conversion_kind, ConversionKind::Night);
    assert_eq!(photo.access, PhotoAccess::Free);
}

// =============================================================================
// Photo list
// =============================================================================

#[tokio::test]
async fn fetch_page_maps_records_and_pagination() {
    let base = spawn_backend(mock_backend()).await;

    let page = client(&base, None).fetch_page(1, 2).await.unwrap();

    assert_eq!(page.photos.len(), 2);
    assert_eq!(page.photos[0].id(), Some(PhotoId(4)));
    assert_eq!(page.photos[0].original_url, "/api/photos/4/original");
    assert_eq!(page.photos[0].enhanced_url, "/api/photos/4/enhanced");
    assert!(page.photos[0].created_at.is_some());
    assert_eq!(page.photos[1].conversion_kind, ConversionKind::Night);
    assert_eq!(page.page_state.page_size, 2);
    assert_eq!(page.page_state.total_pages, 2);
    assert_eq!(page.page_state.total_count, 3);
    assert!(page.page_state.has_next);
}

#[tokio::test]
async fn fetch_page_unsuccessful_body_is_error() {
    let base = spawn_backend(mock_backend()).await;
    let result = client(&base, None).fetch_page(2, 2).await;
    assert!(matches!(result, Err(ClientError::Api { status: 200, .. })));
}

#[tokio::test]
async fn fetch_page_bad_status_is_error() {
    let base = spawn_backend(mock_backend()).await;
    match client(&base, None).fetch_page(3, 2).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "HTTP error! status: 502");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn non_json_error_body_is_unknown_error() {
    let base = spawn_backend(mock_backend()).await;
    match client(&base, None).fetch_page(4, 2).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Unknown error");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(&format!("http://{}", addr), None).fetch_page(1, 2).await;
    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn delete_photo_success_and_not_found() {
    let base = spawn_backend(mock_backend()).await;
    let client = client(&base, None);

    client.delete_photo(PhotoId(4)).await.unwrap();
    let err = client.delete_photo(PhotoId(5)).await.unwrap_err();
    assert_eq!(err.to_string(), "API error 404: Photo not found");
}

// =============================================================================
// Account
// =============================================================================

#[tokio::test]
async fn check_auth_uses_session_cookie() {
    let base = spawn_backend(mock_backend()).await;

    assert!(!client(&base, None).check_auth().await.unwrap());
    assert!(client(&base, Some("session=abc")).check_auth().await.unwrap());
}

#[tokio::test]
async fn user_stats_requires_session() {
    let base = spawn_backend(mock_backend()).await;

    let stats = client(&base, Some("session=abc")).user_stats().await.unwrap();
    assert_eq!(stats.images_processed, 9);

    let err = client(&base, None).user_stats().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 401, .. }));
}

// =============================================================================
// Payments and assets
// =============================================================================

#[tokio::test]
async fn check_status_reports_paid_only_when_confirmed() {
    let base = spawn_backend(mock_backend()).await;
    let client = client(&base, None);

    assert!(client.check_status(&[PhotoId(1)]).await.unwrap());
    assert!(!client.check_status(&[PhotoId(1), PhotoId(2)]).await.unwrap());
}

#[tokio::test]
async fn create_checkout_validates_response() {
    let base = spawn_backend(mock_backend()).await;
    let client = client(&base, None);

    let url = client.create_checkout(&[PhotoId(2)]).await.unwrap();
    assert_eq!(url, "https://checkout.example/cs_1");

    let err = client.create_checkout(&[PhotoId(7)]).await.unwrap_err();
    assert_eq!(err.to_string(), "Payment error: Photos not found");

    let err = client.create_checkout(&[PhotoId(8)]).await.unwrap_err();
    assert_eq!(err.to_string(), "Payment error: Payment session URL not received");
}

#[tokio::test]
async fn fetch_asset_returns_bytes_or_error() {
    let base = spawn_backend(mock_backend()).await;
    let client = client(&base, None);

    assert_eq!(client.fetch_asset("/api/photos/4/enhanced").await.unwrap(), vec![9, 8, 7]);
    assert!(matches!(
        client.fetch_asset("/api/photos/5/enhanced").await,
        Err(ClientError::Api { status: 403, .. })
    ));
}
