//! Tests for the photo upload pipeline.
//!
//! The pipeline is strictly ordered: local validation must reject bad
//! uploads before the external host is contacted, and a host failure must
//! leave the database untouched.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{
    MultipartBuilder, RecordingHost, basic_upload_body, body_json, create_test_app,
    create_test_app_with_host,
};
use tower::ServiceExt;

async fn post_upload(app: &Router, body: Vec<u8>) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/photos/upload")
                .header("content-type", MultipartBuilder::content_type())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn test_upload_persists_photo_with_host_url() {
    let (app, db, host) = create_test_app().await;

    let response = post_upload(&app, basic_upload_body("Misty Morning")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["title"], "Misty Morning");
    assert_eq!(json["imageUrl"], host.url());
    assert_eq!(json["category"]["name"], "Landscape");
    assert_eq!(json["category"]["slug"], "landscape");
    // No alt supplied: falls back to the title
    assert_eq!(json["alt"], "Misty Morning");

    assert_eq!(host.calls(), 1);
    assert_eq!(db.photos().count().await.unwrap(), 1);

    let stored = db
        .photos()
        .get_by_uuid(json["id"].as_str().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.image_url, host.url());
}

#[tokio::test]
async fn test_upload_with_all_fields() {
    let (app, _, _) = create_test_app().await;

    let body = MultipartBuilder::new()
        .file("image", "sunset.png", "image/png", b"\x89PNGfake")
        .text("title", "Sunset at Reine")
        .text("description", "Evening light over the fjord")
        .text("category[name]", "Travel")
        .text("category[slug]", "travel")
        .text("dateTaken", "2024-06-21")
        .text("location", "Lofoten, Norway")
        .text("alt", "Orange sky over mountains")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["description"], "Evening light over the fjord");
    assert_eq!(json["dateTaken"], "2024-06-21");
    assert_eq!(json["location"], "Lofoten, Norway");
    assert_eq!(json["alt"], "Orange sky over mountains");
}

// =============================================================================
// Validation failures (host must never be called)
// =============================================================================

#[tokio::test]
async fn test_upload_without_image_rejected_before_host() {
    let (app, db, host) = create_test_app().await;

    let body = MultipartBuilder::new()
        .text("title", "No image here")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "No image file provided");

    assert_eq!(host.calls(), 0);
    assert_eq!(db.photos().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_without_title_rejected_before_host() {
    let (app, db, host) = create_test_app().await;

    let body = MultipartBuilder::new()
        .file("image", "photo.jpg", "image/jpeg", b"\xff\xd8fake")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(host.calls(), 0);
    assert_eq!(db.photos().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_whitespace_title_rejected() {
    let (app, _, host) = create_test_app().await;

    let body = MultipartBuilder::new()
        .file("image", "photo.jpg", "image/jpeg", b"\xff\xd8fake")
        .text("title", "   ")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(host.calls(), 0);
}

#[tokio::test]
async fn test_upload_title_length_bounds() {
    let (app, _, host) = create_test_app().await;

    let response = post_upload(&app, basic_upload_body("x")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_upload(&app, basic_upload_body(&"x".repeat(101))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(host.calls(), 0);

    // Boundary values pass
    let response = post_upload(&app, basic_upload_body("xy")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_upload(&app, basic_upload_body(&"x".repeat(100))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_title_limit_counts_characters_not_bytes() {
    let (app, _, _) = create_test_app().await;

    // 100 two-byte characters: over the cap in bytes, at the cap in chars
    let title = "ø".repeat(100);
    let response = post_upload(&app, basic_upload_body(&title)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_upload(&app, basic_upload_body(&"ø".repeat(101))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_missing_category_rejected() {
    let (app, _, host) = create_test_app().await;

    let body = MultipartBuilder::new()
        .file("image", "photo.jpg", "image/jpeg", b"\xff\xd8fake")
        .text("title", "Missing slug")
        .text("category[name]", "Misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Category name and slug are required"
    );
    assert_eq!(host.calls(), 0);
}

#[tokio::test]
async fn test_upload_wrong_content_type_rejected() {
    let (app, db, host) = create_test_app().await;

    let body = MultipartBuilder::new()
        .file("image", "notes.pdf", "application/pdf", b"%PDF-1.4")
        .text("title", "Not a photo")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(host.calls(), 0);
    assert_eq!(db.photos().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_oversized_image_rejected() {
    let (app, db, host) = create_test_app().await;

    let oversized = vec![0u8; 5 * 1024 * 1024 + 1];
    let body = MultipartBuilder::new()
        .file("image", "huge.jpg", "image/jpeg", &oversized)
        .text("title", "Too big")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(host.calls(), 0);
    assert_eq!(db.photos().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_image_at_limit_accepted() {
    let (app, _, host) = create_test_app().await;

    let at_limit = vec![0u8; 5 * 1024 * 1024];
    let body = MultipartBuilder::new()
        .file("image", "big.jpg", "image/jpeg", &at_limit)
        .text("title", "Exactly at the cap")
        .text("category[name]", "Misc")
        .text("category[slug]", "misc")
        .build();

    let response = post_upload(&app, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(host.calls(), 1);
}

// =============================================================================
// Host failures
// =============================================================================

#[tokio::test]
async fn test_host_failure_is_bad_gateway_and_nothing_persisted() {
    let (app, db, host) = create_test_app_with_host(RecordingHost::failing()).await;

    let response = post_upload(&app, basic_upload_body("Doomed upload")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    assert_eq!(host.calls(), 1);
    assert_eq!(db.photos().count().await.unwrap(), 0);
}
