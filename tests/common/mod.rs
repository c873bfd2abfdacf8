#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use darkroom::{ServerConfig, create_app, db::Database};
use darkroom::imagehost::{ImageHost, ImageHostError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

/// Fake image host that records calls instead of talking to the network.
pub struct RecordingHost {
    calls: AtomicUsize,
    fail: bool,
    url: String,
}

impl RecordingHost {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            url: "https://images.example.com/fake.jpg".to_string(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            url: String::new(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageHost for RecordingHost {
    async fn store(&self, _image: &[u8]) -> Result<String, ImageHostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ImageHostError::Provider("host is down".to_string()))
        } else {
            Ok(self.url.clone())
        }
    }
}

/// Create a test app backed by an in-memory database and a recording host.
pub async fn create_test_app() -> (axum::Router, Database, Arc<RecordingHost>) {
    create_test_app_with_host(RecordingHost::succeeding()).await
}

pub async fn create_test_app_with_host(
    host: Arc<RecordingHost>,
) -> (axum::Router, Database, Arc<RecordingHost>) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        image_host: host.clone(),
    };
    (create_app(&config), db, host)
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not valid JSON")
}

pub const MULTIPART_BOUNDARY: &str = "----test-boundary-7MA4YWxkTrZu0gW";

/// Builder for raw multipart/form-data request bodies.
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        self.body
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
    }
}

/// A minimal valid upload form: small JPEG payload plus required fields.
pub fn basic_upload_body(title: &str) -> Vec<u8> {
    MultipartBuilder::new()
        .file("image", "photo.jpg", "image/jpeg", b"\xff\xd8\xff\xe0fakejpeg")
        .text("title", title)
        .text("category[name]", "Landscape")
        .text("category[slug]", "landscape")
        .build()
}
