//! External image host integration.
//!
//! The host owns the actual image bytes; this system only keeps the URL it
//! hands back. The operation is a single non-cancelable call with no retry:
//! a failed upload is surfaced to the caller, who may resubmit.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

/// Default Imgur API base URL.
pub const IMGUR_API_URL: &str = "https://api.imgur.com/3";

/// A collaborator that stores image bytes and returns a durable public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store the image and return its public URL.
    async fn store(&self, image: &[u8]) -> Result<String, ImageHostError>;
}

/// Errors from the image host.
#[derive(Debug)]
pub enum ImageHostError {
    /// The host could not be reached or the response could not be read.
    Transport(reqwest::Error),
    /// The host answered but rejected the upload.
    Provider(String),
}

impl std::fmt::Display for ImageHostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageHostError::Transport(e) => write!(f, "Image host unreachable: {}", e),
            ImageHostError::Provider(msg) => write!(f, "Image host rejected upload: {}", msg),
        }
    }
}

impl std::error::Error for ImageHostError {}

/// Imgur client. Uploads are sent base64-encoded with a Client-ID
/// authorization header, matching the anonymous-upload API.
pub struct ImgurClient {
    http: reqwest::Client,
    api_url: String,
    client_id: String,
}

#[derive(Deserialize)]
struct ImgurResponse {
    success: bool,
    data: Option<ImgurData>,
}

#[derive(Deserialize)]
struct ImgurData {
    link: Option<String>,
    error: Option<String>,
}

impl ImgurClient {
    pub fn new(client_id: String, api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            client_id,
        }
    }
}

#[async_trait]
impl ImageHost for ImgurClient {
    async fn store(&self, image: &[u8]) -> Result<String, ImageHostError> {
        let body = serde_json::json!({
            "image": BASE64.encode(image),
            "type": "base64",
        });

        let response = self
            .http
            .post(format!("{}/image", self.api_url))
            .header("Authorization", format!("Client-ID {}", self.client_id))
            .json(&body)
            .send()
            .await
            .map_err(ImageHostError::Transport)?;

        let status = response.status();
        let parsed: ImgurResponse = response
            .json()
            .await
            .map_err(|_| ImageHostError::Provider(format!("unexpected response ({})", status)))?;

        if !status.is_success() || !parsed.success {
            let detail = parsed
                .data
                .and_then(|d| d.error)
                .unwrap_or_else(|| format!("status {}", status));
            return Err(ImageHostError::Provider(detail));
        }

        parsed
            .data
            .and_then(|d| d.link)
            .ok_or_else(|| ImageHostError::Provider("response missing image link".to_string()))
    }
}
