//! Photos API: gallery reads plus the upload pipeline.
//!
//! Uploads move through a linear pipeline: multipart intake, local
//! validation, delegation to the external image host, metadata insert.
//! Validation failures are rejected before the host is ever contacted,
//! and a host failure leaves no metadata behind.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{ApiAuth, HasAuthState};
use crate::db::{Database, NewPhoto, Photo, PhotoPatch};
use crate::imagehost::ImageHost;
use crate::jwt::TokenKeys;

/// Hard ceiling on the image payload.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit: 5MB image + form fields + multipart framing.
const BODY_LIMIT: usize = 6 * 1024 * 1024;

const TITLE_MIN: usize = 2;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const LOCATION_MAX: usize = 100;

#[derive(Clone)]
pub struct PhotosState {
    pub db: Database,
    pub keys: Arc<TokenKeys>,
    pub image_host: Arc<dyn ImageHost>,
}

impl HasAuthState for PhotosState {
    fn keys(&self) -> &TokenKeys {
        &self.keys
    }
}

pub fn router(state: PhotosState) -> Router {
    Router::new()
        .route("/", get(list_photos))
        .route("/upload", post(upload_photo))
        .route("/{id}", get(get_photo).patch(update_photo))
        .route("/delete/{id}", delete(delete_photo))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Content types accepted for upload, including legacy browser variants.
fn is_allowed_image_type(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/pjpeg" | "image/png" | "image/x-png" | "image/webp"
    )
}

// --- Response types ---

#[derive(Serialize)]
struct CategoryBody {
    name: String,
    slug: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoResponse {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    image_url: String,
    alt: String,
    category: CategoryBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Photo> for PhotoResponse {
    fn from(photo: Photo) -> Self {
        Self {
            id: photo.uuid,
            title: photo.title,
            description: photo.description,
            image_url: photo.image_url,
            alt: photo.alt,
            category: CategoryBody {
                name: photo.category_name,
                slug: photo.category_slug,
            },
            date_taken: photo.date_taken,
            location: photo.location,
            created_at: photo.created_at,
            updated_at: photo.updated_at,
        }
    }
}

#[derive(Serialize)]
struct ListResponse {
    success: bool,
    count: usize,
    data: Vec<PhotoResponse>,
}

#[derive(Deserialize)]
struct ListParams {
    category: Option<String>,
}

// --- Read handlers ---

/// List photos newest-first, optionally filtered by category slug.
async fn list_photos(
    State(state): State<PhotosState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let photos = state
        .db
        .photos()
        .list(params.category.as_deref())
        .await
        .db_err("Failed to list photos")?;

    let data: Vec<PhotoResponse> = photos.into_iter().map(PhotoResponse::from).collect();
    Ok(Json(ListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// Get a single photo by id.
async fn get_photo(
    State(state): State<PhotosState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = state
        .db
        .photos()
        .get_by_uuid(&id)
        .await
        .db_err("Failed to get photo")?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    Ok(Json(PhotoResponse::from(photo)))
}

// --- Upload pipeline ---

/// Everything collected from the multipart body before validation.
#[derive(Default)]
struct UploadForm {
    image: Option<Vec<u8>>,
    title: Option<String>,
    description: Option<String>,
    category_name: Option<String>,
    category_slug: Option<String>,
    date_taken: Option<String>,
    location: Option<String>,
    alt: Option<String>,
}

/// Parse the multipart body into memory, rejecting oversized or
/// wrongly-typed image payloads as they arrive.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().unwrap_or("").to_string();
                if !is_allowed_image_type(&content_type) {
                    return Err(ApiError::bad_request(
                        "Not an image! Please upload a JPEG, PNG or WebP image",
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read image data"))?;
                if data.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::bad_request("Image exceeds the 5MB size limit"));
                }
                form.image = Some(data.to_vec());
            }
            "title" => form.title = Some(read_text(field, "title").await?),
            "description" => form.description = Some(read_text(field, "description").await?),
            "category[name]" => form.category_name = Some(read_text(field, "category[name]").await?),
            "category[slug]" => form.category_slug = Some(read_text(field, "category[slug]").await?),
            "dateTaken" => form.date_taken = Some(read_text(field, "dateTaken").await?),
            "location" => form.location = Some(read_text(field, "location").await?),
            "alt" => form.alt = Some(read_text(field, "alt").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|_| ApiError::bad_request(format!("Failed to read {}", name)))
}

// Limits are in characters, not bytes, so multibyte text is not penalized
fn check_len(value: &str, max: usize, what: &str) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::bad_request(format!(
            "{} must be at most {} characters",
            what, max
        )));
    }
    Ok(())
}

fn check_title_len(title: &str) -> Result<(), ApiError> {
    let len = title.chars().count();
    if len < TITLE_MIN || len > TITLE_MAX {
        return Err(ApiError::bad_request(format!(
            "Title must be between {} and {} characters",
            TITLE_MIN, TITLE_MAX
        )));
    }
    Ok(())
}

/// Upload a new photo.
///
/// The image is forwarded to the external host only after every local
/// check has passed; on host failure nothing is persisted.
async fn upload_photo(
    State(state): State<PhotosState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;

    // Required-field checks, before any external call
    let image = form
        .image
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;
    let title = form
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Title is required"))?;
    check_title_len(&title)?;
    let (category_name, category_slug) = match (form.category_name, form.category_slug) {
        (Some(name), Some(slug)) if !name.is_empty() && !slug.is_empty() => (name, slug),
        _ => {
            return Err(ApiError::bad_request("Category name and slug are required"));
        }
    };
    if let Some(ref description) = form.description {
        check_len(description, DESCRIPTION_MAX, "Description")?;
    }
    if let Some(ref location) = form.location {
        check_len(location, LOCATION_MAX, "Location")?;
    }

    // Delegate the bytes to the external host; failures are the host's
    // fault, not the client's, and abort the whole upload
    let image_url = state
        .image_host
        .store(&image)
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to upload image: {}", e)))?;

    let alt = form
        .alt
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| title.clone());

    let photo = state
        .db
        .photos()
        .create(NewPhoto {
            title,
            description: form.description,
            image_url,
            alt,
            category_name,
            category_slug,
            date_taken: form.date_taken.filter(|d| !d.is_empty()),
            location: form.location.filter(|l| !l.is_empty()),
        })
        .await
        .db_err("Failed to save photo")?;

    Ok((StatusCode::CREATED, Json(PhotoResponse::from(photo))))
}

// --- Update / delete ---

#[derive(Deserialize, Default)]
struct CategoryPatchBody {
    name: Option<String>,
    slug: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdatePhotoRequest {
    title: Option<String>,
    description: Option<String>,
    alt: Option<String>,
    category: Option<CategoryPatchBody>,
    date_taken: Option<String>,
    location: Option<String>,
}

/// Sparse patch: only fields present and non-empty are overwritten.
/// Empty strings are skipped, so a field cannot be cleared this way -
/// kept for compatibility with the original API.
async fn update_photo(
    State(state): State<PhotosState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePhotoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    let category = req.category.unwrap_or_default();
    let patch = PhotoPatch {
        title: non_empty(req.title),
        description: non_empty(req.description),
        alt: non_empty(req.alt),
        category_name: non_empty(category.name),
        category_slug: non_empty(category.slug),
        date_taken: non_empty(req.date_taken),
        location: non_empty(req.location),
    };

    if let Some(ref title) = patch.title {
        check_title_len(title)?;
    }
    if let Some(ref description) = patch.description {
        check_len(description, DESCRIPTION_MAX, "Description")?;
    }
    if let Some(ref location) = patch.location {
        check_len(location, LOCATION_MAX, "Location")?;
    }

    let photo = state
        .db
        .photos()
        .update(&id, patch)
        .await
        .db_err("Failed to update photo")?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    Ok(Json(PhotoResponse::from(photo)))
}

/// Delete a photo. Requires a valid bearer access token.
async fn delete_photo(
    State(state): State<PhotosState>,
    ApiAuth(_user): ApiAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .photos()
        .delete(&id)
        .await
        .db_err("Failed to delete photo")?;
    if !deleted {
        return Err(ApiError::not_found("Photo not found"));
    }

    Ok(Json(serde_json::json!({ "message": "Photo deleted successfully" })))
}
