//! API route handlers.

pub mod auth;
pub mod error;
pub mod photos;

use axum::{Json, Router, routing::get};
use std::sync::Arc;

use crate::db::Database;
use crate::imagehost::ImageHost;
use crate::jwt::TokenKeys;

/// Create the API router with all endpoints.
pub fn create_api_router(
    db: Database,
    keys: Arc<TokenKeys>,
    image_host: Arc<dyn ImageHost>,
) -> Router {
    let auth_router = auth::router(auth::AuthState {
        db: db.clone(),
        keys: keys.clone(),
    });

    let photos_router = photos::router(photos::PhotosState {
        db,
        keys,
        image_host,
    });

    Router::new()
        .route("/", get(welcome))
        .nest("/auth", auth_router)
        .nest("/photos", photos_router)
}

async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Photography Portfolio API",
        "endpoints": {
            "auth": "/api/auth",
            "photos": "/api/photos"
        }
    }))
}
