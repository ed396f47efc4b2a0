use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rand::prelude::RngExt;
use rand::rng;
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::{Error, Result};

/// Stored images never change under a given name.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Serve a stored image by exact name.
///
/// Missing names and names that could escape the store both answer 404 "Image not found".
#[instrument(skip(state))]
pub async fn get_image(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let bytes = state.store.read(&filename).await?;
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, content_type.essence_str().to_string()),
            (header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL.to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// Redirect to a uniformly chosen stored image.
#[instrument(skip(state))]
pub async fn random_image(State(state): State<AppState>) -> Result<Response> {
    let names = state.store.list().await?;
    if names.is_empty() {
        return Err(Error::Empty {
            resource: "images".to_string(),
        });
    }

    let chosen = &names[rng().random_range(0..names.len())];
    debug!(image = %chosen, candidates = names.len(), "Picked random image");

    // 302 rather than axum's `Redirect::to`, which answers 303
    Ok((StatusCode::FOUND, [(header::LOCATION, format!("/images/{chosen}"))]).into_response())
}
