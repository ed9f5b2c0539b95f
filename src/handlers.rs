use crate::{
    errors::AppError,
    identity::RequestIdentity,
    models::{DeleteOutcome, ImageUpload},
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /memes: multipart `title`, `description` and optional `image`.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    RequestIdentity(identity): RequestIdentity,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "title" => title = field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read title: {}", e)))?,
            "description" => description = field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read description: {}", e)))?,
            "image" => {
                let file_name = field.file_name().filter(|n| !n.is_empty()).map(|s| s.to_string());
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was picked.
                if file_name.is_none() && data.is_empty() {
                    continue;
                }
                image = Some(ImageUpload::new(file_name, content_type, data));
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let form = state.upload_form(Arc::new(identity));
    let record = form.submit_values(title, description, image).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /memes: every meme, newest first, with per-caller delete flags.
pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    RequestIdentity(identity): RequestIdentity,
) -> Result<impl IntoResponse, AppError> {
    let gallery = state.gallery(Arc::new(identity));
    gallery.refresh().await?;
    let entries = gallery.entries();
    tracing::debug!("Handler retrieved {} memes", entries.len());
    Ok(Json(entries))
}

/// DELETE /memes/{id}: 204 when deleted, 200 with `not_found` when already gone.
pub async fn delete_meme(
    State(state): State<Arc<AppState>>,
    RequestIdentity(identity): RequestIdentity,
    Path(id_str): Path<String>,
) -> Result<Response, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let gallery = state.gallery(Arc::new(identity));

    match gallery.delete(meme_id).await? {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
        outcome @ DeleteOutcome::NotFound => {
            Ok((StatusCode::OK, Json(serde_json::json!({ "outcome": outcome })))
                .into_response())
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}
