use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, media::MediaStore};
use axum::extract::{Multipart, State};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(upload_media)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/media", rejection(ServerError))]
struct UploadMediaPath();

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct UploadResponse {
    url: String,
}

/// Accepts a multipart form with a `file` part and replies with the public
/// URL the stored bytes are served from.
async fn upload_media(
    UploadMediaPath(): UploadMediaPath,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let bytes = field.bytes().await?;
        let url = media.store(user.user_id(), &file_name, bytes).await?;

        return Ok(Json(UploadResponse { url }));
    }

    Err(ServerError::MissingFilePart)
}
