use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use media::{MediaError, MediaStore};
use pinnwand_common::model::{
    Id,
    auth::{AccessTokenDecodeError, AccessTokenHashError},
    post::{InvalidPostError, PostMarker},
    user::UserMarker,
};
use pinnwand_db::client::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod auth;
mod json;
pub mod media;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub media_store: Arc<MediaStore>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided access token could not be decoded: {0}")]
    InvalidAccessToken(#[from] AccessTokenDecodeError),
    #[error("The access token could not be hashed: {0}")]
    AccessTokenHash(#[from] AccessTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("The userId field is required")]
    MissingUserId,
    #[error("The profile payload is required")]
    MissingProfilePayload,
    #[error("The authenticated user does not own this profile")]
    ProfileOwnerMismatch,
    #[error(transparent)]
    InvalidPost(#[from] InvalidPostError),
    #[error("Reading the multipart upload failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("The upload is missing a file part")]
    MissingFilePart,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::ProfileOwnerMismatch => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAccessToken(_)
            | ServerError::MissingUserId
            | ServerError::MissingProfilePayload
            | ServerError::InvalidPost(_)
            | ServerError::Multipart(_)
            | ServerError::MissingFilePart => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::AccessTokenHash(_)
            | ServerError::Media(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: self.to_string(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(
            ServerError::UnknownRoute(Uri::from_static("/nope")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::PostByIdNotFound(7_u64.into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServerError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::ProfileOwnerMismatch.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ServerError::MissingUserId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::MissingProfilePayload.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::InvalidPost(InvalidPostError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::MissingFilePart.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_body_carries_status_and_message() {
        let body = ErrorResponse {
            status: 400,
            error: ServerError::MissingUserId.to_string(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["error"], "The userId field is required");
    }
}
