use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::{Query, State};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::model::{
    Id,
    profile::{Profile, ProfileFields, ProfileMarker},
    user::{User, UserMarker},
};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_profile)
        .typed_post(save_profile)
        .typed_get(get_me)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/profile", rejection(ServerError))]
struct GetProfilePath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileQuery {
    user_id: Option<Id<UserMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct GetProfileResponse {
    profile: Option<Profile>,
}

/// A user with no stored profile yet gets `{"profile": null}`, not an error.
async fn get_profile(
    GetProfilePath(): GetProfilePath,
    Query(query): Query<ProfileQuery>,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<GetProfileResponse>> {
    let user_id = query.user_id.ok_or(ServerError::MissingUserId)?;
    if user_id != caller.user_id() {
        return Err(ServerError::ProfileOwnerMismatch);
    }

    let profile = db.fetch_profile(user_id).await?;

    Ok(Json(GetProfileResponse { profile }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/profile", rejection(ServerError))]
struct SaveProfilePath();

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveProfileRequest {
    user_id: Option<Id<UserMarker>>,
    profile: Option<ProfileFields>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveProfileResponse {
    success: bool,
    message: String,
    profile_id: Id<ProfileMarker>,
}

async fn save_profile(
    SaveProfilePath(): SaveProfilePath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
    Json(request): Json<SaveProfileRequest>,
) -> Result<Json<SaveProfileResponse>> {
    let user_id = request.user_id.ok_or(ServerError::MissingUserId)?;
    let fields = request.profile.ok_or(ServerError::MissingProfilePayload)?;
    if user_id != caller.user_id() {
        return Err(ServerError::ProfileOwnerMismatch);
    }

    let upsert = db.upsert_profile(user_id, &fields).await?;

    let message = if upsert.created {
        "Profile created successfully"
    } else {
        "Profile updated successfully"
    };

    Ok(Json(SaveProfileResponse {
        success: true,
        message: message.to_owned(),
        profile_id: upsert.id,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/me", rejection(ServerError))]
struct MePath();

/// The identity provider's view of the authenticated caller.
async fn get_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(caller.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(caller.user_id()))?;

    Ok(Json(user))
}
