use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::model::{
    Id,
    post::{Comment, CommentContent, CreatePost, Post, PostDraft, PostMarker},
    user::UserMarker,
};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_feed)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(toggle_like)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts", rejection(ServerError))]
struct FeedPath();

/// Every post, newest first. No pagination.
async fn get_feed(
    FeedPath(): FeedPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.fetch_feed().await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>> {
    draft.validate().map_err(ServerError::InvalidPost)?;

    let author = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    // Name/avatar snapshot: prefer the stored profile, fall back to the
    // identity record. Later profile edits do not touch existing posts.
    let (user_name, user_image) = match db.fetch_profile(user.user_id()).await? {
        Some(profile) => (profile.display_name, profile.avatar_url),
        None => (author.display_name, author.avatar_url),
    };

    let post = db
        .create_post(&CreatePost {
            author: user.user_id(),
            user_name,
            user_image,
            content: draft.content.clone(),
            image_url: draft.image_url().to_owned(),
        })
        .await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/like", rejection(ServerError))]
struct ToggleLikePath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct LikesResponse {
    likes: Vec<Id<UserMarker>>,
}

/// Toggles the caller's like on the post and replies with the resulting
/// like list.
async fn toggle_like(
    ToggleLikePath { id }: ToggleLikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<LikesResponse>> {
    let likes = db
        .toggle_like(id, user.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(LikesResponse { likes }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/comments", rejection(ServerError))]
struct AddCommentPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct AddCommentRequest {
    content: CommentContent,
}

async fn add_comment(
    AddCommentPath { id }: AddCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(request): Json<AddCommentRequest>,
) -> Result<Json<Comment>> {
    let author = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    let comment = db
        .add_comment(id, user.user_id(), &author.display_name, &request.content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(comment))
}
