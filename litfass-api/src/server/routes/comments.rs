use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    guard,
    json::Json,
    pagination::{Page, PageQuery, Pager, PaginationConfig},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use litfass_common::model::{
    Id,
    comment::{Comment, CommentMarker, CreateComment, PartialComment, UpdateComment},
    post::PostMarker,
};
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_get(get_comment)
        .typed_patch(update_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments", rejection(ServerError))]
struct CommentsPath {
    post_id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments/{id}", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
    id: Id<CommentMarker>,
}

async fn list_comments(
    path: CommentsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Comment>>> {
    let pager = Pager::new(params, config)?;

    if db.fetch_post(path.post_id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(path.post_id));
    }

    let (comments, count) = db
        .list_comments(path.post_id, pager.limit(), pager.offset())
        .await?;

    Ok(Json(pager.paginate(comments, count, &path.to_uri())))
}

async fn create_comment(
    CommentsPath { post_id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreateComment>,
) -> Result<(StatusCode, Json<PartialComment>)> {
    if db.fetch_post(post_id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(post_id));
    }

    let comment = db.create_comment(post_id, user.user_id(), &create).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Comment>> {
    let comment = db
        .fetch_comment(post_id, id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(comment))
}

async fn update_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdateComment>,
) -> Result<Json<PartialComment>> {
    let comment = db
        .fetch_comment(post_id, id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    guard::ensure_author(user, comment.author.id)?;

    let updated = db
        .update_comment(post_id, id, &update)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(updated))
}

async fn delete_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let comment = db
        .fetch_comment(post_id, id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    guard::ensure_author(user, comment.author.id)?;

    if !db.delete_comment(post_id, id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }

    Ok(StatusCode::NO_CONTENT)
}
