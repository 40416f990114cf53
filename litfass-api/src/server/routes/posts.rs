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
    post::{CreatePost, PartialPost, Post, PostMarker, UpdatePost},
};
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}", rejection(ServerError))]
struct PostPath {
    post_id: Id<PostMarker>,
}

async fn list_posts(
    path: PostsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Post>>> {
    let pager = Pager::new(params, config)?;
    let (posts, count) = db.list_posts(pager.limit(), pager.offset()).await?;

    Ok(Json(pager.paginate(posts, count, &path.to_uri())))
}

async fn create_post(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreatePost>,
) -> Result<(StatusCode, Json<PartialPost>)> {
    if let Some(group) = create.group
        && db.fetch_group(group).await?.is_none()
    {
        return Err(ServerError::PostedToUnknownGroup(group));
    }

    let post = db.create_post(user.user_id(), &create).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    PostPath { post_id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { post_id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdatePost>,
) -> Result<Json<PartialPost>> {
    let post = db
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;
    guard::ensure_author(user, post.author.id)?;

    if let Some(Some(group)) = update.group
        && db.fetch_group(group).await?.is_none()
    {
        return Err(ServerError::PostedToUnknownGroup(group));
    }

    let updated = db
        .update_post(post_id, &update)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    Ok(Json(updated))
}

async fn delete_post(
    PostPath { post_id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = db
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;
    guard::ensure_author(user, post.author.id)?;

    if !db.delete_post(post_id).await? {
        return Err(ServerError::PostByIdNotFound(post_id));
    }

    Ok(StatusCode::NO_CONTENT)
}
