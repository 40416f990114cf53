use crate::server::{
    Result, ServerError, ServerRouter,
    json::Json,
    pagination::{Page, PageQuery, Pager, PaginationConfig},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use litfass_common::model::{
    Id,
    post::Post,
    user::{User, UserMarker},
};
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_user)
        .typed_get(list_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct UserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn list_user_posts(
    path: UserPostsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Post>>> {
    let pager = Pager::new(params, config)?;

    if db.fetch_user(path.id).await?.is_none() {
        return Err(ServerError::UserByIdNotFound(path.id));
    }

    let (posts, count) = db
        .list_posts_by_author(path.id, pager.limit(), pager.offset())
        .await?;

    Ok(Json(pager.paginate(posts, count, &path.to_uri())))
}
