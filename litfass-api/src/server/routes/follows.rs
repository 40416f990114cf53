use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    pagination::{Page, PageQuery, Pager, PaginationConfig},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use litfass_common::model::{
    Id, ModelValidationError,
    follow::{self, CreateFollow, Follow},
    user::UserMarker,
};
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_follows)
        .typed_post(create_follow)
        .typed_delete(delete_follow)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follows", rejection(ServerError))]
struct FollowsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/follows/{followed}", rejection(ServerError))]
struct FollowPath {
    followed: Id<UserMarker>,
}

async fn list_follows(
    path: FollowsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    user: AuthenticatedUser,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Follow>>> {
    let pager = Pager::new(params, config)?;
    let (follows, count) = db
        .list_follows(user.user_id(), pager.limit(), pager.offset())
        .await?;

    Ok(Json(pager.paginate(follows, count, &path.to_uri())))
}

async fn create_follow(
    _: FollowsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(create): Json<CreateFollow>,
) -> Result<(StatusCode, Json<Follow>)> {
    follow::validate_edge(user.user_id(), create.followed)
        .map_err(ModelValidationError::from)?;

    if db.fetch_user(create.followed).await?.is_none() {
        return Err(ServerError::UserByIdNotFound(create.followed));
    }

    let edge = db
        .create_follow(user.user_id(), create.followed)
        .await?
        .ok_or(ServerError::DuplicateFollow(create.followed))?;

    Ok((StatusCode::CREATED, Json(edge)))
}

async fn delete_follow(
    FollowPath { followed }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    if !db.delete_follow(user.user_id(), followed).await? {
        return Err(ServerError::FollowEdgeNotFound(followed));
    }

    Ok(StatusCode::NO_CONTENT)
}
