use crate::server::{
    Result, ServerError, ServerRouter,
    json::Json,
    pagination::{Page, PageQuery, Pager, PaginationConfig},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use litfass_common::model::{
    Id,
    group::{Group, GroupMarker},
    post::Post,
};
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

// Groups are created administratively, so the API surface is read-only.
pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_groups)
        .typed_get(get_group)
        .typed_get(list_group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups", rejection(ServerError))]
struct GroupsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups/{id}", rejection(ServerError))]
struct GroupPath {
    id: Id<GroupMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups/{id}/posts", rejection(ServerError))]
struct GroupPostsPath {
    id: Id<GroupMarker>,
}

async fn list_groups(
    path: GroupsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Group>>> {
    let pager = Pager::new(params, config)?;
    let (groups, count) = db.list_groups(pager.limit(), pager.offset()).await?;

    Ok(Json(pager.paginate(groups, count, &path.to_uri())))
}

async fn get_group(
    GroupPath { id }: GroupPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Group>> {
    let group = db
        .fetch_group(id)
        .await?
        .ok_or(ServerError::GroupByIdNotFound(id))?;

    Ok(Json(group))
}

async fn list_group_posts(
    path: GroupPostsPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Post>>> {
    let pager = Pager::new(params, config)?;

    if db.fetch_group(path.id).await?.is_none() {
        return Err(ServerError::GroupByIdNotFound(path.id));
    }

    let (posts, count) = db
        .list_posts_by_group(path.id, pager.limit(), pager.offset())
        .await?;

    Ok(Json(pager.paginate(posts, count, &path.to_uri())))
}
