use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    pagination::{Page, PageQuery, Pager, PaginationConfig},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use litfass_common::model::post::Post;
use litfass_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

/// The requester's personalized feed: posts by everyone they follow, newest
/// first. Following nobody yields an empty page.
async fn feed(
    path: FeedPath,
    State(db): State<Arc<DbClient>>,
    State(config): State<PaginationConfig>,
    user: AuthenticatedUser,
    PageQuery(params): PageQuery,
) -> Result<Json<Page<Post>>> {
    let pager = Pager::new(params, config)?;
    let (posts, count) = db
        .list_feed_posts(user.user_id(), pager.limit(), pager.offset())
        .await?;

    Ok(Json(pager.paginate(posts, count, &path.to_uri())))
}
