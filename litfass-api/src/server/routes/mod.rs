use crate::server::ServerRouter;
use axum::Router;

mod comments;
mod feed;
mod follows;
mod groups;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(groups::routes())
        .merge(users::routes())
        .merge(follows::routes())
        .merge(feed::routes())
}
