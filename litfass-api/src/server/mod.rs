use crate::server::pagination::{InvalidPageError, PaginationConfig};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use litfass_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenDecodeError, AuthTokenHashError},
    comment::CommentMarker,
    group::GroupMarker,
    post::PostMarker,
    user::UserMarker,
};
use litfass_db::client::{DbClient, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod guard;
mod json;
pub mod pagination;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub pagination: PaginationConfig,
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
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    InvalidPage(#[from] InvalidPageError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Group with id {0} was not found.")]
    GroupByIdNotFound(Id<GroupMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("No follow edge towards user {0} exists.")]
    FollowEdgeNotFound(Id<UserMarker>),
    #[error("Cannot file a post under unknown group {0}.")]
    PostedToUnknownGroup(Id<GroupMarker>),
    #[error("Only the author may modify or delete this.")]
    NotResourceOwner,
    #[error("A follow edge towards user {0} already exists.")]
    DuplicateFollow(Id<UserMarker>),
}

/// Failure category named in the error body. The response status derives
/// from it, so the mapping from domain failures to statuses lives in exactly
/// one place.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ServerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::GroupByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::FollowEdgeNotFound(_) => ErrorKind::NotFound,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::InvalidPage(_)
            | ServerError::PostedToUnknownGroup(_) => ErrorKind::Validation,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken => ErrorKind::Unauthenticated,
            ServerError::NotResourceOwner => ErrorKind::Forbidden,
            ServerError::DuplicateFollow(_) => ErrorKind::Conflict,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    fn detail(&self) -> Option<String> {
        (self.kind() == ErrorKind::Validation).then(|| self.to_string())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            kind: self.kind(),
            detail: self.detail(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ErrorKind, ServerError};
    use axum::http::StatusCode;
    use litfass_common::model::{ModelValidationError, follow::SelfFollowError};

    #[test]
    fn statuses_follow_the_taxonomy() {
        let self_follow = ServerError::Validation(ModelValidationError::from(SelfFollowError));

        assert_eq!(self_follow.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::InvalidToken.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::NotResourceOwner.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::PostByIdNotFound(1_u64.into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::DuplicateFollow(1_u64.into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServerError::PostedToUnknownGroup(1_u64.into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn detail_is_reserved_for_validation_failures() {
        let self_follow = ServerError::Validation(ModelValidationError::from(SelfFollowError));
        assert!(self_follow.detail().is_some());

        assert_eq!(ServerError::InvalidToken.detail(), None);
        assert_eq!(ServerError::NotResourceOwner.detail(), None);
    }

    #[test]
    fn kinds_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
