pub mod auth;
pub mod comment;
pub mod follow;
pub mod group;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        comment::EmptyCommentTextError,
        follow::SelfFollowError,
        group::InvalidGroupSlugError,
        post::{EmptyPostTextError, InvalidImageRefError},
        user::InvalidUserHandleError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    util::NonPositiveDurationError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// Every way a domain value can fail validation, whether it arrives from a
/// request body or from a stored row.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    GroupSlug(#[from] InvalidGroupSlugError),
    #[error(transparent)]
    PostText(#[from] EmptyPostTextError),
    #[error(transparent)]
    CommentText(#[from] EmptyCommentTextError),
    #[error(transparent)]
    ImageRef(#[from] InvalidImageRefError),
    #[error(transparent)]
    SelfFollow(#[from] SelfFollowError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LitfassEpoch;
impl Epoch for LitfassEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type LitfassSnowflake = Snowflake<LitfassEpoch>;
pub type LitfassSnowflakeGenerator = SnowflakeGenerator<LitfassEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(LitfassSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: LitfassSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> LitfassSnowflake {
        self.0
    }

    /// The creation instant embedded in the id.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.timestamp().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<LitfassSnowflake> for Id<Marker> {
    fn from(value: LitfassSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for LitfassSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(LitfassSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
