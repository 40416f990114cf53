//! Raw row shapes and their conversions into domain models. Rows failing
//! domain validation surface as [`ModelValidationError`] rather than panics.

use litfass_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CommentMarker, CommentText, PartialComment},
    follow::Follow,
    group::{Group, GroupSlug},
    post::{ImageRef, PartialPost, Post, PostMarker, PostText},
    user::{User, UserHandle},
};
use litfass_common::util::PositiveDuration;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub struct AuthRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct GroupRecord {
    pub group_snowflake: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post row joined with its author.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct FullPostRecord {
    pub post_snowflake: i64,
    pub group_snowflake: Option<i64>,
    pub content: String,
    pub image_ref: Option<String>,
    pub user_snowflake: i64,
    pub handle: String,
}

/// A post row on its own, as returned from inserts and updates.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct PostRecord {
    pub post_snowflake: i64,
    pub group_snowflake: Option<i64>,
    pub content: String,
    pub image_ref: Option<String>,
    pub user_snowflake: i64,
}

/// A comment row joined with its author.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct FullCommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub struct FollowRecord {
    pub follower_snowflake: i64,
    pub followed_snowflake: i64,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            handle: UserHandle::new(value.handle)?,
        })
    }
}

impl TryFrom<AuthRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthRecord) -> Result<Self, Self::Error> {
        let expires_after = value
            .expires_after_seconds
            .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
            .transpose()?;

        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: AuthTokenHash::try_from(value.token_hash.into_boxed_slice())?,
            created_at: value.created_at.to_utc(),
            expires_after,
        })
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = ModelValidationError;

    fn try_from(value: GroupRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.group_snowflake.cast_unsigned().into(),
            title: value.title,
            slug: GroupSlug::new(value.slug)?,
            description: value.description,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        let id: Id<PostMarker> = value.post_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            group: value
                .group_snowflake
                .map(|snowflake| snowflake.cast_unsigned().into()),
            text: PostText::new(value.content)?,
            image: value.image_ref.map(ImageRef::new).transpose()?,
            published_at: id.created_at(),
        })
    }
}

impl TryFrom<PostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        let id: Id<PostMarker> = value.post_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            author_id: value.user_snowflake.cast_unsigned().into(),
            group: value
                .group_snowflake
                .map(|snowflake| snowflake.cast_unsigned().into()),
            text: PostText::new(value.content)?,
            image: value.image_ref.map(ImageRef::new).transpose()?,
            published_at: id.created_at(),
        })
    }
}

impl TryFrom<FullCommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: FullCommentRecord) -> Result<Self, Self::Error> {
        let id: Id<CommentMarker> = value.comment_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            post: value.post_snowflake.cast_unsigned().into(),
            author: User {
                id: value.user_snowflake.cast_unsigned().into(),
                handle: UserHandle::new(value.handle)?,
            },
            text: CommentText::new(value.content)?,
            published_at: id.created_at(),
        })
    }
}

impl TryFrom<CommentRecord> for PartialComment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        let id: Id<CommentMarker> = value.comment_snowflake.cast_unsigned().into();

        Ok(Self {
            id,
            post: value.post_snowflake.cast_unsigned().into(),
            author_id: value.user_snowflake.cast_unsigned().into(),
            text: CommentText::new(value.content)?,
            published_at: id.created_at(),
        })
    }
}

impl From<FollowRecord> for Follow {
    fn from(value: FollowRecord) -> Self {
        Self {
            follower: value.follower_snowflake.cast_unsigned().into(),
            followed: value.followed_snowflake.cast_unsigned().into(),
            followed_at: value.created_at.to_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{FollowRecord, FullPostRecord, UserRecord};
    use litfass_common::model::{
        LitfassEpoch, LitfassSnowflakeGenerator, follow::Follow, post::Post, user::User,
    };
    use litfass_common::snowflake::{Epoch, ProcessId, WorkerId};
    use time::{Duration, OffsetDateTime};

    #[test]
    fn invalid_stored_handle_is_an_error() {
        let record = UserRecord {
            user_snowflake: 1,
            handle: String::new(),
        };
        assert!(User::try_from(record).is_err());
    }

    #[test]
    fn empty_stored_content_is_an_error() {
        let record = FullPostRecord {
            post_snowflake: 1,
            content: String::new(),
            handle: "author".to_owned(),
            ..FullPostRecord::default()
        };
        assert!(Post::try_from(record).is_err());
    }

    #[test]
    fn post_publication_time_comes_from_the_snowflake() {
        let mut generator =
            LitfassSnowflakeGenerator::new(WorkerId::new_unchecked(1), ProcessId::new_unchecked(2));
        let created = LitfassEpoch::EPOCH_TIME + Duration::days(165) + Duration::minutes(30);
        let snowflake = generator.generate_at(created);

        let record = FullPostRecord {
            post_snowflake: snowflake.get().cast_signed(),
            content: "hello".to_owned(),
            handle: "author".to_owned(),
            ..FullPostRecord::default()
        };

        let post = Post::try_from(record).unwrap();
        assert_eq!(post.published_at, created);
    }

    #[test]
    fn follow_times_convert_to_utc() {
        let created_at = LitfassEpoch::EPOCH_TIME + Duration::days(30);
        let record = FollowRecord {
            follower_snowflake: 1,
            followed_snowflake: 2,
            created_at: OffsetDateTime::from(created_at),
        };

        let follow = Follow::from(record);
        assert_eq!(follow.followed_at, created_at);
    }
}
