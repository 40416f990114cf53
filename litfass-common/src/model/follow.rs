use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::UtcDateTime;

/// A directed follow edge: the follower's feed includes the followed user's
/// posts. At most one edge exists per ordered pair.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Follow {
    pub follower: Id<UserMarker>,
    pub followed: Id<UserMarker>,
    pub followed_at: UtcDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateFollow {
    pub followed: Id<UserMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Users cannot follow themselves")]
pub struct SelfFollowError;

/// Checks that a follower/followed pair forms a legal edge.
pub fn validate_edge(
    follower: Id<UserMarker>,
    followed: Id<UserMarker>,
) -> Result<(), SelfFollowError> {
    if follower == followed {
        Err(SelfFollowError)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, follow::validate_edge, user::UserMarker};

    #[test]
    fn self_follow_is_rejected() {
        let user: Id<UserMarker> = 7_u64.into();
        assert!(validate_edge(user, user).is_err());
    }

    #[test]
    fn distinct_pair_is_legal() {
        let follower: Id<UserMarker> = 7_u64.into();
        let followed: Id<UserMarker> = 8_u64.into();
        assert!(validate_edge(follower, followed).is_ok());
        assert!(validate_edge(followed, follower).is_ok());
    }
}
