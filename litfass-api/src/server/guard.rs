//! Ownership is the sole authorization predicate for mutations: no roles,
//! no admin override. Reads need no identity at all, creates only need an
//! authenticated one, and both of those are enforced by extractors.

use crate::server::{ServerError, auth::AuthenticatedUser};
use litfass_common::model::{Id, user::UserMarker};

/// Allows the operation iff the requester authored the resource.
pub fn ensure_author(
    requester: AuthenticatedUser,
    author: Id<UserMarker>,
) -> Result<(), ServerError> {
    if requester.user_id() == author {
        Ok(())
    } else {
        Err(ServerError::NotResourceOwner)
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, auth::AuthenticatedUser, guard::ensure_author};

    #[test]
    fn author_may_mutate() {
        let requester = AuthenticatedUser::new(3_u64.into());
        assert!(ensure_author(requester, 3_u64.into()).is_ok());
    }

    #[test]
    fn everyone_else_is_forbidden() {
        let requester = AuthenticatedUser::new(4_u64.into());
        assert!(matches!(
            ensure_author(requester, 3_u64.into()),
            Err(ServerError::NotResourceOwner)
        ));
    }
}
