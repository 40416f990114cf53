use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const GROUP_SLUG_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GroupMarker;

/// A named category posts can be filed under. Groups are set up
/// administratively and are read-only over the API.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Group {
    pub id: Id<GroupMarker>,
    pub title: String,
    pub slug: GroupSlug,
    pub description: String,
}

/// Unique URL-safe group name: non-empty, at most [`GROUP_SLUG_MAX_LEN`]
/// bytes of lowercase ascii letters, digits, `-` and `_`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupSlug(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The group slug is invalid: {0}")]
pub struct InvalidGroupSlugError(String);

impl GroupSlug {
    pub fn new(slug: String) -> Result<Self, InvalidGroupSlugError> {
        let legal_chars = slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

        if !slug.is_empty() && slug.len() <= GROUP_SLUG_MAX_LEN && legal_chars {
            Ok(GroupSlug(slug))
        } else {
            Err(InvalidGroupSlugError(slug))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for GroupSlug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        GroupSlug::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"GroupSlug"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::group::{GROUP_SLUG_MAX_LEN, GroupSlug};

    #[test]
    fn slug_charset() {
        assert!(GroupSlug::new("rock-n-roll_01".to_owned()).is_ok());
        assert!(GroupSlug::new(String::new()).is_err());
        assert!(GroupSlug::new("With Spaces".to_owned()).is_err());
        assert!(GroupSlug::new("UPPER".to_owned()).is_err());
        assert!(GroupSlug::new("ünïcode".to_owned()).is_err());
    }

    #[test]
    fn slug_bounds() {
        assert!(GroupSlug::new("x".repeat(GROUP_SLUG_MAX_LEN)).is_ok());
        assert!(GroupSlug::new("x".repeat(GROUP_SLUG_MAX_LEN + 1)).is_err());
    }
}
