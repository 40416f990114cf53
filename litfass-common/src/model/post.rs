use crate::{
    model::{
        Id,
        group::GroupMarker,
        user::{User, UserMarker},
    },
    util::patch_field,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const IMAGE_REF_MAX_LEN: usize = 255;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A published post with its author resolved. The author binding and
/// `published_at` are fixed at creation; only the author may change the
/// remaining fields.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub group: Option<Id<GroupMarker>>,
    pub text: PostText,
    pub image: Option<ImageRef>,
    pub published_at: UtcDateTime,
}

/// Post shape returned from writes, where only the author id is at hand.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub group: Option<Id<GroupMarker>>,
    pub text: PostText,
    pub image: Option<ImageRef>,
    pub published_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub text: PostText,
    #[serde(default)]
    pub group: Option<Id<GroupMarker>>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// Partial update. Absent fields are left untouched; `group` and `image`
/// accept an explicit `null` to clear the value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UpdatePost {
    #[serde(default)]
    pub text: Option<PostText>,
    #[serde(default, deserialize_with = "patch_field::deserialize")]
    pub group: Option<Option<Id<GroupMarker>>>,
    #[serde(default, deserialize_with = "patch_field::deserialize")]
    pub image: Option<Option<ImageRef>>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostText(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post text must not be empty")]
pub struct EmptyPostTextError;

impl PostText {
    pub fn new(text: String) -> Result<Self, EmptyPostTextError> {
        if text.trim().is_empty() {
            Err(EmptyPostTextError)
        } else {
            Ok(PostText(text))
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

impl<'de> Deserialize<'de> for PostText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostText::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(""), &"non-empty post text"))
    }
}

/// Opaque reference handed out by the media store for an uploaded image.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The image reference is invalid: {0}")]
pub struct InvalidImageRefError(String);

impl ImageRef {
    pub fn new(reference: String) -> Result<Self, InvalidImageRefError> {
        if !reference.is_empty() && reference.len() <= IMAGE_REF_MAX_LEN {
            Ok(ImageRef(reference))
        } else {
            Err(InvalidImageRefError(reference))
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

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        ImageRef::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"ImageRef"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{ImageRef, PostText, UpdatePost};

    #[test]
    fn text_must_have_content() {
        assert!(PostText::new(String::new()).is_err());
        assert!(PostText::new("   \n\t".to_owned()).is_err());
        assert!(PostText::new("hello".to_owned()).is_ok());
    }

    #[test]
    fn image_ref_bounds() {
        assert!(ImageRef::new(String::new()).is_err());
        assert!(ImageRef::new("media/0451.png".to_owned()).is_ok());
        assert!(ImageRef::new("x".repeat(256)).is_err());
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let update: UpdatePost = serde_json::from_str(r#"{"text": "new text"}"#).unwrap();
        assert!(update.text.is_some());
        assert_eq!(update.group, None);
        assert_eq!(update.image, None);

        let update: UpdatePost = serde_json::from_str(r#"{"group": null}"#).unwrap();
        assert_eq!(update.text, None);
        assert_eq!(update.group, Some(None));

        let update: UpdatePost = serde_json::from_str(r#"{"group": 42, "image": null}"#).unwrap();
        assert_eq!(update.group, Some(Some(42_u64.into())));
        assert_eq!(update.image, Some(None));
    }

    #[test]
    fn update_rejects_empty_text() {
        let update: Result<UpdatePost, _> = serde_json::from_str(r#"{"text": ""}"#);
        assert!(update.is_err());
    }
}
