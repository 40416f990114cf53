use crate::model::{
    Id,
    post::PostMarker,
    user::{User, UserMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A comment under a post. The parent post binding is immutable; the text is
/// editable by the comment's author only.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: User,
    pub text: CommentText,
    pub published_at: UtcDateTime,
}

/// Comment shape returned from writes, where only the author id is at hand.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct PartialComment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub text: CommentText,
    pub published_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateComment {
    pub text: CommentText,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UpdateComment {
    #[serde(default)]
    pub text: Option<CommentText>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentText(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment text must not be empty")]
pub struct EmptyCommentTextError;

impl CommentText {
    pub fn new(text: String) -> Result<Self, EmptyCommentTextError> {
        if text.trim().is_empty() {
            Err(EmptyCommentTextError)
        } else {
            Ok(CommentText(text))
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

impl<'de> Deserialize<'de> for CommentText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentText::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(""), &"non-empty comment text"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::comment::{CommentText, CreateComment};

    #[test]
    fn text_must_have_content() {
        assert!(CommentText::new(String::new()).is_err());
        assert!(CommentText::new(" ".to_owned()).is_err());
        assert!(CommentText::new("well said".to_owned()).is_ok());
    }

    #[test]
    fn create_body_validates_text() {
        let parsed: Result<CreateComment, _> = serde_json::from_str(r#"{"text": ""}"#);
        assert!(parsed.is_err());

        let parsed: CreateComment = serde_json::from_str(r#"{"text": "first!"}"#).unwrap();
        assert_eq!(parsed.text.get(), "first!");
    }
}
