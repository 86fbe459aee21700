use crate::{
    model::{Id, user::DisplayName, user::UserMarker},
    util::timestamp_ms,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_CONTENT_MAX_LEN: usize = 2000;
pub const COMMENT_MAX_LEN: usize = 1000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A feed entry. `user_name`/`user_image` are a snapshot of the author at
/// creation time and are not kept in sync with later profile edits.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    pub user_name: DisplayName,
    pub user_image: String,
    pub content: String,
    pub image_url: String,
    pub likes: Vec<Id<UserMarker>>,
    pub comments: Vec<Comment>,
    #[serde(with = "timestamp_ms")]
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub user_id: Id<UserMarker>,
    pub user_name: DisplayName,
    pub content: CommentContent,
    #[serde(with = "timestamp_ms")]
    pub created_at: UtcDateTime,
}

/// What a client submits to create a post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("A post needs text content or an image.")]
    Empty,
    #[error("Post content exceeds {POST_CONTENT_MAX_LEN} characters.")]
    ContentTooLong,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), InvalidPostError> {
        let has_text = !self.content.trim().is_empty();
        let has_image = self.image_url.as_deref().is_some_and(|url| !url.is_empty());

        if !has_text && !has_image {
            return Err(InvalidPostError::Empty);
        }
        if self.content.chars().count() > POST_CONTENT_MAX_LEN {
            return Err(InvalidPostError::ContentTooLong);
        }
        Ok(())
    }

    /// The image URL to store; posts without one carry an empty string.
    #[must_use]
    pub fn image_url(&self) -> &str {
        self.image_url.as_deref().unwrap_or("")
    }
}

/// A validated draft plus the author snapshot, ready for insertion.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub user_name: DisplayName,
    pub user_image: String,
    pub content: String,
    pub image_url: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidCommentError {
    #[error("A comment cannot be blank.")]
    Blank,
    #[error("A comment exceeds {COMMENT_MAX_LEN} characters.")]
    TooLong,
}

impl CommentContent {
    pub fn new(content: String) -> Result<Self, InvalidCommentError> {
        if content.trim().is_empty() {
            return Err(InvalidCommentError::Blank);
        }
        if content.chars().count() > COMMENT_MAX_LEN {
            return Err(InvalidCommentError::TooLong);
        }
        Ok(Self(content))
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

impl<'de> Deserialize<'de> for CommentContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentContent::new(inner)
            .map_err(|_| Error::invalid_value(Unexpected::Other("blank or overlong comment"), &"CommentContent"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_needs_text_or_image() {
        let empty = PostDraft::default();
        assert_eq!(empty.validate(), Err(InvalidPostError::Empty));

        let whitespace_only = PostDraft {
            content: "   \n".to_owned(),
            image_url: None,
        };
        assert_eq!(whitespace_only.validate(), Err(InvalidPostError::Empty));

        let empty_image = PostDraft {
            content: String::new(),
            image_url: Some(String::new()),
        };
        assert_eq!(empty_image.validate(), Err(InvalidPostError::Empty));

        let text_only = PostDraft {
            content: "hello".to_owned(),
            image_url: None,
        };
        assert_eq!(text_only.validate(), Ok(()));

        let image_only = PostDraft {
            content: String::new(),
            image_url: Some("https://example.com/a.png".to_owned()),
        };
        assert_eq!(image_only.validate(), Ok(()));
    }

    #[test]
    fn draft_content_length_cap() {
        let long = PostDraft {
            content: "x".repeat(POST_CONTENT_MAX_LEN + 1),
            image_url: None,
        };
        assert_eq!(long.validate(), Err(InvalidPostError::ContentTooLong));
    }

    #[test]
    fn missing_image_url_becomes_empty_string() {
        let draft = PostDraft {
            content: "hello".to_owned(),
            image_url: None,
        };
        assert_eq!(draft.image_url(), "");
    }

    #[test]
    fn comment_content_rules() {
        assert!(CommentContent::new("nice post".to_owned()).is_ok());
        assert_eq!(
            CommentContent::new("   ".to_owned()),
            Err(InvalidCommentError::Blank)
        );
        assert_eq!(
            CommentContent::new("x".repeat(COMMENT_MAX_LEN + 1)),
            Err(InvalidCommentError::TooLong)
        );
    }
}
