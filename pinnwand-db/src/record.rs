use pinnwand_common::model::{
    Id, ModelValidationError,
    auth::Session,
    post::{Comment, CommentContent, Post},
    profile::Profile,
    user::{DisplayName, User, UserMarker},
};
use sqlx::FromRow;
use std::collections::HashMap;
use time::{Duration, PrimitiveDateTime, UtcDateTime};

/// Timestamps are stored without a zone; everything in the database is UTC.
pub(crate) fn to_db_time(time: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(time.date(), time.time())
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct SessionRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ProfileRecord {
    pub profile_snowflake: i64,
    pub user_snowflake: i64,
    pub display_name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub avatar_url: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ProfileUpsertRecord {
    pub profile_snowflake: i64,
    pub inserted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub user_name: String,
    pub user_image: String,
    pub content: String,
    pub image_url: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct LikeRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub user_name: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            display_name: DisplayName::new(value.display_name)?,
            email: value.email,
            avatar_url: value.avatar_url,
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = ModelValidationError;

    fn try_from(value: ProfileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.profile_snowflake.cast_unsigned().into(),
            user_id: value.user_snowflake.cast_unsigned().into(),
            display_name: DisplayName::new(value.display_name)?,
            bio: value.bio,
            location: value.location,
            website: value.website,
            avatar_url: value.avatar_url,
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            user_id: value.user_snowflake.cast_unsigned().into(),
            user_name: DisplayName::new(value.user_name)?,
            content: CommentContent::new(value.content)?,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl PostRecord {
    pub(crate) fn into_post(
        self,
        likes: Vec<Id<UserMarker>>,
        comments: Vec<Comment>,
    ) -> Result<Post, ModelValidationError> {
        Ok(Post {
            id: self.post_snowflake.cast_unsigned().into(),
            user_id: self.user_snowflake.cast_unsigned().into(),
            user_name: DisplayName::new(self.user_name)?,
            user_image: self.user_image,
            content: self.content,
            image_url: self.image_url,
            likes,
            comments,
            created_at: self.created_at.as_utc(),
        })
    }
}

/// Stitches post rows together with their like and comment rows. Posts come
/// out in the order the post rows came in; comment rows are expected sorted
/// by id already. Posts nothing refers to get empty lists.
pub(crate) fn assemble_posts(
    posts: Vec<PostRecord>,
    likes: Vec<LikeRecord>,
    comments: Vec<CommentRecord>,
) -> Result<Vec<Post>, ModelValidationError> {
    let mut likes_by_post: HashMap<i64, Vec<Id<UserMarker>>> = HashMap::new();
    for like in likes {
        likes_by_post
            .entry(like.post_snowflake)
            .or_default()
            .push(like.user_snowflake.cast_unsigned().into());
    }

    let mut comments_by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        comments_by_post
            .entry(comment.post_snowflake)
            .or_default()
            .push(comment.try_into()?);
    }

    posts
        .into_iter()
        .map(|record| {
            let likes = likes_by_post
                .remove(&record.post_snowflake)
                .unwrap_or_default();
            let comments = comments_by_post
                .remove(&record.post_snowflake)
                .unwrap_or_default();
            record.into_post(likes, comments)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnwand_common::{
        model::PinnwandEpoch,
        snowflake::{ProcessId, Snowflake, SnowflakeGenerator, WorkerId},
    };
    use time::macros::utc_datetime;

    fn generator() -> SnowflakeGenerator<PinnwandEpoch> {
        SnowflakeGenerator::new(WorkerId::new_unchecked(1), ProcessId::new_unchecked(1))
    }

    fn post_record(snowflake: Snowflake<PinnwandEpoch>, content: &str) -> PostRecord {
        PostRecord {
            post_snowflake: snowflake.get().cast_signed(),
            user_snowflake: 9,
            user_name: "Ada".to_owned(),
            user_image: String::new(),
            content: content.to_owned(),
            image_url: String::new(),
            created_at: to_db_time(snowflake.created_at()),
        }
    }

    #[test]
    fn user_record_conversion() {
        let user = User::try_from(UserRecord {
            user_snowflake: 12,
            display_name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            avatar_url: String::new(),
        })
        .unwrap();

        assert_eq!(user.id, 12_u64.into());
        assert_eq!(user.display_name.get(), "Ada");
    }

    #[test]
    fn session_record_conversion() {
        let session = Session::try_from(SessionRecord {
            user_snowflake: 5,
            token_hash: vec![0; pinnwand_common::model::auth::ACCESS_TOKEN_HASH_LEN],
            created_at: to_db_time(utc_datetime!(2025-03-01 08:00)),
            expires_after_seconds: Some(3600),
        })
        .unwrap();

        assert_eq!(session.user, 5_u64.into());
        assert_eq!(
            session.expires_after.unwrap().get(),
            Duration::seconds(3600)
        );

        let bad_hash = Session::try_from(SessionRecord {
            user_snowflake: 5,
            token_hash: vec![0; 3],
            created_at: to_db_time(utc_datetime!(2025-03-01 08:00)),
            expires_after_seconds: None,
        });
        assert!(bad_hash.is_err());
    }

    #[test]
    fn feed_assembly_preserves_query_order() {
        let mut generator = generator();
        let early = generator
            .generate_at(utc_datetime!(2025-05-01 10:00))
            .unwrap();
        let middle = generator
            .generate_at(utc_datetime!(2025-05-01 11:00))
            .unwrap();
        let late = generator
            .generate_at(utc_datetime!(2025-05-01 12:00))
            .unwrap();

        // The feed query returns rows ordered by descending snowflake.
        let rows = vec![
            post_record(late, "third"),
            post_record(middle, "second"),
            post_record(early, "first"),
        ];

        let posts = assemble_posts(rows, Vec::new(), Vec::new()).unwrap();

        let contents: Vec<_> = posts.iter().map(|post| post.content.as_str()).collect();
        assert_eq!(contents, ["third", "second", "first"]);
        assert!(posts[0].created_at > posts[1].created_at);
        assert!(posts[1].created_at > posts[2].created_at);
    }

    #[test]
    fn feed_assembly_defaults_to_empty_lists() {
        let mut generator = generator();
        let id = generator
            .generate_at(utc_datetime!(2025-05-01 10:00))
            .unwrap();

        let posts = assemble_posts(vec![post_record(id, "hello")], Vec::new(), Vec::new()).unwrap();

        assert_eq!(posts[0].likes, Vec::new());
        assert_eq!(posts[0].comments, Vec::new());
    }

    #[test]
    fn feed_assembly_attaches_likes_and_ordered_comments() {
        let mut generator = generator();
        let post_id = generator
            .generate_at(utc_datetime!(2025-05-01 10:00))
            .unwrap();
        let other_id = generator
            .generate_at(utc_datetime!(2025-05-01 11:00))
            .unwrap();
        let first_comment = generator
            .generate_at(utc_datetime!(2025-05-01 12:00))
            .unwrap();
        let second_comment = generator
            .generate_at(utc_datetime!(2025-05-01 13:00))
            .unwrap();

        let comment_record = |snowflake: Snowflake<PinnwandEpoch>, content: &str| CommentRecord {
            comment_snowflake: snowflake.get().cast_signed(),
            post_snowflake: post_id.get().cast_signed(),
            user_snowflake: 4,
            user_name: "Grace".to_owned(),
            content: content.to_owned(),
            created_at: to_db_time(snowflake.created_at()),
        };

        let posts = assemble_posts(
            vec![post_record(other_id, "b"), post_record(post_id, "a")],
            vec![LikeRecord {
                post_snowflake: post_id.get().cast_signed(),
                user_snowflake: 4,
            }],
            vec![
                comment_record(first_comment, "C1"),
                comment_record(second_comment, "C2"),
            ],
        )
        .unwrap();

        let post = &posts[1];
        assert_eq!(post.content, "a");
        assert_eq!(post.likes, vec![4_u64.into()]);
        let comment_texts: Vec<_> = post
            .comments
            .iter()
            .map(|comment| comment.content.get())
            .collect();
        assert_eq!(comment_texts, ["C1", "C2"]);

        assert!(posts[0].likes.is_empty());
        assert!(posts[0].comments.is_empty());
    }
}
