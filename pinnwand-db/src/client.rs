use crate::record::{
    CommentRecord, LikeRecord, PostRecord, ProfileRecord, ProfileUpsertRecord, SessionRecord,
    UserRecord, assemble_posts, to_db_time,
};
use pinnwand_common::model::{
    Id, ModelValidationError, PinnwandSnowflake, PinnwandSnowflakeGenerator,
    auth::{AccessTokenHash, Session},
    post::{Comment, CommentContent, CreatePost, Post, PostMarker},
    profile::{Profile, ProfileFields, ProfileMarker},
    user::{DisplayName, User, UserMarker},
};
use pinnwand_common::snowflake::{ProcessId, SnowflakeTimestampError, WorkerId};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Generating an id failed: {0}")]
    IdGeneration(#[from] SnowflakeTimestampError),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The application's single gateway to Postgres. Also owns the snowflake
/// generator, so every id handed out goes through one increment sequence.
#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<PinnwandSnowflakeGenerator>,
}

/// Outcome of a profile save: the row's id and whether it was newly created.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ProfileUpsert {
    pub id: Id<ProfileMarker>,
    pub created: bool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(PinnwandSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn generate_snowflake(&self) -> Result<PinnwandSnowflake> {
        let mut generator = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(generator.generate()?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, display_name, email, avatar_url
            FROM users.users
            WHERE user_snowflake = $1
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    pub async fn fetch_session(&self, token_hash: &AccessTokenHash) -> Result<Option<Session>> {
        let record = query_as::<_, SessionRecord>(
            "
            SELECT user_snowflake, token_hash, created_at, expires_after_seconds
            FROM users.sessions
            WHERE token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Session::try_from).transpose()?)
    }

    pub async fn fetch_profile(&self, user_id: Id<UserMarker>) -> Result<Option<Profile>> {
        let record = query_as::<_, ProfileRecord>(
            "
            SELECT profile_snowflake, user_snowflake, display_name, bio, location, website,
                avatar_url, created_at, updated_at
            FROM profiles.profiles
            WHERE user_snowflake = $1
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Profile::try_from).transpose()?)
    }

    /// Creates the user's profile, or overwrites its editable fields if one
    /// exists. The unique index on `user_snowflake` makes concurrent first
    /// saves converge on a single row. A fresh row gets
    /// `created_at == updated_at`; an overwrite only bumps `updated_at`.
    pub async fn upsert_profile(
        &self,
        user_id: Id<UserMarker>,
        fields: &ProfileFields,
    ) -> Result<ProfileUpsert> {
        let profile_snowflake = self.generate_snowflake()?;
        let now = to_db_time(profile_snowflake.created_at());

        let record = query_as::<_, ProfileUpsertRecord>(
            "
            INSERT INTO profiles.profiles (profile_snowflake, user_snowflake, display_name,
                bio, location, website, avatar_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (user_snowflake) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                location = EXCLUDED.location,
                website = EXCLUDED.website,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = EXCLUDED.updated_at
            RETURNING profile_snowflake, (xmax = 0) AS inserted
            ",
        )
        .bind(profile_snowflake.get().cast_signed())
        .bind(user_id.snowflake().get().cast_signed())
        .bind(fields.display_name.get())
        .bind(&fields.bio)
        .bind(&fields.location)
        .bind(&fields.website)
        .bind(&fields.avatar_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProfileUpsert {
            id: record.profile_snowflake.cast_unsigned().into(),
            created: record.inserted,
        })
    }

    /// The feed: every post, newest first.
    pub async fn fetch_feed(&self) -> Result<Vec<Post>> {
        let posts = query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, user_snowflake, user_name, user_image, content, image_url,
                created_at
            FROM posts.posts
            ORDER BY post_snowflake DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = posts.iter().map(|post| post.post_snowflake).collect();

        let likes = query_as::<_, LikeRecord>(
            "
            SELECT post_snowflake, user_snowflake
            FROM posts.likes
            WHERE post_snowflake = ANY($1)
            ORDER BY user_snowflake
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comments = query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, user_name, content,
                created_at
            FROM posts.comments
            WHERE post_snowflake = ANY($1)
            ORDER BY comment_snowflake
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_posts(posts, likes, comments)?)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let post_key = post_id.snowflake().get().cast_signed();

        let record = query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, user_snowflake, user_name, user_image, content, image_url,
                created_at
            FROM posts.posts
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let likes = query_as::<_, LikeRecord>(
            "
            SELECT post_snowflake, user_snowflake
            FROM posts.likes
            WHERE post_snowflake = $1
            ORDER BY user_snowflake
            ",
        )
        .bind(post_key)
        .fetch_all(&self.pool)
        .await?;

        let comments = query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, user_name, content,
                created_at
            FROM posts.comments
            WHERE post_snowflake = $1
            ORDER BY comment_snowflake
            ",
        )
        .bind(post_key)
        .fetch_all(&self.pool)
        .await?;

        let like_ids = likes
            .into_iter()
            .map(|like| like.user_snowflake.cast_unsigned().into())
            .collect();
        let comments = comments
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<Vec<_>, ModelValidationError>>()?;

        Ok(Some(record.into_post(like_ids, comments)?))
    }

    pub async fn create_post(&self, create: &CreatePost) -> Result<Post> {
        let post_snowflake = self.generate_snowflake()?;
        let created_at = post_snowflake.created_at();

        query(
            "
            INSERT INTO posts.posts (post_snowflake, user_snowflake, user_name, user_image,
                content, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(create.author.snowflake().get().cast_signed())
        .bind(create.user_name.get())
        .bind(&create.user_image)
        .bind(&create.content)
        .bind(&create.image_url)
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id: post_snowflake.into(),
            user_id: create.author,
            user_name: create.user_name.clone(),
            user_image: create.user_image.clone(),
            content: create.content.clone(),
            image_url: create.image_url.clone(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at,
        })
    }

    /// Atomically toggles `user_id`'s membership in the post's like set and
    /// returns the resulting set, or `None` for an unknown post. Row-level
    /// insert/delete, so concurrent toggles by different users never clobber
    /// each other.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Vec<Id<UserMarker>>>> {
        let post_key = post_id.snowflake().get().cast_signed();
        let user_key = user_id.snowflake().get().cast_signed();

        let mut tx = self.pool.begin().await?;

        let known_post =
            query_scalar::<_, i64>("SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1")
                .bind(post_key)
                .fetch_optional(&mut *tx)
                .await?;
        if known_post.is_none() {
            return Ok(None);
        }

        let inserted = query(
            "
            INSERT INTO posts.likes (post_snowflake, user_snowflake)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(post_key)
        .bind(user_key)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            query("DELETE FROM posts.likes WHERE post_snowflake = $1 AND user_snowflake = $2")
                .bind(post_key)
                .bind(user_key)
                .execute(&mut *tx)
                .await?;
        }

        let likes = query_scalar::<_, i64>(
            "
            SELECT user_snowflake
            FROM posts.likes
            WHERE post_snowflake = $1
            ORDER BY user_snowflake
            ",
        )
        .bind(post_key)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(
            likes
                .into_iter()
                .map(|raw| raw.cast_unsigned().into())
                .collect(),
        ))
    }

    /// Appends a comment to the post, or returns `None` for an unknown post.
    /// Comments live in their own table keyed by ascending snowflake, so
    /// concurrent appends interleave instead of overwriting each other.
    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        user_name: &DisplayName,
        content: &CommentContent,
    ) -> Result<Option<Comment>> {
        let post_key = post_id.snowflake().get().cast_signed();

        let known_post =
            query_scalar::<_, i64>("SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1")
                .bind(post_key)
                .fetch_optional(&self.pool)
                .await?;
        if known_post.is_none() {
            return Ok(None);
        }

        let comment_snowflake = self.generate_snowflake()?;
        let created_at = comment_snowflake.created_at();

        query(
            "
            INSERT INTO posts.comments (comment_snowflake, post_snowflake, user_snowflake,
                user_name, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(post_key)
        .bind(user_id.snowflake().get().cast_signed())
        .bind(user_name.get())
        .bind(content.get())
        .bind(to_db_time(created_at))
        .execute(&self.pool)
        .await?;

        Ok(Some(Comment {
            id: comment_snowflake.into(),
            user_id,
            user_name: user_name.clone(),
            content: content.clone(),
            created_at,
        }))
    }
}
