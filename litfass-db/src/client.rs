use crate::record::{
    AuthRecord, CommentRecord, FollowRecord, FullCommentRecord, FullPostRecord, GroupRecord,
    PostRecord, UserRecord,
};
use litfass_common::model::{
    Id, LitfassSnowflake, LitfassSnowflakeGenerator, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CommentMarker, CommentText, CreateComment, PartialComment, UpdateComment},
    follow::Follow,
    group::{Group, GroupMarker},
    post::{CreatePost, ImageRef, PartialPost, Post, PostMarker, PostText, UpdatePost},
    user::{User, UserMarker},
};
use litfass_common::snowflake::{ProcessId, WorkerId};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

const MAX_CONNECTIONS: u32 = 8;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Error connecting to the database: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("Error running migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<LitfassSnowflakeGenerator>,
}

fn convert_rows<R, T>(records: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = ModelValidationError>,
{
    records
        .into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::from)
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(LitfassSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    /// Connects to the database and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self, ConnectError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        crate::MIGRATOR.run(&pool).await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    fn next_snowflake(&self) -> LitfassSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_snowflake, users.handle
            FROM users.users
            WHERE users.user_snowflake = $1
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthRecord>(
            "
            SELECT user_snowflake, token_hash, created_at, expires_after_seconds
            FROM users.auth_tokens
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    pub async fn fetch_group(&self, group_id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT group_snowflake, title, slug, description
            FROM posts.groups
            WHERE group_snowflake = $1
            ",
        )
        .bind(group_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    pub async fn list_groups(&self, limit: i64, offset: i64) -> Result<(Vec<Group>, u64)> {
        let total: i64 = query_scalar("SELECT COUNT(*) FROM posts.groups")
            .fetch_one(&self.pool)
            .await?;

        let records = query_as::<_, GroupRecord>(
            "
            SELECT group_snowflake, title, slug, description
            FROM posts.groups
            ORDER BY group_snowflake DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((convert_rows(records)?, total.cast_unsigned()))
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(
            "
            SELECT
                posts.post_snowflake,
                posts.group_snowflake,
                posts.content,
                posts.image_ref,
                users.user_snowflake,
                users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(
        &self,
        author: Id<UserMarker>,
        post: &CreatePost,
    ) -> Result<PartialPost> {
        let post_snowflake = self.next_snowflake();

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts
                (post_snowflake, user_snowflake, group_snowflake, content, image_ref)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING post_snowflake, group_snowflake, content, image_ref, user_snowflake
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(post.group.map(|group| group.snowflake().get().cast_signed()))
        .bind(post.text.get())
        .bind(post.image.as_ref().map(ImageRef::get))
        .fetch_one(&self.pool)
        .await?;

        Ok(PartialPost::try_from(record)?)
    }

    /// Updates only the supplied fields; `group` and `image` may be cleared.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &UpdatePost,
    ) -> Result<Option<PartialPost>> {
        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts.posts SET
                content = COALESCE($2, content),
                group_snowflake = CASE WHEN $3 THEN $4 ELSE group_snowflake END,
                image_ref = CASE WHEN $5 THEN $6 ELSE image_ref END
            WHERE post_snowflake = $1
            RETURNING post_snowflake, group_snowflake, content, image_ref, user_snowflake
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(update.text.as_ref().map(PostText::get))
        .bind(update.group.is_some())
        .bind(
            update
                .group
                .flatten()
                .map(|group| group.snowflake().get().cast_signed()),
        )
        .bind(update.image.is_some())
        .bind(
            update
                .image
                .as_ref()
                .and_then(|image| image.as_ref())
                .map(ImageRef::get),
        )
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(PartialPost::try_from).transpose()?;
        Ok(post)
    }

    /// Removes the post; its comments go with it via the storage cascade.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let affected = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    pub async fn list_posts(&self, limit: i64, offset: i64) -> Result<(Vec<Post>, u64)> {
        self.post_page(
            "SELECT COUNT(*) FROM posts.posts",
            "
            SELECT
                posts.post_snowflake,
                posts.group_snowflake,
                posts.content,
                posts.image_ref,
                users.user_snowflake,
                users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            ORDER BY posts.post_snowflake DESC
            LIMIT $1 OFFSET $2
            ",
            None,
            limit,
            offset,
        )
        .await
    }

    pub async fn list_posts_by_author(
        &self,
        author: Id<UserMarker>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, u64)> {
        self.post_page(
            "SELECT COUNT(*) FROM posts.posts WHERE user_snowflake = $1",
            "
            SELECT
                posts.post_snowflake,
                posts.group_snowflake,
                posts.content,
                posts.image_ref,
                users.user_snowflake,
                users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.user_snowflake = $1
            ORDER BY posts.post_snowflake DESC
            LIMIT $2 OFFSET $3
            ",
            Some(author.snowflake().get().cast_signed()),
            limit,
            offset,
        )
        .await
    }

    pub async fn list_posts_by_group(
        &self,
        group: Id<GroupMarker>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, u64)> {
        self.post_page(
            "SELECT COUNT(*) FROM posts.posts WHERE group_snowflake = $1",
            "
            SELECT
                posts.post_snowflake,
                posts.group_snowflake,
                posts.content,
                posts.image_ref,
                users.user_snowflake,
                users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.group_snowflake = $1
            ORDER BY posts.post_snowflake DESC
            LIMIT $2 OFFSET $3
            ",
            Some(group.snowflake().get().cast_signed()),
            limit,
            offset,
        )
        .await
    }

    /// Posts authored by anyone the follower follows, newest first. The set
    /// is resolved fresh on every call; a post is in the page iff its author
    /// is followed at query time.
    pub async fn list_feed_posts(
        &self,
        follower: Id<UserMarker>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, u64)> {
        self.post_page(
            "
            SELECT COUNT(*) FROM posts.posts
            WHERE user_snowflake IN (
                SELECT followed_snowflake FROM users.follows WHERE follower_snowflake = $1
            )
            ",
            "
            SELECT
                posts.post_snowflake,
                posts.group_snowflake,
                posts.content,
                posts.image_ref,
                users.user_snowflake,
                users.handle
            FROM posts.posts
            JOIN users.users USING (user_snowflake)
            WHERE posts.user_snowflake IN (
                SELECT followed_snowflake FROM users.follows WHERE follower_snowflake = $1
            )
            ORDER BY posts.post_snowflake DESC
            LIMIT $2 OFFSET $3
            ",
            Some(follower.snowflake().get().cast_signed()),
            limit,
            offset,
        )
        .await
    }

    async fn post_page(
        &self,
        count_sql: &'static str,
        page_sql: &'static str,
        key: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, u64)> {
        let mut count_query = query_scalar::<_, i64>(count_sql);
        if let Some(key) = key {
            count_query = count_query.bind(key);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let mut page_query = query_as::<_, FullPostRecord>(page_sql);
        if let Some(key) = key {
            page_query = page_query.bind(key);
        }
        let records = page_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((convert_rows(records)?, total.cast_unsigned()))
    }

    pub async fn fetch_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, FullCommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                users.user_snowflake,
                users.handle
            FROM posts.comments
            JOIN users.users USING (user_snowflake)
            WHERE comments.post_snowflake = $1 AND comments.comment_snowflake = $2
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(comment_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        comment: &CreateComment,
    ) -> Result<PartialComment> {
        let comment_snowflake = self.next_snowflake();

        let record = query_as::<_, CommentRecord>(
            "
            INSERT INTO posts.comments
                (comment_snowflake, post_snowflake, user_snowflake, content)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_snowflake, post_snowflake, content, user_snowflake
            ",
        )
        .bind(comment_snowflake.get().cast_signed())
        .bind(post_id.snowflake().get().cast_signed())
        .bind(author.snowflake().get().cast_signed())
        .bind(comment.text.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(PartialComment::try_from(record)?)
    }

    pub async fn update_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        update: &UpdateComment,
    ) -> Result<Option<PartialComment>> {
        let record = query_as::<_, CommentRecord>(
            "
            UPDATE posts.comments SET content = COALESCE($3, content)
            WHERE post_snowflake = $1 AND comment_snowflake = $2
            RETURNING comment_snowflake, post_snowflake, content, user_snowflake
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(comment_id.snowflake().get().cast_signed())
        .bind(update.text.as_ref().map(CommentText::get))
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(PartialComment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<bool> {
        let affected = query(
            "DELETE FROM posts.comments WHERE post_snowflake = $1 AND comment_snowflake = $2",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(comment_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    pub async fn list_comments(
        &self,
        post_id: Id<PostMarker>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Comment>, u64)> {
        let total: i64 =
            query_scalar("SELECT COUNT(*) FROM posts.comments WHERE post_snowflake = $1")
                .bind(post_id.snowflake().get().cast_signed())
                .fetch_one(&self.pool)
                .await?;

        let records = query_as::<_, FullCommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.content,
                users.user_snowflake,
                users.handle
            FROM posts.comments
            JOIN users.users USING (user_snowflake)
            WHERE comments.post_snowflake = $1
            ORDER BY comments.comment_snowflake DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((convert_rows(records)?, total.cast_unsigned()))
    }

    /// Inserts a follow edge. Returns `None` when the edge already exists;
    /// the composite key decides the winner between racing requests.
    pub async fn create_follow(
        &self,
        follower: Id<UserMarker>,
        followed: Id<UserMarker>,
    ) -> Result<Option<Follow>> {
        let record = query_as::<_, FollowRecord>(
            "
            INSERT INTO users.follows (follower_snowflake, followed_snowflake)
            VALUES ($1, $2)
            ON CONFLICT (follower_snowflake, followed_snowflake) DO NOTHING
            RETURNING follower_snowflake, followed_snowflake, created_at
            ",
        )
        .bind(follower.snowflake().get().cast_signed())
        .bind(followed.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Follow::from))
    }

    pub async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        followed: Id<UserMarker>,
    ) -> Result<bool> {
        let affected = query(
            "DELETE FROM users.follows WHERE follower_snowflake = $1 AND followed_snowflake = $2",
        )
        .bind(follower.snowflake().get().cast_signed())
        .bind(followed.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    pub async fn list_follows(
        &self,
        follower: Id<UserMarker>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Follow>, u64)> {
        let total: i64 =
            query_scalar("SELECT COUNT(*) FROM users.follows WHERE follower_snowflake = $1")
                .bind(follower.snowflake().get().cast_signed())
                .fetch_one(&self.pool)
                .await?;

        let records = query_as::<_, FollowRecord>(
            "
            SELECT follower_snowflake, followed_snowflake, created_at
            FROM users.follows
            WHERE follower_snowflake = $1
            ORDER BY created_at DESC, followed_snowflake DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(follower.snowflake().get().cast_signed())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let follows = records.into_iter().map(Follow::from).collect();
        Ok((follows, total.cast_unsigned()))
    }
}
