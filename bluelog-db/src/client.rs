use crate::record::{AdminRecord, AdminSessionRecord, CategoryRecord, PostRecord};
use bluelog_comments::CommentError;
use bluelog_common::{
    model::{
        Id, ModelValidationError,
        admin::{Admin, AdminMarker, AdminProfile, CreateAdmin},
        category::{Category, CategoryMarker, CategoryName, DEFAULT_CATEGORY},
        page::{Page, PageRequest},
        post::{Post, PostContent, PostMarker},
        token::{AdminSession, AdminToken, AdminTokenHash, AdminTokenHashError},
    },
    util::PositiveDuration,
};
use sqlx::{
    PgPool, Postgres, Transaction, migrate::MigrateError, postgres::PgPoolOptions, query,
    query_as, query_scalar,
};
use thiserror::Error;
use tracing::info;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Running migrations failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    TokenHash(#[from] AdminTokenHashError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error("The default category cannot be renamed or deleted")]
    DefaultCategoryProtected,
    #[error("A category named {0:?} already exists")]
    CategoryNameTaken(String),
    #[error("Category with id {0} does not exist")]
    UnknownCategory(Id<CategoryMarker>),
}

impl From<DbError> for CommentError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Comment(err) => err,
            other => CommentError::storage(other),
        }
    }
}

/// Converts a page selection into `LIMIT` and `OFFSET` parameters.
pub(crate) fn limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

fn map_unique_violation(err: sqlx::Error, name: &CategoryName) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::CategoryNameTaken(name.get().to_owned())
        }
        _ => err.into(),
    }
}

fn map_foreign_key_violation(err: sqlx::Error, category: Id<CategoryMarker>) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::UnknownCategory(category)
        }
        _ => err.into(),
    }
}

pub(crate) const POST_COLUMNS: &str = "post_id, title, body, created_at, can_comment, category_id";
const ADMIN_COLUMNS: &str = "admin_id, username, name, email, blog_title, blog_sub_title, about";

#[derive(Debug, Clone)]
pub struct DbClient {
    pub(crate) pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Builds the pool without opening a connection until the first query.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("Database migrations applied");

        Ok(())
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn fetch_admin_by_id(&self, admin_id: Id<AdminMarker>) -> Result<Option<Admin>> {
        let record = query_as::<_, AdminRecord>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM blog.admins WHERE admin_id = $1"
        ))
        .bind(admin_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let admin = record.map(Admin::try_from).transpose()?;
        Ok(admin)
    }

    /// The blog has a single owner: the oldest admin row.
    pub async fn fetch_blog_admin(&self) -> Result<Option<Admin>> {
        let record = query_as::<_, AdminRecord>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM blog.admins ORDER BY admin_id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        let admin = record.map(Admin::try_from).transpose()?;
        Ok(admin)
    }

    pub async fn create_admin(&self, admin: &CreateAdmin) -> Result<Id<AdminMarker>> {
        let admin_id = query_scalar::<_, i64>(
            "
            INSERT INTO blog.admins (username, name, email, blog_title)
            VALUES ($1, $2, $3, $4)
            RETURNING admin_id
            ",
        )
        .bind(&admin.username)
        .bind(admin.name.get())
        .bind(admin.email.get())
        .bind(admin.blog_title())
        .fetch_one(&self.pool)
        .await?;

        Ok(Id::from_db(admin_id))
    }

    /// Replaces the editable profile. Returns `None` if the admin does not exist.
    pub async fn update_admin_profile(
        &self,
        admin_id: Id<AdminMarker>,
        profile: &AdminProfile,
    ) -> Result<Option<Admin>> {
        let record = query_as::<_, AdminRecord>(&format!(
            "
            UPDATE blog.admins
            SET name = $2, email = $3, blog_title = $4, blog_sub_title = $5, about = $6
            WHERE admin_id = $1
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(admin_id.as_db())
        .bind(profile.name.get())
        .bind(profile.email.get())
        .bind(profile.blog_title())
        .bind(profile.blog_sub_title())
        .bind(profile.about())
        .fetch_optional(&self.pool)
        .await?;

        let admin = record.map(Admin::try_from).transpose()?;
        Ok(admin)
    }

    /// Issues a new bearer token. Only its hash is stored.
    pub async fn create_admin_token(
        &self,
        admin_id: Id<AdminMarker>,
        expires_after: Option<PositiveDuration>,
    ) -> Result<AdminToken> {
        let token = AdminToken::generate(admin_id);
        let token_hash = token.hash()?;

        query(
            "
            INSERT INTO blog.admin_tokens (token_hash, admin_id, expires_after_seconds)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&token_hash.0[..])
        .bind(admin_id.as_db())
        .bind(expires_after.map(|duration| duration.whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn fetch_admin_session(
        &self,
        token_hash: &AdminTokenHash,
    ) -> Result<Option<AdminSession>> {
        let record = query_as::<_, AdminSessionRecord>(
            "
            SELECT admin_id, token_hash, created_at, expires_after_seconds
            FROM blog.admin_tokens
            WHERE token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(AdminSession::try_from).transpose()?;
        Ok(session)
    }

    pub async fn fetch_posts(&self, page: PageRequest) -> Result<Page<Post>> {
        let (limit, offset) = limit_offset(page);
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM blog.posts
            ORDER BY created_at DESC, post_id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = query_scalar::<_, i64>("SELECT COUNT(*) FROM blog.posts")
            .fetch_one(&self.pool)
            .await?;

        let posts = records.into_iter().map(Post::from).collect();
        Ok(Page::new(posts, page, total.cast_unsigned()))
    }

    pub async fn fetch_category_posts(
        &self,
        category_id: Id<CategoryMarker>,
        page: PageRequest,
    ) -> Result<Page<Post>> {
        let (limit, offset) = limit_offset(page);
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM blog.posts
            WHERE category_id = $1
            ORDER BY created_at DESC, post_id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(category_id.as_db())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = query_scalar::<_, i64>("SELECT COUNT(*) FROM blog.posts WHERE category_id = $1")
            .bind(category_id.as_db())
            .fetch_one(&self.pool)
            .await?;

        let posts = records.into_iter().map(Post::from).collect();
        Ok(Page::new(posts, page, total.cast_unsigned()))
    }

    pub async fn create_post(&self, post: &PostContent) -> Result<Post> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            INSERT INTO blog.posts (title, body, category_id)
            VALUES ($1, $2, $3)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(post.title())
        .bind(post.body())
        .bind(post.category.as_db())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_foreign_key_violation(err, post.category))?;

        Ok(record.into())
    }

    /// Replaces title, body and category. Comments and `can_comment` are kept.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        post: &PostContent,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            UPDATE blog.posts
            SET title = $2, body = $3, category_id = $4
            WHERE post_id = $1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(post_id.as_db())
        .bind(post.title())
        .bind(post.body())
        .bind(post.category.as_db())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_foreign_key_violation(err, post.category))?;

        Ok(record.map(Post::from))
    }

    /// Flips `can_comment` and returns the new value, or `None` if the post does not exist.
    pub async fn toggle_comments(&self, post_id: Id<PostMarker>) -> Result<Option<bool>> {
        let can_comment = query_scalar::<_, bool>(
            "
            UPDATE blog.posts
            SET can_comment = NOT can_comment
            WHERE post_id = $1
            RETURNING can_comment
            ",
        )
        .bind(post_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(can_comment)
    }

    /// Removes the post together with all of its comments.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM blog.posts WHERE post_id = $1")
            .bind(post_id.as_db())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_category(
        &self,
        category_id: Id<CategoryMarker>,
    ) -> Result<Option<Category>> {
        let record = query_as::<_, CategoryRecord>(
            "SELECT category_id, name FROM blog.categories WHERE category_id = $1",
        )
        .bind(category_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let category = record.map(Category::try_from).transpose()?;
        Ok(category)
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let records = query_as::<_, CategoryRecord>(
            "SELECT category_id, name FROM blog.categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let categories = records
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<_, _>>()?;
        Ok(categories)
    }

    pub async fn create_category(&self, name: &CategoryName) -> Result<Category> {
        let record = query_as::<_, CategoryRecord>(
            "
            INSERT INTO blog.categories (name)
            VALUES ($1)
            RETURNING category_id, name
            ",
        )
        .bind(name.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_unique_violation(err, name))?;

        Ok(record.try_into()?)
    }

    pub async fn rename_category(
        &self,
        category_id: Id<CategoryMarker>,
        name: &CategoryName,
    ) -> Result<Option<Category>> {
        if category_id == DEFAULT_CATEGORY {
            return Err(DbError::DefaultCategoryProtected);
        }

        let record = query_as::<_, CategoryRecord>(
            "
            UPDATE blog.categories
            SET name = $2
            WHERE category_id = $1
            RETURNING category_id, name
            ",
        )
        .bind(category_id.as_db())
        .bind(name.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_unique_violation(err, name))?;

        let category = record.map(Category::try_from).transpose()?;
        Ok(category)
    }

    /// Moves the category's posts to the default category, then deletes it.
    pub async fn delete_category(&self, category_id: Id<CategoryMarker>) -> Result<bool> {
        if category_id == DEFAULT_CATEGORY {
            return Err(DbError::DefaultCategoryProtected);
        }

        let mut tx = self.begin().await?;
        let moved = query("UPDATE blog.posts SET category_id = $2 WHERE category_id = $1")
            .bind(category_id.as_db())
            .bind(DEFAULT_CATEGORY.as_db())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = query("DELETE FROM blog.categories WHERE category_id = $1")
            .bind(category_id.as_db())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }
        tx.commit().await?;

        info!(%category_id, moved, "Category deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{DbClient, DbError};
    use bluelog_common::{
        model::{
            Id,
            admin::{AdminMarker, AdminProfile, CreateAdmin},
            category::{CategoryMarker, CategoryName, DEFAULT_CATEGORY},
            comment::EmailAddress,
            page::PageRequest,
            post::PostContent,
        },
        util::PositiveDuration,
    };
    use sqlx::PgPool;
    use time::Duration;

    fn name(name: &str) -> CategoryName {
        CategoryName::new(name.to_owned()).unwrap()
    }

    fn content(title: &str, category: Id<CategoryMarker>) -> PostContent {
        PostContent::new(title.to_owned(), "Body".to_owned(), category).unwrap()
    }

    async fn create_admin(db: &DbClient) -> Id<AdminMarker> {
        let admin = CreateAdmin::new(
            "grey".to_owned(),
            Some("Grey Li".to_owned()),
            EmailAddress::new("owner@example.com".to_owned()).unwrap(),
        )
        .unwrap();
        db.create_admin(&admin).await.unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn deleting_a_category_moves_its_posts(pool: PgPool) {
        let db = DbClient::new(pool);
        let rust = db.create_category(&name("Rust")).await.unwrap();
        let post = db.create_post(&content("Ownership", rust.id)).await.unwrap();

        assert!(db.delete_category(rust.id).await.unwrap());

        let post = db.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.category, DEFAULT_CATEGORY);
        assert_eq!(db.fetch_category(rust.id).await.unwrap(), None);
        assert!(!db.delete_category(rust.id).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn default_category_is_protected(pool: PgPool) {
        let db = DbClient::new(pool);

        assert!(matches!(
            db.delete_category(DEFAULT_CATEGORY).await,
            Err(DbError::DefaultCategoryProtected)
        ));
        assert!(matches!(
            db.rename_category(DEFAULT_CATEGORY, &name("Misc")).await,
            Err(DbError::DefaultCategoryProtected)
        ));

        let categories = db.fetch_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, DEFAULT_CATEGORY);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn category_names_are_unique(pool: PgPool) {
        let db = DbClient::new(pool);
        let rust = db.create_category(&name("Rust")).await.unwrap();
        let python = db.create_category(&name("Python")).await.unwrap();

        assert!(matches!(
            db.create_category(&name("Rust")).await,
            Err(DbError::CategoryNameTaken(taken)) if taken == "Rust"
        ));
        assert!(matches!(
            db.rename_category(python.id, &name("Rust")).await,
            Err(DbError::CategoryNameTaken(_))
        ));

        let renamed = db.rename_category(rust.id, &name("Rustacean")).await.unwrap();
        assert_eq!(renamed.map(|category| category.name), Some(name("Rustacean")));
        assert_eq!(db.rename_category(Id::new(99), &name("Go")).await.unwrap(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn editing_a_post_keeps_its_comment_switch(pool: PgPool) {
        let db = DbClient::new(pool);
        let rust = db.create_category(&name("Rust")).await.unwrap();
        let post = db.create_post(&content("Draft", DEFAULT_CATEGORY)).await.unwrap();
        db.toggle_comments(post.id).await.unwrap();

        let edited = db
            .update_post(post.id, &content("Ownership", rust.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.id, post.id);
        assert_eq!(edited.title, "Ownership");
        assert_eq!(edited.category, rust.id);
        assert!(!edited.can_comment);
        assert_eq!(edited.timestamp, post.timestamp);

        assert!(matches!(
            db.update_post(post.id, &content("Ownership", Id::new(99))).await,
            Err(DbError::UnknownCategory(id)) if id == Id::new(99)
        ));
        assert!(matches!(
            db.create_post(&content("Lifetimes", Id::new(99))).await,
            Err(DbError::UnknownCategory(_))
        ));
        assert_eq!(
            db.update_post(Id::new(404), &content("Ownership", rust.id))
                .await
                .unwrap(),
            None
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn category_posts_are_filtered_and_paged(pool: PgPool) {
        let db = DbClient::new(pool);
        let rust = db.create_category(&name("Rust")).await.unwrap();
        let first = db.create_post(&content("Ownership", rust.id)).await.unwrap();
        db.create_post(&content("Elsewhere", DEFAULT_CATEGORY)).await.unwrap();
        let second = db.create_post(&content("Lifetimes", rust.id)).await.unwrap();

        let page = db
            .fetch_category_posts(rust.id, PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, second.id);

        let page = db
            .fetch_category_posts(rust.id, PageRequest::new(2, 1))
            .await
            .unwrap();
        assert_eq!(page.items[0].id, first.id);

        let all = db.fetch_posts(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn admin_profile_can_be_edited(pool: PgPool) {
        let db = DbClient::new(pool);
        let admin_id = create_admin(&db).await;

        let admin = db.fetch_blog_admin().await.unwrap().unwrap();
        assert_eq!(admin.id, admin_id);
        assert_eq!(admin.name.get(), "Grey Li");
        assert_eq!(admin.blog_title, "Grey Li's Blog");
        assert_eq!(admin.blog_sub_title, "");

        let profile = AdminProfile::new(
            admin.name,
            EmailAddress::new("grey@example.com".to_owned()).unwrap(),
            "Bluelog".to_owned(),
            "No, I'm the real thing.".to_owned(),
            "Hello.".to_owned(),
        )
        .unwrap();
        let updated = db
            .update_admin_profile(admin_id, &profile)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.email.get(), "grey@example.com");
        assert_eq!(updated.blog_title, "Bluelog");
        assert_eq!(updated.about, "Hello.");
        assert_eq!(db.fetch_admin_by_id(admin_id).await.unwrap(), Some(updated));

        assert_eq!(
            db.update_admin_profile(Id::new(99), &profile).await.unwrap(),
            None
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn tokens_are_found_by_hash(pool: PgPool) {
        let db = DbClient::new(pool);
        let admin_id = create_admin(&db).await;
        let lifetime = PositiveDuration::new(Duration::hours(1)).unwrap();

        let token = db.create_admin_token(admin_id, Some(lifetime)).await.unwrap();
        let session = db
            .fetch_admin_session(&token.hash().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.admin, admin_id);
        assert_eq!(session.expires_after, Some(lifetime));

        let stranger = db.create_admin_token(admin_id, None).await.unwrap();
        assert!(stranger.hash().unwrap() != token.hash().unwrap());
    }
}
