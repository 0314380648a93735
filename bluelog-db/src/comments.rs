use crate::{
    client::{DbClient, DbError, POST_COLUMNS, Result, limit_offset},
    record::{CommentRecord, PostRecord},
};
use bluelog_comments::{IntegrityError, Missing, ValidationError, store::CommentStore};
use bluelog_common::model::{
    Id,
    admin::Admin,
    comment::{Comment, CommentFilter, CommentMarker, CreateComment},
    page::{Page, PageRequest},
    post::{Post, PostMarker},
};
use sqlx::{query, query_as, query_scalar};
use tracing::debug;

const COMMENT_COLUMNS: &str =
    "comment_id, post_id, author, email, body, created_at, from_admin, read, replied_id";

fn filter_condition(filter: CommentFilter) -> &'static str {
    match filter {
        CommentFilter::Unread => "NOT read",
        CommentFilter::Admin => "from_admin",
        CommentFilter::All => "TRUE",
    }
}

fn into_comments(records: Vec<CommentRecord>) -> Result<Vec<Comment>> {
    let comments = records
        .into_iter()
        .map(Comment::try_from)
        .collect::<Result<_, _>>()?;
    Ok(comments)
}

impl DbClient {
    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM blog.posts WHERE post_id = $1"
        ))
        .bind(post_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM blog.comments WHERE comment_id = $1"
        ))
        .bind(comment_id.as_db())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    async fn insert_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let mut tx = self.begin().await?;

        // Row locks keep the post and the reply target in place until the insert commits.
        let can_comment = query_scalar::<_, bool>(
            "SELECT can_comment FROM blog.posts WHERE post_id = $1 FOR SHARE",
        )
        .bind(comment.post.as_db())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::Comment(Missing::Post(comment.post).into()))?;
        if !can_comment {
            return Err(DbError::Comment(
                ValidationError::CommentsDisabled(comment.post).into(),
            ));
        }

        if let Some(replied) = comment.replied {
            let replied_post = query_scalar::<_, i64>(
                "SELECT post_id FROM blog.comments WHERE comment_id = $1 FOR SHARE",
            )
            .bind(replied.as_db())
            .fetch_optional(&mut *tx)
            .await?
            .map(Id::<PostMarker>::from_db)
            .ok_or(DbError::Comment(Missing::Comment(replied).into()))?;

            if replied_post != comment.post {
                return Err(DbError::Comment(
                    IntegrityError::CrossPostReply {
                        post: comment.post,
                        replied,
                        replied_post,
                    }
                    .into(),
                ));
            }
        }

        let record = query_as::<_, CommentRecord>(&format!(
            "
            INSERT INTO blog.comments (post_id, author, email, body, from_admin, read, replied_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMMENT_COLUMNS}
            "
        ))
        .bind(comment.post.as_db())
        .bind(comment.author.get())
        .bind(comment.email.get())
        .bind(comment.body.get())
        .bind(comment.from_admin)
        .bind(comment.read)
        .bind(comment.replied.map(Id::as_db))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(record.try_into()?)
    }

    async fn remove_comment(&self, comment_id: Id<CommentMarker>) -> Result<()> {
        let mut tx = self.begin().await?;

        let detached = query("UPDATE blog.comments SET replied_id = NULL WHERE replied_id = $1")
            .bind(comment_id.as_db())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = query("DELETE FROM blog.comments WHERE comment_id = $1")
            .bind(comment_id.as_db())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DbError::Comment(Missing::Comment(comment_id).into()));
        }
        tx.commit().await?;

        debug!(%comment_id, detached, "Removed comment");
        Ok(())
    }

    async fn select_post_comments(
        &self,
        post_id: Id<PostMarker>,
        page: PageRequest,
    ) -> Result<Page<Comment>> {
        let (limit, offset) = limit_offset(page);
        let records = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM blog.comments
            WHERE post_id = $1
            ORDER BY created_at DESC, comment_id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(post_id.as_db())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = query_scalar::<_, i64>("SELECT COUNT(*) FROM blog.comments WHERE post_id = $1")
            .bind(post_id.as_db())
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(into_comments(records)?, page, total.cast_unsigned()))
    }

    async fn select_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<Page<Comment>> {
        let condition = filter_condition(filter);
        let (limit, offset) = limit_offset(page);
        let records = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM blog.comments
            WHERE {condition}
            ORDER BY created_at DESC, comment_id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total = query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM blog.comments WHERE {condition}"
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(into_comments(records)?, page, total.cast_unsigned()))
    }

    async fn set_read(&self, comment_id: Id<CommentMarker>) -> Result<()> {
        let updated = query("UPDATE blog.comments SET read = TRUE WHERE comment_id = $1")
            .bind(comment_id.as_db())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(DbError::Comment(Missing::Comment(comment_id).into()));
        }

        Ok(())
    }

    async fn set_all_read(&self) -> Result<u64> {
        let updated = query("UPDATE blog.comments SET read = TRUE WHERE NOT read")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated)
    }

    async fn unread(&self) -> Result<u64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM blog.comments WHERE NOT read")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.cast_unsigned())
    }
}

impl CommentStore for DbClient {
    async fn fetch_admin(&self) -> bluelog_comments::Result<Option<Admin>> {
        Ok(self.fetch_blog_admin().await?)
    }

    async fn fetch_post(&self, post: Id<PostMarker>) -> bluelog_comments::Result<Option<Post>> {
        Ok(DbClient::fetch_post(self, post).await?)
    }

    async fn fetch_comment(
        &self,
        comment: Id<CommentMarker>,
    ) -> bluelog_comments::Result<Option<Comment>> {
        Ok(DbClient::fetch_comment(self, comment).await?)
    }

    async fn create_comment(&self, comment: &CreateComment) -> bluelog_comments::Result<Comment> {
        Ok(self.insert_comment(comment).await?)
    }

    async fn delete_comment(&self, comment: Id<CommentMarker>) -> bluelog_comments::Result<()> {
        Ok(self.remove_comment(comment).await?)
    }

    async fn fetch_post_comments(
        &self,
        post: Id<PostMarker>,
        page: PageRequest,
    ) -> bluelog_comments::Result<Page<Comment>> {
        Ok(self.select_post_comments(post, page).await?)
    }

    async fn fetch_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> bluelog_comments::Result<Page<Comment>> {
        Ok(self.select_comments(filter, page).await?)
    }

    async fn mark_read(&self, comment: Id<CommentMarker>) -> bluelog_comments::Result<()> {
        Ok(self.set_read(comment).await?)
    }

    async fn mark_all_read(&self) -> bluelog_comments::Result<u64> {
        Ok(self.set_all_read().await?)
    }

    async fn count_unread(&self) -> bluelog_comments::Result<u64> {
        Ok(self.unread().await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{DbClient, DbError},
        comments::{COMMENT_COLUMNS, filter_condition},
    };
    use bluelog_comments::{
        CommentError, IntegrityError, Missing, ValidationError, store::CommentStore,
    };
    use bluelog_common::model::{
        Id,
        category::DEFAULT_CATEGORY,
        comment::{
            AuthorName, CommentBody, CommentFilter, CommentMarker, CreateComment, EmailAddress,
        },
        page::PageRequest,
        post::{Post, PostContent, PostMarker},
    };
    use sqlx::PgPool;

    async fn post(db: &DbClient, title: &str) -> Post {
        let content =
            PostContent::new(title.to_owned(), format!("Body of {title}"), DEFAULT_CATEGORY)
                .unwrap();
        db.create_post(&content).await.unwrap()
    }

    fn comment(
        post: Id<PostMarker>,
        from_admin: bool,
        replied: Option<Id<CommentMarker>>,
    ) -> CreateComment {
        let (author, email) = if from_admin {
            ("Grey", "owner@example.com")
        } else {
            ("Zhang", "z@x.com")
        };

        CreateComment {
            post,
            author: AuthorName::new(author.to_owned()).unwrap(),
            email: EmailAddress::new(email.to_owned()).unwrap(),
            body: CommentBody::new("nice post".to_owned()).unwrap(),
            from_admin,
            read: from_admin,
            replied,
        }
    }

    #[test]
    fn filter_conditions() {
        assert_eq!(filter_condition(CommentFilter::Unread), "NOT read");
        assert_eq!(filter_condition(CommentFilter::Admin), "from_admin");
        assert_eq!(filter_condition(CommentFilter::All), "TRUE");
    }

    #[test]
    fn comment_columns_match_record() {
        assert_eq!(COMMENT_COLUMNS.split(", ").count(), 9);
    }

    #[test]
    fn comment_errors_survive_the_round_trip() {
        let err = DbError::Comment(Missing::Comment(Id::new(3)).into());
        assert!(matches!(
            CommentError::from(err),
            CommentError::NotFound(Missing::Comment(id)) if id == Id::new(3)
        ));

        let err = DbError::DefaultCategoryProtected;
        assert!(matches!(CommentError::from(err), CommentError::Storage(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn created_comment_round_trips(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;

        let created = db.create_comment(&comment(post.id, false, None)).await.unwrap();
        let fetched = db.fetch_comment(created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.author.get(), "Zhang");
        assert!(!fetched.from_admin);
        assert!(!fetched.read);
        assert_eq!(fetched.replied, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn deleting_a_reply_target_keeps_the_reply(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;
        let target = db.create_comment(&comment(post.id, false, None)).await.unwrap();
        let reply = db
            .create_comment(&comment(post.id, true, Some(target.id)))
            .await
            .unwrap();
        assert_eq!(reply.replied, Some(target.id));

        db.delete_comment(target.id).await.unwrap();

        assert_eq!(db.fetch_comment(target.id).await.unwrap(), None);
        let reply = db.fetch_comment(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.replied, None);

        assert!(matches!(
            db.delete_comment(target.id).await,
            Err(CommentError::NotFound(Missing::Comment(id))) if id == target.id
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn deleting_a_post_removes_its_comments(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;
        let created = db.create_comment(&comment(post.id, false, None)).await.unwrap();

        assert!(db.delete_post(post.id).await.unwrap());

        assert_eq!(db.fetch_comment(created.id).await.unwrap(), None);
        assert_eq!(db.count_unread().await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn mark_all_read_empties_the_unread_list(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;
        for from_admin in [false, false, true, false] {
            db.create_comment(&comment(post.id, from_admin, None))
                .await
                .unwrap();
        }
        assert_eq!(db.count_unread().await.unwrap(), 3);

        assert_eq!(db.mark_all_read().await.unwrap(), 3);

        let unread = db
            .fetch_comments(CommentFilter::Unread, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert!(unread.items.is_empty());
        assert_eq!(unread.total, 0);
        assert_eq!(db.count_unread().await.unwrap(), 0);
        assert_eq!(db.mark_all_read().await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn mark_read_flags_one_comment(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;
        let first = db.create_comment(&comment(post.id, false, None)).await.unwrap();
        let second = db.create_comment(&comment(post.id, false, None)).await.unwrap();

        db.mark_read(first.id).await.unwrap();

        assert!(db.fetch_comment(first.id).await.unwrap().unwrap().read);
        assert!(!db.fetch_comment(second.id).await.unwrap().unwrap().read);
        assert!(matches!(
            db.mark_read(Id::new(999)).await,
            Err(CommentError::NotFound(Missing::Comment(_)))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn reply_across_posts_is_an_integrity_error(pool: PgPool) {
        let db = DbClient::new(pool);
        let first = post(&db, "Hello World").await;
        let second = post(&db, "Other").await;
        let elsewhere = db.create_comment(&comment(first.id, false, None)).await.unwrap();

        let cross_post = db
            .create_comment(&comment(second.id, false, Some(elsewhere.id)))
            .await;
        assert!(matches!(
            cross_post,
            Err(CommentError::Integrity(IntegrityError::CrossPostReply {
                post,
                replied,
                replied_post,
            })) if post == second.id && replied == elsewhere.id && replied_post == first.id
        ));

        let missing = db
            .create_comment(&comment(second.id, false, Some(Id::new(999))))
            .await;
        assert!(matches!(
            missing,
            Err(CommentError::NotFound(Missing::Comment(id))) if id == Id::new(999)
        ));

        let listed = db
            .fetch_post_comments(second.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn disabled_post_rejects_comments(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Announcements").await;
        assert_eq!(db.toggle_comments(post.id).await.unwrap(), Some(false));

        let result = db.create_comment(&comment(post.id, true, None)).await;
        assert!(matches!(
            result,
            Err(CommentError::Validation(ValidationError::CommentsDisabled(id))) if id == post.id
        ));

        let missing = db.create_comment(&comment(Id::new(404), false, None)).await;
        assert!(matches!(
            missing,
            Err(CommentError::NotFound(Missing::Post(id))) if id == Id::new(404)
        ));

        let listed = db
            .fetch_post_comments(post.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn admin_filter_pages_through_admin_comments(pool: PgPool) {
        let db = DbClient::new(pool);
        let post = post(&db, "Hello World").await;
        let mut admin_ids = Vec::new();
        for n in 0..10 {
            let from_admin = n % 3 == 0 && n < 9;
            let created = db
                .create_comment(&comment(post.id, from_admin, None))
                .await
                .unwrap();
            if from_admin {
                admin_ids.push(created.id);
            }
        }
        assert_eq!(admin_ids.len(), 3);

        let mut listed = Vec::new();
        for page in 1..=3 {
            let page = db
                .fetch_comments(CommentFilter::Admin, PageRequest::new(page, 2))
                .await
                .unwrap();
            assert_eq!(page.total, 3);
            assert!(page.items.iter().all(|comment| comment.from_admin));
            listed.extend(page.items.into_iter().map(|comment| comment.id));
        }
        admin_ids.reverse();
        assert_eq!(listed, admin_ids);

        let all = db
            .fetch_comments(CommentFilter::All, PageRequest::new(1, 100))
            .await
            .unwrap();
        assert_eq!(all.total, 10);
        assert!(all.items.windows(2).all(|pair| pair[0].id > pair[1].id));

        let unread = db
            .fetch_comments(CommentFilter::Unread, PageRequest::new(1, 100))
            .await
            .unwrap();
        assert_eq!(unread.total, 7);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn post_comments_are_scoped_and_newest_first(pool: PgPool) {
        let db = DbClient::new(pool);
        let first = post(&db, "Hello World").await;
        let second = post(&db, "Other").await;
        let older = db.create_comment(&comment(first.id, false, None)).await.unwrap();
        db.create_comment(&comment(second.id, false, None)).await.unwrap();
        let newer = db.create_comment(&comment(first.id, true, None)).await.unwrap();

        let listed = db
            .fetch_post_comments(first.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 2);
        let ids: Vec<_> = listed.items.iter().map(|comment| comment.id).collect();
        assert_eq!(ids, [newer.id, older.id]);

        let out_of_range = db
            .fetch_post_comments(first.id, PageRequest::new(5, 10))
            .await
            .unwrap();
        assert!(out_of_range.items.is_empty());
        assert_eq!(out_of_range.total, 2);
    }
}
