use crate::{error::Result, store::CommentStore};
use bluelog_common::model::{
    Id,
    comment::{Comment, CommentFilter, CommentMarker},
    page::{Page, PageRequest},
};
use tracing::{debug, info};

/// Admin review of the blog's comments.
#[derive(Debug)]
pub struct Moderation<'a, S> {
    store: &'a S,
}

impl<'a, S: CommentStore> Moderation<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All comments of the blog matching `filter`, newest first.
    pub async fn list(&self, filter: CommentFilter, page: PageRequest) -> Result<Page<Comment>> {
        let comments = self.store.fetch_comments(filter, page).await?;
        debug!(
            ?filter,
            page = page.page(),
            total = comments.total,
            "Listed comments for moderation"
        );

        Ok(comments)
    }

    /// Marking an already read comment again is not an error.
    pub async fn mark_read(&self, comment: Id<CommentMarker>) -> Result<()> {
        self.store.mark_read(comment).await?;
        info!(%comment, "Comment marked as read");

        Ok(())
    }

    /// Either every unread comment becomes read or none does.
    pub async fn mark_all_read(&self) -> Result<u64> {
        let changed = self.store.mark_all_read().await?;
        info!(changed, "Marked all comments as read");

        Ok(changed)
    }

    /// Replies to the deleted comment are kept and lose their reply reference.
    pub async fn delete(&self, comment: Id<CommentMarker>) -> Result<()> {
        self.store.delete_comment(comment).await?;
        info!(%comment, "Comment deleted");

        Ok(())
    }

    pub async fn unread_count(&self) -> Result<u64> {
        self.store.count_unread().await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{CommentError, Missing},
        memory::MemoryStore,
        moderation::Moderation,
        store::CommentStore,
    };
    use bluelog_common::model::{
        Id,
        comment::{AuthorName, CommentBody, CommentFilter, CreateComment, EmailAddress},
        page::PageRequest,
        post::PostMarker,
    };

    fn comment(post: Id<PostMarker>, from_admin: bool, replied: Option<u64>) -> CreateComment {
        CreateComment {
            post,
            author: AuthorName::new(if from_admin { "Grey" } else { "Zhang" }.to_owned()).unwrap(),
            email: EmailAddress::new("z@x.com".to_owned()).unwrap(),
            body: CommentBody::new("nice post".to_owned()).unwrap(),
            from_admin,
            read: from_admin,
            replied: replied.map(Id::new),
        }
    }

    async fn populated(admin: usize, visitor: usize) -> MemoryStore {
        let store = MemoryStore::new();
        let post = store.insert_post("Post", true);
        for index in 0..admin + visitor {
            store
                .create_comment(&comment(post.id, index < admin, None))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn admin_filter_spans_pages() {
        let store = populated(3, 7).await;
        let moderation = Moderation::new(&store);

        let mut seen = Vec::new();
        for page in 1..=3 {
            let listed = moderation
                .list(CommentFilter::Admin, PageRequest::new(page, 2))
                .await
                .unwrap();
            assert_eq!(listed.total, 3);
            assert_eq!(listed.pages(), 2);
            seen.extend(listed.items);
        }

        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|comment| comment.from_admin));
    }

    #[tokio::test]
    async fn unread_and_all_filters() {
        let store = populated(3, 7).await;
        let moderation = Moderation::new(&store);

        let unread = moderation
            .list(CommentFilter::Unread, PageRequest::new(1, 50))
            .await
            .unwrap();
        assert_eq!(unread.total, 7);
        assert!(unread.items.iter().all(|comment| !comment.read));

        let all = moderation
            .list(CommentFilter::All, PageRequest::new(1, 4))
            .await
            .unwrap();
        assert_eq!(all.total, 10);
        let ids: Vec<u64> = all.items.iter().map(|comment| comment.id.get()).collect();
        assert_eq!(ids, [10, 9, 8, 7]);
    }

    #[tokio::test]
    async fn all_filter_spans_posts() {
        let store = MemoryStore::new();
        let first = store.insert_post("First", true);
        let second = store.insert_post("Second", true);
        store.create_comment(&comment(first.id, false, None)).await.unwrap();
        store.create_comment(&comment(second.id, false, None)).await.unwrap();

        let all = Moderation::new(&store)
            .list(CommentFilter::All, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn mark_all_read_empties_unread() {
        let store = populated(2, 5).await;
        let moderation = Moderation::new(&store);

        assert_eq!(moderation.unread_count().await.unwrap(), 5);
        assert_eq!(moderation.mark_all_read().await.unwrap(), 5);

        let unread = moderation
            .list(CommentFilter::Unread, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert!(unread.items.is_empty());
        assert_eq!(unread.total, 0);
        assert_eq!(moderation.unread_count().await.unwrap(), 0);

        assert_eq!(moderation.mark_all_read().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let store = populated(0, 2).await;
        let moderation = Moderation::new(&store);

        moderation.mark_read(Id::new(1)).await.unwrap();
        moderation.mark_read(Id::new(1)).await.unwrap();

        assert!(store.fetch_comment(Id::new(1)).await.unwrap().unwrap().read);
        assert!(!store.fetch_comment(Id::new(2)).await.unwrap().unwrap().read);
        assert_eq!(moderation.unread_count().await.unwrap(), 1);

        assert!(matches!(
            moderation.mark_read(Id::new(77)).await,
            Err(CommentError::NotFound(Missing::Comment(_)))
        ));
    }

    #[tokio::test]
    async fn deleting_reply_target_keeps_reply() {
        let store = MemoryStore::new();
        let post = store.insert_post("Post", true);
        let target = store.create_comment(&comment(post.id, false, None)).await.unwrap();
        let reply = store
            .create_comment(&comment(post.id, true, Some(target.id.get())))
            .await
            .unwrap();
        assert_eq!(reply.replied, Some(target.id));

        let moderation = Moderation::new(&store);
        moderation.delete(target.id).await.unwrap();

        assert!(store.fetch_comment(target.id).await.unwrap().is_none());
        let reply = store.fetch_comment(reply.id).await.unwrap().unwrap();
        assert_eq!(reply.replied, None);

        assert!(matches!(
            moderation.delete(target.id).await,
            Err(CommentError::NotFound(Missing::Comment(_)))
        ));
    }
}
