//! In-process [`CommentStore`] and mail outbox for tests.

use crate::{
    error::{IntegrityError, Missing, Result, ValidationError},
    notify::{Mail, MailError, MailTransport},
    store::CommentStore,
};
use bluelog_common::model::{
    Id,
    admin::{Admin, CreateAdmin},
    category::DEFAULT_CATEGORY,
    comment::{Comment, CommentFilter, CommentMarker, CreateComment},
    page::{Page, PageRequest},
    post::{Post, PostMarker},
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use time::{Duration, UtcDateTime, macros::utc_datetime};
use tokio::sync::mpsc;

/// Timestamps come from a logical clock that advances one second per write,
/// which keeps newest-first ordering deterministic.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    admin: Option<Admin>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
    last_post_id: u64,
    last_comment_id: u64,
    clock: UtcDateTime,
}

impl State {
    fn tick(&mut self) -> UtcDateTime {
        self.clock += Duration::seconds(1);
        self.clock
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                admin: None,
                posts: BTreeMap::new(),
                comments: BTreeMap::new(),
                last_post_id: 0,
                last_comment_id: 0,
                clock: utc_datetime!(2025-01-01 00:00),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_admin(&self, admin: CreateAdmin) -> Admin {
        let admin = Admin {
            id: Id::new(1),
            blog_title: admin.blog_title(),
            username: admin.username,
            name: admin.name,
            email: admin.email,
            blog_sub_title: String::new(),
            about: String::new(),
        };
        self.state().admin = Some(admin.clone());
        admin
    }

    pub fn insert_post(&self, title: &str, can_comment: bool) -> Post {
        let mut state = self.state();
        state.last_post_id += 1;
        let post = Post {
            id: Id::new(state.last_post_id),
            title: title.to_owned(),
            body: format!("Body of {title}"),
            timestamp: state.tick(),
            can_comment,
            category: DEFAULT_CATEGORY,
        };
        state.posts.insert(post.id, post.clone());
        post
    }

    pub fn set_can_comment(&self, post: Id<PostMarker>, can_comment: bool) {
        if let Some(post) = self.state().posts.get_mut(&post) {
            post.can_comment = can_comment;
        }
    }

    #[must_use]
    pub fn comment_count(&self, post: Id<PostMarker>) -> usize {
        self.state()
            .comments
            .values()
            .filter(|comment| comment.post == post)
            .count()
    }

    fn paginate(&self, page: PageRequest, keep: impl Fn(&Comment) -> bool) -> Page<Comment> {
        let mut selected: Vec<Comment> = self
            .state()
            .comments
            .values()
            .filter(|comment| keep(comment))
            .cloned()
            .collect();
        selected.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));

        let total = selected.len() as u64;
        let items = selected
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();

        Page::new(items, page, total)
    }
}

impl CommentStore for MemoryStore {
    async fn fetch_admin(&self) -> Result<Option<Admin>> {
        Ok(self.state().admin.clone())
    }

    async fn fetch_post(&self, post: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state().posts.get(&post).cloned())
    }

    async fn fetch_comment(&self, comment: Id<CommentMarker>) -> Result<Option<Comment>> {
        Ok(self.state().comments.get(&comment).cloned())
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let mut state = self.state();

        let post = state
            .posts
            .get(&comment.post)
            .ok_or(Missing::Post(comment.post))?;
        if !post.can_comment {
            return Err(ValidationError::CommentsDisabled(post.id).into());
        }
        if let Some(replied) = comment.replied {
            let target = state
                .comments
                .get(&replied)
                .ok_or(Missing::Comment(replied))?;
            if target.post != comment.post {
                return Err(IntegrityError::CrossPostReply {
                    post: comment.post,
                    replied,
                    replied_post: target.post,
                }
                .into());
            }
        }

        state.last_comment_id += 1;
        let created = Comment {
            id: Id::new(state.last_comment_id),
            post: comment.post,
            author: comment.author.clone(),
            email: comment.email.clone(),
            body: comment.body.clone(),
            timestamp: state.tick(),
            from_admin: comment.from_admin,
            read: comment.read,
            replied: comment.replied,
        };
        state.comments.insert(created.id, created.clone());

        Ok(created)
    }

    async fn delete_comment(&self, comment: Id<CommentMarker>) -> Result<()> {
        let mut state = self.state();
        if state.comments.remove(&comment).is_none() {
            return Err(Missing::Comment(comment).into());
        }
        for reply in state.comments.values_mut() {
            if reply.replied == Some(comment) {
                reply.replied = None;
            }
        }

        Ok(())
    }

    async fn fetch_post_comments(
        &self,
        post: Id<PostMarker>,
        page: PageRequest,
    ) -> Result<Page<Comment>> {
        Ok(self.paginate(page, |comment| comment.post == post))
    }

    async fn fetch_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<Page<Comment>> {
        Ok(self.paginate(page, |comment| filter.matches(comment)))
    }

    async fn mark_read(&self, comment: Id<CommentMarker>) -> Result<()> {
        self.state()
            .comments
            .get_mut(&comment)
            .map(|comment| comment.read = true)
            .ok_or_else(|| Missing::Comment(comment).into())
    }

    async fn mark_all_read(&self) -> Result<u64> {
        let mut state = self.state();
        let mut changed = 0;
        for comment in state.comments.values_mut().filter(|comment| !comment.read) {
            comment.read = true;
            changed += 1;
        }

        Ok(changed)
    }

    async fn count_unread(&self) -> Result<u64> {
        Ok(self
            .state()
            .comments
            .values()
            .filter(|comment| !comment.read)
            .count() as u64)
    }
}

/// Forwards every attempted mail to a channel, optionally failing the send afterwards.
#[derive(Debug)]
pub struct RecordingTransport {
    outbox: mpsc::UnboundedSender<Mail>,
    fail: bool,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Mail>) {
        Self::with_failure(false)
    }

    #[must_use]
    pub fn failing() -> (Self, mpsc::UnboundedReceiver<Mail>) {
        Self::with_failure(true)
    }

    fn with_failure(fail: bool) -> (Self, mpsc::UnboundedReceiver<Mail>) {
        let (outbox, receiver) = mpsc::unbounded_channel();
        (Self { outbox, fail }, receiver)
    }
}

impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        let _ = self.outbox.send(mail.clone());
        if self.fail {
            return Err(MailError::new("connection refused"));
        }

        Ok(())
    }
}
