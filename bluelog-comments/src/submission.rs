use crate::{
    error::{CommentError, Missing, Result, ValidationError},
    notify::Notifications,
    store::CommentStore,
};
use bluelog_common::model::{
    Id, ModelValidationError,
    admin::Admin,
    comment::{AuthorName, Comment, CommentBody, CommentMarker, CreateComment, EmailAddress},
    post::{Post, PostMarker},
};
use tracing::{info, warn};

/// Who is submitting a comment. Resolved by the caller from the request.
#[derive(Copy, Clone, Debug)]
pub enum Caller<'a> {
    Visitor,
    Admin(&'a Admin),
}

/// Raw form input. Author and email are ignored for admin callers.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CommentForm {
    pub author: String,
    pub email: String,
    pub body: String,
}

/// What a reply form needs to know about the comment being answered.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ReplyTarget {
    pub post: Id<PostMarker>,
    pub comment: Id<CommentMarker>,
    pub author: AuthorName,
}

pub struct CommentSubmission<'a, S> {
    store: &'a S,
    notifications: &'a Notifications,
}

fn field<T>(value: Result<T, impl Into<ModelValidationError>>) -> Result<T> {
    value.map_err(|err| CommentError::from(Into::<ModelValidationError>::into(err)))
}

impl<'a, S: CommentStore> CommentSubmission<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, notifications: &'a Notifications) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Validates and stores a comment, then queues its notifications.
    ///
    /// Admin comments are signed with the admin profile and start out read.
    /// Visitor comments start out unread and are announced to the admin. A
    /// reply additionally notifies the author of the answered comment.
    pub async fn submit(
        &self,
        caller: Caller<'_>,
        post: Id<PostMarker>,
        form: CommentForm,
        reply_to: Option<Id<CommentMarker>>,
    ) -> Result<Comment> {
        let post = self
            .store
            .fetch_post(post)
            .await?
            .ok_or(Missing::Post(post))?;
        if !post.can_comment {
            return Err(ValidationError::CommentsDisabled(post.id).into());
        }

        let (author, email, from_admin) = match caller {
            Caller::Admin(admin) => (
                admin.name.clone(),
                admin.email.clone(),
                true,
            ),
            Caller::Visitor => (
                field(AuthorName::new(form.author))?,
                field(EmailAddress::new(form.email))?,
                false,
            ),
        };
        let body = field(CommentBody::new(form.body))?;

        let replied = match reply_to {
            Some(reply_to) => Some(
                self.store
                    .fetch_comment(reply_to)
                    .await?
                    .filter(|target| target.post == post.id)
                    .ok_or(Missing::Comment(reply_to))?,
            ),
            None => None,
        };

        let comment = self
            .store
            .create_comment(&CreateComment {
                post: post.id,
                author,
                email,
                body,
                from_admin,
                read: from_admin,
                replied: replied.as_ref().map(|target| target.id),
            })
            .await?;
        info!(
            comment = %comment.id,
            post = %post.id,
            from_admin,
            replied = ?comment.replied.map(Id::get),
            "Comment created"
        );

        if let Some(replied) = &replied {
            self.notifications.new_reply(&post, replied);
        }
        if !from_admin {
            self.notify_admin(&post).await;
        }

        Ok(comment)
    }

    /// Looks up the comment a reply form answers.
    pub async fn reply_target(&self, comment: Id<CommentMarker>) -> Result<ReplyTarget> {
        let target = self
            .store
            .fetch_comment(comment)
            .await?
            .ok_or(Missing::Comment(comment))?;
        let post = self
            .store
            .fetch_post(target.post)
            .await?
            .ok_or(Missing::Post(target.post))?;
        if !post.can_comment {
            return Err(ValidationError::CommentsDisabled(post.id).into());
        }

        Ok(ReplyTarget {
            post: post.id,
            comment: target.id,
            author: target.author,
        })
    }

    async fn notify_admin(&self, post: &Post) {
        match self.store.fetch_admin().await {
            Ok(Some(admin)) => self.notifications.new_comment(post, admin.email),
            Ok(None) => warn!(
                post = %post.id,
                "No admin configured, skipping comment notification"
            ),
            Err(err) => warn!(
                error = %err,
                post = %post.id,
                "Admin lookup failed, skipping comment notification"
            ),
        }
    }
}
