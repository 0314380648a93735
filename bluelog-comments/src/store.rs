use crate::error::Result;
use bluelog_common::model::{
    Id,
    admin::Admin,
    comment::{Comment, CommentFilter, CommentMarker, CreateComment},
    page::{Page, PageRequest},
    post::{Post, PostMarker},
};
use std::future::Future;

/// Persistence port for the comment subsystem.
///
/// Implementations enforce referential integrity themselves: comments need an
/// existing post that accepts comments, a reply target must live on the same
/// post, and deleting a comment clears every `replied` reference to it.
pub trait CommentStore: Send + Sync {
    /// The blog owner, if one has been set up.
    fn fetch_admin(&self) -> impl Future<Output = Result<Option<Admin>>> + Send;

    fn fetch_post(&self, post: Id<PostMarker>) -> impl Future<Output = Result<Option<Post>>> + Send;

    fn fetch_comment(
        &self,
        comment: Id<CommentMarker>,
    ) -> impl Future<Output = Result<Option<Comment>>> + Send;

    /// Checks and insert happen atomically.
    ///
    /// Fails with `NotFound` for a missing post or reply target,
    /// `Validation(CommentsDisabled)` when the post does not accept comments and
    /// `Integrity(CrossPostReply)` when the reply target is on another post.
    fn create_comment(
        &self,
        comment: &CreateComment,
    ) -> impl Future<Output = Result<Comment>> + Send;

    /// Nulls the `replied` reference of every answer, then removes the comment.
    fn delete_comment(&self, comment: Id<CommentMarker>) -> impl Future<Output = Result<()>> + Send;

    /// Newest first.
    fn fetch_post_comments(
        &self,
        post: Id<PostMarker>,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Comment>>> + Send;

    /// Blog-wide listing, newest first.
    fn fetch_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Comment>>> + Send;

    /// Idempotent. Fails with `NotFound` if the comment is absent.
    fn mark_read(&self, comment: Id<CommentMarker>) -> impl Future<Output = Result<()>> + Send;

    /// Flips every unread comment in one transaction and returns how many changed.
    fn mark_all_read(&self) -> impl Future<Output = Result<u64>> + Send;

    fn count_unread(&self) -> impl Future<Output = Result<u64>> + Send;
}
