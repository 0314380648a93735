//! JSON shapes returned by the routes.

use bluelog_comments::submission::ReplyTarget;
use bluelog_common::model::{
    Id,
    admin::Admin,
    category::CategoryMarker,
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
};
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostView {
    pub id: Id<PostMarker>,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub can_comment: bool,
    pub category: Id<CategoryMarker>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.body,
            timestamp: post.timestamp.into(),
            can_comment: post.can_comment,
            category: post.category,
        }
    }
}

/// What visitors see of a comment. The author's email stays private.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CommentView {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub from_admin: bool,
    pub replied: Option<Id<CommentMarker>>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post: comment.post,
            author: comment.author.into_inner(),
            body: comment.body.into_inner(),
            timestamp: comment.timestamp.into(),
            from_admin: comment.from_admin,
            replied: comment.replied,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ModerationCommentView {
    #[serde(flatten)]
    pub comment: CommentView,
    pub email: String,
    pub read: bool,
}

impl From<Comment> for ModerationCommentView {
    fn from(comment: Comment) -> Self {
        let email = comment.email.get().to_owned();
        let read = comment.read;

        Self {
            comment: comment.into(),
            email,
            read,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ReplyTargetView {
    pub post: Id<PostMarker>,
    pub comment: Id<CommentMarker>,
    pub author: String,
}

impl From<ReplyTarget> for ReplyTargetView {
    fn from(target: ReplyTarget) -> Self {
        Self {
            post: target.post,
            comment: target.comment,
            author: target.author.into_inner(),
        }
    }
}

/// The public face of the admin profile. Username and email stay private.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AboutView {
    pub name: String,
    pub blog_title: String,
    pub blog_sub_title: String,
    pub about: String,
}

impl From<Admin> for AboutView {
    fn from(admin: Admin) -> Self {
        Self {
            name: admin.name.into_inner(),
            blog_title: admin.blog_title,
            blog_sub_title: admin.blog_sub_title,
            about: admin.about,
        }
    }
}
