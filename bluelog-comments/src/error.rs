use bluelog_common::model::{
    Id, ModelValidationError, comment::CommentMarker, post::PostMarker,
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type Result<T, E = CommentError> = std::result::Result<T, E>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("{0} was not found.")]
    NotFound(Missing),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("Comment storage failed: {0}")]
    Storage(#[source] BoxError),
}

impl CommentError {
    pub fn storage(err: impl Into<BoxError>) -> Self {
        Self::Storage(err.into())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Missing {
    Post(Id<PostMarker>),
    Comment(Id<CommentMarker>),
}

impl Display for Missing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Post(id) => write!(f, "Post with id {id}"),
            Missing::Comment(id) => write!(f, "Comment with id {id}"),
        }
    }
}

impl From<Missing> for CommentError {
    fn from(value: Missing) -> Self {
        Self::NotFound(value)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ValidationError {
    #[error("Comments are disabled for post {0}.")]
    CommentsDisabled(Id<PostMarker>),
    #[error(transparent)]
    Field(#[from] ModelValidationError),
}

impl From<ModelValidationError> for CommentError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value.into())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum IntegrityError {
    #[error("Comment {replied} belongs to post {replied_post}, not post {post}.")]
    CrossPostReply {
        post: Id<PostMarker>,
        replied: Id<CommentMarker>,
        replied_post: Id<PostMarker>,
    },
}
