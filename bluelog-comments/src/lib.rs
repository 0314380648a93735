//! Comment threading and moderation for the blog.
//!
//! Comments are written through [`submission::CommentSubmission`], moderated
//! through [`moderation::Moderation`] and announced by mail through
//! [`notify::NotificationGateway`]. Persistence is reached only through the
//! [`store::CommentStore`] port.

pub mod error;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod moderation;
pub mod notify;
pub mod store;
pub mod submission;

pub use error::{CommentError, IntegrityError, Missing, Result, ValidationError};
