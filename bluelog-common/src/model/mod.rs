pub mod admin;
pub mod category;
pub mod comment;
pub mod page;
pub mod post;
pub mod token;

use crate::{
    model::{
        admin::InvalidAdminProfileError,
        category::InvalidCategoryNameError,
        comment::{InvalidAuthorNameError, InvalidCommentBodyError, InvalidEmailAddressError},
        post::InvalidPostError,
        token::InvalidAdminTokenHashError,
    },
    util::NonPositiveDurationError,
};
use derive_where::derive_where;
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    AuthorName(#[from] InvalidAuthorNameError),
    #[error(transparent)]
    EmailAddress(#[from] InvalidEmailAddressError),
    #[error(transparent)]
    CommentBody(#[from] InvalidCommentBodyError),
    #[error(transparent)]
    CategoryName(#[from] InvalidCategoryNameError),
    #[error(transparent)]
    Post(#[from] InvalidPostError),
    #[error(transparent)]
    AdminProfile(#[from] InvalidAdminProfileError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAdminTokenHashError),
}

/// Database-assigned row id, tagged with the entity it belongs to.
#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// The id as stored in a `BIGINT` column.
    #[must_use]
    pub fn as_db(self) -> i64 {
        self.0.cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        Self::new(value.cast_unsigned())
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Trims surrounding whitespace and checks the character count lies in `1..=max_len`.
pub(crate) fn bounded_text(value: String, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    (1..=max_len).contains(&len).then(|| trimmed.to_owned())
}
