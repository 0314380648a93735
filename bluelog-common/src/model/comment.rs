use crate::model::{Id, bounded_text, post::PostMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;
use validator::ValidateEmail;

pub const AUTHOR_NAME_MAX_LEN: usize = 30;
pub const EMAIL_ADDRESS_MAX_LEN: usize = 254;
pub const COMMENT_BODY_MAX_LEN: usize = 5000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: AuthorName,
    pub email: EmailAddress,
    pub body: CommentBody,
    pub timestamp: UtcDateTime,
    pub from_admin: bool,
    pub read: bool,
    /// The comment this one answers. Cleared when that comment is deleted.
    pub replied: Option<Id<CommentMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: AuthorName,
    pub email: EmailAddress,
    pub body: CommentBody,
    pub from_admin: bool,
    pub read: bool,
    pub replied: Option<Id<CommentMarker>>,
}

/// Selection used by the moderation listing.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentFilter {
    #[default]
    Unread,
    Admin,
    All,
}

impl CommentFilter {
    #[must_use]
    pub fn matches(self, comment: &Comment) -> bool {
        match self {
            CommentFilter::Unread => !comment.read,
            CommentFilter::Admin => comment.from_admin,
            CommentFilter::All => true,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The author name must be 1 to {AUTHOR_NAME_MAX_LEN} characters: {0:?}")]
pub struct InvalidAuthorNameError(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0:?}")]
pub struct InvalidEmailAddressError(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The comment body must be 1 to {COMMENT_BODY_MAX_LEN} characters")]
pub struct InvalidCommentBodyError;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(name: String) -> Result<Self, InvalidAuthorNameError> {
        match bounded_text(name.clone(), AUTHOR_NAME_MAX_LEN) {
            Some(name) => Ok(Self(name)),
            None => Err(InvalidAuthorNameError(name)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(email: String) -> Result<Self, InvalidEmailAddressError> {
        let email = email.trim().to_owned();
        if email.len() <= EMAIL_ADDRESS_MAX_LEN && email.validate_email() {
            Ok(Self(email))
        } else {
            Err(InvalidEmailAddressError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentBody(String);

impl CommentBody {
    pub fn new(body: String) -> Result<Self, InvalidCommentBodyError> {
        bounded_text(body, COMMENT_BODY_MAX_LEN)
            .map(Self)
            .ok_or(InvalidCommentBodyError)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for AuthorName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        AuthorName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"AuthorName"))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        EmailAddress::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"EmailAddress"))
    }
}
