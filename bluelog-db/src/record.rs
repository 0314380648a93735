use bluelog_common::{
    model::{
        Id, ModelValidationError,
        admin::Admin,
        category::{Category, CategoryName},
        comment::{AuthorName, Comment, CommentBody, EmailAddress},
        post::Post,
        token::AdminSession,
    },
    util::PositiveDuration,
};
use sqlx::FromRow;
use time::PrimitiveDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AdminRecord {
    pub admin_id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub blog_title: String,
    pub blog_sub_title: String,
    pub about: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AdminSessionRecord {
    pub admin_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CategoryRecord {
    pub category_id: i64,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: PrimitiveDateTime,
    pub can_comment: bool,
    pub category_id: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub author: String,
    pub email: String,
    pub body: String,
    pub created_at: PrimitiveDateTime,
    pub from_admin: bool,
    pub read: bool,
    pub replied_id: Option<i64>,
}

impl TryFrom<AdminRecord> for Admin {
    type Error = ModelValidationError;

    fn try_from(value: AdminRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.admin_id),
            username: value.username,
            name: AuthorName::new(value.name)?,
            email: EmailAddress::new(value.email)?,
            blog_title: value.blog_title,
            blog_sub_title: value.blog_sub_title,
            about: value.about,
        })
    }
}

impl TryFrom<AdminSessionRecord> for AdminSession {
    type Error = ModelValidationError;

    fn try_from(value: AdminSessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            admin: Id::from_db(value.admin_id),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(PositiveDuration::from_seconds)
                .transpose()?,
        })
    }
}

impl TryFrom<CategoryRecord> for Category {
    type Error = ModelValidationError;

    fn try_from(value: CategoryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.category_id),
            name: CategoryName::new(value.name)?,
        })
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: Id::from_db(value.post_id),
            title: value.title,
            body: value.body,
            timestamp: value.created_at.as_utc(),
            can_comment: value.can_comment,
            category: Id::from_db(value.category_id),
        }
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.comment_id),
            post: Id::from_db(value.post_id),
            author: AuthorName::new(value.author)?,
            email: EmailAddress::new(value.email)?,
            body: CommentBody::new(value.body)?,
            timestamp: value.created_at.as_utc(),
            from_admin: value.from_admin,
            read: value.read,
            replied: value.replied_id.map(Id::from_db),
        })
    }
}
