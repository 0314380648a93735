use crate::model::{
    Id, bounded_text,
    comment::{AuthorName, EmailAddress, InvalidAuthorNameError},
};
use thiserror::Error;

pub const BLOG_TITLE_MAX_LEN: usize = 60;
pub const BLOG_SUB_TITLE_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AdminMarker;

/// The blog owner. Admin comments are signed with `name` and `email`, and
/// visitor comments are announced to `email`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Admin {
    pub id: Id<AdminMarker>,
    pub username: String,
    pub name: AuthorName,
    pub email: EmailAddress,
    pub blog_title: String,
    pub blog_sub_title: String,
    pub about: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateAdmin {
    pub username: String,
    pub name: AuthorName,
    pub email: EmailAddress,
}

/// The editable part of the admin: how the blog presents itself. The subtitle may be empty.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AdminProfile {
    pub name: AuthorName,
    pub email: EmailAddress,
    blog_title: String,
    blog_sub_title: String,
    about: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum InvalidAdminProfileError {
    #[error("The admin username must not be empty")]
    Username,
    #[error("The admin name is not a valid comment author: {0}")]
    Name(#[from] InvalidAuthorNameError),
    #[error("The blog title must be 1 to {BLOG_TITLE_MAX_LEN} characters")]
    BlogTitle,
    #[error("The blog subtitle must be at most {BLOG_SUB_TITLE_MAX_LEN} characters")]
    BlogSubTitle,
}

impl CreateAdmin {
    /// Without a display name the capitalized username is used. The name signs
    /// admin comments, so it obeys the comment author limits.
    pub fn new(
        username: String,
        name: Option<String>,
        email: EmailAddress,
    ) -> Result<Self, InvalidAdminProfileError> {
        let username = username.trim().to_owned();
        if username.is_empty() {
            return Err(InvalidAdminProfileError::Username);
        }
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| capitalize(&username));

        Ok(Self {
            username,
            name: AuthorName::new(name)?,
            email,
        })
    }

    #[must_use]
    pub fn blog_title(&self) -> String {
        format!("{}'s Blog", self.name.get())
    }
}

impl AdminProfile {
    pub fn new(
        name: AuthorName,
        email: EmailAddress,
        blog_title: String,
        blog_sub_title: String,
        about: String,
    ) -> Result<Self, InvalidAdminProfileError> {
        let blog_title = bounded_text(blog_title, BLOG_TITLE_MAX_LEN)
            .ok_or(InvalidAdminProfileError::BlogTitle)?;
        let blog_sub_title = blog_sub_title.trim().to_owned();
        if blog_sub_title.chars().count() > BLOG_SUB_TITLE_MAX_LEN {
            return Err(InvalidAdminProfileError::BlogSubTitle);
        }

        Ok(Self {
            name,
            email,
            blog_title,
            blog_sub_title,
            about,
        })
    }

    #[must_use]
    pub fn blog_title(&self) -> &str {
        &self.blog_title
    }

    #[must_use]
    pub fn blog_sub_title(&self) -> &str {
        &self.blog_sub_title
    }

    #[must_use]
    pub fn about(&self) -> &str {
        &self.about
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
