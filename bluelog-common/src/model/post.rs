use crate::model::{Id, bounded_text, category::CategoryMarker};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 60;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub body: String,
    pub timestamp: UtcDateTime,
    pub can_comment: bool,
    pub category: Id<CategoryMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostContent {
    title: String,
    body: String,
    pub category: Id<CategoryMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("The post title must be 1 to {POST_TITLE_MAX_LEN} characters")]
    Title,
    #[error("The post body must not be empty")]
    Body,
}

impl PostContent {
    pub fn new(
        title: String,
        body: String,
        category: Id<CategoryMarker>,
    ) -> Result<Self, InvalidPostError> {
        let title = bounded_text(title, POST_TITLE_MAX_LEN).ok_or(InvalidPostError::Title)?;
        if body.trim().is_empty() {
            return Err(InvalidPostError::Body);
        }

        Ok(Self {
            title,
            body,
            category,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        category::DEFAULT_CATEGORY,
        post::{InvalidPostError, PostContent},
    };

    #[test]
    fn create_post_validation() {
        let post = PostContent::new(" Hello ".to_owned(), "body".to_owned(), DEFAULT_CATEGORY)
            .unwrap();
        assert_eq!(post.title(), "Hello");

        assert_eq!(
            PostContent::new(String::new(), "body".to_owned(), DEFAULT_CATEGORY),
            Err(InvalidPostError::Title)
        );
        assert_eq!(
            PostContent::new("t".repeat(61), "body".to_owned(), DEFAULT_CATEGORY),
            Err(InvalidPostError::Title)
        );
        assert_eq!(
            PostContent::new("Hello".to_owned(), " ".to_owned(), DEFAULT_CATEGORY),
            Err(InvalidPostError::Body)
        );
    }
}
