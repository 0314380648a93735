use crate::server::ServerRouter;
use bluelog_common::model::page::PageRequest;
use serde::Deserialize;

mod about;
mod categories;
mod comments;
mod moderation;
mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(moderation::routes())
        .merge(categories::routes())
        .merge(about::routes())
}

/// `?page=&per_page=`, both optional.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl PageQuery {
    fn request(self, default_per_page: u32) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(default_per_page),
        )
    }
}
