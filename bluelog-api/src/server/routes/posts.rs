use crate::server::{
    BlogSettings, Result, ServerError, ServerRouter, ServerState,
    auth::AuthenticatedAdmin,
    extract::{Json, Query},
    routes::PageQuery,
    views::{CommentView, PostView},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use bluelog_comments::{
    store::CommentStore,
    submission::{Caller, CommentForm},
};
use bluelog_common::model::{
    Id,
    comment::CommentMarker,
    page::Page,
    post::PostMarker,
};
use bluelog_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_get(get_post)
        .typed_get(get_post_comments)
        .typed_post(submit_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn get_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<BlogSettings>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PostView>>> {
    let posts = db.fetch_posts(page.request(settings.post_per_page)).await?;

    Ok(Json(posts.map(PostView::from)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostView>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

async fn get_post_comments(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<BlogSettings>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<CommentView>>> {
    if db.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let comments = db
        .fetch_post_comments(id, page.request(settings.comment_per_page))
        .await?;

    Ok(Json(comments.map(CommentView::from)))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ReplyQuery {
    reply: Option<Id<CommentMarker>>,
}

/// Admin submissions ignore `author` and `email`, so both may be left out.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CommentRequest {
    #[serde(default)]
    author: String,
    #[serde(default)]
    email: String,
    body: String,
}

impl From<CommentRequest> for CommentForm {
    fn from(request: CommentRequest) -> Self {
        Self {
            author: request.author,
            email: request.email,
            body: request.body,
        }
    }
}

async fn submit_comment(
    PostCommentsPath { id }: PostCommentsPath,
    State(state): State<ServerState>,
    admin: Option<AuthenticatedAdmin>,
    Query(ReplyQuery { reply }): Query<ReplyQuery>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentView>)> {
    let caller = match &admin {
        Some(AuthenticatedAdmin(admin)) => Caller::Admin(admin),
        None => Caller::Visitor,
    };

    let comment = state
        .submission()
        .submit(caller, id, request.into(), reply)
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}
