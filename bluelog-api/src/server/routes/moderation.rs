use crate::server::{
    BlogSettings, Result, ServerError, ServerRouter,
    auth::AuthenticatedAdmin,
    extract::{Json, Query},
    views::{ModerationCommentView, PostView},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use bluelog_comments::moderation::Moderation;
use bluelog_common::model::{
    Id,
    category::{CategoryMarker, DEFAULT_CATEGORY},
    comment::{CommentFilter, CommentMarker},
    page::{Page, PageRequest},
    post::{InvalidPostError, PostContent, PostMarker},
};
use bluelog_db::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_get(unread_count)
        .typed_post(mark_all_read)
        .typed_post(mark_read)
        .typed_delete(delete_comment)
        .typed_post(create_post)
        .typed_patch(update_post)
        .typed_post(toggle_comments)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/comments", rejection(ServerError))]
struct CommentsPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ModerationQuery {
    #[serde(default)]
    filter: CommentFilter,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_comments(
    CommentsPath(): CommentsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<BlogSettings>,
    _: AuthenticatedAdmin,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<Page<ModerationCommentView>>> {
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(settings.comment_per_page),
    );
    let comments = Moderation::new(&*db).list(query.filter, page).await?;

    Ok(Json(comments.map(ModerationCommentView::from)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/comments/unread", rejection(ServerError))]
struct UnreadPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UnreadCount {
    unread: u64,
}

async fn unread_count(
    UnreadPath(): UnreadPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedAdmin,
) -> Result<Json<UnreadCount>> {
    let unread = Moderation::new(&*db).unread_count().await?;

    Ok(Json(UnreadCount { unread }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/comments/read", rejection(ServerError))]
struct ReadAllPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct MarkedRead {
    changed: u64,
}

async fn mark_all_read(
    ReadAllPath(): ReadAllPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedAdmin,
) -> Result<Json<MarkedRead>> {
    let changed = Moderation::new(&*db).mark_all_read().await?;

    Ok(Json(MarkedRead { changed }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/comments/{id}/read", rejection(ServerError))]
struct ReadPath {
    id: Id<CommentMarker>,
}

async fn mark_read(
    ReadPath { id }: ReadPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedAdmin,
) -> Result<StatusCode> {
    Moderation::new(&*db).mark_read(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/comments/{id}", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    CommentPath { id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedAdmin,
) -> Result<StatusCode> {
    Moderation::new(&*db).delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/posts", rejection(ServerError))]
struct PostsPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct PostRequest {
    title: String,
    body: String,
    category: Option<Id<CategoryMarker>>,
}

impl PostRequest {
    fn content(self) -> Result<PostContent, InvalidPostError> {
        PostContent::new(
            self.title,
            self.body,
            self.category.unwrap_or(DEFAULT_CATEGORY),
        )
    }
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(request): Json<PostRequest>,
) -> Result<(StatusCode, Json<PostView>)> {
    let post = db.create_post(&request.content()?).await?;
    info!(admin = %admin.id, post = %post.id, "Post created");

    Ok((StatusCode::CREATED, Json(post.into())))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/posts/{id}/comments-enabled", rejection(ServerError))]
struct CommentsEnabledPath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct CommentsEnabled {
    can_comment: bool,
}

async fn toggle_comments(
    CommentsEnabledPath { id }: CommentsEnabledPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<Json<CommentsEnabled>> {
    let can_comment = db
        .toggle_comments(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    info!(admin = %admin.id, post = %id, can_comment, "Comments toggled");

    Ok(Json(CommentsEnabled { can_comment }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

/// Replaces title, body and category. Without `category` the post moves to the default one.
async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(request): Json<PostRequest>,
) -> Result<Json<PostView>> {
    let post = db
        .update_post(id, &request.content()?)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    info!(admin = %admin.id, post = %id, "Post updated");

    Ok(Json(post.into()))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<StatusCode> {
    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }
    info!(admin = %admin.id, post = %id, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}
