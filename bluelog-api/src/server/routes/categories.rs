use crate::server::{
    BlogSettings, Result, ServerError, ServerRouter,
    auth::AuthenticatedAdmin,
    extract::{Json, Query},
    routes::PageQuery,
    views::PostView,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use bluelog_common::model::{
    Id,
    category::{Category, CategoryMarker, CategoryName},
    page::Page,
};
use bluelog_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_categories)
        .typed_get(get_category_posts)
        .typed_post(create_category)
        .typed_patch(rename_category)
        .typed_delete(delete_category)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/categories", rejection(ServerError))]
struct CategoriesPath();

async fn get_categories(
    CategoriesPath(): CategoriesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Category>>> {
    let categories = db.fetch_categories().await?;

    Ok(Json(categories))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/categories/{id}/posts", rejection(ServerError))]
struct CategoryPostsPath {
    id: Id<CategoryMarker>,
}

async fn get_category_posts(
    CategoryPostsPath { id }: CategoryPostsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<BlogSettings>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PostView>>> {
    if db.fetch_category(id).await?.is_none() {
        return Err(ServerError::CategoryByIdNotFound(id));
    }

    let posts = db
        .fetch_category_posts(id, page.request(settings.post_per_page))
        .await?;

    Ok(Json(posts.map(PostView::from)))
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CategoryRequest {
    name: CategoryName,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/categories", rejection(ServerError))]
struct AdminCategoriesPath();

async fn create_category(
    AdminCategoriesPath(): AdminCategoriesPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(CategoryRequest { name }): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = db.create_category(&name).await?;
    info!(admin = %admin.id, category = %category.id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/categories/{id}", rejection(ServerError))]
struct CategoryPath {
    id: Id<CategoryMarker>,
}

async fn rename_category(
    CategoryPath { id }: CategoryPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(CategoryRequest { name }): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let category = db
        .rename_category(id, &name)
        .await?
        .ok_or(ServerError::CategoryByIdNotFound(id))?;
    info!(admin = %admin.id, category = %id, "Category renamed");

    Ok(Json(category))
}

async fn delete_category(
    CategoryPath { id }: CategoryPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
) -> Result<StatusCode> {
    if !db.delete_category(id).await? {
        return Err(ServerError::CategoryByIdNotFound(id));
    }
    info!(admin = %admin.id, category = %id, "Category deleted");

    Ok(StatusCode::NO_CONTENT)
}
