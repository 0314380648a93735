use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedAdmin, extract::Json, views::AboutView,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bluelog_common::model::{
    admin::{Admin, AdminProfile, InvalidAdminProfileError},
    comment::{AuthorName, EmailAddress},
};
use bluelog_db::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_about)
        .typed_patch(update_settings)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/about", rejection(ServerError))]
struct AboutPath();

async fn get_about(
    AboutPath(): AboutPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<AboutView>> {
    let admin = db
        .fetch_blog_admin()
        .await?
        .ok_or(ServerError::AdminNotConfigured)?;

    Ok(Json(admin.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/settings", rejection(ServerError))]
struct SettingsPath();

/// Omitted fields keep their current value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct SettingsRequest {
    name: Option<AuthorName>,
    email: Option<EmailAddress>,
    blog_title: Option<String>,
    blog_sub_title: Option<String>,
    about: Option<String>,
}

impl SettingsRequest {
    fn apply(self, admin: Admin) -> Result<AdminProfile, InvalidAdminProfileError> {
        AdminProfile::new(
            self.name.unwrap_or(admin.name),
            self.email.unwrap_or(admin.email),
            self.blog_title.unwrap_or(admin.blog_title),
            self.blog_sub_title.unwrap_or(admin.blog_sub_title),
            self.about.unwrap_or(admin.about),
        )
    }
}

async fn update_settings(
    SettingsPath(): SettingsPath,
    State(db): State<Arc<DbClient>>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<AboutView>> {
    let admin_id = admin.id;
    let profile = request.apply(admin)?;
    let admin = db
        .update_admin_profile(admin_id, &profile)
        .await?
        .ok_or(ServerError::InvalidToken)?;
    info!(admin = %admin_id, "Settings updated");

    Ok(Json(admin.into()))
}
