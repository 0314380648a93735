use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use bluelog_comments::{CommentError, notify::Notifications, submission::CommentSubmission};
use bluelog_common::model::{
    Id,
    admin::InvalidAdminProfileError,
    category::CategoryMarker,
    post::{InvalidPostError, PostMarker},
    token::{AdminTokenDecodeError, AdminTokenHashError},
};
use bluelog_db::{DbClient, DbError};
use extract::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod extract;
mod routes;
mod views;

pub type ServerRouter = Router<ServerState>;

/// Page sizes used when a request does not ask for one.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct BlogSettings {
    pub post_per_page: u32,
    pub comment_per_page: u32,
}

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub notifications: Notifications,
    pub settings: BlogSettings,
}

impl ServerState {
    pub fn submission(&self) -> CommentSubmission<'_, DbClient> {
        CommentSubmission::new(&self.db_client, &self.notifications)
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided admin token could not be decoded: {0}")]
    InvalidAdminToken(#[from] AdminTokenDecodeError),
    #[error("The admin token could not be hashed: {0}")]
    AdminTokenHash(#[from] AdminTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    InvalidPost(#[from] InvalidPostError),
    #[error(transparent)]
    InvalidProfile(#[from] InvalidAdminProfileError),
    #[error("The blog has no admin yet")]
    AdminNotConfigured,
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Category with id {0} was not found.")]
    CategoryByIdNotFound(Id<CategoryMarker>),
}

fn comment_status(err: &CommentError) -> StatusCode {
    match err {
        CommentError::NotFound(_) => StatusCode::NOT_FOUND,
        CommentError::Validation(_) | CommentError::Integrity(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CommentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CategoryByIdNotFound(_)
            | ServerError::AdminNotConfigured => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::JsonRejection(rejection) => rejection.status(),
            ServerError::QueryRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAdminToken(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidPost(_)
            | ServerError::InvalidProfile(_)
            | ServerError::Database(DbError::UnknownCategory(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Comment(err) | ServerError::Database(DbError::Comment(err)) => {
                comment_status(err)
            }
            ServerError::Database(DbError::DefaultCategoryProtected) => StatusCode::FORBIDDEN,
            ServerError::Database(DbError::CategoryNameTaken(_)) => StatusCode::CONFLICT,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AdminTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        // Server errors may carry storage details, so only client errors are explained.
        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: status.is_client_error().then(|| self.to_string()),
        };
        (status, Json(error_response)).into_response()
    }
}
