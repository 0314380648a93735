use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::TypedHeader;
use bluelog_common::model::{admin::Admin, token::AdminToken};
use bluelog_db::DbClient;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The blog owner, authenticated through an `Authorization: Bearer` admin token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedAdmin(pub Admin);

impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AdminToken =
            <AuthorizationHeader as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .map_err(ServerError::InvalidAuthorizationHeader)?
                .token()
                .parse()?;

        let token_hash = request_token.hash()?;

        let db = Arc::<DbClient>::from_ref(state);
        let session = db
            .fetch_admin_session(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if session.admin != request_token.admin_id || session.is_expired_at(UtcDateTime::now()) {
            return Err(ServerError::InvalidToken);
        }

        let admin = db
            .fetch_admin_by_id(session.admin)
            .await?
            .ok_or(ServerError::InvalidToken)?;
        debug!(admin = %admin.id, "Admin authenticated");

        Ok(Self(admin))
    }
}

/// Absent credentials mean a visitor. Present but invalid credentials are still rejected.
impl<S> OptionalFromRequestParts<S> for AuthenticatedAdmin
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }

        <Self as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerError, auth::AuthenticatedAdmin};
    use axum::{
        extract::{FromRequestParts, OptionalFromRequestParts},
        http::{Request, StatusCode, header::AUTHORIZATION, request::Parts},
    };
    use bluelog_db::DbClient;
    use std::sync::Arc;

    fn database() -> Arc<DbClient> {
        Arc::new(DbClient::connect_lazy("postgres://localhost/bluelog", 1).unwrap())
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut request = Request::builder().uri("/admin/comments");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        request.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_a_visitor() {
        let db = database();

        let admin = <AuthenticatedAdmin as OptionalFromRequestParts<_>>::from_request_parts(
            &mut parts(None),
            &db,
        )
        .await
        .unwrap();
        assert_eq!(admin, None);

        let err = <AuthenticatedAdmin as FromRequestParts<_>>::from_request_parts(
            &mut parts(None),
            &db,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::InvalidAuthorizationHeader(_)));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_credentials_are_rejected() {
        let db = database();

        let basic = <AuthenticatedAdmin as OptionalFromRequestParts<_>>::from_request_parts(
            &mut parts(Some("Basic Z3JleTpzZWNyZXQ=")),
            &db,
        )
        .await
        .unwrap_err();
        assert!(matches!(basic, ServerError::InvalidAuthorizationHeader(_)));
        assert_eq!(basic.status(), StatusCode::BAD_REQUEST);

        let garbage = <AuthenticatedAdmin as OptionalFromRequestParts<_>>::from_request_parts(
            &mut parts(Some("Bearer not-a-token")),
            &db,
        )
        .await
        .unwrap_err();
        assert!(matches!(garbage, ServerError::InvalidAdminToken(_)));
        assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    }
}
