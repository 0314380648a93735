use bluelog_comments::notify::{NotificationGateway, Notifications};
use bluelog_common::{
    model::{ModelValidationError, admin::CreateAdmin, comment::EmailAddress},
    util::PositiveDuration,
};
use bluelog_db::{DbClient, DbError};
use mail::{Mailer, MailerError, SmtpEnv};
use serde::Deserialize;
use server::{BlogSettings, ServerState};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod mail;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error setting up the mailer: {0}")]
    Mailer(#[from] MailerError),
    #[error("Invalid admin configuration: {0}")]
    Admin(#[from] ModelValidationError),
    #[error("ADMIN_EMAIL is required to create the admin")]
    MissingAdminEmail,
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,
    blog_base_url: String,
    #[serde(default = "default_post_per_page")]
    blog_post_per_page: u32,
    #[serde(default = "default_comment_per_page")]
    blog_comment_per_page: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_post_per_page() -> u32 {
    10
}

fn default_comment_per_page() -> u32 {
    15
}

/// Only read when the database has no admin yet.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct AdminEnv {
    admin_username: Option<String>,
    admin_name: Option<String>,
    admin_email: Option<String>,
    admin_token_lifetime_seconds: Option<i64>,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bluelog_api=debug,\
                bluelog_comments=debug,\
                bluelog_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_dotenv() -> Result<(), InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    Ok(())
}

/// Creates the admin and a first token on an empty database. The token is only ever shown here.
async fn bootstrap_admin(db: &DbClient, env: &AdminEnv) -> Result<(), InitError> {
    if db.fetch_blog_admin().await?.is_some() {
        return Ok(());
    }
    let Some(username) = &env.admin_username else {
        warn!("No admin exists and ADMIN_USERNAME is not set, admin routes are unusable");
        return Ok(());
    };

    let email = env.admin_email.clone().ok_or(InitError::MissingAdminEmail)?;
    let email = EmailAddress::new(email).map_err(ModelValidationError::from)?;
    let admin = CreateAdmin::new(username.clone(), env.admin_name.clone(), email)
        .map_err(ModelValidationError::from)?;
    let expires_after = env
        .admin_token_lifetime_seconds
        .map(PositiveDuration::from_seconds)
        .transpose()
        .map_err(ModelValidationError::from)?;

    let admin_id = db.create_admin(&admin).await?;
    let token = db.create_admin_token(admin_id, expires_after).await?;
    info!(admin = %admin_id, username = %admin.username, %token, "Created admin, store this token");

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c");
        return;
    }

    info!("Shutting down");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    load_dotenv()?;
    let env: Env = envy::from_env()?;
    let smtp: SmtpEnv = envy::from_env()?;
    let admin_env: AdminEnv = envy::from_env()?;

    let db_client = DbClient::connect(&env.database_url, env.database_max_connections).await?;
    db_client.migrate().await?;
    bootstrap_admin(&db_client, &admin_env).await?;

    let (gateway, notification_worker) = NotificationGateway::spawn(Mailer::new(&smtp)?);
    let state = ServerState {
        db_client: Arc::new(db_client),
        notifications: Notifications::new(gateway, env.blog_base_url),
        settings: BlogSettings {
            post_per_page: env.blog_post_per_page,
            comment_per_page: env.blog_comment_per_page,
        },
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().layer(tracing_layer).with_state(state);

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    // The router owned the last notification sender, so the worker now drains and exits.
    if let Err(err) = notification_worker.await {
        warn!(error = %err, "Notification worker ended abnormally");
    }

    Ok(())
}
