//! Fire-and-forget mail notifications.
//!
//! [`NotificationGateway::notify`] only enqueues. A background worker drains the
//! queue and hands every mail to its own detached task, so delivery order is
//! unspecified and a slow transport never holds up a request. Each mail gets a
//! single attempt; failures are logged and dropped.

use crate::error::BoxError;
use bluelog_common::model::{
    Id,
    comment::{Comment, EmailAddress},
    post::{Post, PostMarker},
};
use std::{future::Future, sync::Arc};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

pub const NEW_COMMENT_SUBJECT: &str = "New comment";
pub const NEW_REPLY_SUBJECT: &str = "New reply";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Mail {
    pub subject: String,
    pub recipient: EmailAddress,
    pub html: String,
}

#[derive(Debug, Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(#[source] BoxError);

impl MailError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

pub trait MailTransport: Send + Sync + 'static {
    fn send(&self, mail: &Mail) -> impl Future<Output = Result<(), MailError>> + Send;
}

#[derive(Clone, Debug)]
pub struct NotificationGateway {
    queue: mpsc::UnboundedSender<Mail>,
}

impl NotificationGateway {
    /// Starts the delivery worker on the current tokio runtime.
    ///
    /// The worker stops once every gateway clone has been dropped.
    pub fn spawn<T: MailTransport>(transport: T) -> (Self, JoinHandle<()>) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver_all(Arc::new(transport), receiver));

        (Self { queue }, worker)
    }

    pub fn notify(
        &self,
        subject: impl Into<String>,
        recipient: EmailAddress,
        html: impl Into<String>,
    ) {
        let mail = Mail {
            subject: subject.into(),
            recipient,
            html: html.into(),
        };

        if let Err(mpsc::error::SendError(mail)) = self.queue.send(mail) {
            warn!(
                subject = %mail.subject,
                recipient = mail.recipient.get(),
                "Notification worker has stopped, dropping mail"
            );
        }
    }
}

async fn deliver_all<T: MailTransport>(
    transport: Arc<T>,
    mut receiver: mpsc::UnboundedReceiver<Mail>,
) {
    while let Some(mail) = receiver.recv().await {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { deliver(&*transport, mail).await });
    }

    debug!("Notification queue closed");
}

async fn deliver<T: MailTransport>(transport: &T, mail: Mail) {
    match transport.send(&mail).await {
        Ok(()) => debug!(
            subject = %mail.subject,
            recipient = mail.recipient.get(),
            "Notification sent"
        ),
        Err(err) => warn!(
            error = %err,
            subject = %mail.subject,
            recipient = mail.recipient.get(),
            "Notification could not be sent"
        ),
    }
}

/// Renders the comment notifications and hands them to the gateway.
#[derive(Clone, Debug)]
pub struct Notifications {
    gateway: NotificationGateway,
    base_url: String,
}

impl Notifications {
    #[must_use]
    pub fn new(gateway: NotificationGateway, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { gateway, base_url }
    }

    #[must_use]
    pub fn post_url(&self, post: Id<PostMarker>) -> String {
        format!("{}/posts/{post}#comments", self.base_url)
    }

    /// Tells the blog owner about a visitor comment.
    pub fn new_comment(&self, post: &Post, admin_email: EmailAddress) {
        let headline = format!("The post <i>{}</i> has a new comment.", post.title);
        let html = self.render(&headline, post.id);
        self.gateway.notify(NEW_COMMENT_SUBJECT, admin_email, html);
    }

    /// Tells the author of `replied` that someone answered them.
    pub fn new_reply(&self, post: &Post, replied: &Comment) {
        let headline = format!(
            "Your comment on the post <i>{}</i> has a new reply.",
            post.title
        );
        let html = self.render(&headline, post.id);
        self.gateway.notify(NEW_REPLY_SUBJECT, replied.email.clone(), html);
    }

    fn render(&self, headline: &str, post: Id<PostMarker>) -> String {
        let url = self.post_url(post);
        format!(
            "<p>{headline} Follow the link to read it:</p>\
             <p><a href=\"{url}\">{url}</a></p>\
             <p><small style=\"color: #868e96\">Please do not reply to this email.</small></p>"
        )
    }
}
