//! Admin notification side channel. The trait keeps the transport swappable;
//! the shipped implementation resolves ADMIN recipients from the store and
//! records the notification, since actual delivery lives outside this
//! service.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};

use crate::users;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort: failures are logged, never surfaced to the request.
    async fn notify_admins(&self, message: &str);
}

pub struct AdminNotifier {
    db: PgPool,
}

impl AdminNotifier {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for AdminNotifier {
    async fn notify_admins(&self, message: &str) {
        match users::repo::admin_emails(&self.db).await {
            Ok(recipients) if recipients.is_empty() => {
                info!(notification = %message, "no admin recipients for notification");
            }
            Ok(recipients) => {
                info!(?recipients, notification = %message, "admin notification recorded");
            }
            Err(e) => {
                error!(error = %e, "failed to resolve admin notification recipients");
            }
        }
    }
}
