//! Append-only audit trail. Rows are created once and never updated or
//! deleted; a failed insert is logged and swallowed so auditing can never
//! break the request that triggered it.

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

/// Client metadata captured per request for the audit trail.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            // First hop of the forwarding chain.
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| "unknown".into());
        let user_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        Ok(RequestMeta {
            ip_address,
            user_agent,
        })
    }
}

/// Record who performed which action on which module. `action` and `module`
/// are explicit strings supplied by the caller.
pub async fn register(db: &PgPool, user_id: Uuid, action: &str, module: &str, meta: &RequestMeta) {
    let result = sqlx::query(
        "INSERT INTO audit_logs (user_id, action_performed, affected_module, ip_address, user_agent) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(module)
    .bind(&meta.ip_address)
    .bind(&meta.user_agent)
    .execute(db)
    .await;

    if let Err(e) = result {
        error!(error = %e, action, module, "audit log insert failed");
    }
}

/// Fire-and-forget variant used by handlers on their success path.
pub fn spawn_register(
    db: &PgPool,
    user_id: Uuid,
    action: &'static str,
    module: &'static str,
    meta: RequestMeta,
) {
    let db = db.clone();
    tokio::spawn(async move {
        register(&db, user_id, action, module, &meta).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn meta_prefers_first_forwarded_hop() {
        let (mut parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("user-agent", "curl/8.0")
            .body(())
            .expect("request")
            .into_parts();
        let meta = RequestMeta::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(meta.ip_address, "203.0.113.9");
        assert_eq!(meta.user_agent, "curl/8.0");
    }

    #[tokio::test]
    async fn meta_defaults_when_headers_missing() {
        let (mut parts, _) = Request::builder()
            .body(())
            .expect("request")
            .into_parts();
        let meta = RequestMeta::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(meta.ip_address, "unknown");
        assert_eq!(meta.user_agent, "unknown");
    }
}
