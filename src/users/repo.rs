use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::repo::{self, Assignments, Entity, InsertPayload, UpdatePatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    Admin,
    Anonymous,
}

impl Default for UserType {
    fn default() -> Self {
        UserType::Anonymous
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, email, password_hash, user_type, created_at, updated_at";
}

/// Request-scoped view of the authenticated user. Deliberately has no
/// password hash column; this is the projection `CurrentUser` loads.
#[derive(Debug, Clone, FromRow)]
pub struct AuthedUser {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
}

struct UserInsert {
    email: String,
    password_hash: String,
    user_type: UserType,
}

impl InsertPayload<User> for UserInsert {
    fn push_insert(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push("(email, password_hash, user_type) VALUES (");
        let mut vals = qb.separated(", ");
        vals.push_bind(self.email.clone());
        vals.push_bind(self.password_hash.clone());
        vals.push_bind(self.user_type);
        qb.push(")");
    }
}

/// Allowed-mutable fields for a user. A password arrives here already
/// hashed; see `UserUpdateRequest::into_patch`.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub user_type: Option<UserType>,
}

impl UpdatePatch<User> for UserPatch {
    fn apply(&self, set: &mut Assignments<'_, '_>) {
        if let Some(email) = &self.email {
            set.set("email", email.clone());
        }
        if let Some(hash) = &self.password_hash {
            set.set("password_hash", hash.clone());
        }
        if let Some(user_type) = self.user_type {
            set.set("user_type", user_type);
        }
    }
}

/// Create a user, hashing the plaintext first. No path persists a plaintext
/// password.
pub async fn create(
    db: &PgPool,
    email: &str,
    password: &str,
    user_type: UserType,
) -> Result<User, ApiError> {
    let password_hash = hash_password(password)?;
    repo::create(
        db,
        &UserInsert {
            email: email.to_string(),
            password_hash,
            user_type,
        },
    )
    .await
}

pub async fn get_by_email(db: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM {} WHERE email = $1",
        User::COLUMNS,
        User::TABLE
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn get_authed_by_email(db: &PgPool, email: &str) -> Result<Option<AuthedUser>, ApiError> {
    let user = sqlx::query_as::<_, AuthedUser>(
        "SELECT id, email, user_type FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Recipient list for admin notifications.
pub async fn admin_emails(db: &PgPool) -> Result<Vec<String>, ApiError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT email FROM users WHERE user_type = $1")
        .bind(UserType::Admin)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(email,)| email).collect())
}
