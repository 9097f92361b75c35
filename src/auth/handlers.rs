use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthRequest, TokenResponse},
        jwt::JwtKeys,
        password::verify_password,
    },
    error::ApiError,
    state::AppState,
    users::{self, repo::User},
};

const CREDENTIALS_MESSAGE: &str = "The email or password do not match.";

/// Single guard for both failure modes, so an unknown email and a wrong
/// password are indistinguishable to the caller.
fn check_credentials(user: Option<User>, email: &str, password: &str) -> Result<User, ApiError> {
    let user = match user {
        Some(user) => user,
        None => {
            warn!(email = %email, "authentication for unknown email");
            return Err(ApiError::Unauthorized(CREDENTIALS_MESSAGE.into()));
        }
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "authentication with invalid password");
        return Err(ApiError::Unauthorized(CREDENTIALS_MESSAGE.into()));
    }
    Ok(user)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/authenticate", post(authenticate))
}

/// The same 401 is returned whether the email is unknown or the password is
/// wrong, so the response never reveals which check failed.
#[instrument(skip(state, payload))]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(mut payload): Json<AuthRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let user = users::repo::get_by_email(&state.db, &payload.email).await?;
    let user = check_credentials(user, &payload.email, &payload.password)?;

    let token = JwtKeys::from_ref(&state).sign(user.id, &user.email)?;

    info!(user_id = %user.id, "access token issued");
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::users::repo::UserType;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn stored_user(password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: hash_password(password).expect("hash"),
            user_type: UserType::Anonymous,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn unknown_email_and_wrong_password_share_one_message() {
        let unknown = check_credentials(None, "a@x.com", "Abcdef1!").unwrap_err();
        let wrong =
            check_credentials(Some(stored_user("Abcdef1!")), "a@x.com", "Abcdef1.").unwrap_err();
        assert_eq!(unknown.to_string(), CREDENTIALS_MESSAGE);
        assert_eq!(wrong.to_string(), CREDENTIALS_MESSAGE);
        assert_eq!(unknown.status_code().as_u16(), 401);
        assert_eq!(wrong.status_code().as_u16(), 401);
    }

    #[test]
    fn empty_password_gets_the_generic_message() {
        let err = check_credentials(Some(stored_user("Abcdef1!")), "a@x.com", "").unwrap_err();
        assert_eq!(err.to_string(), CREDENTIALS_MESSAGE);
        assert_eq!(err.status_code().as_u16(), 401);
    }

    #[test]
    fn matching_password_passes_the_guard() {
        let user = check_credentials(Some(stored_user("Abcdef1!")), "a@x.com", "Abcdef1!")
            .expect("credentials ok");
        assert_eq!(user.email, "a@x.com");
    }
}
