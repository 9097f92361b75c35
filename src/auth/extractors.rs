use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::{self, AuthedUser, UserType};

/// Resolves the requesting user from the bearer token. The user is re-loaded
/// from the store on every request (password hash excluded from the
/// projection) so role or state changes take effect without token
/// revocation infrastructure.
pub struct CurrentUser(pub AuthedUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header.".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header.".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token)?;

        let user = repo::get_authed_by_email(&state.db, &claims.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %claims.email, "token subject no longer exists");
                ApiError::Unauthorized("User not found.".into())
            })?;

        Ok(CurrentUser(user))
    }
}

/// Role gate applied before any mutating user/product operation.
pub struct AdminUser(pub AuthedUser);

fn require_admin(user: &AuthedUser) -> Result<(), ApiError> {
    if user.user_type != UserType::Admin {
        warn!(user_id = %user.id, email = %user.email, "non-admin attempted a privileged operation");
        return Err(ApiError::Forbidden("You're not able to perform this.".into()));
    }
    Ok(())
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn authed(user_type: UserType) -> AuthedUser {
        AuthedUser {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            user_type,
        }
    }

    #[test]
    fn anonymous_user_is_forbidden() {
        let err = require_admin(&authed(UserType::Anonymous)).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 403);
        assert_eq!(err.to_string(), "You're not able to perform this.");
    }

    #[test]
    fn admin_user_passes_the_role_gate() {
        assert!(require_admin(&authed(UserType::Admin)).is_ok());
    }
}
