use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ApiError, FieldError};
use crate::users::dto::is_valid_email;

/// Request body for `POST /authenticate`.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

impl AuthRequest {
    /// Only the email shape is validated here. The password, empty or not,
    /// goes through verification so every credential failure produces the
    /// same 401.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError::new(
                "email",
                "Invalid email address.",
                json!(self.email),
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Response returned on successful authentication.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_email() {
        let req = AuthRequest {
            email: "not-an-email".into(),
            password: "Abcdef1!".into(),
        };
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_password_is_not_a_validation_error() {
        let req = AuthRequest {
            email: "a@x.com".into(),
            password: String::new(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn token_response_shape() {
        let resp = TokenResponse {
            access_token: "abc".into(),
            token_type: "bearer".into(),
        };
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["access_token"], "abc");
    }
}
