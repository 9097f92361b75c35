use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::{hash_password, is_valid_password, password_rule_message};
use crate::error::{ApiError, FieldError};
use crate::users::repo::{User, UserPatch, UserType};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Keeps an absent key distinct from an explicit `null`: outer `None` means
/// the key was missing, `Some(None)` means `null` was sent.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::deserialize(de).map(Some)
}

/// Every updatable column is NOT NULL, so an explicit `null` has no valid
/// target state and is rejected rather than ignored.
pub(crate) fn reject_explicit_null<T>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<Option<T>>,
) -> Option<T> {
    match value {
        Some(Some(v)) => Some(v),
        Some(None) => {
            errors.push(FieldError::new(field, "This field may not be null.", json!(null)));
            None
        }
        None => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub user_type: UserType,
}

impl UserCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError::new(
                "email",
                "Invalid email address.",
                json!(self.email),
            ));
        }
        if !is_valid_password(&self.password) {
            // Never echo the rejected password back.
            errors.push(FieldError::new("password", password_rule_message(), json!(null)));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

/// Partial update: absent fields leave existing values untouched, while an
/// explicit `null` is a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub password: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub user_type: Option<Option<UserType>>,
}

impl UserUpdateRequest {
    /// Validates the supplied fields and hashes a supplied password before
    /// it can reach the repository. The create path hashes inside the
    /// repository instead; the update path wires it in here.
    pub fn into_patch(self) -> Result<UserPatch, ApiError> {
        let mut errors = Vec::new();
        let email = reject_explicit_null(&mut errors, "email", self.email);
        let password = reject_explicit_null(&mut errors, "password", self.password);
        let user_type = reject_explicit_null(&mut errors, "user_type", self.user_type);

        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.push(FieldError::new(
                    "email",
                    "Invalid email address.",
                    json!(email),
                ));
            }
        }
        if let Some(password) = &password {
            if !is_valid_password(password) {
                errors.push(FieldError::new("password", password_rule_message(), json!(null)));
            }
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let password_hash = match password {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };
        Ok(UserPatch {
            email: email.map(|e| e.trim().to_lowercase()),
            password_hash,
            user_type,
        })
    }
}

/// The password never appears in a response body.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_type: user.user_type,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub user_data: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 1000)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }

    pub fn page(&self) -> i64 {
        self.offset() / self.limit() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_defaults_to_anonymous_when_omitted() {
        let req: UserCreateRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"Abcdef1!"}"#).expect("parse");
        assert_eq!(req.user_type, UserType::Anonymous);
    }

    #[test]
    fn create_rejects_weak_password_with_rule_message() {
        let req = UserCreateRequest {
            email: "a@x.com".into(),
            password: "short".into(),
            user_type: UserType::Anonymous,
        };
        match req.validate().unwrap_err() {
            ApiError::Validation(details) => {
                assert_eq!(details[0].field, "password");
                assert!(details[0].message.contains("8 to 25 characters"));
                assert_eq!(details[0].input, serde_json::Value::Null);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_collects_every_failed_rule() {
        let req = UserCreateRequest {
            email: "nope".into(),
            password: "bad".into(),
            user_type: UserType::Anonymous,
        };
        match req.validate().unwrap_err() {
            ApiError::Validation(details) => assert_eq!(details.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_update_body_produces_empty_patch() {
        let req: UserUpdateRequest = serde_json::from_str("{}").expect("parse");
        let patch = req.into_patch().expect("patch");
        assert!(patch.email.is_none());
        assert!(patch.password_hash.is_none());
        assert!(patch.user_type.is_none());
    }

    #[test]
    fn update_rejects_explicit_null_field() {
        let req: UserUpdateRequest =
            serde_json::from_str(r#"{"email": null}"#).expect("parse");
        match req.into_patch().unwrap_err() {
            ApiError::Validation(details) => {
                assert_eq!(details[0].field, "email");
                assert!(details[0].message.contains("null"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let absent: UserUpdateRequest = serde_json::from_str("{}").expect("parse");
        assert!(absent.email.is_none());
        let null: UserUpdateRequest =
            serde_json::from_str(r#"{"email": null}"#).expect("parse");
        assert_eq!(null.email, Some(None));
    }

    #[test]
    fn update_hashes_supplied_password() {
        let req = UserUpdateRequest {
            email: None,
            password: Some(Some("Abcdef1!".into())),
            user_type: None,
        };
        let patch = req.into_patch().expect("patch");
        let hash = patch.password_hash.expect("hash present");
        assert_ne!(hash, "Abcdef1!");
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn response_never_serializes_password() {
        let resp = UserResponse {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            user_type: UserType::Admin,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&resp).expect("serialize");
        assert!(!json.contains("password"));
        assert!(json.contains("ADMIN"));
    }

    #[test]
    fn pagination_page_number() {
        let p = Pagination {
            limit: 10,
            offset: 30,
        };
        assert_eq!(p.page(), 4);
        let first = Pagination {
            limit: 100,
            offset: 0,
        };
        assert_eq!(first.page(), 1);
    }
}
