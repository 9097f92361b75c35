use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    audit::{self, RequestMeta},
    auth::extractors::AdminUser,
    error::ApiError,
    repo,
    state::AppState,
    users::{
        dto::{Pagination, UserCreateRequest, UserListResponse, UserResponse, UserUpdateRequest},
        repo::{self as user_repo, User},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id", put(update_user))
}

#[instrument(skip(state, payload, meta))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    meta: RequestMeta,
    Json(mut payload): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    // Friendly pre-check; the unique index is the authoritative guard.
    if user_repo::get_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::AlreadyExists("Email already registered.".into()));
    }

    let user = user_repo::create(&state.db, &payload.email, &payload.password, payload.user_type)
        .await?;

    info!(user_id = %user.id, "user created");
    audit::spawn_register(&state.db, admin.id, "create", "users", meta);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(p): Query<Pagination>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = repo::get_multi::<User>(&state.db, p.offset(), p.limit()).await?;
    let total = repo::count::<User>(&state.db).await?;
    Ok(Json(UserListResponse {
        user_data: users.into_iter().map(UserResponse::from).collect(),
        total,
        page: p.page(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repo::get::<User>(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, payload, meta))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = payload.into_patch()?;

    if let Some(email) = &patch.email {
        if let Some(existing) = user_repo::get_by_email(&state.db, email).await? {
            if existing.id != id {
                return Err(ApiError::AlreadyExists("Email already registered.".into()));
            }
        }
    }

    let user = repo::update::<User, _>(&state.db, id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;

    info!(user_id = %user.id, "user updated");
    audit::spawn_register(&state.db, admin.id, "update", "users", meta);
    Ok(Json(UserResponse::from(user)))
}
