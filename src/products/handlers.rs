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
    products::{
        dto::{ProductCreateRequest, ProductResponse, ProductUpdateRequest},
        repo::{self as product_repo, Product},
    },
    repo,
    state::AppState,
    users::dto::Pagination,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id", put(update_product))
}

#[instrument(skip(state, payload, meta))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    meta: RequestMeta,
    Json(payload): Json<ProductCreateRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    payload.validate()?;

    // Friendly pre-checks; the unique indexes remain the authoritative
    // guard, and their rejection also maps to 409.
    if product_repo::get_by_sku(&state.db, &payload.sku).await?.is_some() {
        return Err(ApiError::AlreadyExists("SKU already exists.".into()));
    }
    if product_repo::get_by_name(&state.db, &payload.name).await?.is_some() {
        return Err(ApiError::AlreadyExists("Product name already exists.".into()));
    }

    let product: Product = repo::create(&state.db, &payload.into_insert()).await?;

    info!(product_id = %product.id, sku = %product.sku, "product created");
    audit::spawn_register(&state.db, admin.id, "create", "products", meta);
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = repo::get::<Product>(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;
    Ok(Json(ProductResponse::from(product)))
}

/// An empty catalog is an empty 200 list, not a 404.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = repo::get_multi::<Product>(&state.db, p.offset(), p.limit()).await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

#[instrument(skip(state, payload, meta))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdateRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let patch = payload.into_patch()?;

    if let Some(sku) = &patch.sku {
        if let Some(existing) = product_repo::get_by_sku(&state.db, sku).await? {
            if existing.id != id {
                return Err(ApiError::AlreadyExists("SKU already exists.".into()));
            }
        }
    }
    if let Some(name) = &patch.name {
        if let Some(existing) = product_repo::get_by_name(&state.db, name).await? {
            if existing.id != id {
                return Err(ApiError::AlreadyExists("Product name already exists.".into()));
            }
        }
    }

    let product = repo::update::<Product, _>(&state.db, id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;

    info!(product_id = %product.id, sku = %product.sku, "product updated");
    audit::spawn_register(&state.db, admin.id, "update", "products", meta);

    let notifier = state.notifier.clone();
    let message = format!("Product {} was updated.", product.sku);
    tokio::spawn(async move {
        notifier.notify_admins(&message).await;
    });

    Ok(Json(ProductResponse::from(product)))
}
