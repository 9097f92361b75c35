use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::repo::{Assignments, Entity, InsertPayload, UpdatePatch};

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub brand: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static str = "id, sku, name, price, brand, created_at, updated_at";
}

pub struct ProductInsert {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub brand: String,
}

impl InsertPayload<Product> for ProductInsert {
    fn push_insert(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push("(sku, name, price, brand) VALUES (");
        let mut vals = qb.separated(", ");
        vals.push_bind(self.sku.clone());
        vals.push_bind(self.name.clone());
        vals.push_bind(self.price);
        vals.push_bind(self.brand.clone());
        qb.push(")");
    }
}

/// Allowed-mutable fields for a product.
#[derive(Debug, Default)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
}

impl UpdatePatch<Product> for ProductPatch {
    fn apply(&self, set: &mut Assignments<'_, '_>) {
        if let Some(sku) = &self.sku {
            set.set("sku", sku.clone());
        }
        if let Some(name) = &self.name {
            set.set("name", name.clone());
        }
        if let Some(price) = self.price {
            set.set("price", price);
        }
        if let Some(brand) = &self.brand {
            set.set("brand", brand.clone());
        }
    }
}

async fn get_by_unique(
    db: &PgPool,
    column: &str,
    value: &str,
) -> Result<Option<Product>, ApiError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM {} WHERE {column} = $1",
        Product::COLUMNS,
        Product::TABLE
    ))
    .bind(value)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn get_by_sku(db: &PgPool, sku: &str) -> Result<Option<Product>, ApiError> {
    get_by_unique(db, "sku", sku).await
}

pub async fn get_by_name(db: &PgPool, name: &str) -> Result<Option<Product>, ApiError> {
    get_by_unique(db, "name", name).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_payload_binds_all_product_columns() {
        let payload = ProductInsert {
            sku: "PROD-0001".into(),
            name: "Anvil".into(),
            price: 99.99,
            brand: "Acme".into(),
        };
        let mut qb = QueryBuilder::new("INSERT INTO products ");
        payload.push_insert(&mut qb);
        assert_eq!(
            qb.sql(),
            "INSERT INTO products (sku, name, price, brand) VALUES ($1, $2, $3, $4)"
        );
    }

    #[test]
    fn patch_with_price_only_touches_price() {
        let patch = ProductPatch {
            price: Some(10.0),
            ..Default::default()
        };
        let mut qb = QueryBuilder::new("UPDATE products SET ");
        let mut set = Assignments::new(&mut qb);
        patch.apply(&mut set);
        assert_eq!(set.count(), 1);
        assert_eq!(qb.sql(), "UPDATE products SET price = $1");
    }
}
