use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::products::repo::{Product, ProductInsert, ProductPatch};
use crate::users::dto::{double_option, reject_explicit_null};

#[derive(Debug, Deserialize)]
pub struct ProductCreateRequest {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub brand: String,
}

fn check_non_empty(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "This field is required.", json!(value)));
    }
}

fn check_price(errors: &mut Vec<FieldError>, price: f64) {
    if !(price.is_finite() && price > 0.0) {
        errors.push(FieldError::new(
            "price",
            "Input should be greater than 0.",
            json!(price),
        ));
    }
}

impl ProductCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        check_non_empty(&mut errors, "sku", &self.sku);
        check_non_empty(&mut errors, "name", &self.name);
        check_non_empty(&mut errors, "brand", &self.brand);
        check_price(&mut errors, self.price);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    pub fn into_insert(self) -> ProductInsert {
        ProductInsert {
            sku: self.sku,
            name: self.name,
            price: self.price,
            brand: self.brand,
        }
    }
}

/// Partial update: absent fields leave existing values untouched, while an
/// explicit `null` is a validation error.
#[derive(Debug, Default, Deserialize)]
pub struct ProductUpdateRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
}

impl ProductUpdateRequest {
    pub fn into_patch(self) -> Result<ProductPatch, ApiError> {
        let mut errors = Vec::new();
        let sku = reject_explicit_null(&mut errors, "sku", self.sku);
        let name = reject_explicit_null(&mut errors, "name", self.name);
        let price = reject_explicit_null(&mut errors, "price", self.price);
        let brand = reject_explicit_null(&mut errors, "brand", self.brand);

        if let Some(sku) = &sku {
            check_non_empty(&mut errors, "sku", sku);
        }
        if let Some(name) = &name {
            check_non_empty(&mut errors, "name", name);
        }
        if let Some(brand) = &brand {
            check_non_empty(&mut errors, "brand", brand);
        }
        if let Some(price) = price {
            check_price(&mut errors, price);
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(ProductPatch {
            sku,
            name,
            price,
            brand,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub brand: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            sku: product.sku,
            name: product.name,
            price: product.price,
            brand: product.brand,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_price() {
        let req = ProductCreateRequest {
            sku: "PROD-0001".into(),
            name: "Anvil".into(),
            price: -1.0,
            brand: "Acme".into(),
        };
        match req.validate().unwrap_err() {
            ApiError::Validation(details) => {
                assert_eq!(details[0].field, "price");
                assert_eq!(details[0].input, json!(-1.0));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_required_fields() {
        let req = ProductCreateRequest {
            sku: "  ".into(),
            name: String::new(),
            price: 5.0,
            brand: "Acme".into(),
        };
        match req.validate().unwrap_err() {
            ApiError::Validation(details) => {
                let fields: Vec<_> = details.iter().map(|d| d.field).collect();
                assert_eq!(fields, vec!["sku", "name"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let req: ProductUpdateRequest =
            serde_json::from_str(r#"{"price": 12.5}"#).expect("parse");
        let patch = req.into_patch().expect("patch");
        assert_eq!(patch.price, Some(12.5));
        assert!(patch.sku.is_none());
        assert!(patch.name.is_none());
        assert!(patch.brand.is_none());
    }

    #[test]
    fn update_rejects_supplied_invalid_price() {
        let req = ProductUpdateRequest {
            price: Some(Some(0.0)),
            ..Default::default()
        };
        assert!(matches!(
            req.into_patch().unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn update_rejects_explicit_null_field() {
        let req: ProductUpdateRequest =
            serde_json::from_str(r#"{"price": null}"#).expect("parse");
        match req.into_patch().unwrap_err() {
            ApiError::Validation(details) => {
                assert_eq!(details[0].field, "price");
                assert!(details[0].message.contains("null"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
