use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::Product,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: i32,
}

impl CreateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    Ok(())
}

/// Largest price the `NUMERIC(12, 2)` column holds.
fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    // Stored with two decimals; more precision would be rounded away.
    if price.normalize().scale() > 2 {
        return Err(AppError::BadRequest(
            "Price cannot have more than 2 decimal places".into(),
        ));
    }
    if price > max_price() {
        return Err(AppError::BadRequest("Price is out of range".into()));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }
    Ok(())
}
