use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::OrderDetail,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_quantity(self.quantity)
    }
}

/// Full replacement of an order line: both the product and the quantity.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl UpdateOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_quantity(self.quantity)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderDetail>,
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be positive".into()));
    }
    Ok(())
}
