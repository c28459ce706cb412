//! Order lifecycle with stock reservation.
//!
//! While an order is live its quantity is held back from the product's
//! stock. Every write below runs in one transaction and locks the order row,
//! then the product rows it touches in ascending id order, before reading any
//! stock figure it is going to change.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, DatabaseTransaction, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderRequest},
    entity::{orders::ActiveModel as OrderActive, products::Model as ProductModel},
    error::{AppError, AppResult, OrNotFound},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin, include_deleted_for},
    models::OrderDetail,
    repository::{OrderDetailRow, OrderStore, ProductStore, UserStore},
    response::{Acknowledged, ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
};

const ORDERS: OrderStore = OrderStore::new();
const PRODUCTS: ProductStore = ProductStore::new();
const USERS: UserStore = UserStore::new();

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    payload.validate()?;
    let txn = state.orm.begin().await?;

    USERS
        .find_by_id(&txn, user.user_id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;
    let product = PRODUCTS
        .find_by_id_for_update(&txn, payload.product_id, false)
        .await
        .or_not_found(AppError::ProductNotFound)?;

    let remaining = reserve_stock(product.stock, 0, payload.quantity)
        .ok_or(AppError::InsufficientStock(product.id))?;
    let total = line_total(product.price, payload.quantity)?;

    let order = ORDERS
        .create(
            &txn,
            OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                total: Set(total),
                created_at: NotSet,
                updated_at: NotSet,
                is_deleted: NotSet,
                deleted_at: NotSet,
            },
        )
        .await?;
    PRODUCTS.set_stock(&txn, product.id, remaining).await?;

    let detail = load_detail(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        product_id = %product.id,
        quantity = order.quantity,
        stock = remaining,
        "order created"
    );

    Ok(ApiResponse::success(
        "Order created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    payload.validate()?;
    let txn = state.orm.begin().await?;

    let order = ORDERS
        .find_by_id_for_update(&txn, id, false)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    ensure_owner_or_admin(user, order.user_id)?;
    USERS
        .find_by_id(&txn, user.user_id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let product_changed = order.product_id != payload.product_id;
    let (product, remaining) = if product_changed {
        let (previous, next) = lock_products(&txn, order.product_id, payload.product_id).await?;
        let restocked = restock(previous.stock, order.quantity)?;
        PRODUCTS.set_stock(&txn, previous.id, restocked).await?;

        let remaining = reserve_stock(next.stock, 0, payload.quantity)
            .ok_or(AppError::InsufficientStock(next.id))?;
        (next, remaining)
    } else {
        let current = PRODUCTS
            .find_by_id_for_update(&txn, order.product_id, false)
            .await
            .or_not_found(AppError::ProductNotFound)?;

        let remaining = reserve_stock(current.stock, order.quantity, payload.quantity)
            .ok_or(AppError::InsufficientStock(current.id))?;
        (current, remaining)
    };
    PRODUCTS.set_stock(&txn, product.id, remaining).await?;

    let mut changed = order;
    changed.product_id = product.id;
    changed.quantity = payload.quantity;
    changed.total = line_total(product.price, payload.quantity)?;
    let order = ORDERS.update(&txn, changed).await?;

    let detail = load_detail(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        product_id = %product.id,
        product_changed,
        quantity = order.quantity,
        stock = remaining,
        "order updated"
    );

    Ok(ApiResponse::success(
        "Order updated",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Acknowledged>> {
    let txn = state.orm.begin().await?;

    let order = ORDERS
        .find_by_id_for_update(&txn, id, false)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    ensure_owner_or_admin(user, order.user_id)?;

    // The product may have been deleted since; its stock is still returned.
    let product = PRODUCTS
        .find_by_id_for_update(&txn, order.product_id, true)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    let restocked = restock(product.stock, order.quantity)?;
    PRODUCTS.set_stock(&txn, product.id, restocked).await?;

    let ok = ORDERS
        .delete(&txn, order.id)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        product_id = %product.id,
        stock = restocked,
        "order deleted"
    );

    Ok(ApiResponse::success(
        "Order deleted",
        Acknowledged { ok },
        Some(Meta::empty()),
    ))
}

pub async fn restore_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let order = ORDERS
        .find_by_id_for_update(&txn, id, true)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    if !order.is_deleted {
        return Err(AppError::OrderNotFound);
    }

    let product = PRODUCTS
        .find_by_id_for_update(&txn, order.product_id, true)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    let remaining = reserve_stock(product.stock, 0, order.quantity)
        .ok_or(AppError::InsufficientStock(product.id))?;
    PRODUCTS.set_stock(&txn, product.id, remaining).await?;

    ORDERS
        .restore(&txn, order.id)
        .await
        .or_not_found(AppError::OrderNotFound)?;

    let detail = load_detail(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        admin_id = %user.user_id,
        product_id = %product.id,
        stock = remaining,
        "order restored"
    );

    Ok(ApiResponse::success(
        "Order restored",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    include_deleted: bool,
) -> AppResult<ApiResponse<OrderDetail>> {
    let include_deleted = include_deleted_for(Some(user), include_deleted);
    let row = ORDERS
        .find_detail_by_id(&state.orm, id, include_deleted)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    ensure_owner_or_admin(user, row.user_id)?;

    Ok(ApiResponse::success("OK", row.into(), Some(Meta::empty())))
}

pub async fn list_user_orders(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    include_deleted: bool,
) -> AppResult<ApiResponse<OrderList>> {
    let include_deleted = include_deleted_for(Some(user), include_deleted);
    ensure_owner_or_admin(user, user_id)?;
    // The listed account itself must be live, even when deleted orders are shown.
    USERS
        .find_by_id(&state.orm, user_id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let rows = ORDERS
        .find_details_by_user(&state.orm, user_id, include_deleted)
        .await?;
    Ok(order_list(rows))
}

pub async fn paginated_user_orders(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let include_deleted = include_deleted_for(Some(user), query.requested_deleted());
    ensure_owner_or_admin(user, user_id)?;
    // The listed account itself must be live, even when deleted orders are shown.
    USERS
        .find_by_id(&state.orm, user_id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let page = ORDERS
        .paginated_details_by_user(
            &state.orm,
            user_id,
            &query.page_query(include_deleted),
            Some(query.search_column()),
        )
        .await?;
    let meta = Meta::from_page(&page);
    let items = page.items.into_iter().map(OrderDetail::from).collect();

    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    include_deleted: bool,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let rows = ORDERS
        .find_all_details(&state.orm, include_deleted)
        .await?;
    Ok(order_list(rows))
}

pub async fn paginated_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let page = ORDERS
        .paginated_details(
            &state.orm,
            &query.page_query(query.requested_deleted()),
            Some(query.search_column()),
        )
        .await?;
    let meta = Meta::from_page(&page);
    let items = page.items.into_iter().map(OrderDetail::from).collect();

    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

fn order_list(rows: Vec<OrderDetailRow>) -> ApiResponse<OrderList> {
    let total = rows.len() as u64;
    let items = rows.into_iter().map(OrderDetail::from).collect();
    ApiResponse::success("Ok", OrderList { items }, Some(Meta::new(1, total, total)))
}

async fn load_detail(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderDetail> {
    let row = ORDERS
        .find_detail_by_id(txn, id, false)
        .await
        .or_not_found(AppError::OrderNotFound)?;
    Ok(row.into())
}

/// Locks the product an order is moving away from and the one it moves to,
/// in ascending id order so concurrent swaps cannot deadlock.
///
/// The previous product may be soft-deleted; the next one may not.
async fn lock_products(
    txn: &DatabaseTransaction,
    previous_id: Uuid,
    next_id: Uuid,
) -> AppResult<(ProductModel, ProductModel)> {
    let (low, high) = if previous_id < next_id {
        (previous_id, next_id)
    } else {
        (next_id, previous_id)
    };

    let low = PRODUCTS
        .find_by_id_for_update(txn, low, true)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    let high = PRODUCTS
        .find_by_id_for_update(txn, high, true)
        .await
        .or_not_found(AppError::ProductNotFound)?;

    let (previous, next) = if low.id == previous_id {
        (low, high)
    } else {
        (high, low)
    };
    if next.is_deleted {
        return Err(AppError::ProductNotFound);
    }
    Ok((previous, next))
}

/// Stock left after reserving `requested` units, where `already_reserved`
/// units are held by the order being changed and count as available.
///
/// `None` when there is not enough stock.
pub fn reserve_stock(stock: i32, already_reserved: i32, requested: i32) -> Option<i32> {
    stock
        .checked_add(already_reserved)?
        .checked_sub(requested)
        .filter(|remaining| *remaining >= 0)
}

fn restock(stock: i32, quantity: i32) -> AppResult<i32> {
    stock
        .checked_add(quantity)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stock counter overflow")))
}

/// Largest total the `NUMERIC(14, 2)` column holds.
fn max_total() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

pub fn line_total(price: Decimal, quantity: i32) -> AppResult<Decimal> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= max_total())
        .ok_or_else(|| AppError::BadRequest("Order total is out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserving_exactly_the_stock_leaves_zero() {
        assert_eq!(reserve_stock(5, 0, 5), Some(0));
        assert_eq!(reserve_stock(5, 0, 6), None);
    }

    #[test]
    fn quantity_held_by_the_order_counts_as_available() {
        // 10 in catalog, order holds 4, stock shows 6.
        assert_eq!(reserve_stock(6, 4, 6), Some(4));
        assert_eq!(reserve_stock(6, 4, 10), Some(0));
        assert_eq!(reserve_stock(6, 4, 11), None);
    }

    #[test]
    fn overflow_is_treated_as_unavailable() {
        assert_eq!(reserve_stock(i32::MAX, 1, 1), None);
        assert!(restock(i32::MAX, 1).is_err());
        assert_eq!(restock(4, 6).unwrap(), 10);
    }

    #[test]
    fn totals_follow_price_times_quantity() {
        let price = Decimal::new(50, 1);
        assert_eq!(line_total(price, 4).unwrap(), Decimal::new(200, 1));
        assert_eq!(line_total(price, 6).unwrap(), Decimal::new(300, 1));
        assert!(line_total(Decimal::MAX, 2).is_err());
    }

    #[test]
    fn totals_beyond_the_stored_range_are_rejected() {
        let priciest = Decimal::new(999_999_999_999, 2);
        assert_eq!(line_total(priciest, 100).unwrap(), Decimal::new(99_999_999_999_900, 2));
        assert!(matches!(
            line_total(priciest, 101),
            Err(AppError::BadRequest(_))
        ));
        assert!(line_total(priciest, 1_000_000).is_err());
        assert_eq!(line_total(Decimal::new(1, 2), i32::MAX).unwrap(), Decimal::new(2_147_483_647, 2));
    }

    #[test]
    fn lifecycle_arithmetic_returns_to_catalog_stock() {
        let catalog = 10;
        let after_create = reserve_stock(catalog, 0, 4).unwrap();
        assert_eq!(after_create, 6);

        let after_update = reserve_stock(after_create, 4, 6).unwrap();
        assert_eq!(after_update, 4);

        let after_delete = restock(after_update, 6).unwrap();
        assert_eq!(after_delete, catalog);

        let after_restore = reserve_stock(after_delete, 0, 6).unwrap();
        assert_eq!(after_restore, 4);
    }
}
