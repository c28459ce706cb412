mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{PRODUCTS, USERS, create_product, create_user, setup, stock_of};
use storefront_api::{
    dto::orders::{CreateOrderRequest, UpdateOrderRequest},
    entity::Role,
    error::AppError,
    routes::params::OrderListQuery,
    services::order_service,
};

fn order(product_id: Uuid, quantity: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        product_id,
        quantity,
    }
}

fn change(product_id: Uuid, quantity: i32) -> UpdateOrderRequest {
    UpdateOrderRequest {
        product_id,
        quantity,
    }
}

// Place 4, raise to 6, delete as admin, restore: stock follows each step.
#[tokio::test]
async fn order_lifecycle_keeps_stock_in_step() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Widget", Decimal::new(50, 1), 10).await?;

    let created = order_service::create_order(state, &buyer, order(product.id, 4))
        .await?
        .data
        .expect("order");
    assert_eq!(created.order.total, Decimal::new(200, 1));
    assert_eq!(created.order.user_id, buyer.user_id);
    assert_eq!(created.product_name.as_deref(), Some("Widget"));
    assert_eq!(stock_of(state, product.id).await?, 6);

    let updated = order_service::update_order(
        state,
        &buyer,
        created.order.id,
        change(product.id, 6),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.order.quantity, 6);
    assert_eq!(updated.order.total, Decimal::new(300, 1));
    assert_eq!(stock_of(state, product.id).await?, 4);

    order_service::delete_order(state, &admin, created.order.id).await?;
    assert_eq!(stock_of(state, product.id).await?, 10);

    let restored = order_service::restore_order(state, &admin, created.order.id)
        .await?
        .data
        .expect("order");
    assert!(!restored.order.is_deleted);
    assert_eq!(stock_of(state, product.id).await?, 4);

    Ok(())
}

#[tokio::test]
async fn ordering_the_whole_stock_succeeds_and_one_more_fails() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &buyer, "Lamp", Decimal::new(1999, 2), 5).await?;

    let too_many = order_service::create_order(state, &buyer, order(product.id, 6)).await;
    assert!(matches!(too_many, Err(AppError::InsufficientStock(id)) if id == product.id));
    assert_eq!(stock_of(state, product.id).await?, 5);

    order_service::create_order(state, &buyer, order(product.id, 5)).await?;
    assert_eq!(stock_of(state, product.id).await?, 0);

    let empty = order_service::create_order(state, &buyer, order(product.id, 1)).await;
    assert!(matches!(empty, Err(AppError::InsufficientStock(_))));
    assert_eq!(stock_of(state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn create_then_delete_returns_stock_exactly() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &buyer, "Chair", Decimal::new(4500, 2), 12).await?;

    let placed = order_service::create_order(state, &buyer, order(product.id, 7))
        .await?
        .data
        .expect("order");
    assert_eq!(stock_of(state, product.id).await?, 5);

    let deleted = order_service::delete_order(state, &buyer, placed.order.id)
        .await?
        .data
        .expect("ack");
    assert!(deleted.ok);
    assert_eq!(stock_of(state, product.id).await?, 12);

    let again = order_service::delete_order(state, &buyer, placed.order.id).await;
    assert!(matches!(again, Err(AppError::OrderNotFound)));
    assert_eq!(stock_of(state, product.id).await?, 12);

    Ok(())
}

#[tokio::test]
async fn moving_an_order_to_another_product_moves_the_reservation() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let buyer = create_user(state, Role::User).await?;
    let first = create_product(state, &buyer, "Red Mug", Decimal::new(800, 2), 10).await?;
    let second = create_product(state, &buyer, "Blue Mug", Decimal::new(900, 2), 5).await?;

    let placed = order_service::create_order(state, &buyer, order(first.id, 3))
        .await?
        .data
        .expect("order");
    assert_eq!(stock_of(state, first.id).await?, 7);

    let moved = order_service::update_order(state, &buyer, placed.order.id, change(second.id, 2))
        .await?
        .data
        .expect("order");
    assert_eq!(moved.order.product_id, second.id);
    assert_eq!(moved.order.total, Decimal::new(1800, 2));
    assert_eq!(moved.product_name.as_deref(), Some("Blue Mug"));
    assert_eq!(stock_of(state, first.id).await?, 10);
    assert_eq!(stock_of(state, second.id).await?, 3);

    // Not enough on the target: nothing moves, including the restock.
    let refused =
        order_service::update_order(state, &buyer, placed.order.id, change(first.id, 11)).await;
    assert!(matches!(refused, Err(AppError::InsufficientStock(id)) if id == first.id));
    assert_eq!(stock_of(state, first.id).await?, 10);
    assert_eq!(stock_of(state, second.id).await?, 3);

    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_touch_an_order() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let owner = create_user(state, Role::User).await?;
    let stranger = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Desk", Decimal::new(12000, 2), 3).await?;

    let placed = order_service::create_order(state, &owner, order(product.id, 1))
        .await?
        .data
        .expect("order");
    let id = placed.order.id;

    assert!(matches!(
        order_service::get_order(state, &stranger, id, false).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::update_order(state, &stranger, id, change(product.id, 2)).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::delete_order(state, &stranger, id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::list_user_orders(state, &stranger, owner.user_id, false).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::list_all_orders(state, &owner, false).await,
        Err(AppError::Forbidden)
    ));
    assert_eq!(stock_of(state, product.id).await?, 2);

    let seen = order_service::get_order(state, &admin, id, false)
        .await?
        .data
        .expect("order");
    assert_eq!(seen.order.id, id);

    order_service::update_order(state, &admin, id, change(product.id, 3)).await?;
    assert_eq!(stock_of(state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn restore_needs_admin_a_deleted_order_and_free_stock() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Kettle", Decimal::new(3000, 2), 4).await?;

    let placed = order_service::create_order(state, &buyer, order(product.id, 3))
        .await?
        .data
        .expect("order");
    let id = placed.order.id;

    assert!(matches!(
        order_service::restore_order(state, &admin, id).await,
        Err(AppError::OrderNotFound)
    ));

    order_service::delete_order(state, &buyer, id).await?;
    assert!(matches!(
        order_service::restore_order(state, &buyer, id).await,
        Err(AppError::Forbidden)
    ));

    // Someone else takes most of the stock while the order is deleted.
    order_service::create_order(state, &admin, order(product.id, 2)).await?;
    assert!(matches!(
        order_service::restore_order(state, &admin, id).await,
        Err(AppError::InsufficientStock(_))
    ));
    assert_eq!(stock_of(state, product.id).await?, 2);

    assert!(matches!(
        order_service::restore_order(state, &admin, Uuid::new_v4()).await,
        Err(AppError::OrderNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn deleting_an_order_restocks_a_deleted_product() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &buyer, "Vase", Decimal::new(2500, 2), 6).await?;

    let placed = order_service::create_order(state, &buyer, order(product.id, 2))
        .await?
        .data
        .expect("order");
    PRODUCTS.delete(&state.orm, product.id).await?;

    assert!(matches!(
        order_service::create_order(state, &buyer, order(product.id, 1)).await,
        Err(AppError::ProductNotFound)
    ));
    assert!(matches!(
        order_service::update_order(state, &buyer, placed.order.id, change(product.id, 1)).await,
        Err(AppError::ProductNotFound)
    ));

    order_service::delete_order(state, &buyer, placed.order.id).await?;
    assert_eq!(stock_of(state, product.id).await?, 6);

    Ok(())
}

#[tokio::test]
async fn concurrent_orders_cannot_oversell() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let first = create_user(state, Role::User).await?;
    let second = create_user(state, Role::User).await?;
    let product = create_product(state, &first, "Limited Print", Decimal::new(10000, 2), 5).await?;

    let (a, b) = tokio::join!(
        order_service::create_order(state, &first, order(product.id, 5)),
        order_service::create_order(state, &second, order(product.id, 5)),
    );

    let succeeded = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    assert!(
        matches!(a, Err(AppError::InsufficientStock(_)))
            || matches!(b, Err(AppError::InsufficientStock(_)))
    );
    assert_eq!(stock_of(state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn deleted_orders_are_only_listed_for_admins() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Notebook", Decimal::new(350, 2), 20).await?;

    let kept = order_service::create_order(state, &buyer, order(product.id, 1))
        .await?
        .data
        .expect("order");
    let dropped = order_service::create_order(state, &buyer, order(product.id, 2))
        .await?
        .data
        .expect("order");
    order_service::delete_order(state, &buyer, dropped.order.id).await?;

    let own = order_service::list_user_orders(state, &buyer, buyer.user_id, true)
        .await?
        .data
        .expect("orders");
    assert_eq!(own.items.len(), 1);
    assert_eq!(own.items[0].order.id, kept.order.id);
    assert!(own.items[0].email.is_some());

    assert!(matches!(
        order_service::get_order(state, &buyer, dropped.order.id, true).await,
        Err(AppError::OrderNotFound)
    ));

    let everything = order_service::list_user_orders(state, &admin, buyer.user_id, true)
        .await?
        .data
        .expect("orders");
    assert_eq!(everything.items.len(), 2);

    let page = order_service::paginated_user_orders(
        state,
        &admin,
        buyer.user_id,
        OrderListQuery {
            per_page: Some(1),
            include_deleted: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let meta = page.meta.expect("meta");
    assert_eq!(meta.total, Some(2));
    assert_eq!(meta.total_pages, Some(2));
    assert_eq!(meta.has_next, Some(true));

    assert!(matches!(
        order_service::list_user_orders(state, &admin, Uuid::new_v4(), false).await,
        Err(AppError::UserNotFound)
    ));

    Ok(())
}

#[tokio::test]
async fn active_orders_and_stock_add_up_to_the_catalog() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Lamp", Decimal::new(1250, 2), 30).await?;

    let a = order_service::create_order(state, &buyer, order(product.id, 3))
        .await?
        .data
        .expect("order");
    let b = order_service::create_order(state, &buyer, order(product.id, 5))
        .await?
        .data
        .expect("order");
    order_service::create_order(state, &buyer, order(product.id, 2)).await?;
    order_service::update_order(state, &buyer, a.order.id, change(product.id, 7)).await?;
    order_service::delete_order(state, &buyer, b.order.id).await?;

    let active = order_service::list_user_orders(state, &buyer, buyer.user_id, false)
        .await?
        .data
        .expect("orders");
    let reserved: i32 = active.items.iter().map(|d| d.order.quantity).sum();
    let stock = stock_of(state, product.id).await?;
    assert_eq!(reserved, 9);
    assert!(stock >= 0);
    assert_eq!(reserved + stock, 30);

    Ok(())
}

#[tokio::test]
async fn totals_too_large_to_store_are_bad_requests() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let buyer = create_user(state, Role::User).await?;
    let priciest = Decimal::new(999_999_999_999, 2);
    let product = create_product(state, &buyer, "Yacht", priciest, 1_000_000).await?;

    let refused = order_service::create_order(state, &buyer, order(product.id, 1_000_000)).await;
    assert!(matches!(refused, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(state, product.id).await?, 1_000_000);

    let placed = order_service::create_order(state, &buyer, order(product.id, 100))
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total, Decimal::new(99_999_999_999_900, 2));

    let grown =
        order_service::update_order(state, &buyer, placed.order.id, change(product.id, 101)).await;
    assert!(matches!(grown, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(state, product.id).await?, 999_900);

    Ok(())
}

#[tokio::test]
async fn orders_of_a_deleted_account_are_not_listed() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let admin = create_user(state, Role::Admin).await?;
    let buyer = create_user(state, Role::User).await?;
    let product = create_product(state, &admin, "Stool", Decimal::new(2000, 2), 5).await?;
    order_service::create_order(state, &buyer, order(product.id, 1)).await?;
    USERS.delete(&state.orm, buyer.user_id).await?;

    assert!(matches!(
        order_service::list_user_orders(state, &admin, buyer.user_id, true).await,
        Err(AppError::UserNotFound)
    ));
    assert!(matches!(
        order_service::paginated_user_orders(
            state,
            &admin,
            buyer.user_id,
            OrderListQuery {
                include_deleted: Some(true),
                ..Default::default()
            },
        )
        .await,
        Err(AppError::UserNotFound)
    ));

    Ok(())
}
