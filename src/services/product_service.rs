use sea_orm::{ActiveValue::NotSet, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Model as ProductModel},
    error::{AppError, AppResult, OrNotFound},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin, include_deleted_for},
    models::Product,
    repository::{Page, ProductStore, UserStore},
    response::{Acknowledged, ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

const PRODUCTS: ProductStore = ProductStore::new();
const USERS: UserStore = UserStore::new();

pub async fn get_product(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
    include_deleted: bool,
) -> AppResult<ApiResponse<Product>> {
    let include_deleted = include_deleted_for(user, include_deleted);
    let product = PRODUCTS
        .find_by_id(&state.orm, id, include_deleted)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn list_all_products(
    state: &AppState,
    user: Option<&AuthUser>,
    include_deleted: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let include_deleted = include_deleted_for(user, include_deleted);
    let items = PRODUCTS.find_all(&state.orm, include_deleted).await?;
    Ok(product_list(items))
}

pub async fn list_products(
    state: &AppState,
    user: Option<&AuthUser>,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let include_deleted = include_deleted_for(user, query.requested_deleted());
    let page = PRODUCTS
        .paginated(&state.orm, &query.page_query(include_deleted))
        .await?;
    Ok(product_page(page))
}

pub async fn list_products_by_owner(
    state: &AppState,
    user: Option<&AuthUser>,
    owner_id: Uuid,
    include_deleted: bool,
) -> AppResult<ApiResponse<ProductList>> {
    let include_deleted = include_deleted_for(user, include_deleted);
    USERS
        .find_by_id(&state.orm, owner_id, include_deleted)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let items = PRODUCTS
        .find_all_by_owner(&state.orm, owner_id, include_deleted)
        .await?;
    Ok(product_list(items))
}

pub async fn paginated_products_by_owner(
    state: &AppState,
    user: Option<&AuthUser>,
    owner_id: Uuid,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let include_deleted = include_deleted_for(user, query.requested_deleted());
    USERS
        .find_by_id(&state.orm, owner_id, include_deleted)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let page = PRODUCTS
        .paginated_by_owner(&state.orm, owner_id, &query.page_query(include_deleted))
        .await?;
    Ok(product_page(page))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    payload.validate()?;
    USERS
        .find_by_id(&state.orm, user.user_id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_owned()),
        price: Set(payload.price),
        stock: Set(payload.stock),
        user_id: Set(user.user_id),
        created_at: NotSet,
        updated_at: NotSet,
        is_deleted: NotSet,
        deleted_at: NotSet,
    };
    let product = PRODUCTS.create(&state.orm, active).await?;

    tracing::info!(
        product_id = %product.id,
        owner_id = %user.user_id,
        stock = product.stock,
        "product created"
    );

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    payload.validate()?;
    let txn = state.orm.begin().await?;

    // Locked so a concurrent order cannot reserve against a stale stock value.
    let existing = PRODUCTS
        .find_by_id_for_update(&txn, id, false)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let product = PRODUCTS.update(&txn, apply_patch(existing, payload)).await?;
    txn.commit().await?;

    tracing::info!(
        product_id = %product.id,
        user_id = %user.user_id,
        stock = product.stock,
        "product updated"
    );

    Ok(ApiResponse::success(
        "Updated",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Acknowledged>> {
    let existing = PRODUCTS
        .find_by_id(&state.orm, id, false)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let ok = PRODUCTS
        .delete(&state.orm, id)
        .await
        .or_not_found(AppError::ProductNotFound)?;

    tracing::info!(product_id = %id, user_id = %user.user_id, "product deleted");

    Ok(ApiResponse::success(
        "Deleted",
        Acknowledged { ok },
        Some(Meta::empty()),
    ))
}

pub async fn restore_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = PRODUCTS
        .find_by_id(&state.orm, id, true)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    if !existing.is_deleted {
        return Err(AppError::ProductNotFound);
    }

    PRODUCTS
        .restore(&state.orm, id)
        .await
        .or_not_found(AppError::ProductNotFound)?;
    let product = PRODUCTS
        .find_by_id(&state.orm, id, false)
        .await
        .or_not_found(AppError::ProductNotFound)?;

    tracing::info!(product_id = %id, admin_id = %user.user_id, "product restored");

    Ok(ApiResponse::success(
        "Restored",
        product.into(),
        Some(Meta::empty()),
    ))
}

fn apply_patch(mut product: ProductModel, patch: UpdateProductRequest) -> ProductModel {
    if let Some(name) = patch.name {
        product.name = name.trim().to_owned();
    }
    if let Some(price) = patch.price {
        product.price = price;
    }
    if let Some(stock) = patch.stock {
        product.stock = stock;
    }
    product
}

fn product_list(models: Vec<ProductModel>) -> ApiResponse<ProductList> {
    let total = models.len() as u64;
    let items = models.into_iter().map(Product::from).collect();
    ApiResponse::success("Products", ProductList { items }, Some(Meta::new(1, total, total)))
}

fn product_page(page: Page<ProductModel>) -> ApiResponse<ProductList> {
    let meta = Meta::from_page(&page);
    let items = page.items.into_iter().map(Product::from).collect();
    ApiResponse::success("Products", ProductList { items }, Some(meta))
}
