use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::{Acknowledged, ApiResponse},
    routes::params::{DeletedFilter, ProductQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/all", get(list_all_products))
        .route("/user/{id}", get(list_owner_products))
        .route("/user/{id}/paginated", get(paginate_owner_products))
        .route(
            "/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/{id}/restore", post(restore_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Paginated products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, user.as_ref(), query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/all",
    params(DeletedFilter),
    responses(
        (status = 200, description = "All products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_all_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(filter): Query<DeletedFilter>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp =
        product_service::list_all_products(&state, user.as_ref(), filter.requested()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/user/{id}",
    params(("id" = Uuid, Path, description = "Owner user ID"), DeletedFilter),
    responses(
        (status = 200, description = "Products owned by a user", body = ApiResponse<ProductList>),
        (status = 404, description = "User not found")
    ),
    tag = "Products"
)]
pub async fn list_owner_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(filter): Query<DeletedFilter>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp =
        product_service::list_products_by_owner(&state, user.as_ref(), id, filter.requested())
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/user/{id}/paginated",
    params(("id" = Uuid, Path, description = "Owner user ID"), ProductQuery),
    responses(
        (status = 200, description = "Paginated products of a user", body = ApiResponse<ProductList>),
        (status = 404, description = "User not found")
    ),
    tag = "Products"
)]
pub async fn paginate_owner_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp =
        product_service::paginated_products_by_owner(&state, user.as_ref(), id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID"), DeletedFilter),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(filter): Query<DeletedFilter>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp =
        product_service::get_product(&state, user.as_ref(), id, filter.requested()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update product", body = ApiResponse<Product>),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Delete product", body = ApiResponse<Acknowledged>),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Acknowledged>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/restore",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Restore product", body = ApiResponse<Product>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "No deleted product with this id")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn restore_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::restore_product(&state, &user, id).await?;
    Ok(Json(resp))
}
