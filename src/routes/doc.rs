use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            LoginRequest, LoginResponse, PendingRegistration, RefreshRequest, RegisterRequest,
            TokenPair,
        },
        orders::{CreateOrderRequest, OrderList, UpdateOrderRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        users::{UpdateUserRequest, UserList},
    },
    entity::Role,
    models::{Order, OrderDetail, Product, User},
    response::{Acknowledged, ApiResponse, Meta},
    routes::{auth, health, orders, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::verify,
        auth::login,
        auth::refresh,
        users::list_users,
        users::list_all_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::restore_user,
        products::list_products,
        products::list_all_products,
        products::list_owner_products,
        products::paginate_owner_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::restore_product,
        orders::list_orders,
        orders::list_all_orders,
        orders::list_user_orders,
        orders::paginate_user_orders,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::delete_order,
        orders::restore_order
    ),
    components(
        schemas(
            Role,
            User,
            Product,
            Order,
            OrderDetail,
            Acknowledged,
            RegisterRequest,
            PendingRegistration,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            TokenPair,
            UpdateUserRequest,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderList,
            params::SortOrder,
            params::ProductSearchField,
            params::ProductSortBy,
            params::UserSearchField,
            params::UserSortBy,
            params::OrderSearchField,
            params::OrderSortBy,
            health::HealthData,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<OrderDetail>,
            ApiResponse<ProductList>,
            ApiResponse<OrderList>,
            ApiResponse<UserList>,
            ApiResponse<Acknowledged>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, e-mail verification and tokens"),
        (name = "Users", description = "User accounts"),
        (name = "Products", description = "Product catalog"),
        (name = "Orders", description = "Orders and stock reservation"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
