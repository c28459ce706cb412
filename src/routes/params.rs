use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::entity::{orders, products, users};
use crate::repository::{OrderSearchColumn, PageQuery};

pub use crate::repository::SortOrder;

#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    pub fn normalize(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page)
    }
}

fn page_query<C>(
    pagination: Pagination,
    search: Option<&String>,
    search_field: Option<C>,
    sort_field: C,
    sort_order: Option<SortOrder>,
    include_deleted: bool,
) -> PageQuery<C> {
    let (page, limit) = pagination.normalize();
    PageQuery {
        page,
        limit,
        search: search.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()),
        search_field,
        sort_field,
        sort_order: sort_order.unwrap_or(SortOrder::Desc),
        include_deleted,
    }
}

/// `?include_deleted=` on non-paginated listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeletedFilter {
    pub include_deleted: Option<bool>,
}

impl DeletedFilter {
    pub fn requested(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSearchField {
    Name,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    UpdatedAt,
    Name,
    Price,
    Stock,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring matched against `search_field`.
    pub search: Option<String>,
    pub search_field: Option<ProductSearchField>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
    pub include_deleted: Option<bool>,
}

impl ProductQuery {
    pub fn requested_deleted(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }

    pub fn page_query(&self, include_deleted: bool) -> PageQuery<products::Column> {
        let search_field = match self.search_field.unwrap_or(ProductSearchField::Name) {
            ProductSearchField::Name => products::Column::Name,
        };
        let sort_field = match self.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
            ProductSortBy::CreatedAt => products::Column::CreatedAt,
            ProductSortBy::UpdatedAt => products::Column::UpdatedAt,
            ProductSortBy::Name => products::Column::Name,
            ProductSortBy::Price => products::Column::Price,
            ProductSortBy::Stock => products::Column::Stock,
        };
        page_query(
            Pagination {
                page: self.page,
                per_page: self.per_page,
            },
            self.search.as_ref(),
            Some(search_field),
            sort_field,
            self.sort_order,
            include_deleted,
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserSearchField {
    Username,
    Email,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserSortBy {
    CreatedAt,
    UpdatedAt,
    Username,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub search_field: Option<UserSearchField>,
    pub sort_by: Option<UserSortBy>,
    pub sort_order: Option<SortOrder>,
    pub include_deleted: Option<bool>,
}

impl UserQuery {
    pub fn requested_deleted(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }

    pub fn page_query(&self, include_deleted: bool) -> PageQuery<users::Column> {
        let search_field = match self.search_field.unwrap_or(UserSearchField::Username) {
            UserSearchField::Username => users::Column::Username,
            UserSearchField::Email => users::Column::Email,
        };
        let sort_field = match self.sort_by.unwrap_or(UserSortBy::CreatedAt) {
            UserSortBy::CreatedAt => users::Column::CreatedAt,
            UserSortBy::UpdatedAt => users::Column::UpdatedAt,
            UserSortBy::Username => users::Column::Username,
        };
        page_query(
            Pagination {
                page: self.page,
                per_page: self.per_page,
            },
            self.search.as_ref(),
            Some(search_field),
            sort_field,
            self.sort_order,
            include_deleted,
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSearchField {
    ProductName,
    Username,
    Email,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortBy {
    CreatedAt,
    UpdatedAt,
    Quantity,
    Total,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Matched against the ordered product's name unless `search_field` says otherwise.
    pub search: Option<String>,
    pub search_field: Option<OrderSearchField>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
    pub include_deleted: Option<bool>,
}

impl OrderListQuery {
    pub fn requested_deleted(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }

    pub fn search_column(&self) -> OrderSearchColumn {
        match self.search_field.unwrap_or(OrderSearchField::ProductName) {
            OrderSearchField::ProductName => OrderSearchColumn::ProductName,
            OrderSearchField::Username => OrderSearchColumn::Username,
            OrderSearchField::Email => OrderSearchColumn::Email,
        }
    }

    /// The search column lives on a joined table, so it is passed alongside
    /// this query through [`Self::search_column`].
    pub fn page_query(&self, include_deleted: bool) -> PageQuery<orders::Column> {
        let sort_field = match self.sort_by.unwrap_or(OrderSortBy::CreatedAt) {
            OrderSortBy::CreatedAt => orders::Column::CreatedAt,
            OrderSortBy::UpdatedAt => orders::Column::UpdatedAt,
            OrderSortBy::Quantity => orders::Column::Quantity,
            OrderSortBy::Total => orders::Column::Total,
        };
        page_query(
            Pagination {
                page: self.page,
                per_page: self.per_page,
            },
            self.search.as_ref(),
            None,
            sort_field,
            self.sort_order,
            include_deleted,
        )
    }
}
