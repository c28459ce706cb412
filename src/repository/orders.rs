use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use super::{Page, PageQuery, RepoError, RepoResult, Repository, contains_pattern, paginate_into};
use crate::entity::{
    orders::{Column, Entity as Orders, Relation},
    products::{Column as ProdCol, Entity as Products},
    users::{Column as UserCol, Entity as Users},
};

pub type OrderStore = Repository<Orders>;

/// An order row joined with display fields of its user and product.
///
/// The joined columns are nullable because both joins are `LEFT JOIN`s.
#[derive(Debug, Clone, FromQueryResult)]
pub struct OrderDetailRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub total: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub product_name: Option<String>,
    pub product_price: Option<Decimal>,
}

fn detailed() -> Select<Orders> {
    Orders::find()
        .join(JoinType::LeftJoin, Relation::Users.def())
        .join(JoinType::LeftJoin, Relation::Products.def())
        .column_as(UserCol::Username, "username")
        .column_as(UserCol::Email, "email")
        .column_as(ProdCol::Name, "product_name")
        .column_as(ProdCol::Price, "product_price")
}

/// Joined columns an order listing can be searched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSearchColumn {
    ProductName,
    Username,
    Email,
}

impl OrderSearchColumn {
    fn expr(self) -> Expr {
        match self {
            OrderSearchColumn::ProductName => Expr::col((Products, ProdCol::Name)),
            OrderSearchColumn::Username => Expr::col((Users, UserCol::Username)),
            OrderSearchColumn::Email => Expr::col((Users, UserCol::Email)),
        }
    }
}

fn searched(
    select: Select<Orders>,
    query: &PageQuery<Column>,
    search_on: Option<OrderSearchColumn>,
) -> Select<Orders> {
    match (query.search_text(), search_on) {
        (Some(search), Some(column)) => {
            select.filter(column.expr().ilike(contains_pattern(search)))
        }
        _ => select,
    }
}

fn visible_only(select: Select<Orders>, include_deleted: bool) -> Select<Orders> {
    if include_deleted {
        select
    } else {
        select.filter(Column::IsDeleted.eq(false))
    }
}

impl Repository<Orders> {
    pub async fn find_detail_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        include_deleted: bool,
    ) -> RepoResult<OrderDetailRow> {
        visible_only(detailed(), include_deleted)
            .filter(Column::Id.eq(id))
            .into_model::<OrderDetailRow>()
            .one(conn)
            .await?
            .ok_or(RepoError::NotFound)
    }

    pub async fn find_details_by_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        include_deleted: bool,
    ) -> RepoResult<Vec<OrderDetailRow>> {
        Ok(visible_only(detailed(), include_deleted)
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .into_model::<OrderDetailRow>()
            .all(conn)
            .await?)
    }

    pub async fn find_all_details<C: ConnectionTrait>(
        &self,
        conn: &C,
        include_deleted: bool,
    ) -> RepoResult<Vec<OrderDetailRow>> {
        Ok(visible_only(detailed(), include_deleted)
            .order_by_desc(Column::CreatedAt)
            .into_model::<OrderDetailRow>()
            .all(conn)
            .await?)
    }

    /// Pages through every order. The search text, if any, is matched against
    /// `search_on`, a column of the joined user or product.
    pub async fn paginated_details<C: ConnectionTrait>(
        &self,
        conn: &C,
        query: &PageQuery<Column>,
        search_on: Option<OrderSearchColumn>,
    ) -> RepoResult<Page<OrderDetailRow>> {
        let select = searched(detailed(), query, search_on);
        paginate_into(conn, select, query).await
    }

    pub async fn paginated_details_by_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        query: &PageQuery<Column>,
        search_on: Option<OrderSearchColumn>,
    ) -> RepoResult<Page<OrderDetailRow>> {
        let select = searched(detailed(), query, search_on).filter(Column::UserId.eq(user_id));
        paginate_into(conn, select, query).await
    }
}
