//! Soft-delete aware data access shared by every entity.
//!
//! [`Repository`] is generic over any sea-orm entity implementing
//! [`SoftDelete`]. Every method takes the connection to run on, so callers
//! decide whether a call joins an open [`sea_orm::DatabaseTransaction`] or runs
//! on the pool. Repositories never begin transactions themselves.
//!
//! Entity-specific queries live in the submodules as inherent impls on
//! `Repository<entity::X::Entity>`.

use std::marker::PhantomData;

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, FromQueryResult, IdenStatic, IntoActiveModel, Iterable, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, SqlErr,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod orders;
pub mod products;
pub mod users;

pub use orders::{OrderDetailRow, OrderSearchColumn, OrderStore};
pub use products::ProductStore;
pub use users::UserStore;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("dangling reference: {0}")]
    InvalidReference(String),

    #[error("storage failure: {0}")]
    Storage(#[source] DbErr),
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        if matches!(err, DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated) {
            return RepoError::NotFound;
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RepoError::Duplicate(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                RepoError::InvalidReference(detail)
            }
            _ => RepoError::Storage(err),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Lifecycle fields every persisted model carries.
pub trait BaseModel {
    fn id(&self) -> Uuid;
    fn is_deleted(&self) -> bool;
    fn deleted_at(&self) -> Option<DateTimeWithTimeZone>;
}

/// Columns the generic repository filters on and stamps.
pub trait SoftDelete: EntityTrait {
    fn id_column() -> Self::Column;
    fn created_at_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;
    fn is_deleted_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search, sort and window parameters for [`Repository::paginated`].
///
/// `search_field` and `sort_field` are entity columns, so request-level
/// allow-lists are expressed by mapping request enums onto columns.
#[derive(Debug, Clone)]
pub struct PageQuery<C> {
    /// 1-based page number.
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub search_field: Option<C>,
    pub sort_field: C,
    pub sort_order: SortOrder,
    pub include_deleted: bool,
}

impl<C> PageQuery<C> {
    pub fn current_page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.max(1)
    }

    pub fn offset(&self) -> u64 {
        (self.current_page() - 1) * self.limit()
    }

    /// The search text, when there is any to apply.
    pub(crate) fn search_text(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub limit: u64,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    fn new<C: IdenStatic>(items: Vec<T>, total: u64, query: &PageQuery<C>) -> Self {
        let limit = query.limit();
        let current_page = query.current_page();
        let total_pages = total.div_ceil(limit);
        Self {
            items,
            total,
            total_pages,
            current_page,
            limit,
            sort_by: query.sort_field.as_str().to_owned(),
            sort_order: query.sort_order,
            has_previous: current_page > 1,
            has_next: current_page < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            total_pages: self.total_pages,
            current_page: self.current_page,
            limit: self.limit,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

/// Escapes `LIKE` wildcards so user input is matched literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn visibility<E: SoftDelete>(include_deleted: bool) -> Condition {
    let mut condition = Condition::all();
    if !include_deleted {
        condition = condition.add(E::is_deleted_column().eq(false));
    }
    condition
}

/// `ILIKE` pattern matching `search` as a literal substring.
pub(crate) fn contains_pattern(search: &str) -> String {
    format!("%{}%", escape_like(search))
}

fn page_condition<E: SoftDelete>(query: &PageQuery<E::Column>) -> Condition {
    let mut condition = visibility::<E>(query.include_deleted);
    if let (Some(search), Some(field)) = (query.search_text(), query.search_field) {
        condition = condition.add(Expr::col((E::default(), field)).ilike(contains_pattern(search)));
    }
    condition
}

fn sorted<E: SoftDelete>(select: Select<E>, field: E::Column, order: SortOrder) -> Select<E> {
    let select = match order {
        SortOrder::Asc => select.order_by_asc(field),
        SortOrder::Desc => select.order_by_desc(field),
    };
    // Stable pages when the sort column has ties.
    select.order_by_asc(E::id_column())
}

fn visible<M: BaseModel>(model: M, include_deleted: bool) -> RepoResult<M> {
    if model.is_deleted() && !include_deleted {
        return Err(RepoError::NotFound);
    }
    Ok(model)
}

/// Runs a filtered, sorted and windowed query, decoding rows as `M`.
pub(crate) async fn paginate_into<E, M, C>(
    conn: &C,
    select: Select<E>,
    query: &PageQuery<E::Column>,
) -> RepoResult<Page<M>>
where
    E: SoftDelete,
    E::Model: Sync,
    M: FromQueryResult + Send + Sync,
    C: ConnectionTrait,
{
    let filtered = select.filter(page_condition::<E>(query));
    let total = filtered.clone().count(conn).await?;

    let items = sorted(filtered, query.sort_field, query.sort_order)
        .limit(query.limit())
        .offset(query.offset())
        .into_model::<M>()
        .all(conn)
        .await?;

    Ok(Page::new(items, total, query))
}

/// Generic soft-delete CRUD over entity `E`.
#[derive(Debug)]
pub struct Repository<E> {
    entity: PhantomData<fn() -> E>,
}

impl<E> Repository<E> {
    pub const fn new() -> Self {
        Self {
            entity: PhantomData,
        }
    }
}

impl<E> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Repository<E> {}

impl<E> Repository<E>
where
    E: SoftDelete,
    E::Model: BaseModel + IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
{
    /// Looks a row up by id. Soft-deleted rows are reported as
    /// [`RepoError::NotFound`] unless `include_deleted` is set.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        include_deleted: bool,
    ) -> RepoResult<E::Model> {
        let model = E::find()
            .filter(E::id_column().eq(id))
            .one(conn)
            .await?
            .ok_or(RepoError::NotFound)?;
        visible(model, include_deleted)
    }

    /// Same as [`Self::find_by_id`] but holds a `FOR UPDATE` row lock until
    /// the surrounding transaction ends.
    pub async fn find_by_id_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        include_deleted: bool,
    ) -> RepoResult<E::Model> {
        let model = E::find()
            .filter(E::id_column().eq(id))
            .lock(LockType::Update)
            .one(conn)
            .await?
            .ok_or(RepoError::NotFound)?;
        visible(model, include_deleted)
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        active: E::ActiveModel,
    ) -> RepoResult<E::Model> {
        Ok(active.insert(conn).await?)
    }

    /// Overwrites every column of an existing, non-deleted row with `model`
    /// and stamps `updated_at`.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: E::Model,
    ) -> RepoResult<E::Model> {
        self.find_by_id(conn, model.id(), false).await?;

        let mut active: E::ActiveModel = model.into_active_model();
        for column in E::Column::iter() {
            if let Some(value) = active.get(column).into_value() {
                active.set(column, value);
            }
        }
        active.set(E::updated_at_column(), now().into());

        Ok(active.update(conn).await?)
    }

    /// Soft-deletes a visible row. Deleting an already deleted row is a miss.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> RepoResult<bool> {
        self.find_by_id(conn, id, false).await?;

        let stamp = now();
        let result = E::update_many()
            .col_expr(E::is_deleted_column(), Expr::value(true))
            .col_expr(E::deleted_at_column(), Expr::value(stamp))
            .col_expr(E::updated_at_column(), Expr::value(stamp))
            .filter(E::id_column().eq(id))
            .exec(conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn restore<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> RepoResult<bool> {
        self.find_by_id(conn, id, true).await?;

        let result = E::update_many()
            .col_expr(E::is_deleted_column(), Expr::value(false))
            .col_expr(
                E::deleted_at_column(),
                Expr::value(Option::<DateTimeWithTimeZone>::None),
            )
            .col_expr(E::updated_at_column(), Expr::value(now()))
            .filter(E::id_column().eq(id))
            .exec(conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Physically removes the row whatever its soft-delete state.
    pub async fn hard_delete<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> RepoResult<bool> {
        let result = E::delete_many()
            .filter(E::id_column().eq(id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(true)
    }

    pub async fn find_all<C: ConnectionTrait>(
        &self,
        conn: &C,
        include_deleted: bool,
    ) -> RepoResult<Vec<E::Model>> {
        Ok(E::find()
            .filter(visibility::<E>(include_deleted))
            .order_by_desc(E::created_at_column())
            .all(conn)
            .await?)
    }

    pub async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        include_deleted: bool,
    ) -> RepoResult<u64> {
        Ok(E::find()
            .filter(visibility::<E>(include_deleted))
            .count(conn)
            .await?)
    }

    pub async fn paginated<C: ConnectionTrait>(
        &self,
        conn: &C,
        query: &PageQuery<E::Column>,
    ) -> RepoResult<Page<E::Model>> {
        paginate_into(conn, E::find(), query).await
    }
}
