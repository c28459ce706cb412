use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, PageQuery, RepoError, RepoResult, Repository, now, paginate_into};
use crate::entity::products::{Column, Entity as Products, Model as ProductModel};

pub type ProductStore = Repository<Products>;

impl Repository<Products> {
    pub async fn find_all_by_owner<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: Uuid,
        include_deleted: bool,
    ) -> RepoResult<Vec<ProductModel>> {
        let mut finder = Products::find().filter(Column::UserId.eq(owner_id));
        if !include_deleted {
            finder = finder.filter(Column::IsDeleted.eq(false));
        }

        Ok(finder.order_by_desc(Column::CreatedAt).all(conn).await?)
    }

    pub async fn paginated_by_owner<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: Uuid,
        query: &PageQuery<Column>,
    ) -> RepoResult<Page<ProductModel>> {
        let finder = Products::find().filter(Column::UserId.eq(owner_id));
        paginate_into(conn, finder, query).await
    }

    /// Writes the stock counter of a product whatever its soft-delete state.
    ///
    /// Reserved for the order workflow, which must be able to return stock to
    /// a product that was deleted after the order was placed. Callers hold the
    /// row lock from [`Repository::find_by_id_for_update`].
    pub async fn set_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        stock: i32,
    ) -> RepoResult<()> {
        let result = Products::update_many()
            .col_expr(Column::Stock, Expr::value(stock))
            .col_expr(Column::UpdatedAt, Expr::value(now()))
            .filter(Column::Id.eq(product_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
