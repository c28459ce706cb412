use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};

use super::{RepoError, RepoResult, Repository};
use crate::entity::users::{Column, Entity as Users, Model as UserModel};

pub type UserStore = Repository<Users>;

impl Repository<Users> {
    /// Finds the live account registered under `email`. Soft-deleted
    /// accounts never match, so their address can be registered again.
    pub async fn find_by_email<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
    ) -> RepoResult<UserModel> {
        Users::find()
            .filter(
                Condition::all()
                    .add(Column::Email.eq(email))
                    .add(Column::IsDeleted.eq(false)),
            )
            .one(conn)
            .await?
            .ok_or(RepoError::NotFound)
    }

    pub async fn email_taken<C: ConnectionTrait>(&self, conn: &C, email: &str) -> RepoResult<bool> {
        match self.find_by_email(conn, email).await {
            Ok(_) => Ok(true),
            Err(RepoError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
