use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::User,
};

/// Profile fields a user may change about themself.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.username.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::BadRequest("Username cannot be blank".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}
