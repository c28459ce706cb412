use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::User,
};

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub birthdate: Option<NaiveDate>,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(AppError::BadRequest("Invalid email address".into()));
        }
        if self.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".into(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::BadRequest("Username is required".into()));
        }
        Ok(())
    }
}

/// Sent back after registration; the account exists only once verified.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRegistration {
    pub email: String,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            username: username.into(),
            birthdate: None,
        }
    }

    #[test]
    fn registration_requires_plausible_fields() {
        assert!(request("ada@example.com", "correct horse", "ada").validate().is_ok());
        assert!(request("not-an-email", "correct horse", "ada").validate().is_err());
        assert!(request("ada@example.com", "short", "ada").validate().is_err());
        assert!(request("ada@example.com", "correct horse", "  ").validate().is_err());
    }
}
