use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    repository::RepoError,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound
            | AppError::OrderNotFound
            | AppError::ProductNotFound
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::OrmError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound,
            RepoError::Duplicate(detail) => AppError::AlreadyExists(detail),
            RepoError::InvalidReference(detail) => {
                AppError::BadRequest(format!("invalid reference: {detail}"))
            }
            RepoError::Storage(err) => AppError::OrmError(err),
        }
    }
}

/// Translates a repository miss into the caller's domain-specific variant.
pub trait OrNotFound<T> {
    fn or_not_found(self, err: AppError) -> AppResult<T>;
}

impl<T> OrNotFound<T> for Result<T, RepoError> {
    fn or_not_found(self, err: AppError) -> AppResult<T> {
        self.map_err(|repo_err| match repo_err {
            RepoError::NotFound => err,
            other => other.into(),
        })
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
