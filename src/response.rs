use serde::Serialize;
use utoipa::ToSchema;

use crate::repository::Page;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
    pub has_previous: Option<bool>,
    pub has_next: Option<bool>,
}

impl Meta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: None,
            has_previous: None,
            has_next: None,
        }
    }

    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            page: Some(page.current_page),
            per_page: Some(page.limit),
            total: Some(page.total),
            total_pages: Some(page.total_pages),
            has_previous: Some(page.has_previous),
            has_next: Some(page.has_next),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
            has_previous: None,
            has_next: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

/// Payload for mutations that only report whether a row changed.
#[derive(Debug, Serialize, ToSchema)]
pub struct Acknowledged {
    pub ok: bool,
}
