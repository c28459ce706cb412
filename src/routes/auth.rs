use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{
        LoginRequest, LoginResponse, PendingRegistration, RefreshRequest, RegisterRequest,
        TokenPair, VerifyQuery,
    },
    error::AppResult,
    models::User,
    response::ApiResponse,
    services::auth_service::{login_user, refresh_token, register_user, verify_email},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", get(verify))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 202, description = "Verification e-mail sent", body = ApiResponse<PendingRegistration>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PendingRegistration>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    params(VerifyQuery),
    responses(
        (status = 201, description = "Account created", body = ApiResponse<User>),
        (status = 401, description = "Invalid or expired token"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = verify_email(&state, &query.token).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = refresh_token(&state, payload).await?;
    Ok(Json(resp))
}
