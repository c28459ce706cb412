use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveValue::NotSet, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::auth::{
        LoginRequest, LoginResponse, PendingRegistration, RefreshRequest, RegisterRequest,
        TokenPair,
    },
    entity::{Role, users::ActiveModel as UserActive},
    error::{AppError, AppResult, OrNotFound},
    models::User,
    repository::{RepoError, UserStore},
    response::{ApiResponse, Meta},
    state::AppState,
    token::seconds_left,
};

const USERS: UserStore = UserStore::new();

/// Refresh tokens closer than this to expiry are replaced on use.
const REFRESH_ROTATION_SECS: i64 = 24 * 60 * 60;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<PendingRegistration>> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    if USERS.email_taken(&state.orm, &email).await? {
        return Err(AppError::AlreadyExists("Email".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let token = state.tokens.issue_verification(
        email.clone(),
        password_hash,
        payload.username.trim().to_owned(),
        payload.birthdate,
    )?;

    let link = format!(
        "{}/api/auth/verify?token={}",
        state.config.public_url.trim_end_matches('/'),
        token
    );
    let subject = format!("Confirm your {} account", state.config.app_name);
    let body = format!(
        "<p>Hi {},</p><p>Confirm your e-mail address to finish signing up: \
         <a href=\"{link}\">{link}</a></p>",
        payload.username.trim()
    );
    state
        .notifier
        .send(&email, &subject, &body)
        .await
        .map_err(AppError::Internal)?;

    tracing::info!(email = %email, "verification sent");

    Ok(ApiResponse::success(
        "Verification e-mail sent",
        PendingRegistration { email },
        Some(Meta::empty()),
    ))
}

pub async fn verify_email(state: &AppState, token: &str) -> AppResult<ApiResponse<User>> {
    let pending = state.tokens.verify_verification(token)?;
    let txn = state.orm.begin().await?;

    if USERS.email_taken(&txn, &pending.email).await? {
        return Err(AppError::AlreadyExists("Email".into()));
    }

    let existing = USERS.count(&txn, true).await?;
    let role = role_for_new_account(existing);

    let user = USERS
        .create(
            &txn,
            UserActive {
                id: Set(Uuid::new_v4()),
                email: Set(pending.email),
                password_hash: Set(pending.password_hash),
                username: Set(pending.username),
                role: Set(role),
                birthdate: Set(pending.birthdate),
                created_at: NotSet,
                updated_at: NotSet,
                is_deleted: NotSet,
                deleted_at: NotSet,
            },
        )
        .await
        .map_err(|err| match err {
            RepoError::Duplicate(_) => AppError::AlreadyExists("Email".into()),
            other => other.into(),
        })?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "user created");

    Ok(ApiResponse::success(
        "User created",
        user.into(),
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let invalid = || AppError::BadRequest("Invalid email or password".into());

    let email = normalize_email(&payload.email);
    let user = USERS
        .find_by_email(&state.orm, &email)
        .await
        .or_not_found(invalid())?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let access_token = state.tokens.issue_access(user.id, user.role)?;
    let refresh_token = state.tokens.issue_refresh(user.id, user.role)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            access_token,
            refresh_token,
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn refresh_token(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let claims = state.tokens.verify_refresh(&payload.refresh_token)?;
    let user = USERS
        .find_by_id(&state.orm, claims.sub, false)
        .await
        .or_not_found(AppError::Unauthorized("Account no longer exists".into()))?;

    // Role comes from the database so promotions apply on the next refresh.
    let access_token = state.tokens.issue_access(user.id, user.role)?;
    let refresh_token = if needs_rotation(seconds_left(&claims)) {
        state.tokens.issue_refresh(user.id, user.role)?
    } else {
        payload.refresh_token
    };

    Ok(ApiResponse::success(
        "Token refreshed",
        TokenPair {
            access_token,
            refresh_token,
        },
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// The very first account, deleted ones included, administers the shop.
fn role_for_new_account(existing_accounts: u64) -> Role {
    if existing_accounts == 0 {
        Role::Admin
    } else {
        Role::User
    }
}

fn needs_rotation(seconds_left: i64) -> bool {
    seconds_left < REFRESH_ROTATION_SECS
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_account_becomes_admin() {
        assert_eq!(role_for_new_account(0), Role::Admin);
        assert_eq!(role_for_new_account(1), Role::User);
        assert_eq!(role_for_new_account(42), Role::User);
    }

    #[test]
    fn refresh_token_rotates_inside_last_day() {
        assert!(needs_rotation(0));
        assert!(needs_rotation(REFRESH_ROTATION_SECS - 1));
        assert!(!needs_rotation(REFRESH_ROTATION_SECS));
        assert!(!needs_rotation(7 * REFRESH_ROTATION_SECS));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse battery").unwrap();
        assert_ne!(hash, "correct horse battery");
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
