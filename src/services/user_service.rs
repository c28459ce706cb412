use uuid::Uuid;

use crate::{
    dto::users::{UpdateUserRequest, UserList},
    entity::users::Model as UserModel,
    error::{AppError, AppResult, OrNotFound},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin, include_deleted_for},
    models::User,
    repository::UserStore,
    response::{Acknowledged, ApiResponse, Meta},
    routes::params::UserQuery,
    state::AppState,
};

const USERS: UserStore = UserStore::new();

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    include_deleted: bool,
) -> AppResult<ApiResponse<User>> {
    let include_deleted = include_deleted_for(Some(user), include_deleted);
    let found = USERS
        .find_by_id(&state.orm, id, include_deleted)
        .await
        .or_not_found(AppError::UserNotFound)?;
    Ok(ApiResponse::success("User", found.into(), None))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    include_deleted: bool,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let models = USERS.find_all(&state.orm, include_deleted).await?;
    let total = models.len() as u64;
    let items = models.into_iter().map(User::from).collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn list_users_paginated(
    state: &AppState,
    user: &AuthUser,
    query: UserQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let page = USERS
        .paginated(&state.orm, &query.page_query(query.requested_deleted()))
        .await?;
    let meta = Meta::from_page(&page);
    let items = page.items.into_iter().map(User::from).collect();

    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    if user.user_id != id {
        return Err(AppError::Forbidden);
    }
    payload.validate()?;

    let existing = USERS
        .find_by_id(&state.orm, id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;
    let updated = USERS
        .update(&state.orm, apply_profile(existing, payload))
        .await
        .or_not_found(AppError::UserNotFound)?;

    tracing::info!(user_id = %id, "profile updated");

    Ok(ApiResponse::success(
        "Updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Acknowledged>> {
    ensure_owner_or_admin(user, id)?;
    let ok = USERS
        .delete(&state.orm, id)
        .await
        .or_not_found(AppError::UserNotFound)?;

    tracing::info!(user_id = %id, by = %user.user_id, "user deleted");

    Ok(ApiResponse::success(
        "Deleted",
        Acknowledged { ok },
        Some(Meta::empty()),
    ))
}

pub async fn restore_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let existing = USERS
        .find_by_id(&state.orm, id, true)
        .await
        .or_not_found(AppError::UserNotFound)?;
    if !existing.is_deleted {
        return Err(AppError::UserNotFound);
    }

    // A new account may have claimed the address while this one was deleted.
    if USERS.email_taken(&state.orm, &existing.email).await? {
        return Err(AppError::AlreadyExists("Email".into()));
    }

    USERS
        .restore(&state.orm, id)
        .await
        .or_not_found(AppError::UserNotFound)?;
    let restored = USERS
        .find_by_id(&state.orm, id, false)
        .await
        .or_not_found(AppError::UserNotFound)?;

    tracing::info!(user_id = %id, admin_id = %user.user_id, "user restored");

    Ok(ApiResponse::success(
        "Restored",
        restored.into(),
        Some(Meta::empty()),
    ))
}

fn apply_profile(mut model: UserModel, patch: UpdateUserRequest) -> UserModel {
    if let Some(username) = patch.username {
        model.username = username.trim().to_owned();
    }
    if let Some(birthdate) = patch.birthdate {
        model.birthdate = Some(birthdate);
    }
    model
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::entity::Role;

    fn account() -> UserModel {
        let now = Utc::now().fixed_offset();
        UserModel {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            username: "ada".into(),
            role: Role::User,
            birthdate: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[test]
    fn profile_patch_leaves_credentials_and_role_alone() {
        let original = account();
        let birthdate = NaiveDate::from_ymd_opt(1815, 12, 10);
        let patched = apply_profile(
            original.clone(),
            UpdateUserRequest {
                username: Some(" countess ".into()),
                birthdate,
            },
        );

        assert_eq!(patched.username, "countess");
        assert_eq!(patched.birthdate, birthdate);
        assert_eq!(patched.email, original.email);
        assert_eq!(patched.password_hash, original.password_hash);
        assert_eq!(patched.role, Role::User);
    }

    #[test]
    fn outward_user_has_no_password_field() {
        let json = serde_json::to_value(User::from(account())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }
}
