mod common;

use common::{USERS, create_user, setup, unique_email};
use storefront_api::{
    dto::auth::{LoginRequest, RefreshRequest, RegisterRequest},
    entity::Role,
    error::AppError,
    services::auth_service,
};

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "correct horse battery".into(),
        username: "grace".into(),
        birthdate: None,
    }
}

fn token_from(body: &str) -> &str {
    let start = body.find("token=").map(|i| i + "token=".len()).unwrap_or(0);
    let rest = &body[start..];
    let end = rest.find('"').unwrap_or(rest.len());
    &rest[..end]
}

#[tokio::test]
async fn register_verify_login_refresh() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    // Someone already exists, so the new account is a regular user.
    create_user(state, Role::Admin).await?;

    let email = unique_email("grace");
    let pending = auth_service::register_user(state, registration(&email))
        .await?
        .data
        .expect("pending");
    assert_eq!(pending.email, email);
    assert!(matches!(
        USERS.find_by_email(&state.orm, &email).await,
        Err(storefront_api::repository::RepoError::NotFound)
    ));

    let mail = app.outbox.last_to(&email).expect("verification mail");
    assert!(mail.subject.contains("Storefront"));
    assert!(mail.body_html.contains("/api/auth/verify?token="));

    let user = auth_service::verify_email(state, token_from(&mail.body_html))
        .await?
        .data
        .expect("user");
    assert_eq!(user.email, email);
    assert_eq!(user.role, Role::User);

    let again = auth_service::verify_email(state, token_from(&mail.body_html)).await;
    assert!(matches!(again, Err(AppError::AlreadyExists(_))));

    let session = auth_service::login_user(
        state,
        LoginRequest {
            email: email.to_uppercase(),
            password: "correct horse battery".into(),
        },
    )
    .await?
    .data
    .expect("session");
    assert_eq!(session.user.id, user.id);

    let claims = state.tokens.verify_access(&session.access_token)?;
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, Role::User);

    let pair = auth_service::refresh_token(
        state,
        RefreshRequest {
            refresh_token: session.refresh_token.clone(),
        },
    )
    .await?
    .data
    .expect("tokens");
    // Far from expiry, so the refresh token is kept.
    assert_eq!(pair.refresh_token, session.refresh_token);
    assert!(state.tokens.verify_access(&pair.access_token).is_ok());

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    create_user(state, Role::Admin).await?;

    let email = unique_email("dup");
    auth_service::register_user(state, registration(&email)).await?;
    let mail = app.outbox.last_to(&email).expect("verification mail");
    auth_service::verify_email(state, token_from(&mail.body_html)).await?;

    let second = auth_service::register_user(state, registration(&email)).await;
    assert!(matches!(second, Err(AppError::AlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_tokens_are_refused() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    create_user(state, Role::Admin).await?;

    let email = unique_email("ada");
    auth_service::register_user(state, registration(&email)).await?;
    let mail = app.outbox.last_to(&email).expect("verification mail");
    auth_service::verify_email(state, token_from(&mail.body_html)).await?;

    let wrong_password = auth_service::login_user(
        state,
        LoginRequest {
            email: email.clone(),
            password: "not the password".into(),
        },
    )
    .await;
    let unknown_email = auth_service::login_user(
        state,
        LoginRequest {
            email: unique_email("nobody"),
            password: "correct horse battery".into(),
        },
    )
    .await;
    match (wrong_password, unknown_email) {
        (Err(AppError::BadRequest(a)), Err(AppError::BadRequest(b))) => assert_eq!(a, b),
        other => panic!("expected identical BadRequest errors, got {other:?}"),
    }

    assert!(matches!(
        auth_service::verify_email(state, "garbage").await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        auth_service::refresh_token(
            state,
            RefreshRequest {
                refresh_token: "garbage".into()
            }
        )
        .await,
        Err(AppError::Unauthorized(_))
    ));

    Ok(())
}
