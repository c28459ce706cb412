#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set};
use uuid::Uuid;

use storefront_api::{
    config::{AppConfig, JwtConfig},
    db::{create_orm_conn, run_migrations},
    entity::{Role, products, users},
    middleware::auth::AuthUser,
    notify::Notifier,
    repository::{ProductStore, UserStore},
    state::AppState,
};

pub const USERS: UserStore = UserStore::new();
pub const PRODUCTS: ProductStore = ProductStore::new();

/// Captures outgoing messages instead of sending them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

impl RecordingNotifier {
    pub fn last_to(&self, to: &str) -> Option<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body_html: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body_html: body_html.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub outbox: Arc<RecordingNotifier>,
}

/// Connects to the test database, or returns `None` when none is configured.
pub async fn setup() -> anyhow::Result<Option<TestApp>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        app_name: "Storefront".into(),
        public_url: "http://localhost:3000".into(),
        jwt: JwtConfig {
            issuer: "storefront-test".into(),
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            verify_secret: "test-verify-secret".into(),
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 30 * 24 * 60 * 60,
            verify_ttl_secs: 30 * 60,
        },
    };

    let outbox = Arc::new(RecordingNotifier::default());
    let state = AppState::new(orm, config, outbox.clone());
    Ok(Some(TestApp { state, outbox }))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Inserts an account directly, bypassing e-mail verification.
pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    create_user_with_email(state, role, &unique_email("fixture")).await
}

pub async fn create_user_with_email(
    state: &AppState,
    role: Role,
    email: &str,
) -> anyhow::Result<AuthUser> {
    let user = USERS
        .create(
            &state.orm,
            users::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                password_hash: Set("not-a-real-hash".into()),
                username: Set("fixture".into()),
                role: Set(role),
                birthdate: Set(None),
                created_at: NotSet,
                updated_at: NotSet,
                is_deleted: NotSet,
                deleted_at: NotSet,
            },
        )
        .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_product(
    state: &AppState,
    owner: &AuthUser,
    name: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<products::Model> {
    Ok(PRODUCTS
        .create(
            &state.orm,
            products::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name.to_string()),
                price: Set(price),
                stock: Set(stock),
                user_id: Set(owner.user_id),
                created_at: NotSet,
                updated_at: NotSet,
                is_deleted: NotSet,
                deleted_at: NotSet,
            },
        )
        .await?)
}

/// Current stock, whether or not the product is soft-deleted.
pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    Ok(PRODUCTS
        .find_by_id(&state.orm, product_id, true)
        .await?
        .stock)
}
