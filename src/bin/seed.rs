use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, Set};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{Role, products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    repository::{ProductStore, RepoError, UserStore},
    services::auth_service::hash_password,
};

const USERS: UserStore = UserStore::new();
const PRODUCTS: ProductStore = ProductStore::new();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin", "admin12345", Role::Admin).await?;
    let user_id = ensure_user(&orm, "user@example.com", "user", "user12345", Role::User).await?;
    seed_products(&orm, admin_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    match USERS.find_by_email(orm, email).await {
        Ok(existing) => {
            println!("User {email} already present");
            return Ok(existing.id);
        }
        Err(RepoError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = USERS
        .create(
            orm,
            UserActive {
                id: Set(Uuid::new_v4()),
                email: Set(email.to_string()),
                password_hash: Set(password_hash),
                username: Set(username.to_string()),
                role: Set(role),
                birthdate: Set(None),
                created_at: NotSet,
                updated_at: NotSet,
                is_deleted: NotSet,
                deleted_at: NotSet,
            },
        )
        .await?;

    println!("Created user {email} (role={role:?})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection, owner_id: Uuid) -> anyhow::Result<()> {
    let existing = PRODUCTS.find_all_by_owner(orm, owner_id, true).await?;
    let products = [
        ("Axum Hoodie", Decimal::new(5500, 2), 50),
        ("Ferris Mug", Decimal::new(1200, 2), 100),
        ("Rust Sticker Pack", Decimal::new(500, 2), 200),
        ("E-book: Async Rust", Decimal::new(2500, 2), 75),
    ];

    for (name, price, stock) in products {
        if existing.iter().any(|p| p.name == name) {
            continue;
        }
        PRODUCTS
            .create(
                orm,
                ProductActive {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    price: Set(price),
                    stock: Set(stock),
                    user_id: Set(owner_id),
                    created_at: NotSet,
                    updated_at: NotSet,
                    is_deleted: NotSet,
                    deleted_at: NotSet,
                },
            )
            .await?;
    }

    println!("Seeded products");
    Ok(())
}
