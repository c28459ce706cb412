use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_name: String,
    /// Base URL used when building links sent to users.
    pub public_url: String,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub verify_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub verify_ttl_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "Storefront".to_string());
        let public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));

        Ok(Self {
            database_url,
            host,
            port,
            app_name,
            public_url,
            jwt: JwtConfig::from_env()?,
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront-api".to_string()),
            access_secret: env::var("JWT_ACCESS_SECRET")
                .context("JWT_ACCESS_SECRET is not set")?,
            refresh_secret: env::var("JWT_REFRESH_SECRET")
                .context("JWT_REFRESH_SECRET is not set")?,
            verify_secret: env::var("JWT_VERIFY_SECRET")
                .context("JWT_VERIFY_SECRET is not set")?,
            access_ttl_secs: secs_from_env("JWT_ACCESS_TTL_SECS", 24 * 60 * 60),
            refresh_ttl_secs: secs_from_env("JWT_REFRESH_TTL_SECS", 30 * 24 * 60 * 60),
            verify_ttl_secs: secs_from_env("JWT_VERIFY_TTL_SECS", 30 * 60),
        })
    }
}

fn secs_from_env(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
