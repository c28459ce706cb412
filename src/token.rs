use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    entity::Role,
    error::{AppError, AppResult},
};

/// Claims of access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// Claims of an e-mail verification token. The pending account travels inside
/// the token so nothing is written until the address is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyClaims {
    pub email: String,
    pub password_hash: String,
    pub username: String,
    pub birthdate: Option<NaiveDate>,
    pub iss: String,
    pub exp: usize,
}

/// Signs and verifies the three HS256 token kinds, each with its own secret.
#[derive(Debug, Clone)]
pub struct TokenService {
    config: JwtConfig,
}

impl TokenService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn issue_access(&self, user_id: Uuid, role: Role) -> AppResult<String> {
        self.issue_session(
            user_id,
            role,
            &self.config.access_secret,
            self.config.access_ttl_secs,
        )
    }

    pub fn issue_refresh(&self, user_id: Uuid, role: Role) -> AppResult<String> {
        self.issue_session(
            user_id,
            role,
            &self.config.refresh_secret,
            self.config.refresh_ttl_secs,
        )
    }

    pub fn issue_verification(
        &self,
        email: String,
        password_hash: String,
        username: String,
        birthdate: Option<NaiveDate>,
    ) -> AppResult<String> {
        let claims = VerifyClaims {
            email,
            password_hash,
            username,
            birthdate,
            iss: self.config.issuer.clone(),
            exp: expires_in(self.config.verify_ttl_secs)?,
        };
        sign(&claims, &self.config.verify_secret)
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, &self.config.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, &self.config.refresh_secret)
    }

    pub fn verify_verification(&self, token: &str) -> AppResult<VerifyClaims> {
        self.verify(token, &self.config.verify_secret)
    }

    fn issue_session(
        &self,
        user_id: Uuid,
        role: Role,
        secret: &str,
        ttl_secs: i64,
    ) -> AppResult<String> {
        let claims = Claims {
            sub: user_id,
            role,
            iss: self.config.issuer.clone(),
            iat: Utc::now().timestamp() as usize,
            exp: expires_in(ttl_secs)?,
        };
        sign(&claims, secret)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, secret: &str) -> AppResult<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        decode::<T>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AppError::Unauthorized("Invalid or expired token".into())
        })
    }
}

/// Seconds left before `claims` expire, clamped at zero.
pub fn seconds_left(claims: &Claims) -> i64 {
    (claims.exp as i64 - Utc::now().timestamp()).max(0)
}

fn expires_in(ttl_secs: i64) -> AppResult<usize> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::seconds(ttl_secs))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
    Ok(expiration.timestamp() as usize)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> AppResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
