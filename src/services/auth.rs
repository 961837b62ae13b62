// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{user_repo::NewUser, UserRepository},
    models::auth::{Claims, RegisterUserPayload, User},
};

/// HS256 signing material plus token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    secret: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self { secret: secret.into(), ttl }
    }

    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    keys: JwtKeys,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, keys: JwtKeys, pool: PgPool) -> Self {
        Self { user_repo, keys, pool }
    }

    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<User, AppError> {
        // 1. Duplicates are reported before any work is done
        let (username_taken, email_taken) = self
            .user_repo
            .username_or_email_taken(&payload.username, &payload.email)
            .await?;
        if username_taken {
            return Err(AppError::UsernameAlreadyExists);
        }
        if email_taken {
            return Err(AppError::EmailAlreadyExists);
        }

        // 2. bcrypt is CPU-bound; keep it off the async workers
        let password = payload.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

        // 3. Insert
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                NewUser {
                    username: &payload.username,
                    email: &payload.email,
                    password_hash: &password_hash,
                    role: payload.role.unwrap_or_default(),
                    first_name: payload.first_name.as_deref(),
                    last_name: payload.last_name.as_deref(),
                },
            )
            .await?;

        tracing::info!("👤 Registered user '{}'", user.username);
        Ok(user)
    }

    /// Returns a fresh access token and the user it belongs to.
    pub async fn login_user(&self, username: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::AccountInactive);
        }

        let token = self.keys.issue(user.id, Utc::now())?;
        Ok((token, user))
    }

    /// Resolves a bearer token to a live, active user.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.keys.verify(token)?;

        let user = self
            .user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::AccountInactive);
        }
        Ok(user)
    }
}
