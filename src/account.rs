use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountInfo {
    pub id: i64,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
}

/// Register a new account. The row is created together with its empty plan
/// document; `registration_date` is written once here and never updated.
pub async fn create_account(pool: &SqlitePool, email: &str, password: &str) -> Result<i64> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "email and password must not be empty".to_string(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
        .to_string();
    let registration_date = OffsetDateTime::now_utc();
    let result = sqlx::query(
        "insert into account (email, password, registration_date) values (?, ?, ?)",
    )
    .bind(email)
    .bind(password_hash)
    .bind(registration_date)
    .execute(pool)
    .await
    .map_err(|e| Error::InvalidInput(format!("could not register {email}: {e}")))?;
    Ok(result.last_insert_rowid())
}

pub async fn login(pool: &SqlitePool, email: &str, password: &str) -> Result<i64> {
    let (id, password_hash) = sqlx::query_as::<_, (i64, String)>(
        "select id, password from account where email = ?",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("no account for {email}")))?;
    let parsed_hash = PasswordHash::new(&password_hash)
        .map_err(|e| anyhow::anyhow!("failed to parse password hash: {e}"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::PermissionDenied("wrong email or password".to_string()))?;
    Ok(id)
}

pub async fn account_info(pool: &SqlitePool, id: i64) -> Result<AccountInfo> {
    let info = sqlx::query_as::<_, (i64, String, OffsetDateTime)>(
        "select id, email, registration_date from account where id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(AccountInfo {
        id: info.0,
        email: info.1,
        registration_date: info.2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_schema;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn register_then_login() {
        let pool = test_pool().await;
        let id = create_account(&pool, "user@example.com", "hunter2")
            .await
            .unwrap();
        let logged_in = login(&pool, "user@example.com", "hunter2").await.unwrap();
        assert_eq!(id, logged_in);

        let info = account_info(&pool, id).await.unwrap();
        assert_eq!(info.email, "user@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_denied() {
        let pool = test_pool().await;
        create_account(&pool, "user@example.com", "hunter2")
            .await
            .unwrap();
        assert!(matches!(
            login(&pool, "user@example.com", "wrong").await,
            Err(Error::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let pool = test_pool().await;
        assert!(matches!(
            login(&pool, "missing@example.com", "whatever").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let pool = test_pool().await;
        create_account(&pool, "user@example.com", "hunter2")
            .await
            .unwrap();
        assert!(create_account(&pool, "user@example.com", "other").await.is_err());
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected() {
        let pool = test_pool().await;
        assert!(matches!(
            create_account(&pool, "  ", "pw").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_account(&pool, "a@b.c", "").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
