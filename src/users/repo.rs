use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::ImageRef;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub avatar: Option<Json<ImageRef>>,
    #[serde(skip_serializing)]
    pub salt: String,
    #[serde(skip_serializing)]
    pub hash: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, email, username, phone, avatar, salt, hash, token, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        id: Uuid,
        email: &str,
        username: &str,
        phone: Option<&str>,
        avatar: Option<&ImageRef>,
        salt: &str,
        hash: &str,
        token: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, phone, avatar, salt, hash, token)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .bind(username)
        .bind(phone)
        .bind(avatar.map(|a| Json(a.clone())))
        .bind(salt)
        .bind(hash)
        .bind(token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Persist a freshly issued login token.
    pub async fn set_token(db: &PgPool, id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET token = $1 WHERE id = $2")
            .bind(token)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Wipe every account. Offers cascade via their owner foreign key.
    pub async fn delete_all(db: &PgPool) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM users").execute(db).await?;
        Ok(res.rows_affected())
    }
}
