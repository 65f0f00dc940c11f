/// PostgreSQL-backed account storage
use super::{UserStore, VerificationTokenStore};
use crate::error::StoreResult;
use crate::models::{User, VerificationToken};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> StoreResult<User> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                active = EXCLUDED.active,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn create_with_token(
        &self,
        user: &User,
        token: &VerificationToken,
    ) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO verification_tokens (user_id, token, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[async_trait]
impl VerificationTokenStore for PgStore {
    async fn find_by_user_id_and_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        let found = sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE user_id = $1 AND token = $2",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    async fn save(&self, token: &VerificationToken) -> StoreResult<VerificationToken> {
        let saved = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (user_id, token, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token) DO UPDATE SET created_at = verification_tokens.created_at
            RETURNING *
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}
