use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::User;

impl User {
    /// Exact, case-sensitive lookup.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
        created_at: OffsetDateTime,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(db)
        .await
    }
}
