use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::todos::repo_types::{NewTodo, Todo};

const TODO_COLUMNS: &str =
    "id, user_id, title, description, completed, priority, created_at, updated_at";

impl Todo {
    /// Most recent first. Timestamps are compared as instants, not as text.
    pub async fn list_by_owner(db: &SqlitePool, owner_id: i64) -> sqlx::Result<Vec<Todo>> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE user_id = ?
            ORDER BY julianday(created_at) DESC, id DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(db)
        .await
    }

    pub async fn insert(
        db: &SqlitePool,
        owner_id: i64,
        new: &NewTodo,
        now: OffsetDateTime,
    ) -> sqlx::Result<Todo> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO todos
                (user_id, title, description, completed, priority, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?, ?)
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.priority)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
    }

    /// Unscoped lookup used only to tell "missing" apart from "not yours".
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Todo>> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM todos
            WHERE id = ?
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// `None` when no row matches `(id, owner_id)`.
    pub async fn update_owned(
        db: &SqlitePool,
        owner_id: i64,
        id: i64,
        changes: &NewTodo,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<Todo>> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos
               SET title = ?, description = ?, priority = ?, updated_at = ?
             WHERE id = ? AND user_id = ?
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.priority)
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
    }

    /// Flip `completed` in place; `None` when no row matches `(id, owner_id)`.
    pub async fn toggle_owned(
        db: &SqlitePool,
        owner_id: i64,
        id: i64,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<Todo>> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE todos
               SET completed = NOT completed, updated_at = ?
             WHERE id = ? AND user_id = ?
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
    }

    /// Number of rows removed: 0 or 1.
    pub async fn delete_owned(db: &SqlitePool, owner_id: i64, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
