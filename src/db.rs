use std::path::Path;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;
use tracing::info;

use crate::{
    auth::{password::hash_password, repo_types::User},
    todos::repo_types::{NewTodo, Todo},
};

const SEED_EMAIL: &str = "test@example.com";
const SEED_PASSWORD: &str = "password123";

pub async fn connect(db_path: &str) -> anyhow::Result<SqlitePool> {
    if let Some(dir) = Path::new(db_path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create database directory {}", dir.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(pool)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    info!("database schema up to date");
    Ok(())
}

/// Insert the demo account and a handful of todos. Skipped when the account already exists.
pub async fn seed_dev_data(db: &SqlitePool) -> anyhow::Result<()> {
    if User::find_by_email(db, SEED_EMAIL).await?.is_some() {
        info!("seed data already present, skipping");
        return Ok(());
    }

    let hash = hash_password(SEED_PASSWORD)?;
    let user = User::create(db, SEED_EMAIL, &hash, OffsetDateTime::now_utc())
        .await
        .context("insert seed user")?;

    let samples = [
        (
            "Complete project setup",
            "Set up the initial project structure and configurations",
            3,
            true,
        ),
        (
            "Implement authentication",
            "Create user registration and login functionality",
            3,
            false,
        ),
        (
            "Build Todo CRUD",
            "Implement create, read, update, delete operations for todos",
            2,
            false,
        ),
        (
            "Design UI/UX",
            "Create responsive and intuitive user interface",
            2,
            false,
        ),
        ("Write tests", "Add unit and integration tests", 1, false),
    ];

    for (title, description, priority, completed) in samples {
        let new = NewTodo {
            title: title.to_string(),
            description: description.to_string(),
            priority,
        };
        let now = OffsetDateTime::now_utc();
        let todo = Todo::insert(db, user.id, &new, now)
            .await
            .context("insert seed todo")?;
        if completed {
            Todo::toggle_owned(db, user.id, todo.id, now).await?;
        }
    }

    info!(user_id = user.id, "seed data inserted");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use std::str::FromStr;

    // A single long-lived connection: every in-memory connection is its own database.
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory dsn")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory pool");
    migrate(&pool).await.expect("migrations");
    pool
}
