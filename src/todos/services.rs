use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    todos::{
        dto::TodoRequest,
        repo_types::{NewTodo, Todo},
    },
};

pub const DEFAULT_PRIORITY: i32 = 1;

impl TodoRequest {
    /// Apply defaults and reject an empty title.
    pub fn validate(self) -> Result<NewTodo, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required".into()));
        }
        Ok(NewTodo {
            title: self.title,
            description: self.description.unwrap_or_default(),
            priority: match self.priority {
                None | Some(0) => DEFAULT_PRIORITY,
                Some(p) => p,
            },
        })
    }
}

/// Wall-clock now, nudged forward if needed so it is strictly after `prev`.
fn next_timestamp(prev: OffsetDateTime) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

/// Load a todo for mutation, separating "does not exist" from "belongs to someone else".
async fn owned_todo(db: &SqlitePool, owner_id: i64, id: i64) -> Result<Todo, AppError> {
    match Todo::find_by_id(db, id).await? {
        None => Err(AppError::NotFound("Todo not found".into())),
        Some(todo) if todo.user_id != owner_id => {
            warn!(todo_id = id, owner_id, "todo belongs to another user");
            Err(AppError::Forbidden("Forbidden".into()))
        }
        Some(todo) => Ok(todo),
    }
}

pub async fn list(db: &SqlitePool, owner_id: i64) -> Result<Vec<Todo>, AppError> {
    let todos = Todo::list_by_owner(db, owner_id).await?;
    debug!(owner_id, count = todos.len(), "todos listed");
    Ok(todos)
}

pub async fn create(db: &SqlitePool, owner_id: i64, req: TodoRequest) -> Result<Todo, AppError> {
    let new = req.validate()?;
    let todo = Todo::insert(db, owner_id, &new, OffsetDateTime::now_utc()).await?;
    info!(todo_id = todo.id, owner_id, "todo created");
    Ok(todo)
}

pub async fn update(
    db: &SqlitePool,
    owner_id: i64,
    id: i64,
    req: TodoRequest,
) -> Result<Todo, AppError> {
    let changes = req.validate()?;
    let current = owned_todo(db, owner_id, id).await?;

    // Still scoped by owner: a concurrent delete turns this into NotFound.
    let todo = Todo::update_owned(db, owner_id, id, &changes, next_timestamp(current.updated_at))
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found".into()))?;
    info!(todo_id = id, owner_id, "todo updated");
    Ok(todo)
}

pub async fn toggle(db: &SqlitePool, owner_id: i64, id: i64) -> Result<Todo, AppError> {
    let current = owned_todo(db, owner_id, id).await?;

    let todo = Todo::toggle_owned(db, owner_id, id, next_timestamp(current.updated_at))
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found".into()))?;
    info!(todo_id = id, owner_id, completed = todo.completed, "todo toggled");
    Ok(todo)
}

/// Missing and foreign todos both report NotFound.
pub async fn delete(db: &SqlitePool, owner_id: i64, id: i64) -> Result<(), AppError> {
    if Todo::delete_owned(db, owner_id, id).await? == 0 {
        warn!(todo_id = id, owner_id, "delete matched no owned todo");
        return Err(AppError::NotFound("Todo not found".into()));
    }
    info!(todo_id = id, owner_id, "todo deleted");
    Ok(())
}
