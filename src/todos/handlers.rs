use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppError,
    state::AppState,
    todos::{dto::TodoRequest, repo_types::Todo, services},
};

type TodoId = WithRejection<Path<i64>, AppError>;
type Body = WithRejection<Json<TodoRequest>, AppError>;

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", put(update_todo).delete(delete_todo))
        .route("/todos/:id/toggle", patch(toggle_todo))
}

#[instrument(skip(state, user), fields(user_id = user.user_id()))]
pub async fn list_todos(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = services::list(&state.db, user.user_id()).await?;
    Ok(Json(todos))
}

#[instrument(skip(state, user, payload), fields(user_id = user.user_id()))]
pub async fn create_todo(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(payload), _): Body,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let todo = services::create(&state.db, user.user_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, user, payload), fields(user_id = user.user_id()))]
pub async fn update_todo(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(id), _): TodoId,
    WithRejection(Json(payload), _): Body,
) -> Result<Json<Todo>, AppError> {
    let todo = services::update(&state.db, user.user_id(), id, payload).await?;
    Ok(Json(todo))
}

#[instrument(skip(state, user), fields(user_id = user.user_id()))]
pub async fn delete_todo(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(id), _): TodoId,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(&state.db, user.user_id(), id).await?;
    Ok(Json(MessageResponse {
        message: "Todo deleted successfully",
    }))
}

#[instrument(skip(state, user), fields(user_id = user.user_id()))]
pub async fn toggle_todo(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(id), _): TodoId,
) -> Result<Json<Todo>, AppError> {
    let todo = services::toggle(&state.db, user.user_id(), id).await?;
    Ok(Json(todo))
}
