pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

/// Every route here sits behind the `AuthUser` gate.
pub fn router() -> Router<AppState> {
    handlers::todo_routes()
}
