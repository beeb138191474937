use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::{CookieJar, WithRejection};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest},
        services,
        session::SESSION_COOKIE,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = services::register(&state.db, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let (user, token) =
        services::login(&state.db, &state.sessions, &payload.email, &payload.password).await?;
    let jar = jar.add(state.sessions.session_cookie(token));
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful",
            user,
        }),
    ))
}

/// Always succeeds; a missing or stale session is simply overwritten.
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(identity) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| state.sessions.resolve(c.value()))
    {
        info!(user_id = identity.user_id, email = %identity.email, "user logged out");
    }
    let jar = jar.add(state.sessions.invalidate());
    (
        jar,
        Json(MessageResponse {
            message: "Logout successful",
        }),
    )
}
