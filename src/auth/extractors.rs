use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use super::session::{SessionIdentity, SessionManager, SESSION_COOKIE};
use crate::error::AppError;

/// Authorization gate for protected routes.
///
/// Resolves the session cookie before the handler body runs; without a valid
/// session the request is answered with 401 and the handler is never invoked.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionIdentity);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionManager: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionManager::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let identity = jar
            .get(SESSION_COOKIE)
            .and_then(|c| sessions.resolve(c.value()));

        match identity {
            Some(identity) => Ok(AuthUser(identity)),
            None => {
                warn!(uri = %parts.uri, "request without a valid session");
                Err(AppError::Unauthorized("Authentication required".into()))
            }
        }
    }
}
