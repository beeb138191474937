use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo_types::User,
        session::SessionManager,
    },
    error::AppError,
};

pub const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_registration(email: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::InvalidInput("invalid email format".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Create an account. The email is stored exactly as given.
pub async fn register(db: &SqlitePool, email: &str, password: &str) -> Result<User, AppError> {
    validate_registration(email, password)?;

    if User::find_by_email(db, email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let hash = hash_password(password)?;
    let user = match User::create(db, email, &hash, OffsetDateTime::now_utc()).await {
        Ok(u) => u,
        // Lost a race against a concurrent registration of the same email.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!(%email, "email registered concurrently");
            return Err(AppError::Conflict("User already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Check credentials and issue a session token.
///
/// Unknown email and wrong password produce the same `Unauthorized` error.
pub async fn login(
    db: &SqlitePool,
    sessions: &SessionManager,
    email: &str,
    password: &str,
) -> Result<(User, String), AppError> {
    let Some(user) = User::find_by_email(db, email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&user.password_hash, password)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = sessions.create(user.id, &user.email)?;
    info!(user_id = user.id, "user logged in");
    Ok((user, token))
}
