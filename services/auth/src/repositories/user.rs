//! User repository for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Errors raised by the user repository
#[derive(Error, Debug)]
pub enum UserRepositoryError {
    /// A user with this email already exists
    #[error("Email already registered")]
    DuplicateEmail,

    /// Password hashing or hash parsing failed
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

type RepositoryResult<T> = Result<T, UserRepositoryError>;

const USER_COLUMNS: &str =
    "id, email, password_hash, current_streak, last_completed_date, created_at, updated_at";

/// Run a CPU-heavy password computation on the blocking thread pool
async fn run_blocking<T, F>(task: F) -> RepositoryResult<T>
where
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| UserRepositoryError::PasswordHash(e.to_string()))?
}

/// Hash a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> RepositoryResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserRepositoryError::PasswordHash(e.to_string()))
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, password_hash: &str) -> RepositoryResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| UserRepositoryError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// [`verify_password`] without blocking the async executor
pub async fn check_password(password: String, password_hash: String) -> RepositoryResult<bool> {
    run_blocking(move || verify_password(&password, &password_hash)).await
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with an empty streak
    ///
    /// `new_user.email` is expected to be normalized already.
    pub async fn create(&self, new_user: &NewUser) -> RepositoryResult<User> {
        info!("Creating new user: {}", new_user.email);

        let password = new_user.password.clone();
        let password_hash = run_blocking(move || hash_password(&password)).await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                UserRepositoryError::DuplicateEmail
            }
            _ => UserRepositoryError::Database(e),
        })?;

        Ok(user)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        info!("Finding user by email: {}", email);

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
