//! User account management.

use etic_api::db::UserRepository;
use etic_api::db::RepositoryError;
use etic_api::services::auth::{hash_password, validate_password};
use etic_core::Email;

use super::{CommandError, connect};

/// Create a user account.
///
/// The user can then log in and create stores through the API.
pub async fn create(email: &str, name: Option<&str>, password: &str) -> Result<(), CommandError> {
    let email =
        Email::parse(email).map_err(|e| CommandError::InvalidInput(format!("{email}: {e}")))?;
    validate_password(password)?;
    let hash = hash_password(password)?;

    let pool = connect().await?;

    tracing::info!("Creating user: {}", email);
    let user = UserRepository::new(&pool)
        .create(&email, &hash, name)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                CommandError::InvalidInput(format!("user already exists with email: {email}"))
            }
            other => other.into(),
        })?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(())
}
