use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::jwt::SessionKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::error::AppError;
use crate::movements::balance::initial_balance;
use crate::movements::repo::upsert_balance;
use crate::validation::{normalize_email, normalize_name, validate_login, validate_registration};

/// One undo action recorded by the registration saga after the matching store
/// write commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Compensation {
    DeleteUser(Uuid),
    DeleteBalance(Uuid),
}

/// Ordered list of compensating deletes. There is no transaction across the
/// registration steps, so on a later failure the committed ones are undone
/// explicitly, newest first.
#[derive(Debug, Default)]
pub(crate) struct Saga {
    steps: Vec<Compensation>,
}

impl Saga {
    pub(crate) fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Steps in undo order (reverse of commit order).
    pub(crate) fn unwind_order(&self) -> impl Iterator<Item = &Compensation> {
        self.steps.iter().rev()
    }

    /// Runs every compensation in reverse order. A failed undo is logged and
    /// skipped so the remaining steps still run.
    pub(crate) async fn unwind(self, db: &PgPool) {
        for step in self.steps.into_iter().rev() {
            let result = match &step {
                Compensation::DeleteUser(id) => User::delete(db, *id).await,
                Compensation::DeleteBalance(owner_id) => {
                    crate::movements::repo::delete_balance(db, *owner_id).await
                }
            };
            if let Err(e) = result {
                error!(error = %e, step = ?step, "saga compensation failed");
            }
        }
    }
}

/// Registers a new user: validate, check for an email collision, hash the
/// password, sign the token (a local step, done before any store write), then
/// create the user and their initial balance. Partial failures roll back the
/// committed writes before surfacing.
pub async fn register_user(
    db: &PgPool,
    keys: &SessionKeys,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(String, PublicUser), AppError> {
    validate_registration(email, password, name).into_result()?;
    let email = normalize_email(email);
    let name = normalize_name(name);

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::EmailTaken);
    }

    let hash = hash_password(password)?;

    // The user ID is minted locally so the token exists before the first
    // store write, keeping the partial-failure window as small as possible.
    let user_id = Uuid::new_v4();
    let token = keys.sign(user_id)?;

    let mut saga = Saga::default();

    let user = match User::create(db, user_id, &email, &hash, &name).await {
        Ok(u) => {
            saga.record(Compensation::DeleteUser(user_id));
            u
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(AppError::Store(e));
        }
    };

    match upsert_balance(db, &initial_balance(user_id)).await {
        Ok(()) => saga.record(Compensation::DeleteBalance(user_id)),
        Err(e) => {
            error!(error = %e, user_id = %user_id, "create initial balance failed");
            saga.unwind(db).await;
            return Err(AppError::Store(e));
        }
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((token, user.into()))
}

/// Authenticates a user and signs a fresh session token. The error is the
/// same whether the email is unknown or the password is wrong.
pub async fn login_user(
    db: &PgPool,
    keys: &SessionKeys,
    email: &str,
    password: &str,
) -> Result<(String, PublicUser), AppError> {
    validate_login(email, password).into_result()?;
    let email = normalize_email(email);

    let user = match User::find_by_email(db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::BadCredentials);
        }
    };

    if !verify_password(password, user.password_hash.as_bytes()) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::BadCredentials);
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user.into()))
}

/// Loads the public profile for a verified user ID. A missing row means the
/// session refers to a deleted account and is treated as an invalid token.
pub async fn load_profile(db: &PgPool, user_id: Uuid) -> Result<PublicUser, AppError> {
    match User::find_by_id(db, user_id).await? {
        Some(u) => Ok(u.into()),
        None => {
            warn!(user_id = %user_id, "session user no longer exists");
            Err(AppError::Token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRef;

    use crate::state::AppState;

    #[test]
    fn saga_unwinds_in_reverse_commit_order() {
        let user_id = Uuid::new_v4();
        let mut saga = Saga::default();
        saga.record(Compensation::DeleteUser(user_id));
        saga.record(Compensation::DeleteBalance(user_id));

        let order: Vec<_> = saga.unwind_order().cloned().collect();
        assert_eq!(
            order,
            vec![
                Compensation::DeleteBalance(user_id),
                Compensation::DeleteUser(user_id),
            ]
        );
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_before_touching_the_store() {
        // Lazy pool: any store access would error, so reaching the store
        // would surface as AppError::Store instead of Validation.
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);

        let err = register_user(&state.db, &keys, "", "ana@example.com", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = register_user(&state.db, &keys, "Ana", "not-an-email", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_rejects_blank_fields_before_touching_the_store() {
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);

        let err = login_user(&state.db, &keys, "", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = login_user(&state.db, &keys, "ana@example.com", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
