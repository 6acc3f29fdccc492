//! # auth-adapters
//!
//! Argon2-backed implementation of `IdentityProvider` and `AuthContext`.
//! Accounts live in memory, keyed by normalised email; the signed-in user
//! is process-wide.

use std::sync::{PoisonError, RwLock};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use domains::{AuthContext, DomainError, IdentityProvider, Result, UserId};
use tracing::{debug, info, warn};

struct Account {
    user_id: UserId,
    password_hash: String,
}

#[derive(Default)]
pub struct CredentialAuth {
    accounts: DashMap<String, Account>,
    current: RwLock<Option<UserId>>,
}

impl CredentialAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn set_current(&self, user: Option<UserId>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::WriteFailed(format!("password hashing failed: {e}")))
}

/// Verifies `password` against a stored PHC string. Malformed hashes never verify.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2 is deliberately slow; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::WriteFailed(format!("hashing task failed: {e}")))
}

#[async_trait]
impl IdentityProvider for CredentialAuth {
    async fn create_user(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalise_email(email);
        if !email.contains('@') {
            return Err(DomainError::Validation(format!("'{email}' is not an email address")));
        }
        if password.is_empty() {
            return Err(DomainError::Validation("password must not be empty".into()));
        }
        if self.accounts.contains_key(&email) {
            return Err(DomainError::Conflict(format!("{email} is already registered")));
        }

        let password = password.to_owned();
        let password_hash = blocking(move || hash_password(&password)).await??;

        let user_id = match self.accounts.entry(email.clone()) {
            // Lost a race with a concurrent registration for the same address.
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!("{email} is already registered")))
            }
            Entry::Vacant(slot) => {
                let user_id = UserId::new();
                slot.insert(Account {
                    user_id,
                    password_hash,
                });
                user_id
            }
        };

        self.set_current(Some(user_id));
        info!(%user_id, "account created");
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalise_email(email);
        let Some((user_id, hash)) = self
            .accounts
            .get(&email)
            .map(|a| (a.user_id, a.password_hash.clone()))
        else {
            debug!("sign-in for unknown email");
            return Err(DomainError::InvalidCredentials);
        };

        let password = password.to_owned();
        if !blocking(move || verify_password(&password, &hash)).await? {
            warn!(%user_id, "sign-in with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        self.set_current(Some(user_id));
        info!(%user_id, "signed in");
        Ok(user_id)
    }

    fn sign_out(&self) {
        self.set_current(None);
        debug!("signed out");
    }
}

impl AuthContext for CredentialAuth {
    fn current_user_id(&self) -> Option<UserId> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
