//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the services.
//! Stores are shared across spawned tasks, so every port is `Send + Sync`.

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{CandidateProfile, DecisionMap, MatchRecord, Message, UserId};

/// Profile persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profiles whose age lies in `[min_age, max_age]`, in the store's order.
    /// The order must be stable for one call; nothing else is promised.
    async fn query_candidates(&self, min_age: u32, max_age: u32) -> Result<Vec<CandidateProfile>>;

    async fn get_profile(&self, id: UserId) -> Result<Option<CandidateProfile>>;

    /// Creates or fully replaces the profile stored under `profile.id`.
    async fn put_profile(&self, profile: CandidateProfile) -> Result<()>;
}

/// Swipe document contract. One decision map per author.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SwipeStore: Send + Sync {
    /// The author's decisions, or an empty map if none were ever written.
    async fn get_decisions(&self, user: UserId) -> Result<DecisionMap>;

    /// Create-if-absent, else field-merge. Must be idempotent under retry.
    async fn put_decisions(&self, user: UserId, decisions: DecisionMap) -> Result<()>;
}

/// Per-user match inbox.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Upserts the record keyed by `(owner, record.peer)`.
    async fn put_match(&self, owner: UserId, record: MatchRecord) -> Result<()>;

    async fn list_matches(&self, owner: UserId) -> Result<Vec<MatchRecord>>;
}

/// Chat history between matched users.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn send_message(&self, message: Message) -> Result<()>;

    /// Every message exchanged between `a` and `b`, in either direction,
    /// oldest first.
    async fn list_messages(&self, a: UserId, b: UserId) -> Result<Vec<Message>>;
}

/// Read-only view of who is logged in.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthContext: Send + Sync {
    /// `None` means not logged in; no store call may be issued in that state.
    fn current_user_id(&self) -> Option<UserId>;
}

/// Credential-based account management.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers a new account and signs it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<UserId>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;

    fn sign_out(&self);
}
