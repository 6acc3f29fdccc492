//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domains::{AuthContext, CandidateProfile, DecisionMap, DomainError, Result, SwipeStore, UserId};
use services::{Discovery, PendingSwipe, Stores, SwipeOutcome, SwipeTuning};
use storage_adapters::MemoryStore;
use tokio::sync::Semaphore;

/// Auth context whose user the test switches by hand.
#[derive(Default)]
pub struct SwitchableAuth {
    current: Mutex<Option<UserId>>,
}

impl SwitchableAuth {
    pub fn signed_in(user: UserId) -> Arc<Self> {
        let auth = Self::default();
        auth.set(Some(user));
        Arc::new(auth)
    }

    pub fn set(&self, user: Option<UserId>) {
        *self.current.lock().unwrap() = user;
    }
}

impl AuthContext for SwitchableAuth {
    fn current_user_id(&self) -> Option<UserId> {
        *self.current.lock().unwrap()
    }
}

/// Swipe store whose writes block until the test releases them one by one.
pub struct GatedSwipes {
    inner: Arc<MemoryStore>,
    gate: Semaphore,
}

impl GatedSwipes {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
        })
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl SwipeStore for GatedSwipes {
    async fn get_decisions(&self, user: UserId) -> Result<DecisionMap> {
        self.inner.get_decisions(user).await
    }

    async fn put_decisions(&self, user: UserId, decisions: DecisionMap) -> Result<()> {
        self.gate
            .acquire()
            .await
            .map_err(|e| DomainError::WriteFailed(e.to_string()))?
            .forget();
        self.inner.put_decisions(user, decisions).await
    }
}

pub fn person(name: &str, age: u32) -> CandidateProfile {
    CandidateProfile {
        age: Some(age),
        photo_urls: vec![format!("https://img/{name}/0"), format!("https://img/{name}/1")],
        ..CandidateProfile::new(UserId::new(), name)
    }
}

pub fn discovery(auth: Arc<dyn AuthContext>, stores: Stores) -> Discovery {
    Discovery::new(auth, stores, SwipeTuning::default(), 16)
}

pub fn names(profiles: &[CandidateProfile]) -> Vec<&str> {
    profiles.iter().map(|p| p.name.as_str()).collect()
}

pub async fn settle(pending: Option<PendingSwipe>) -> SwipeOutcome {
    pending
        .expect("top card should resolve")
        .handle
        .await
        .expect("persist task panicked")
        .expect("swipe should persist")
}
