//! In-memory store backed by `DashMap`s.
//!
//! Candidate queries return profiles in first-insertion order, which keeps
//! deck order deterministic for a given seed.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    CandidateProfile, DecisionMap, MatchRecord, MatchStore, Message, MessageStore, ProfileStore,
    Result, SwipeStore, UserId,
};
use tracing::debug;

#[derive(Default)]
pub struct MemoryStore {
    /// Insertion sequence number alongside each profile.
    profiles: DashMap<UserId, (u64, CandidateProfile)>,
    next_seq: AtomicU64,
    decisions: DashMap<UserId, DecisionMap>,
    matches: DashMap<UserId, Vec<MatchRecord>>,
    /// Conversations keyed by the ordered pair of participants.
    conversations: DashMap<(UserId, UserId), Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts profiles in order. Convenience for seeding.
    pub fn with_profiles(profiles: impl IntoIterator<Item = CandidateProfile>) -> Self {
        let store = Self::new();
        for profile in profiles {
            store.insert_profile(profile);
        }
        store
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    fn insert_profile(&self, profile: CandidateProfile) {
        let seq = match self.profiles.get(&profile.id) {
            Some(existing) => existing.0,
            None => self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.profiles.insert(profile.id, (seq, profile));
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn query_candidates(&self, min_age: u32, max_age: u32) -> Result<Vec<CandidateProfile>> {
        let mut hits: Vec<(u64, CandidateProfile)> = self
            .profiles
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .1
                    .age
                    .is_some_and(|age| (min_age..=max_age).contains(&age))
            })
            .map(|entry| entry.value().clone())
            .collect();
        hits.sort_by_key(|(seq, _)| *seq);
        debug!(min_age, max_age, hits = hits.len(), "candidate query");
        Ok(hits.into_iter().map(|(_, profile)| profile).collect())
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<CandidateProfile>> {
        Ok(self.profiles.get(&id).map(|entry| entry.value().1.clone()))
    }

    async fn put_profile(&self, profile: CandidateProfile) -> Result<()> {
        self.insert_profile(profile);
        Ok(())
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn get_decisions(&self, user: UserId) -> Result<DecisionMap> {
        Ok(self
            .decisions
            .get(&user)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn put_decisions(&self, user: UserId, decisions: DecisionMap) -> Result<()> {
        self.decisions.entry(user).or_default().merge(&decisions);
        Ok(())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn put_match(&self, owner: UserId, record: MatchRecord) -> Result<()> {
        let mut inbox = self.matches.entry(owner).or_default();
        match inbox.iter().position(|r| r.peer == record.peer) {
            Some(i) => inbox[i] = record,
            None => inbox.push(record),
        }
        Ok(())
    }

    async fn list_matches(&self, owner: UserId) -> Result<Vec<MatchRecord>> {
        Ok(self
            .matches
            .get(&owner)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

fn conversation_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn send_message(&self, message: Message) -> Result<()> {
        self.conversations
            .entry(conversation_key(message.from, message.to))
            .or_default()
            .push(message);
        Ok(())
    }

    async fn list_messages(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let mut messages = self
            .conversations
            .get(&conversation_key(a, b))
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        // Stable: equal timestamps keep send order.
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }
}
