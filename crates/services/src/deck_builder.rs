//! Turns a discovery query into a [`Deck`].

use std::sync::Arc;

use domains::{DecisionMap, ProfileStore, Result};
use tracing::{info, warn};

use crate::deck::Deck;
use crate::session::Session;

pub struct DeckBuilder {
    profiles: Arc<dyn ProfileStore>,
    session: Session,
}

impl DeckBuilder {
    pub fn new(profiles: Arc<dyn ProfileStore>, session: Session) -> Self {
        Self { profiles, session }
    }

    /// Queries candidates inside the session's seeking range and drops the
    /// session user and anyone already in `prior`. Query order is preserved.
    /// Anything the store returns outside the range is dropped as well.
    ///
    /// On a failed query nothing is built; the caller keeps an empty deck.
    pub async fn build(&self, prior: &DecisionMap, generation: u64) -> Result<Deck> {
        let me = self.session.user_id();
        let range = self.session.seeking();

        let candidates = self
            .profiles
            .query_candidates(range.min(), range.max())
            .await
            .inspect_err(|e| warn!(user_id = %me, error = %e, "candidate query failed"))?;
        let fetched = candidates.len();

        let eligible: Vec<_> = candidates
            .into_iter()
            .filter(|p| p.age.is_some_and(|age| range.contains(age)))
            .filter(|p| p.id != me && !prior.contains(&p.id))
            .collect();

        info!(
            user_id = %me,
            generation,
            min_age = range.min(),
            max_age = range.max(),
            fetched,
            eligible = eligible.len(),
            "deck built"
        );
        Ok(Deck::new(generation, eligible))
    }
}
