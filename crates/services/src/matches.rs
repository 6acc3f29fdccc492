//! Matches inbox.

use std::sync::Arc;

use domains::{AuthContext, DomainError, MatchRecord, MatchStore, Result};

pub struct MatchesInbox {
    auth: Arc<dyn AuthContext>,
    matches: Arc<dyn MatchStore>,
}

impl MatchesInbox {
    pub fn new(auth: Arc<dyn AuthContext>, matches: Arc<dyn MatchStore>) -> Self {
        Self { auth, matches }
    }

    /// The current user's matches, newest first.
    pub async fn fetch(&self) -> Result<Vec<MatchRecord>> {
        let user_id = self.auth.current_user_id().ok_or(DomainError::NotAuthenticated)?;
        let mut records = self.matches.list_matches(user_id).await?;
        records.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(records)
    }
}
