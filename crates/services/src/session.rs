//! # Session
//!
//! The authenticated identity threaded through the discovery workflow.
//! Built once per deck refresh and handed to the deck builder and swipe
//! recorder by value, so nothing downstream looks identity up on its own.

use domains::{
    AuthContext, CandidateProfile, DomainError, ProfileStore, Result, SeekingAgeRange, UserId,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    profile: CandidateProfile,
}

impl Session {
    /// Resolves the current user and loads their own profile.
    ///
    /// Fails with `NotAuthenticated` before touching the store when nobody
    /// is logged in. A user who has not saved a profile yet gets a blank one,
    /// which means default seeking bounds.
    pub async fn establish(auth: &dyn AuthContext, profiles: &dyn ProfileStore) -> Result<Self> {
        let user_id = auth.current_user_id().ok_or(DomainError::NotAuthenticated)?;
        let profile = match profiles.get_profile(user_id).await? {
            Some(profile) => profile,
            None => {
                debug!(%user_id, "no stored profile, using defaults");
                CandidateProfile::new(user_id, "")
            }
        };
        Ok(Self { profile })
    }

    /// A session for an already known profile.
    pub fn for_profile(profile: CandidateProfile) -> Self {
        Self { profile }
    }

    pub fn user_id(&self) -> UserId {
        self.profile.id
    }

    pub fn seeking(&self) -> SeekingAgeRange {
        self.profile.seeking_range()
    }

    pub fn profile(&self) -> &CandidateProfile {
        &self.profile
    }

    /// `NotAuthenticated` unless `auth` still reports this session's user.
    pub fn ensure_current(&self, auth: &dyn AuthContext) -> Result<()> {
        match auth.current_user_id() {
            Some(id) if id == self.user_id() => Ok(()),
            _ => Err(DomainError::NotAuthenticated),
        }
    }
}
