//! # Swipe Recorder & Match Detector
//!
//! Persists one decision for the session user, then looks at the subject's
//! own swipe document to see whether the accept is mutual.
//!
//! Each step awaits the one before it, so a failure aborts everything after
//! it. Nothing is rolled back and nothing is retried. The one exception is the
//! inbox write: once both accepts exist the match is reported even when its
//! records could not be stored.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    CandidateProfile, DomainError, Match, MatchRecord, MatchStore, ProfileStore, Result,
    SwipeDecision, SwipeStore, UserId, Verdict,
};
use tracing::{info, warn};

use crate::session::Session;

/// Result of a persisted swipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeOutcome {
    pub decision: SwipeDecision,
    /// Set when this swipe completed a mutual accept.
    pub matched: Option<Match>,
    /// Writing the inbox records for `matched` failed. The match itself stands.
    pub record_error: Option<DomainError>,
}

pub struct SwipeRecorder {
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchStore>,
    profiles: Arc<dyn ProfileStore>,
    session: Session,
}

impl SwipeRecorder {
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        matches: Arc<dyn MatchStore>,
        profiles: Arc<dyn ProfileStore>,
        session: Session,
    ) -> Self {
        Self {
            swipes,
            matches,
            profiles,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read, upsert and write back the session user's decision map, then
    /// run match detection for accepts.
    pub async fn record_swipe(&self, subject: UserId, verdict: Verdict) -> Result<SwipeOutcome> {
        let me = self.session.user_id();
        let decision = SwipeDecision { subject, verdict };

        let mut decisions = self.swipes.get_decisions(me).await?;
        decisions.record(decision);
        self.swipes
            .put_decisions(me, decisions)
            .await
            .inspect_err(|e| warn!(user_id = %me, %subject, error = %e, "swipe write failed"))?;
        info!(user_id = %me, %subject, %verdict, "swipe recorded");

        let matched = if verdict.is_accept() {
            self.detect_match(subject).await?
        } else {
            None
        };
        let record_error = match matched {
            Some(_) => self
                .persist_match(subject)
                .await
                .inspect_err(|e| warn!(user_id = %me, %subject, error = %e, "match record not saved"))
                .err(),
            None => None,
        };

        Ok(SwipeOutcome {
            decision,
            matched,
            record_error,
        })
    }

    /// Only the caller's side is checked: the match surfaces for whoever
    /// completes the second accept.
    async fn detect_match(&self, subject: UserId) -> Result<Option<Match>> {
        let me = self.session.user_id();
        let theirs = self.swipes.get_decisions(subject).await?;
        if !theirs.has_accepted(&me) {
            return Ok(None);
        }

        info!(user_id = %me, peer = %subject, "match detected");
        Ok(Some(Match {
            user: me,
            peer: subject,
        }))
    }

    /// Writes an inbox record into both participants' match lists.
    async fn persist_match(&self, subject: UserId) -> Result<()> {
        let me = self.session.user_id();
        let now = Utc::now();
        let peer = self
            .profiles
            .get_profile(subject)
            .await?
            .unwrap_or_else(|| CandidateProfile::new(subject, ""));

        self.matches
            .put_match(me, MatchRecord::for_peer(&peer, now))
            .await?;
        self.matches
            .put_match(subject, MatchRecord::for_peer(self.session.profile(), now))
            .await
    }
}
