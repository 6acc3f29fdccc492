//! # Discovery controller
//!
//! Coordinates the home screen: owns the current [`Deck`], resolves the top
//! card on a swipe or button press, and runs persistence in a spawned task
//! so the card leaves the screen without waiting on the store.
//!
//! Deck state sits behind a mutex that is never held across an await.
//! Spawned completions carry the generation of the deck they came from and
//! leave a rebuilt deck untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domains::{
    AuthContext, CandidateProfile, DomainError, Match, Result, UserId, Verdict,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::card::{resolve_drag, Card, CardIntent, ScriptedAnimation, SwipeTuning};
use crate::deck::{Deck, NodeTicket};
use crate::deck_builder::DeckBuilder;
use crate::session::Session;
use crate::swipe::{SwipeOutcome, SwipeRecorder};
use crate::Stores;

/// Status updates for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    DeckReady { generation: u64, candidates: usize },
    /// The deck could not be (re)built; it is empty until the next refresh.
    FetchFailed(DomainError),
    Matched(Match),
    /// Follows `Matched` when the inbox records for that match were not stored.
    MatchRecordFailed { peer: UserId, error: DomainError },
    /// Recording the swipe or checking it for a match failed. The card is
    /// already gone.
    SwipeFailed { subject: UserId, error: DomainError },
}

/// A swipe whose card has left the deck but whose write may still be running.
#[derive(Debug)]
pub struct PendingSwipe {
    pub subject: UserId,
    pub verdict: Verdict,
    pub ticket: NodeTicket,
    /// Set for button presses; drags animate from the finger position.
    pub animation: Option<ScriptedAnimation>,
    pub handle: JoinHandle<Result<SwipeOutcome>>,
}

pub struct Discovery {
    auth: Arc<dyn AuthContext>,
    stores: Stores,
    tuning: SwipeTuning,
    deck: Arc<Mutex<Deck>>,
    next_generation: u64,
    recorder: Option<Arc<SwipeRecorder>>,
    events: broadcast::Sender<DiscoveryEvent>,
}

impl Discovery {
    pub fn new(
        auth: Arc<dyn AuthContext>,
        stores: Stores,
        tuning: SwipeTuning,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            auth,
            stores,
            tuning,
            deck: Arc::new(Mutex::new(Deck::empty(0))),
            next_generation: 1,
            recorder: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    pub fn tuning(&self) -> &SwipeTuning {
        &self.tuning
    }

    /// The session the current deck was built for.
    pub fn session(&self) -> Option<&Session> {
        self.recorder.as_deref().map(SwipeRecorder::session)
    }

    /// Rebuilds the deck from scratch under a new generation.
    ///
    /// Re-reads the user's own profile (seeking range may have changed in
    /// settings) and swipe document before querying candidates. Any failure
    /// leaves an empty deck. Swipes still in flight are not cancelled.
    ///
    /// The swipe recorder follows the session: it is replaced as soon as the
    /// user is resolved and only dropped when no session could be
    /// established, so a deck left over from another account can never be
    /// recorded under the new one.
    pub async fn refresh(&mut self) -> Result<usize> {
        let generation = self.next_generation;
        self.next_generation += 1;
        // The old deck is detached right away so nothing is swiped on it
        // while the rebuild is suspended.
        *lock(&self.deck) = Deck::empty(generation);

        let built = match Session::establish(self.auth.as_ref(), self.stores.profiles.as_ref()).await
        {
            Ok(session) => {
                self.recorder = Some(Arc::new(SwipeRecorder::new(
                    self.stores.swipes.clone(),
                    self.stores.matches.clone(),
                    self.stores.profiles.clone(),
                    session.clone(),
                )));
                self.build(session, generation).await
            }
            Err(e) => {
                self.recorder = None;
                Err(e)
            }
        };

        match built {
            Ok(deck) => {
                let candidates = deck.remaining();
                *lock(&self.deck) = deck;
                let _ = self.events.send(DiscoveryEvent::DeckReady {
                    generation,
                    candidates,
                });
                Ok(candidates)
            }
            Err(e) => {
                warn!(generation, error = %e, "deck refresh failed");
                let _ = self.events.send(DiscoveryEvent::FetchFailed(e.clone()));
                Err(e)
            }
        }
    }

    async fn build(&self, session: Session, generation: u64) -> Result<Deck> {
        let prior = self.stores.swipes.get_decisions(session.user_id()).await?;
        DeckBuilder::new(self.stores.profiles.clone(), session)
            .build(&prior, generation)
            .await
    }

    pub fn generation(&self) -> u64 {
        lock(&self.deck).generation()
    }

    pub fn top(&self) -> Option<CandidateProfile> {
        lock(&self.deck).top().cloned()
    }

    /// A fresh card for the current top.
    pub fn top_card(&self) -> Option<Card> {
        self.top().map(|p| Card::new(p, self.tuning))
    }

    pub fn remaining(&self) -> usize {
        lock(&self.deck).remaining()
    }

    /// Visible candidates, back to front.
    pub fn render_order(&self) -> Vec<UserId> {
        lock(&self.deck).render_order().map(|p| p.id).collect()
    }

    /// Like button.
    pub fn like(&self) -> Result<Option<PendingSwipe>> {
        self.resolve_top(Verdict::Accept, true)
    }

    /// Dislike button.
    pub fn dislike(&self) -> Result<Option<PendingSwipe>> {
        self.resolve_top(Verdict::Reject, true)
    }

    /// Drag released at horizontal displacement `dx`. Inside the threshold
    /// the card springs back and nothing is resolved.
    pub fn release_drag(&self, dx: f64) -> Result<Option<PendingSwipe>> {
        match resolve_drag(dx, &self.tuning) {
            CardIntent::Swipe(verdict) => self.resolve_top(verdict, false),
            _ => Ok(None),
        }
    }

    /// Resolves the top card with `verdict` as if by gesture.
    pub fn swipe(&self, verdict: Verdict) -> Result<Option<PendingSwipe>> {
        self.resolve_top(verdict, false)
    }

    fn resolve_top(&self, verdict: Verdict, scripted: bool) -> Result<Option<PendingSwipe>> {
        let recorder = self.recorder.clone().ok_or(DomainError::NotAuthenticated)?;
        recorder.session().ensure_current(self.auth.as_ref())?;

        let Some((ticket, profile)) = lock(&self.deck).resolve_top(verdict) else {
            return Ok(None);
        };
        let subject = profile.id;
        debug!(%subject, %verdict, generation = ticket.generation, "card resolved");

        let handle = tokio::spawn(persist(
            recorder,
            self.deck.clone(),
            self.events.clone(),
            ticket,
            subject,
            verdict,
        ));

        Ok(Some(PendingSwipe {
            subject,
            verdict,
            ticket,
            animation: scripted.then(|| ScriptedAnimation::for_verdict(verdict, &self.tuning)),
            handle,
        }))
    }
}

async fn persist(
    recorder: Arc<SwipeRecorder>,
    deck: Arc<Mutex<Deck>>,
    events: broadcast::Sender<DiscoveryEvent>,
    ticket: NodeTicket,
    subject: UserId,
    verdict: Verdict,
) -> Result<SwipeOutcome> {
    let result = recorder.record_swipe(subject, verdict).await;

    if !lock(&deck).complete(ticket) {
        debug!(%subject, generation = ticket.generation, "completion for a detached deck");
    }

    match &result {
        Ok(SwipeOutcome {
            matched: Some(m),
            record_error,
            ..
        }) => {
            info!(user_id = %m.user, peer = %m.peer, "notifying match");
            let _ = events.send(DiscoveryEvent::Matched(*m));
            if let Some(error) = record_error {
                let _ = events.send(DiscoveryEvent::MatchRecordFailed {
                    peer: m.peer,
                    error: error.clone(),
                });
            }
        }
        Ok(_) => {}
        Err(e) => {
            warn!(%subject, error = %e, "swipe not persisted");
            let _ = events.send(DiscoveryEvent::SwipeFailed {
                subject,
                error: e.clone(),
            });
        }
    }
    result
}

fn lock(deck: &Mutex<Deck>) -> MutexGuard<'_, Deck> {
    deck.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        DecisionMap, MockAuthContext, MockMatchStore, MockMessageStore, MockProfileStore,
        MockSwipeStore,
    };

    fn stores(profiles: MockProfileStore, swipes: MockSwipeStore, matches: MockMatchStore) -> Stores {
        Stores {
            profiles: Arc::new(profiles),
            swipes: Arc::new(swipes),
            matches: Arc::new(matches),
            messages: Arc::new(MockMessageStore::new()),
        }
    }

    fn auth_for(id: Option<UserId>) -> Arc<MockAuthContext> {
        let mut auth = MockAuthContext::new();
        auth.expect_current_user_id().return_const(id);
        Arc::new(auth)
    }

    fn candidates(n: usize) -> Vec<CandidateProfile> {
        (0..n)
            .map(|i| CandidateProfile {
                age: Some(30),
                ..CandidateProfile::new(UserId::new(), format!("c{i}"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_refresh_without_login_issues_no_calls() {
        let stores = stores(
            MockProfileStore::new(),
            MockSwipeStore::new(),
            MockMatchStore::new(),
        );
        let mut discovery = Discovery::new(auth_for(None), stores, SwipeTuning::default(), 8);
        let mut events = discovery.subscribe();

        assert_eq!(discovery.refresh().await, Err(DomainError::NotAuthenticated));
        assert_eq!(
            events.recv().await.unwrap(),
            DiscoveryEvent::FetchFailed(DomainError::NotAuthenticated)
        );
        assert!(discovery.top().is_none());
        assert_eq!(discovery.like().unwrap_err(), DomainError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_failed_query_leaves_empty_deck() {
        let me = UserId::new();
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|_| Ok(None));
        profiles
            .expect_query_candidates()
            .returning(|_, _| Err(DomainError::FetchFailed("503".into())));
        let mut swipes = MockSwipeStore::new();
        swipes.expect_get_decisions().returning(|_| Ok(DecisionMap::new()));

        let stores = stores(profiles, swipes, MockMatchStore::new());
        let mut discovery = Discovery::new(auth_for(Some(me)), stores, SwipeTuning::default(), 8);

        assert!(matches!(discovery.refresh().await, Err(DomainError::FetchFailed(_))));
        assert_eq!(discovery.remaining(), 0);
        assert!(discovery.render_order().is_empty());
        // The session was resolved, so the empty deck is simply exhausted.
        assert_eq!(discovery.session().map(Session::user_id), Some(me));
        assert!(discovery.like().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_the_new_users_session() {
        let (ann, bob) = (UserId::new(), UserId::new());
        let current = Arc::new(std::sync::Mutex::new(ann));
        let mut auth = MockAuthContext::new();
        let who = current.clone();
        auth.expect_current_user_id().returning(move || Some(*who.lock().unwrap()));

        let deck = candidates(1);
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|_| Ok(None));
        let mut queries = 0;
        profiles.expect_query_candidates().returning(move |_, _| {
            queries += 1;
            match queries {
                1 => Ok(deck.clone()),
                _ => Err(DomainError::FetchFailed("503".into())),
            }
        });
        let mut swipes = MockSwipeStore::new();
        swipes.expect_get_decisions().returning(|_| Ok(DecisionMap::new()));

        let stores = stores(profiles, swipes, MockMatchStore::new());
        let mut discovery = Discovery::new(Arc::new(auth), stores, SwipeTuning::default(), 8);
        assert_eq!(discovery.refresh().await, Ok(1));
        assert_eq!(discovery.session().map(Session::user_id), Some(ann));

        *current.lock().unwrap() = bob;
        assert!(discovery.refresh().await.is_err());
        assert_eq!(discovery.session().map(Session::user_id), Some(bob));
        assert!(discovery.like().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsaved_match_record_is_reported_after_the_match() {
        let me = UserId::new();
        let deck = candidates(1);
        let peer = deck[0].id;

        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|_| Ok(None));
        profiles
            .expect_query_candidates()
            .returning(move |_, _| Ok(deck.clone()));
        let mut swipes = MockSwipeStore::new();
        swipes
            .expect_get_decisions()
            .returning(move |user| {
                if user == me {
                    Ok(DecisionMap::new())
                } else {
                    Ok([(me, true)].into_iter().collect())
                }
            });
        swipes.expect_put_decisions().returning(|_, _| Ok(()));
        let mut matches = MockMatchStore::new();
        matches
            .expect_put_match()
            .returning(|_, _| Err(DomainError::WriteFailed("inbox down".into())));

        let stores = stores(profiles, swipes, matches);
        let mut discovery = Discovery::new(auth_for(Some(me)), stores, SwipeTuning::default(), 8);
        discovery.refresh().await.unwrap();
        let mut events = discovery.subscribe();

        let outcome = discovery.like().unwrap().unwrap().handle.await.unwrap().unwrap();
        assert_eq!(outcome.matched, Some(Match { user: me, peer }));
        assert_eq!(
            events.recv().await.unwrap(),
            DiscoveryEvent::Matched(Match { user: me, peer })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            DiscoveryEvent::MatchRecordFailed {
                peer,
                error: DomainError::WriteFailed("inbox down".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_write_still_advances_and_reports() {
        let me = UserId::new();
        let deck = candidates(2);
        let first = deck[0].id;
        let second = deck[1].id;

        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|_| Ok(None));
        profiles
            .expect_query_candidates()
            .returning(move |_, _| Ok(deck.clone()));
        let mut swipes = MockSwipeStore::new();
        swipes.expect_get_decisions().returning(|_| Ok(DecisionMap::new()));
        swipes
            .expect_put_decisions()
            .returning(|_, _| Err(DomainError::WriteFailed("denied".into())));

        let stores = stores(profiles, swipes, MockMatchStore::new());
        let mut discovery = Discovery::new(auth_for(Some(me)), stores, SwipeTuning::default(), 8);
        assert_eq!(discovery.refresh().await, Ok(2));
        let mut events = discovery.subscribe();

        let pending = discovery.dislike().unwrap().unwrap();
        assert_eq!(pending.subject, first);
        assert_eq!(pending.animation.map(|a| a.translation_x), Some(-700.0));
        // Advanced before persistence finished.
        assert_eq!(discovery.top().map(|p| p.id), Some(second));

        let result = pending.handle.await.unwrap();
        assert!(matches!(result, Err(DomainError::WriteFailed(_))));
        assert!(matches!(
            events.recv().await.unwrap(),
            DiscoveryEvent::SwipeFailed { subject, .. } if subject == first
        ));
        assert_eq!(discovery.render_order(), vec![second]);
    }

    #[tokio::test]
    async fn test_short_drag_resolves_nothing() {
        let me = UserId::new();
        let deck = candidates(1);
        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile().returning(|_| Ok(None));
        profiles
            .expect_query_candidates()
            .returning(move |_, _| Ok(deck.clone()));
        let mut swipes = MockSwipeStore::new();
        swipes.expect_get_decisions().returning(|_| Ok(DecisionMap::new()));

        let stores = stores(profiles, swipes, MockMatchStore::new());
        let mut discovery = Discovery::new(auth_for(Some(me)), stores, SwipeTuning::default(), 8);
        discovery.refresh().await.unwrap();

        assert!(discovery.release_drag(80.0).unwrap().is_none());
        assert_eq!(discovery.remaining(), 1);
    }
}
