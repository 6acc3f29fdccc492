//! # services
//!
//! The discovery workflow and the screens around it, written against the
//! ports in `domains`. No store, identity provider or UI toolkit is named
//! here; adapters are injected as trait objects.

pub mod card;
pub mod chat;
pub mod deck;
pub mod deck_builder;
pub mod discovery;
pub mod matches;
pub mod registration;
pub mod session;
pub mod settings;
pub mod signal;
pub mod swipe;

use std::sync::Arc;

use domains::{MatchStore, MessageStore, ProfileStore, SwipeStore};

pub use card::{Card, CardFace, CardIntent, ScriptedAnimation, SwipeTuning, TextAlignment};
pub use chat::{ChatLine, ChatLog};
pub use deck::{Deck, NodeState, NodeTicket};
pub use deck_builder::DeckBuilder;
pub use discovery::{Discovery, DiscoveryEvent, PendingSwipe};
pub use matches::MatchesInbox;
pub use registration::RegistrationForm;
pub use session::Session;
pub use settings::ProfileEditor;
pub use signal::Signal;
pub use swipe::{SwipeOutcome, SwipeRecorder};

/// The store adapters the services are wired to.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub swipes: Arc<dyn SwipeStore>,
    pub matches: Arc<dyn MatchStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Stores {
    /// Uses one adapter for every port.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ProfileStore + SwipeStore + MatchStore + MessageStore + 'static,
    {
        Self {
            profiles: store.clone(),
            swipes: store.clone(),
            matches: store.clone(),
            messages: store,
        }
    }
}
