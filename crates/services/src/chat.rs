//! # Chat
//!
//! The conversation with one matched peer. Opening a log checks the peer is
//! in the current user's inbox; every later read or write re-checks that the
//! same user is still signed in.

use std::sync::Arc;

use chrono::Utc;
use domains::{AuthContext, DomainError, MatchRecord, Message, MessageStore, Result, UserId};
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::Stores;

/// A message as laid out in the chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub message: Message,
    /// Drawn on the trailing side of the log.
    pub is_from_current_user: bool,
}

impl ChatLine {
    fn new(message: Message, me: UserId) -> Self {
        Self {
            is_from_current_user: message.from == me,
            message,
        }
    }
}

pub struct ChatLog {
    auth: Arc<dyn AuthContext>,
    messages: Arc<dyn MessageStore>,
    session: Session,
    peer: MatchRecord,
}

impl ChatLog {
    /// Opens the conversation with `peer`. `Validation` unless the two users
    /// have matched.
    pub async fn open(auth: Arc<dyn AuthContext>, stores: &Stores, peer: UserId) -> Result<Self> {
        let session = Session::establish(auth.as_ref(), stores.profiles.as_ref()).await?;
        let me = session.user_id();
        let Some(record) = stores
            .matches
            .list_matches(me)
            .await?
            .into_iter()
            .find(|record| record.peer == peer)
        else {
            warn!(user_id = %me, %peer, "chat with an unmatched user refused");
            return Err(DomainError::Validation(format!("not matched with {peer}")));
        };

        debug!(user_id = %me, %peer, "chat opened");
        Ok(Self {
            auth,
            messages: stores.messages.clone(),
            session,
            peer: record,
        })
    }

    /// The inbox record of the person on the other side.
    pub fn peer(&self) -> &MatchRecord {
        &self.peer
    }

    /// The full conversation, oldest first.
    pub async fn load(&self) -> Result<Vec<ChatLine>> {
        self.session.ensure_current(self.auth.as_ref())?;
        let me = self.session.user_id();

        let mut messages = self.messages.list_messages(me, self.peer.peer).await?;
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages
            .into_iter()
            .map(|message| ChatLine::new(message, me))
            .collect())
    }

    /// Sends `text` to the peer. Blank messages are refused.
    pub async fn send(&self, text: &str) -> Result<ChatLine> {
        self.session.ensure_current(self.auth.as_ref())?;
        if text.trim().is_empty() {
            return Err(DomainError::Validation("message is empty".into()));
        }

        let me = self.session.user_id();
        let message = Message::new(me, self.peer.peer, text, Utc::now());
        self.messages
            .send_message(message.clone())
            .await
            .inspect_err(|e| warn!(user_id = %me, peer = %self.peer.peer, error = %e, "message not sent"))?;
        info!(user_id = %me, peer = %self.peer.peer, "message sent");
        Ok(ChatLine::new(message, me))
    }
}
