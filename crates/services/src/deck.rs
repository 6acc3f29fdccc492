//! # Deck
//!
//! The ordered sequence of cards for one discovery session.
//!
//! Navigation lives here rather than on the cards: the deck is a `Vec` plus a
//! cursor, and "current top" is simply the node at the cursor. Every deck is
//! stamped with a generation so completions that outlive a rebuild can be
//! recognised and dropped.

use domains::{CandidateProfile, UserId, Verdict};

/// Lifecycle of one node. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unresolved,
    /// Intent received, persistence in flight, card animating out.
    Resolving(Verdict),
    /// Persistence finished (successfully or not); evicted from the stack.
    Resolved(Verdict),
}

#[derive(Debug, Clone)]
pub struct DeckNode {
    profile: CandidateProfile,
    state: NodeState,
}

impl DeckNode {
    pub fn profile(&self) -> &CandidateProfile {
        &self.profile
    }

    pub fn state(&self) -> NodeState {
        self.state
    }
}

/// Identifies a resolved node across a later rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTicket {
    pub generation: u64,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Deck {
    generation: u64,
    nodes: Vec<DeckNode>,
    cursor: usize,
}

impl Deck {
    pub fn new(generation: u64, profiles: Vec<CandidateProfile>) -> Self {
        let nodes = profiles
            .into_iter()
            .map(|profile| DeckNode {
                profile,
                state: NodeState::Unresolved,
            })
            .collect();
        Self {
            generation,
            nodes,
            cursor: 0,
        }
    }

    pub fn empty(generation: u64) -> Self {
        Self::new(generation, Vec::new())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn top(&self) -> Option<&CandidateProfile> {
        self.nodes.get(self.cursor).map(DeckNode::profile)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes not yet resolved, the current top included.
    pub fn remaining(&self) -> usize {
        self.nodes.len() - self.cursor
    }

    pub fn is_drained(&self) -> bool {
        self.cursor >= self.nodes.len()
    }

    pub fn node(&self, index: usize) -> Option<&DeckNode> {
        self.nodes.get(index)
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.nodes.iter().any(|n| n.profile.id == *id)
    }

    /// Marks the top node as resolving and moves the cursor to its successor.
    ///
    /// Returns `None` on a drained deck.
    pub fn resolve_top(&mut self, verdict: Verdict) -> Option<(NodeTicket, CandidateProfile)> {
        let index = self.cursor;
        let node = self.nodes.get_mut(index)?;
        node.state = NodeState::Resolving(verdict);
        self.cursor += 1;
        let ticket = NodeTicket {
            generation: self.generation,
            index,
        };
        Some((ticket, node.profile.clone()))
    }

    /// Evicts the node named by `ticket`.
    ///
    /// A ticket from another generation is ignored and `false` is returned;
    /// so is a ticket for a node that is not resolving.
    pub fn complete(&mut self, ticket: NodeTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        match self.nodes.get_mut(ticket.index) {
            Some(node) => match node.state {
                NodeState::Resolving(verdict) => {
                    node.state = NodeState::Resolved(verdict);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Visible cards, back to front. Nodes still animating out are included;
    /// the first candidate in query order is drawn last, i.e. on top.
    pub fn render_order(&self) -> impl Iterator<Item = &CandidateProfile> {
        self.nodes
            .iter()
            .rev()
            .filter(|n| !matches!(n.state, NodeState::Resolved(_)))
            .map(DeckNode::profile)
    }
}
