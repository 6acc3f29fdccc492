//! # Domain Models
//!
//! These structs represent the core entities of Kindling.
//! User identifiers are UUID v4 wrapped in a newtype so they cannot be
//! confused with other ids at the port boundary.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Identity of a registered user. Also used as the candidate identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Inclusive bounds on the age of candidates a user wants to see.
///
/// Always satisfies `min <= max`; construct through [`SeekingAgeRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekingAgeRange {
    min: u32,
    max: u32,
}

impl SeekingAgeRange {
    /// Applied when the user has not configured a range.
    pub const DEFAULT_MIN: u32 = 18;
    pub const DEFAULT_MAX: u32 = 50;

    /// Domain of the settings sliders.
    pub const SLIDER_MIN: u32 = 18;
    pub const SLIDER_MAX: u32 = 100;

    pub fn new(min: u32, max: u32) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::Validation(format!(
                "seeking age range is inverted: min {min} > max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }
}

impl Default for SeekingAgeRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// A remote user record. Displayed on a card when it is someone else's,
/// edited in settings when it is the current user's own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: UserId,
    pub name: String,
    /// Profiles without an age never show up in discovery queries.
    pub age: Option<u32>,
    /// Free text shown under the name (the profession line in the app).
    pub bio: String,
    /// Ordered photo URLs; the first one is the card's cover photo.
    pub photo_urls: Vec<String>,
    pub min_seeking_age: Option<u32>,
    pub max_seeking_age: Option<u32>,
}

impl CandidateProfile {
    /// A profile with only a name, as created right after registration.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            age: None,
            bio: String::new(),
            photo_urls: Vec::new(),
            min_seeking_age: None,
            max_seeking_age: None,
        }
    }

    /// The configured seeking range, falling back to the defaults for any
    /// missing bound or an inverted pair.
    pub fn seeking_range(&self) -> SeekingAgeRange {
        let min = self.min_seeking_age.unwrap_or(SeekingAgeRange::DEFAULT_MIN);
        let max = self.max_seeking_age.unwrap_or(SeekingAgeRange::DEFAULT_MAX);
        SeekingAgeRange::new(min, max).unwrap_or_default()
    }
}

/// Accept or reject, as decided by a swipe or a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl From<bool> for Verdict {
    fn from(accepted: bool) -> Self {
        if accepted {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => f.write_str("accept"),
            Verdict::Reject => f.write_str("reject"),
        }
    }
}

/// One user's verdict on one subject. The author is implicit (the session user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeDecision {
    pub subject: UserId,
    pub verdict: Verdict,
}

/// A user's swipe document: subject id to "accepted".
///
/// Persisted as a single map-valued document per author. Writes merge,
/// so a later decision on the same subject replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionMap(HashMap<UserId, bool>);

impl DecisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a decision, returning the previous value for that subject.
    pub fn record(&mut self, decision: SwipeDecision) -> Option<bool> {
        self.0.insert(decision.subject, decision.verdict.is_accept())
    }

    pub fn get(&self, subject: &UserId) -> Option<bool> {
        self.0.get(subject).copied()
    }

    pub fn contains(&self, subject: &UserId) -> bool {
        self.0.contains_key(subject)
    }

    /// True when `subject` is present and was accepted.
    pub fn has_accepted(&self, subject: &UserId) -> bool {
        self.get(subject).unwrap_or(false)
    }

    /// Field-merge: every entry of `other` overwrites the same key here.
    pub fn merge(&mut self, other: &DecisionMap) {
        self.0.extend(other.0.iter().map(|(k, v)| (*k, *v)));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &bool)> {
        self.0.iter()
    }
}

impl FromIterator<(UserId, bool)> for DecisionMap {
    fn from_iter<I: IntoIterator<Item = (UserId, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Two users who have each accepted the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The user who completed the second accept and is being notified.
    pub user: UserId,
    pub peer: UserId,
}

impl Match {
    pub fn involves(&self, id: &UserId) -> bool {
        self.user == *id || self.peer == *id
    }
}

/// A match as stored in one participant's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub peer: UserId,
    pub name: String,
    pub photo_url: Option<String>,
    pub matched_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Builds the inbox entry that points at `peer`.
    pub fn for_peer(peer: &CandidateProfile, matched_at: DateTime<Utc>) -> Self {
        Self {
            peer: peer.id,
            name: peer.name.clone(),
            photo_url: peer.photo_urls.first().cloned(),
            matched_at,
        }
    }
}

/// One chat line between two matched users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: UserId,
    pub to: UserId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(from: UserId, to: UserId, text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            text: text.into(),
            sent_at,
        }
    }

    /// Whether this message belongs to the conversation between `a` and `b`.
    pub fn between(&self, a: &UserId, b: &UserId) -> bool {
        (self.from == *a && self.to == *b) || (self.from == *b && self.to == *a)
    }
}

/// A sponsored card shown in the deck alongside candidate profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertiser {
    pub title: String,
    pub brand_name: String,
    pub poster_photos: Vec<String>,
}
