use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for readability
pub type TeamId = String;
pub type SessionId = String;
/// Soft, per-tab participant handle ("wid"); distinct from the session
pub type ParticipantId = String;
/// Minimal movable token of an answer string
pub type Fragment = String;

/// Number of labeled slots on the diagram
pub const SLOT_COUNT: usize = 6;

/// Where a dealt fragment currently sits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Bank,
    Slot(usize),
}

impl Location {
    pub fn slot(self) -> Option<usize> {
        match self {
            Location::Bank => None,
            Location::Slot(index) => Some(index),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Bank => write!(f, "bank"),
            Location::Slot(index) => write!(f, "slot {}", index),
        }
    }
}

/// Per-team phase. Ordered within one puzzle set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", content = "index", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    WaitQuorum,
    Clue(usize),
    Assembly,
    Final,
    Finished,
}

impl Phase {
    /// Rank used to assert forward-only movement within a set
    pub fn rank(self) -> usize {
        match self {
            Phase::WaitQuorum => 0,
            Phase::Clue(i) => 1 + i,
            Phase::Assembly => 1 + SLOT_COUNT,
            Phase::Final => 2 + SLOT_COUNT,
            Phase::Finished => 3 + SLOT_COUNT,
        }
    }
}

/// How a broadcast relates to earlier ones of the same kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Replaces the previous sticky message for the team
    Sticky,
    /// Appended, never replayed
    Transient,
}
