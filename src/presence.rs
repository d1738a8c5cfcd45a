//! Soft membership tracking
//!
//! A participant counts as present while it keeps polling. Every ping is
//! queued with its arrival time and bumps a per-participant reference count;
//! purging pops pings older than the expiry window and drops participants
//! whose count reaches zero.

use crate::types::{ParticipantId, SessionId};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// What a single ping changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PingOutcome {
    /// First sighting of this participant (count went 0 → 1)
    pub joined: bool,
    /// The inline purge removed at least one participant
    pub purged: bool,
}

#[derive(Debug)]
pub struct PresenceTracker {
    arrivals: VecDeque<(ParticipantId, Instant)>,
    counts: HashMap<ParticipantId, usize>,
    /// Session that most recently pinged for each participant
    owners: HashMap<ParticipantId, SessionId>,
    expiry: Duration,
    high_water: usize,
}

impl PresenceTracker {
    /// `expiry` is the age after which a ping no longer counts, normally
    /// twice the client poll interval.
    pub fn new(expiry: Duration, high_water: usize) -> Self {
        Self {
            arrivals: VecDeque::new(),
            counts: HashMap::new(),
            owners: HashMap::new(),
            expiry,
            high_water,
        }
    }

    /// Record a ping from `participant` on behalf of `session`
    pub fn ping(&mut self, participant: &str, session: &str, now: Instant) -> PingOutcome {
        self.arrivals.push_back((participant.to_string(), now));

        let count = self.counts.entry(participant.to_string()).or_insert(0);
        *count += 1;
        let joined = *count == 1;

        self.owners.insert(participant.to_string(), session.to_string());

        let purged = if self.arrivals.len() > self.high_water {
            self.purge(now)
        } else {
            false
        };

        PingOutcome { joined, purged }
    }

    /// Drop stale pings. Returns true if any participant left entirely.
    pub fn purge(&mut self, now: Instant) -> bool {
        let mut removed = false;
        while let Some((_, at)) = self.arrivals.front() {
            if now.saturating_duration_since(*at) <= self.expiry {
                break;
            }
            let Some((participant, _)) = self.arrivals.pop_front() else {
                break;
            };
            match self.counts.get_mut(&participant) {
                Some(count) if *count > 1 => *count -= 1,
                _ => {
                    self.counts.remove(&participant);
                    self.owners.remove(&participant);
                    tracing::debug!(participant = %participant, "Participant expired");
                    removed = true;
                }
            }
        }
        removed
    }

    pub fn is_present(&self, participant: &str) -> bool {
        self.counts.contains_key(participant)
    }

    /// Session that owns a present participant
    pub fn owner(&self, participant: &str) -> Option<&SessionId> {
        self.owners.get(participant)
    }

    /// Currently present participants, in no particular order
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.counts.keys()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Outstanding pings for `participant`
    pub fn ref_count(&self, participant: &str) -> usize {
        self.counts.get(participant).copied().unwrap_or(0)
    }

    pub fn queued(&self) -> usize {
        self.arrivals.len()
    }
}
