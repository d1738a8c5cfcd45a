//! Fragment assembly board
//!
//! Tracks which participant holds which fragments, where each dealt fragment
//! currently sits, and the contents of the six slots. The board is rebuilt at
//! the start of every assembly phase and dropped when it ends.

use crate::arrangement;
use crate::pool::FragmentPool;
use crate::presence::PresenceTracker;
use crate::puzzle::PuzzleSet;
use crate::types::{Fragment, Location, ParticipantId, SLOT_COUNT};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Smallest hand dealt to a participant
pub const MIN_FRAGMENTS_PER_PARTICIPANT: usize = 3;

/// A fragment in a slot, tagged with the participant who put it there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placed {
    pub fragment: Fragment,
    pub participant: ParticipantId,
}

/// Reasons a placement is ignored
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlaceError {
    #[error("participant {0} holds no fragments")]
    UnknownParticipant(ParticipantId),

    #[error("fragment {fragment} was not dealt to {participant}")]
    NotDealt {
        participant: ParticipantId,
        fragment: Fragment,
    },

    #[error("slot {0} does not exist")]
    NoSuchSlot(usize),
}

/// Serializable snapshot sent to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardView {
    pub chunks: BTreeMap<ParticipantId, BTreeMap<Fragment, Location>>,
    pub targets: Vec<Vec<Placed>>,
}

/// Hand size for an assembly phase: `(total + 1) / participants`, clamped to
/// `[3, total]`.
pub fn fragments_per_participant(total: usize, participants: usize) -> usize {
    let share = (total + 1) / participants.max(1);
    share.clamp(MIN_FRAGMENTS_PER_PARTICIPANT.min(total), total)
}

#[derive(Debug)]
pub struct Board {
    hands: HashMap<ParticipantId, HashMap<Fragment, Location>>,
    slots: [Vec<Placed>; SLOT_COUNT],
    pool: FragmentPool,
    per_participant: usize,
    success: bool,
}

impl Board {
    /// Start a board for `set`. The hand size is fixed here for the whole phase.
    pub fn new(set: &PuzzleSet, participants: usize, rng: StdRng) -> Self {
        let total = set.all_fragments().len();
        Self {
            hands: HashMap::new(),
            slots: Default::default(),
            pool: FragmentPool::new(set.all_fragments(), rng),
            per_participant: fragments_per_participant(total, participants),
            success: false,
        }
    }

    pub fn per_participant(&self) -> usize {
        self.per_participant
    }

    /// Drop hands of participants that are no longer present.
    ///
    /// Their fragments leave every slot and go back to the pool.
    pub fn reconcile(&mut self, presence: &PresenceTracker) -> Vec<ParticipantId> {
        let gone: Vec<ParticipantId> = self
            .hands
            .keys()
            .filter(|p| !presence.is_present(p))
            .cloned()
            .collect();

        for participant in &gone {
            if let Some(hand) = self.hands.remove(participant) {
                self.pool.recycle(hand.into_keys());
            }
            for slot in self.slots.iter_mut() {
                slot.retain(|placed| placed.participant != *participant);
            }
            tracing::info!(participant = %participant, "Reclaimed fragments");
        }
        gone
    }

    /// Deal a hand to every present participant that has none.
    /// Returns the participants that were dealt in.
    pub fn deal(&mut self, presence: &PresenceTracker) -> Vec<ParticipantId> {
        let mut waiting: Vec<ParticipantId> = presence
            .participants()
            .filter(|p| !self.hands.contains_key(*p))
            .cloned()
            .collect();
        waiting.sort();

        for participant in &waiting {
            let hand = self
                .pool
                .deal(self.per_participant)
                .into_iter()
                .map(|fragment| (fragment, Location::Bank))
                .collect();
            self.hands.insert(participant.clone(), hand);
        }
        waiting
    }

    /// Move one of `participant`'s fragments to `target`.
    ///
    /// The fragment leaves its previous slot, lands in the target slot in sort
    /// key order, and evicts any other holder's copy of the same fragment back
    /// to that holder's bank.
    pub fn place(
        &mut self,
        set: &PuzzleSet,
        participant: &str,
        fragment: &str,
        target: Location,
    ) -> Result<(), PlaceError> {
        if let Location::Slot(index) = target {
            if index >= SLOT_COUNT {
                return Err(PlaceError::NoSuchSlot(index));
            }
        }

        let hand = self
            .hands
            .get_mut(participant)
            .ok_or_else(|| PlaceError::UnknownParticipant(participant.to_string()))?;
        let location = hand
            .get_mut(fragment)
            .ok_or_else(|| PlaceError::NotDealt {
                participant: participant.to_string(),
                fragment: fragment.to_string(),
            })?;

        let previous = std::mem::replace(location, target);
        if let Some(index) = previous.slot() {
            self.slots[index]
                .retain(|p| !(p.participant == participant && p.fragment == fragment));
        }

        if let Some(index) = target.slot() {
            self.evict_copies(participant, fragment);
            let slot = &mut self.slots[index];
            slot.push(Placed {
                fragment: fragment.to_string(),
                participant: participant.to_string(),
            });
            slot.sort_by_key(|p| set.sort_key(&p.fragment).unwrap_or(u32::MAX));
        }

        Ok(())
    }

    /// Send other holders' slotted copies of `fragment` back to their banks
    fn evict_copies(&mut self, owner: &str, fragment: &str) {
        for slot in self.slots.iter_mut() {
            slot.retain(|p| {
                if p.fragment != fragment || p.participant == owner {
                    return true;
                }
                if let Some(location) = self
                    .hands
                    .get_mut(&p.participant)
                    .and_then(|hand| hand.get_mut(fragment))
                {
                    *location = Location::Bank;
                }
                false
            });
        }
    }

    /// Re-run the arrangement validator and latch success
    pub fn check(&mut self, set: &PuzzleSet) -> bool {
        if !self.success && arrangement::is_solved(&self.slots, set) {
            self.success = true;
        }
        self.success
    }

    pub fn slot(&self, index: usize) -> &[Placed] {
        &self.slots[index]
    }

    /// Per-slot strings in slot order
    pub fn slot_strings(&self) -> Vec<String> {
        self.slots.iter().map(|s| arrangement::slot_string(s)).collect()
    }

    pub fn hand(&self, participant: &str) -> Option<&HashMap<Fragment, Location>> {
        self.hands.get(participant)
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> + '_ {
        self.hands.keys()
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            chunks: self
                .hands
                .iter()
                .map(|(p, hand)| {
                    let hand = hand.iter().map(|(f, l)| (f.clone(), *l)).collect();
                    (p.clone(), hand)
                })
                .collect(),
            targets: self.slots.to_vec(),
        }
    }
}
