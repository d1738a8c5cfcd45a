//! Per-team game state and the entry points request handlers call.
//!
//! All state for a team sits behind one mutex. Every mutation takes the lock,
//! changes what it needs, and wakes the driver through `changed` when the
//! driver's exit condition could have moved. Broadcasts always happen after
//! the lock is released.

mod driver;

use crate::board::Board;
use crate::channel::TeamChannel;
use crate::config::GameRules;
use crate::presence::PresenceTracker;
use crate::protocol::ServerMessage;
use crate::puzzle::{canonicalize_answer, PuzzleSet, Word};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::Instant;

/// Display name used for sessions that never set one
const ANONYMOUS: &str = "anonymous";

pub struct TeamState {
    pub phase: Phase,
    pub current_set_index: usize,
    pub solved_words: HashSet<Word>,
    pub accepted_final_answers: HashSet<String>,
    /// Session → display name
    pub sessions: HashMap<SessionId, Option<String>>,
    pub presence: PresenceTracker,
    /// Present only during assembly
    pub board: Option<Board>,
    rng: StdRng,
}

impl TeamState {
    fn new(rules: &GameRules) -> Self {
        let rng = match rules.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            phase: Phase::WaitQuorum,
            current_set_index: 0,
            solved_words: HashSet::new(),
            accepted_final_answers: HashSet::new(),
            sessions: HashMap::new(),
            presence: PresenceTracker::new(rules.presence_expiry, rules.presence_high_water),
            board: None,
            rng,
        }
    }

    /// Move to `phase`. Phases only go forward inside a set.
    fn advance(&mut self, phase: Phase) {
        debug_assert!(
            phase.rank() >= self.phase.rank() || phase == Phase::WaitQuorum,
            "phase moved backwards: {:?} -> {:?}",
            self.phase,
            phase
        );
        self.phase = phase;
    }

    /// Roster names sorted case-insensitively, unnamed sessions last
    fn roster(&self) -> Vec<String> {
        let mut players: Vec<(bool, String, String)> = self
            .sessions
            .values()
            .map(|name| match name {
                Some(name) => (false, name.to_lowercase(), name.clone()),
                None => (true, String::new(), ANONYMOUS.to_string()),
            })
            .collect();
        players.sort();
        players.into_iter().map(|(_, _, name)| name).collect()
    }
}

pub struct Team {
    pub id: TeamId,
    state: Mutex<TeamState>,
    changed: Notify,
    channel: Arc<dyn TeamChannel>,
    sets: Arc<[PuzzleSet]>,
    rules: Arc<GameRules>,
    running: AtomicBool,
}

impl Team {
    pub fn new(
        id: TeamId,
        channel: Arc<dyn TeamChannel>,
        sets: Arc<[PuzzleSet]>,
        rules: Arc<GameRules>,
    ) -> Self {
        Self {
            id,
            state: Mutex::new(TeamState::new(&rules)),
            changed: Notify::new(),
            channel,
            sets,
            rules,
            running: AtomicBool::new(false),
        }
    }

    /// Lock the team state. Callers must not await I/O while holding it.
    pub async fn lock(&self) -> MutexGuard<'_, TeamState> {
        self.state.lock().await
    }

    fn wake(&self) {
        self.changed.notify_waiters();
    }

    /// Spawn the phase driver unless it is already running
    pub fn ensure_running(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(team = %self.id, "Starting team driver");
        let team = Arc::clone(self);
        tokio::spawn(async move { team.run().await });
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Presence ping from `participant` in `session`
    pub async fn on_wait(&self, session: &str, participant: &str, now: Instant) {
        let mut state = self.lock().await;
        let outcome = state.presence.ping(participant, session, now);
        let new_session = if state.sessions.contains_key(session) {
            false
        } else {
            state.sessions.insert(session.to_string(), None);
            true
        };
        drop(state);

        if outcome.joined {
            tracing::debug!(team = %self.id, participant, "New participant");
        }
        if outcome.joined || outcome.purged || new_session {
            self.wake();
        }
    }

    /// Expire silent participants
    pub async fn purge(&self, now: Instant) {
        let removed = self.lock().await.presence.purge(now);
        if removed {
            self.wake();
        }
    }

    /// Move a fragment. Misuse is logged and ignored.
    pub async fn place(&self, session: &str, participant: &str, fragment: &str, target: Location) {
        let mut guard = self.lock().await;
        let state = &mut *guard;

        if state.presence.owner(participant).map(String::as_str) != Some(session) {
            tracing::warn!(team = %self.id, participant, "Placement from foreign session ignored");
            return;
        }
        if state.phase != Phase::Assembly {
            tracing::debug!(team = %self.id, phase = ?state.phase, "Placement outside assembly ignored");
            return;
        }
        let Some(set) = self.sets.get(state.current_set_index) else {
            return;
        };
        let Some(board) = state.board.as_mut() else {
            return;
        };

        if let Err(e) = board.place(set, participant, fragment, target) {
            tracing::warn!(team = %self.id, "Placement ignored: {}", e);
            return;
        }
        tracing::debug!(team = %self.id, participant, fragment, %target, "Placed fragment");
        board.check(set);
        drop(guard);

        self.wake();
    }

    /// Free-text guess. Always posts a chat line; advances the game when the
    /// canonical guess matches what the current phase is waiting for.
    pub async fn submit(&self, session: &str, text: &str, who: &str) {
        let who = match who.trim() {
            "" => ANONYMOUS.to_string(),
            name => name.to_string(),
        };
        let answer = canonicalize_answer(text);
        tracing::info!(team = %self.id, session, "{} submitted {}", who, answer);

        self.channel
            .send(
                vec![ServerMessage::AddChat {
                    who,
                    text: text.to_string(),
                    at: chrono::Utc::now().to_rfc3339(),
                }],
                Delivery::Transient,
            )
            .await;

        let mut state = self.lock().await;
        let Some(set) = self.sets.get(state.current_set_index) else {
            return;
        };
        let accepted = match state.phase {
            Phase::Clue(i) => match set.clue_word(i) {
                Some(word) if word.answer == answer => state.solved_words.insert(word.clone()),
                _ => false,
            },
            Phase::Final if set.final_answer == answer => {
                state.accepted_final_answers.insert(answer)
            }
            _ => false,
        };
        drop(state);

        if accepted {
            self.wake();
        }
    }

    /// Update a session's display name and broadcast the roster
    pub async fn set_name(&self, session: &str, name: &str) {
        let name = name.trim();
        let name = (!name.is_empty()).then(|| name.to_string());

        let mut state = self.lock().await;
        let new_session = state
            .sessions
            .insert(session.to_string(), name)
            .is_none();
        let players = state.roster();
        drop(state);

        if new_session {
            self.wake();
        }
        self.channel
            .send(vec![ServerMessage::Players { players }], Delivery::Transient)
            .await;
    }
}
