//! Phase driver: one task per team walks every puzzle set through
//! quorum, clues, assembly and the final answer.

use super::{Team, TeamState};
use crate::board::Board;
use crate::protocol::ServerMessage;
use crate::puzzle::PuzzleSet;
use crate::types::{Delivery, Phase, SLOT_COUNT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::MutexGuard;

impl Team {
    pub(super) async fn run(self: Arc<Self>) {
        loop {
            let index = self.lock().await.current_set_index;
            let Some(set) = self.sets.get(index) else {
                tracing::error!(team = %self.id, index, "No puzzle set at index");
                return;
            };
            tracing::info!(team = %self.id, set = index, "Starting puzzle set {}", index + 1);

            self.wait_for_quorum().await;
            for clue in 0..SLOT_COUNT {
                self.run_clue(set, clue).await;
            }
            self.run_assembly(set).await;
            self.run_final(set).await;

            if !self.finish_set().await {
                tracing::info!(team = %self.id, "Game over");
                return;
            }
        }
    }

    /// Release the lock, broadcast, then sleep until the next change.
    ///
    /// The wakeup is registered before the lock is dropped so a change made
    /// between the unlock and the await is never missed.
    async fn park(&self, guard: MutexGuard<'_, TeamState>, messages: Vec<ServerMessage>) {
        let notified = self.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        drop(guard);

        if !messages.is_empty() {
            self.channel.send(messages, Delivery::Sticky).await;
        }
        notified.await;
    }

    async fn wait_for_quorum(&self) {
        let required = self.rules.quorum.required(self.channel.size());
        loop {
            let mut state = self.lock().await;
            let waiting = state.sessions.len();
            if waiting >= required {
                tracing::debug!(team = %self.id, waiting, required, "Quorum reached");
                return;
            }
            state.advance(Phase::WaitQuorum);
            self.park(state, vec![ServerMessage::Quorum { required, waiting }])
                .await;
        }
    }

    async fn run_clue(&self, set: &PuzzleSet, index: usize) {
        let Some(word) = set.clue_word(index) else {
            return;
        };

        let mut announce = vec![ServerMessage::ShowClue {
            set: set.index,
            index,
            clue: word.clue.clone(),
        }];
        loop {
            let mut state = self.lock().await;
            state.advance(Phase::Clue(index));
            if state.solved_words.contains(word) {
                break;
            }
            self.park(state, std::mem::take(&mut announce)).await;
        }

        tracing::info!(team = %self.id, set = set.index, index, "Solved {}", word.answer);
        self.channel
            .send(
                vec![ServerMessage::ShowAnswer {
                    set: set.index,
                    index,
                    answer: word.answer.clone(),
                }],
                Delivery::Sticky,
            )
            .await;
        tokio::time::sleep(self.rules.clue_reveal_delay).await;
    }

    async fn run_assembly(&self, set: &PuzzleSet) {
        let words: Vec<String> = set.clue_order().map(|w| w.answer.clone()).collect();

        {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            let rng = StdRng::from_rng(&mut state.rng);
            let board = Board::new(set, state.presence.len(), rng);
            tracing::info!(
                team = %self.id,
                set = set.index,
                participants = state.presence.len(),
                per_participant = board.per_participant(),
                "Assembly started"
            );
            state.board = Some(board);
            state.advance(Phase::Assembly);
        }

        loop {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            let Some(board) = state.board.as_mut() else {
                return;
            };
            if board.check(set) {
                break;
            }
            board.reconcile(&state.presence);
            let dealt = board.deal(&state.presence);
            if !dealt.is_empty() {
                tracing::debug!(team = %self.id, ?dealt, "Dealt hands");
            }
            let view = board.view();
            self.park(guard, vec![ServerMessage::venn_state(view, words.clone())])
                .await;
        }
        tracing::info!(team = %self.id, set = set.index, "Diagram assembled");
    }

    async fn run_final(&self, set: &PuzzleSet) {
        let targets = {
            let mut state = self.lock().await;
            state.advance(Phase::Final);
            state
                .board
                .take()
                .map(|board| board.slot_strings())
                .unwrap_or_default()
        };

        let mut announce = vec![ServerMessage::VennComplete {
            targets: targets.clone(),
        }];
        loop {
            let state = self.lock().await;
            if state.accepted_final_answers.contains(&set.final_answer) {
                break;
            }
            self.park(state, std::mem::take(&mut announce)).await;
        }

        tracing::info!(team = %self.id, set = set.index, "Final answer {}", set.final_answer);
        self.channel
            .send(
                vec![ServerMessage::CenterComplete {
                    targets,
                    answer: set.final_answer.clone(),
                }],
                Delivery::Sticky,
            )
            .await;
        tokio::time::sleep(self.rules.final_reveal_delay).await;
    }

    /// Move to the next set. Returns false once the game is over.
    async fn finish_set(&self) -> bool {
        let mut state = self.lock().await;
        let next = state.current_set_index + 1;

        if next < self.sets.len() {
            state.current_set_index = next;
            state.advance(Phase::WaitQuorum);
            return true;
        }
        if self.rules.cycle_sets {
            tracing::info!(team = %self.id, "All sets solved, starting over");
            state.current_set_index = 0;
            state.solved_words.clear();
            state.accepted_final_answers.clear();
            state.advance(Phase::WaitQuorum);
            return true;
        }

        state.advance(Phase::Finished);
        drop(state);
        self.channel
            .send(vec![ServerMessage::GameOver], Delivery::Sticky)
            .await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{team_with, Recorder};
    use super::*;
    use crate::types::Location;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Wait until the recorder has seen a matching message
    async fn settle(recorder: &Recorder, pred: impl Fn(&ServerMessage) -> bool) {
        let wait = async {
            loop {
                let seen = recorder.sent.lock().unwrap().iter().any(|(m, _)| pred(m));
                if seen {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(60), wait)
            .await
            .expect("message never arrived");
    }

    #[tokio::test(start_paused = true)]
    async fn test_quorum_gates_first_clue() {
        let recorder = Arc::new(Recorder::default());
        let team = Arc::new(team_with(recorder.clone()));

        team.on_wait("s1", "w1", Instant::now()).await;
        team.ensure_running();
        settle(&recorder, |m| {
            matches!(m, ServerMessage::Quorum { required: 2, waiting: 1 })
        })
        .await;
        assert_eq!(team.lock().await.phase, Phase::WaitQuorum);

        team.on_wait("s2", "w2", Instant::now()).await;
        settle(&recorder, |m| matches!(m, ServerMessage::ShowClue { index: 0, .. })).await;
        assert_eq!(team.lock().await.phase, Phase::Clue(0));

        let sent = recorder.sent.lock().unwrap();
        assert!(sent
            .iter()
            .filter(|(m, _)| matches!(m, ServerMessage::ShowClue { .. }))
            .all(|(_, d)| *d == Delivery::Sticky));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_set_runs_to_game_over() {
        let recorder = Arc::new(Recorder::default());
        let team = Arc::new(team_with(recorder.clone()));
        team.on_wait("s1", "w1", Instant::now()).await;
        team.on_wait("s2", "w2", Instant::now()).await;
        team.ensure_running();

        for index in 0..SLOT_COUNT {
            settle(&recorder, |m| matches!(m, ServerMessage::ShowClue { index: i, .. } if *i == index))
                .await;
            let answer = team.sets[0].clue_word(index).unwrap().answer.to_lowercase();
            team.submit("s1", &answer, "Ada").await;
        }

        settle(&recorder, |m| matches!(m, ServerMessage::VennState { .. })).await;
        let holders: Vec<(String, Vec<String>)> = {
            let state = team.lock().await;
            let board = state.board.as_ref().unwrap();
            assert_eq!(board.per_participant(), 8);
            ["w1", "w2"]
                .iter()
                .map(|p| {
                    let hand = board.hand(p).unwrap().keys().cloned().collect();
                    (p.to_string(), hand)
                })
                .collect()
        };

        let words = team.sets[0].words().to_vec();
        for (slot, word) in words.iter().enumerate() {
            for fragment in &word.fragments {
                let (participant, _) = holders
                    .iter()
                    .find(|(_, hand)| hand.contains(fragment))
                    .unwrap();
                let session = if participant == "w1" { "s1" } else { "s2" };
                team.place(session, participant, fragment, Location::Slot(slot))
                    .await;
            }
        }

        settle(&recorder, |m| matches!(m, ServerMessage::VennComplete { .. })).await;
        assert_eq!(team.lock().await.phase, Phase::Final);
        team.submit("s2", "Wood", "Bea").await;

        settle(&recorder, |m| *m == ServerMessage::GameOver).await;
        assert_eq!(team.lock().await.phase, Phase::Finished);

        let sent = recorder.sent.lock().unwrap();
        assert!(sent.iter().any(|(m, _)| matches!(
            m,
            ServerMessage::CenterComplete { answer, targets }
                if answer == "WOOD" && targets[0] == "PLASTIC"
        )));
    }
}
