//! Registry of running teams
//!
//! Teams are created lazily on first contact. Request handlers go through
//! `GameService`, which looks up the team and forwards to it.

use crate::channel::TeamDirectory;
use crate::config::GameRules;
use crate::puzzle::PuzzleSet;
use crate::team::Team;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub struct GameService {
    teams: RwLock<HashMap<TeamId, Arc<Team>>>,
    directory: Arc<dyn TeamDirectory>,
    sets: Arc<[PuzzleSet]>,
    rules: Arc<GameRules>,
}

impl GameService {
    pub fn new(directory: Arc<dyn TeamDirectory>, sets: Vec<PuzzleSet>, rules: GameRules) -> Self {
        Self {
            teams: RwLock::new(HashMap::new()),
            directory,
            sets: Arc::from(sets),
            rules: Arc::new(rules),
        }
    }

    /// Get or create the team
    pub async fn team(&self, id: &TeamId) -> Arc<Team> {
        if let Some(team) = self.teams.read().await.get(id) {
            return team.clone();
        }

        let mut teams = self.teams.write().await;
        teams
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(team = %id, "Creating team");
                Arc::new(Team::new(
                    id.clone(),
                    self.directory.channel(id),
                    self.sets.clone(),
                    self.rules.clone(),
                ))
            })
            .clone()
    }

    /// Presence ping. The first ping for a team starts its driver.
    pub async fn on_wait(&self, team: &TeamId, session: &str, participant: &str) {
        let team = self.team(team).await;
        team.on_wait(session, participant, Instant::now()).await;
        team.ensure_running();
    }

    pub async fn place(
        &self,
        team: &TeamId,
        session: &str,
        participant: &str,
        fragment: &str,
        target: Location,
    ) {
        self.team(team)
            .await
            .place(session, participant, fragment, target)
            .await;
    }

    pub async fn submit(&self, team: &TeamId, session: &str, answer: &str, who: &str) {
        self.team(team).await.submit(session, answer, who).await;
    }

    pub async fn set_name(&self, team: &TeamId, session: &str, who: &str) {
        self.team(team).await.set_name(session, who).await;
    }

    /// Expire silent participants on every team
    pub async fn purge_all(&self, now: Instant) {
        let teams: Vec<Arc<Team>> = self.teams.read().await.values().cloned().collect();
        for team in teams {
            team.purge(now).await;
        }
    }

    pub async fn team_count(&self) -> usize {
        self.teams.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Hub;
    use crate::puzzle::tests::wood_set;

    fn service() -> GameService {
        GameService::new(
            Arc::new(Hub::new(6)),
            vec![wood_set(1)],
            GameRules {
                seed: Some(1),
                ..GameRules::default()
            },
        )
    }

    #[tokio::test]
    async fn test_team_is_created_once() {
        let service = service();
        let a = service.team(&"red".to_string()).await;
        let again = service.team(&"red".to_string()).await;
        let b = service.team(&"blue".to_string()).await;

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(service.team_count().await, 2);
    }

    #[tokio::test]
    async fn test_first_ping_starts_driver() {
        let service = service();
        let team = service.team(&"red".to_string()).await;
        assert!(!team.is_running());

        service.on_wait(&"red".to_string(), "s1", "w1").await;
        assert!(team.is_running());
        assert!(team.lock().await.presence.is_present("w1"));
    }
}
