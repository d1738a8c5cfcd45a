//! Service configuration
//!
//! Everything is read from environment variables (optionally via `.env`).
//! Missing or unparseable values fall back to defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Expected interval between client presence pings
    pub wait_timeout: Duration,
    pub purge_interval: Duration,
    /// Arrival queue length that forces an inline purge
    pub presence_high_water: usize,
    pub min_players: Option<usize>,
    pub max_quorum: usize,
    /// Team size reported by the in-process directory
    pub team_size: usize,
    pub puzzle_file: Option<PathBuf>,
    pub cycle_sets: bool,
    pub seed: Option<u64>,
    pub clue_reveal_delay: Duration,
    pub final_reveal_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 2001)),
            wait_timeout: Duration::from_secs(5),
            purge_interval: Duration::from_millis(2000),
            presence_high_water: 1000,
            min_players: None,
            max_quorum: 4,
            team_size: 6,
            puzzle_file: None,
            cycle_sets: false,
            seed: None,
            clue_reveal_delay: Duration::from_millis(1500),
            final_reveal_delay: Duration::from_millis(3000),
        }
    }
}

/// Read and parse an env var, warning on garbage
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", key, trimmed);
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| v != "0" && v.to_lowercase() != "false")
}

impl Config {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            listen_addr: env_parse("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            wait_timeout: env_parse("WAIT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.wait_timeout),
            purge_interval: env_parse("PURGE_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.purge_interval),
            presence_high_water: env_parse("PRESENCE_HIGH_WATER")
                .unwrap_or(defaults.presence_high_water),
            min_players: env_parse("MIN_PLAYERS"),
            max_quorum: env_parse("MAX_QUORUM").unwrap_or(defaults.max_quorum),
            team_size: env_parse("TEAM_SIZE").unwrap_or(defaults.team_size),
            puzzle_file: std::env::var("PUZZLE_FILE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            cycle_sets: env_flag("CYCLE_SETS").unwrap_or(defaults.cycle_sets),
            seed: env_parse("GAME_SEED"),
            clue_reveal_delay: env_parse("CLUE_REVEAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.clue_reveal_delay),
            final_reveal_delay: env_parse("FINAL_REVEAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.final_reveal_delay),
        };

        tracing::info!(
            listen_addr = %config.listen_addr,
            min_players = ?config.min_players,
            max_quorum = config.max_quorum,
            cycle_sets = config.cycle_sets,
            seeded = config.seed.is_some(),
            "Config loaded"
        );
        config
    }

    /// Runtime rules shared by every team
    pub fn rules(&self) -> GameRules {
        GameRules {
            quorum: QuorumPolicy {
                fixed: self.min_players,
                max: self.max_quorum,
            },
            presence_expiry: self.wait_timeout * 2,
            presence_high_water: self.presence_high_water,
            cycle_sets: self.cycle_sets,
            seed: self.seed,
            clue_reveal_delay: self.clue_reveal_delay,
            final_reveal_delay: self.final_reveal_delay,
        }
    }
}

/// How many sessions a team needs before play starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumPolicy {
    /// Fixed requirement that overrides the team-size rule
    pub fixed: Option<usize>,
    pub max: usize,
}

impl QuorumPolicy {
    /// Half the team (rounded up), or the fixed value, capped at `max`
    pub fn required(&self, team_size: usize) -> usize {
        let wanted = self.fixed.unwrap_or(team_size.div_ceil(2));
        wanted.min(self.max).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct GameRules {
    pub quorum: QuorumPolicy,
    pub presence_expiry: Duration,
    pub presence_high_water: usize,
    pub cycle_sets: bool,
    pub seed: Option<u64>,
    pub clue_reveal_delay: Duration,
    pub final_reveal_delay: Duration,
}

impl Default for GameRules {
    fn default() -> Self {
        Config::default().rules()
    }
}
