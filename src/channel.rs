//! Push delivery to teams
//!
//! The game core only needs two capabilities from the surrounding
//! application: a per-team channel that knows the team's size and can
//! broadcast, and a directory that hands out channels and validates sessions.
//! `Hub` is the in-process implementation used by the server.

use crate::protocol::ServerMessage;
use crate::types::{Delivery, SessionId, TeamId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

/// Per-team push channel
#[async_trait]
pub trait TeamChannel: Send + Sync {
    /// Registered team size, used by the quorum policy
    fn size(&self) -> usize;

    /// Broadcast to everyone on the team. Sticky messages replace the
    /// previous sticky message.
    async fn send(&self, messages: Vec<ServerMessage>, delivery: Delivery);
}

/// Identity presented by a client connection
#[derive(Debug, Clone, Default)]
pub struct SessionCredentials {
    pub team: Option<String>,
    pub session: Option<String>,
}

pub trait TeamDirectory: Send + Sync {
    fn channel(&self, team: &TeamId) -> Arc<dyn TeamChannel>;

    /// Resolve a connection to its team and session, if valid
    fn check_session(&self, credentials: &SessionCredentials) -> Option<(TeamId, SessionId)>;
}

/// Broadcast capacity per team
const CHANNEL_CAPACITY: usize = 256;

/// In-process channel backed by a tokio broadcast sender
pub struct HubChannel {
    size: usize,
    tx: broadcast::Sender<ServerMessage>,
    sticky: Mutex<Option<ServerMessage>>,
}

impl HubChannel {
    fn new(size: usize) -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            size,
            tx,
            sticky: Mutex::new(None),
        }
    }

    /// Current sticky message plus a receiver for everything after it
    pub fn subscribe(&self) -> (Option<ServerMessage>, broadcast::Receiver<ServerMessage>) {
        // Hold the sticky lock so no sticky send slips between read and subscribe
        let sticky = self.sticky.lock().unwrap_or_else(|e| e.into_inner());
        let rx = self.tx.subscribe();
        (sticky.clone(), rx)
    }

    pub fn sticky(&self) -> Option<ServerMessage> {
        self.sticky
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TeamChannel for HubChannel {
    fn size(&self) -> usize {
        self.size
    }

    async fn send(&self, messages: Vec<ServerMessage>, delivery: Delivery) {
        let mut sticky = self.sticky.lock().unwrap_or_else(|e| e.into_inner());
        for msg in messages {
            if delivery == Delivery::Sticky {
                *sticky = Some(msg.clone());
            }
            // No receivers connected is fine
            let _ = self.tx.send(msg);
        }
    }
}

/// Directory of in-process team channels
pub struct Hub {
    team_size: usize,
    teams: RwLock<HashMap<TeamId, Arc<HubChannel>>>,
}

impl Hub {
    pub fn new(team_size: usize) -> Self {
        Self {
            team_size,
            teams: RwLock::new(HashMap::new()),
        }
    }

    /// Channel for `team`, created on first use
    pub fn team(&self, team: &TeamId) -> Arc<HubChannel> {
        if let Some(channel) = self
            .teams
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(team)
        {
            return channel.clone();
        }
        self.teams
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(team.clone())
            .or_insert_with(|| Arc::new(HubChannel::new(self.team_size)))
            .clone()
    }
}

impl TeamDirectory for Hub {
    fn channel(&self, team: &TeamId) -> Arc<dyn TeamChannel> {
        self.team(team)
    }

    /// Authentication happens upstream; trust whatever identity reached us
    fn check_session(&self, credentials: &SessionCredentials) -> Option<(TeamId, SessionId)> {
        let team = credentials.team.as_deref()?.trim();
        let session = credentials.session.as_deref()?.trim();
        if team.is_empty() || session.is_empty() {
            return None;
        }
        Some((team.to_string(), session.to_string()))
    }
}
