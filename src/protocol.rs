use crate::board::{BoardView, Placed};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Presence ping, sent on every poll
    Wait {
        wid: ParticipantId,
    },
    Place {
        wid: ParticipantId,
        fragment: Fragment,
        target: Location,
    },
    Submit {
        answer: String,
        #[serde(default)]
        who: String,
    },
    SetName {
        who: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Waiting room status while the team is below quorum
    Quorum {
        required: usize,
        waiting: usize,
    },
    ShowClue {
        set: usize,
        index: usize,
        clue: String,
    },
    ShowAnswer {
        set: usize,
        index: usize,
        answer: String,
    },
    /// Full assembly board: hands by participant plus slot contents
    VennState {
        chunks: BTreeMap<ParticipantId, BTreeMap<Fragment, Location>>,
        targets: Vec<Vec<Placed>>,
        /// Solved answers in clue order
        words: Vec<String>,
    },
    VennComplete {
        targets: Vec<String>,
    },
    CenterComplete {
        targets: Vec<String>,
        answer: String,
    },
    /// Every set is solved
    GameOver,
    AddChat {
        who: String,
        text: String,
        at: String,
    },
    Players {
        players: Vec<String>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn venn_state(view: BoardView, words: Vec<String>) -> Self {
        ServerMessage::VennState {
            chunks: view.chunks,
            targets: view.targets,
            words,
        }
    }
}
