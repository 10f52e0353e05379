//! Client-side mirror of the canvas.
//!
//! A replica applies `INIT`/`UPDATE` messages from the server, predicts
//! whether a cell can be painted using the same cooldown rule as the engine,
//! and queues outgoing `DRAW` messages.

use std::collections::HashMap;

use crate::cell::{Cell, Coord};
use crate::cooldown::{CooldownStatus, cooldown_status};
use crate::protocol::{ClientMessage, ServerMessage};

/// Color selected before the user picks one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Local prediction for a paint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintCheck {
    Allowed,
    Locked { owner: String, remaining_seconds: u64 },
}

/// What applying a server message changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaEvent {
    /// The replica was replaced by a full snapshot of this many cells.
    Initialized { cells: usize },
    /// One cell changed.
    Updated(Cell),
    /// The server refused one of our paints.
    Error {
        message: String,
        owner: Option<String>,
        remaining_seconds: Option<u64>,
    },
}

/// Local view of the shared canvas.
pub struct CanvasReplica {
    cells: HashMap<Coord, Cell>,
    nickname: Option<String>,
    color: String,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl CanvasReplica {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            nickname: None,
            color: DEFAULT_COLOR.to_string(),
            outgoing: Vec::new(),
        }
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Set the label sent as `owner`. An empty name clears it.
    pub fn set_nickname(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.nickname = if name.is_empty() { None } else { Some(name) };
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Predict whether painting `(x, y)` at `now` would be accepted.
    pub fn can_paint(&self, x: i64, y: i64, now: u64) -> PaintCheck {
        let Some(cell) = self.cells.get(&Coord::new(x, y)) else {
            return PaintCheck::Allowed;
        };
        match cooldown_status(cell.painted_at, now) {
            CooldownStatus::Ready => PaintCheck::Allowed,
            CooldownStatus::Locked { remaining_seconds } => PaintCheck::Locked {
                owner: cell.owner.clone(),
                remaining_seconds,
            },
        }
    }

    /// Queue a `DRAW` with the current nickname and color.
    ///
    /// Returns false without queueing anything when no nickname is set.
    pub fn draw(&mut self, x: i64, y: i64) -> bool {
        let Some(owner) = self.nickname.clone() else {
            return false;
        };
        let msg = ClientMessage::Draw {
            x,
            y,
            color: self.color.clone(),
            owner,
        };
        match msg.to_json() {
            Ok(json) => {
                self.outgoing.push(json);
                true
            }
            Err(_) => false,
        }
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Handle an incoming server frame. Unreadable frames yield `None`.
    pub fn handle_message(&mut self, json: &str) -> Option<ReplicaEvent> {
        let msg: ServerMessage = serde_json::from_str(json).ok()?;
        Some(self.apply(msg))
    }

    pub fn apply(&mut self, msg: ServerMessage) -> ReplicaEvent {
        match msg {
            ServerMessage::Init { data } => {
                self.cells = data.into_iter().map(|cell| (cell.coord(), cell)).collect();
                ReplicaEvent::Initialized {
                    cells: self.cells.len(),
                }
            }
            ServerMessage::Update { data } => {
                self.cells.insert(data.coord(), data.clone());
                ReplicaEvent::Updated(data)
            }
            ServerMessage::Error {
                message,
                owner,
                remaining_seconds,
            } => ReplicaEvent::Error {
                message,
                owner,
                remaining_seconds,
            },
        }
    }
}

impl Default for CanvasReplica {
    fn default() -> Self {
        Self::new()
    }
}
