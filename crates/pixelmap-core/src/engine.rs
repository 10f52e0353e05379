//! Canvas state engine.
//!
//! Owns the authoritative coordinate → cell map. Every change goes through
//! [`CanvasEngine::try_paint`], which validates the request, checks the
//! cooldown and applies the paint as one step under an exclusive lock.

use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::cell::{Cell, Coord};
use crate::cooldown::{CooldownStatus, cooldown_status};

/// Engine errors. These never describe a client mistake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("canvas lock poisoned")]
    LockPoisoned,
}

/// Why a paint request was refused before touching the canvas.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("missing or non-integer coordinate")]
    BadCoordinate,
    #[error("color must not be empty")]
    EmptyColor,
    #[error("owner must not be empty")]
    EmptyOwner,
}

/// A paint request as received from a client.
///
/// Fields are optional because a request is only checked inside
/// [`CanvasEngine::try_paint`]; wrongly typed fields decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaintRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner: Option<String>,
}

impl PaintRequest {
    pub fn new(x: i64, y: i64, color: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            color: Some(color.into()),
            owner: Some(owner.into()),
        }
    }

    /// Check the request shape, returning its coordinate, color and owner.
    pub fn validate(&self) -> Result<(Coord, &str, &str), InvalidReason> {
        let (Some(x), Some(y)) = (self.x, self.y) else {
            return Err(InvalidReason::BadCoordinate);
        };
        let color = self.color.as_deref().unwrap_or_default();
        if color.is_empty() {
            return Err(InvalidReason::EmptyColor);
        }
        let owner = self.owner.as_deref().unwrap_or_default();
        if owner.is_empty() {
            return Err(InvalidReason::EmptyOwner);
        }
        Ok((Coord::new(x, y), color, owner))
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_owned)))
}

/// Result of a paint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintOutcome {
    /// The paint was applied; this is the new stored cell.
    Accepted(Cell),
    /// The cell is still cooling down. Nothing changed.
    Rejected { owner: String, remaining_seconds: u64 },
    /// The request was malformed. The canvas was not read.
    Invalid(InvalidReason),
}

/// The authoritative canvas.
///
/// A single lock guards the whole map: paints are O(1) and snapshots are
/// consistent without extra bookkeeping.
#[derive(Debug, Default)]
pub struct CanvasEngine {
    cells: RwLock<HashMap<Coord, Cell>>,
}

impl CanvasEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every painted cell at a single point in time, in no particular order.
    pub fn snapshot(&self) -> Result<Vec<Cell>, CanvasError> {
        self.snapshot_with(|cells| cells)
    }

    /// Run `f` over a snapshot while the read lock is still held.
    ///
    /// No paint can land between the snapshot and the end of `f`.
    pub fn snapshot_with<R>(&self, f: impl FnOnce(Vec<Cell>) -> R) -> Result<R, CanvasError> {
        let cells = self.cells.read().map_err(|_| CanvasError::LockPoisoned)?;
        let snapshot: Vec<Cell> = cells.values().cloned().collect();
        Ok(f(snapshot))
    }

    /// Validate `request` and apply it at time `now` if the cell is free.
    pub fn try_paint(
        &self,
        request: &PaintRequest,
        now: u64,
    ) -> Result<PaintOutcome, CanvasError> {
        let (coord, color, owner) = match request.validate() {
            Ok(parts) => parts,
            Err(reason) => return Ok(PaintOutcome::Invalid(reason)),
        };

        let mut cells = self.cells.write().map_err(|_| CanvasError::LockPoisoned)?;

        if let Some(existing) = cells.get(&coord) {
            if let CooldownStatus::Locked { remaining_seconds } =
                cooldown_status(existing.painted_at, now)
            {
                debug!(
                    "Rejected paint at {} by {}: held by {} for {}s",
                    coord, owner, existing.owner, remaining_seconds
                );
                return Ok(PaintOutcome::Rejected {
                    owner: existing.owner.clone(),
                    remaining_seconds,
                });
            }
        }

        let cell = Cell {
            x: coord.x,
            y: coord.y,
            color: color.to_string(),
            owner: owner.to_string(),
            painted_at: now,
        };
        cells.insert(coord, cell.clone());
        debug!("Painted {} {} by {}", coord, cell.color, cell.owner);

        Ok(PaintOutcome::Accepted(cell))
    }

    /// Current record of one coordinate.
    pub fn get(&self, coord: Coord) -> Result<Option<Cell>, CanvasError> {
        let cells = self.cells.read().map_err(|_| CanvasError::LockPoisoned)?;
        Ok(cells.get(&coord).cloned())
    }

    /// Number of painted cells.
    pub fn len(&self) -> Result<usize, CanvasError> {
        let cells = self.cells.read().map_err(|_| CanvasError::LockPoisoned)?;
        Ok(cells.len())
    }

    pub fn is_empty(&self) -> Result<bool, CanvasError> {
        Ok(self.len()? == 0)
    }
}
