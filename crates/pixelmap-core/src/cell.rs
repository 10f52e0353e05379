//! Canvas cells and their coordinates.

use serde::{Deserialize, Serialize};

/// Integer coordinate of a cell. The canvas has no declared bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Coord {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// The last accepted paint of one coordinate.
///
/// Serializes to the wire shape `{ x, y, color, owner, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
    /// Opaque color label, usually a hex code.
    pub color: String,
    /// Unverified nickname of the painter.
    pub owner: String,
    /// Milliseconds since the UNIX epoch.
    #[serde(rename = "timestamp")]
    pub painted_at: u64,
}

impl Cell {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}
