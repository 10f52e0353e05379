//! PixelMap Core Library
//!
//! Platform-agnostic canvas state, cooldown rules and wire protocol for the
//! PixelMap shared pixel canvas.

pub mod cell;
pub mod clock;
pub mod cooldown;
pub mod engine;
pub mod protocol;
pub mod replica;

pub use cell::{Cell, Coord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{COOLDOWN_MS, CooldownStatus, cooldown_status};
pub use engine::{CanvasEngine, CanvasError, InvalidReason, PaintOutcome, PaintRequest};
pub use protocol::{ClientMessage, DecodeError, Inbound, ServerMessage, decode_client};
pub use replica::{CanvasReplica, PaintCheck, ReplicaEvent};
