//! PixelMap WebSocket gateway.
//!
//! Accepts WebSocket connections, sends each new client the full canvas,
//! forwards paint requests to the [`pixelmap_core::CanvasEngine`] and fans
//! accepted paints out to every open connection.
//!
//! The binary entry point is in main.rs; modules are public for integration
//! testing.

pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::{Cli, Config};
pub use error::ServerError;
pub use registry::ConnectionRegistry;
pub use state::{AppState, GatewaySettings};
