use std::sync::Arc;
use std::time::Duration;

use pixelmap_core::{CanvasEngine, Clock, SystemClock};

use crate::config::Config;
use crate::registry::ConnectionRegistry;

/// Per-connection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Frames a connection may have queued before it is evicted.
    pub outbound_buffer: usize,
    /// Interval between WebSocket pings, if any.
    pub ping_interval: Option<Duration>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            ping_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            outbound_buffer: config.outbound_buffer.max(1),
            ping_interval: (config.ping_interval_secs > 0)
                .then(|| Duration::from_secs(config.ping_interval_secs)),
        }
    }
}

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The authoritative canvas
    pub engine: Arc<CanvasEngine>,
    /// Open WebSocket connections
    pub registry: Arc<ConnectionRegistry>,
    /// Time source for paint timestamps
    pub clock: Arc<dyn Clock>,
    pub settings: GatewaySettings,
}

impl AppState {
    pub fn new(settings: GatewaySettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: GatewaySettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: Arc::new(CanvasEngine::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            clock,
            settings,
        }
    }
}
