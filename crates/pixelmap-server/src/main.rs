//! PixelMap server
//!
//! Serves a shared pixel canvas over WebSocket.
//!
//! ## Protocol
//!
//! Messages are JSON envelopes discriminated by `type`:
//! ```json
//! { "type": "INIT", "data": [ { "x": 5, "y": 5, "color": "#ff0000", "owner": "alice", "timestamp": 0 } ] }
//! { "type": "DRAW", "x": 5, "y": 5, "color": "#ff0000", "owner": "alice" }
//! { "type": "UPDATE", "data": { "x": 5, "y": 5, "color": "#ff0000", "owner": "alice", "timestamp": 0 } }
//! { "type": "ERROR", "message": "Pixel is on cooldown: ..." }
//! ```

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use pixelmap_server::config::{Cli, Config, generate_config_template};
use pixelmap_server::{AppState, GatewaySettings, ServerError, routes};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();

    if cli.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    let config = Config::load(&cli)?;
    init_tracing(config.json_logs);

    info!("PixelMap server v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = GatewaySettings::from(&config);
    let app = routes::build_router(AppState::new(settings));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        outbound_buffer = settings.outbound_buffer,
        ping_interval = ?settings.ping_interval,
        "Listening on {}",
        addr
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pixelmap_server=info,pixelmap_core=info,tower_http=info".into());

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
