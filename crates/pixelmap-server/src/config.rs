use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Command line flags. Unset flags leave lower layers untouched.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "pixelmap-server", version, about = "PixelMap shared canvas server")]
pub struct Cli {
    /// Path to TOML config file
    #[arg(long, default_value = "./pixelmap.toml")]
    #[serde(skip)]
    pub config: String,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,

    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Frames queued per connection before a slow client is dropped
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_buffer: Option<usize>,

    /// Seconds between WebSocket pings (0 disables)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_interval_secs: Option<u64>,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub outbound_buffer: usize,
    pub ping_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            outbound_buffer: 256,
            ping_interval_secs: 30,
        }
    }
}

impl Config {
    /// Layered precedence:
    /// built-in defaults < TOML file < env vars (PIXELMAP_*) < CLI args
    pub fn figment(cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("PIXELMAP_"))
            .merge(Serialized::defaults(cli))
    }

    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# PixelMap Server Configuration
# Place this file at ./pixelmap.toml or specify with --config <path>
# All settings can be overridden via environment variables (PIXELMAP_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging
# json_logs = false

# Frames queued per connection before a slow client is disconnected
# outbound_buffer = 256

# Seconds between WebSocket pings, 0 disables (default: 30)
# ping_interval_secs = 30

# The paint cooldown (300 seconds) is fixed and cannot be configured.
"#
    .to_string()
}
