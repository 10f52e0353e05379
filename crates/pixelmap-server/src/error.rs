use pixelmap_core::CanvasError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Delivery error: {0}")]
    Delivery(#[from] crate::registry::DeliveryError),
}
