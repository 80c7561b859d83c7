//! Error types for the baker.

use thiserror::Error;

/// Baker-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A primitive failed input validation and cannot be baked
    #[error("Invalid primitive '{name}': {reason}")]
    InvalidPrimitive { name: String, reason: String },

    /// The scene contains no triangles to build an acceleration structure from
    #[error("Missing geometry: {0}")]
    MissingGeometry(String),

    /// Unrecognized pixel or channel layout
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Scene import error
    #[error("Scene error: {0}")]
    Scene(String),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// The probe visibility grid no longer matches the probe list
    #[error("Probe visibility grid is stale; rebuild it after editing probes")]
    StaleVisibility,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
