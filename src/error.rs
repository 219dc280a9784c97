// Error taxonomy for the engine.
//
// Missing or malformed perception input is never an error: analyzers recover
// locally and fusion proceeds with partial data. What remains are programming
// and integration errors: a bad configuration, a collaborator that cannot run,
// or a stream service whose consumer has gone away.

use thiserror::Error;

/// Problems with an `EngineConfig`, detected before the engine is built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroCapacity { field: &'static str },

    #[error("{field} has invalid value {value}")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures reported by an external perception collaborator.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("detection failed: {0}")]
    Detection(String),

    #[error("frame buffer has {actual} bytes, expected {expected}")]
    InvalidFrame { expected: usize, actual: usize },
}

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("engine service is no longer accepting frames")]
    ServiceClosed,

    #[error("engine is still shared by another handle")]
    EngineShared,
}
