use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::traits::ArchiveError;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Initial relative humidity is {rh:.4} (> 1): please supply initial T, p and r_v below saturation"
    )]
    Supersaturated { rh: f64 },

    #[error("Microphysics failed: {source}")]
    Microphysics {
        #[from]
        source: MicrophysicsError,
    },

    #[error("Archive error: {source}")]
    Archive {
        #[from]
        source: ArchiveError,
    },
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MicrophysicsError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Unsupported option for the {backend} backend: {option}")]
    Unsupported {
        backend: &'static str,
        option: &'static str,
    },

    #[error("Cannot {operation} in phase '{phase}'")]
    Protocol {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("No particle selection is active; call a select_* method first")]
    NoSelection,

    #[error("Non-physical ambient state: {0}")]
    Ambient(String),
}
