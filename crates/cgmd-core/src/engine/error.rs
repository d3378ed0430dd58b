use thiserror::Error;

use super::config::ConfigError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::models::amino_acid::AminoAcid;
use crate::core::models::chains::ChainLayoutError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Interaction '{interaction}' registered after the pair list was first built")]
    LateRegistration { interaction: &'static str },

    #[error("Interaction '{interaction}' requires a missing parameter for {residue}: {parameter}")]
    MissingParameter {
        interaction: &'static str,
        residue: AminoAcid,
        parameter: &'static str,
    },

    #[error("Particle index {index} is out of range for a system of {len} particles")]
    ParticleOutOfRange { index: usize, len: usize },

    #[error("Invalid chain layout: {source}")]
    ChainLayout {
        #[from]
        source: ChainLayoutError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to load parameters: {source}")]
    Params {
        #[from]
        source: ParamLoadError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
