use super::error::EngineError;
use crate::core::forcefield::params::Parameters;
use crate::core::models::amino_acid::AminoAcid;
use crate::core::models::chains::Chains;
use std::sync::Arc;

/// Read-only collaborators resolved once at setup and shared by every interaction.
///
/// Each service has a typed accessor; nothing is looked up at runtime and nothing is
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct Services {
    chains: Arc<Chains>,
    parameters: Arc<Parameters>,
    types: Arc<[AminoAcid]>,
}

impl Services {
    pub fn new(
        chains: Chains,
        parameters: Parameters,
        types: Vec<AminoAcid>,
    ) -> Result<Self, EngineError> {
        if chains.len() != types.len() {
            return Err(EngineError::Initialization(format!(
                "chain layout covers {} particles but {} residue types were given",
                chains.len(),
                types.len()
            )));
        }
        Ok(Self {
            chains: Arc::new(chains),
            parameters: Arc::new(parameters),
            types: types.into(),
        })
    }

    pub fn chains(&self) -> &Arc<Chains> {
        &self.chains
    }

    pub fn parameters(&self) -> &Arc<Parameters> {
        &self.parameters
    }

    pub fn types(&self) -> &[AminoAcid] {
        &self.types
    }

    pub fn num_particles(&self) -> usize {
        self.types.len()
    }
}
