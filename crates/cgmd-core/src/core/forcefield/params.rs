use crate::core::models::amino_acid::AminoAcid;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Polarization {
    GlyPro,
    Hydrophobic,
    Missing,
    Polar,
    PolarNeg,
    PolarPos,
}

impl Polarization {
    pub fn is_polar(self) -> bool {
        matches!(
            self,
            Polarization::Polar | Polarization::PolarNeg | Polarization::PolarPos
        )
    }
}

/// Sidechain valence limits and polarization class of one residue type.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Specificity {
    pub polarization: Polarization,
    pub max_sidechain: i8,
    pub max_hydrophobic_ss: i8,
    pub max_polar_ss: i8,
}

/// Per-residue-type parameters of the contact model.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Parameters {
    #[serde(default)]
    pub specificity: HashMap<AminoAcid, Specificity>,
    /// Extent of the sidechain-sidechain well for each residue pair; looked up symmetrically.
    #[serde(default)]
    pub pairwise_min_dist: HashMap<AminoAcid, HashMap<AminoAcid, f64>>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl Parameters {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn specificity(&self, acid: AminoAcid) -> Option<&Specificity> {
        self.specificity.get(&acid)
    }

    pub fn pairwise_min_dist(&self, a: AminoAcid, b: AminoAcid) -> Option<f64> {
        self.pairwise_min_dist
            .get(&a)
            .and_then(|row| row.get(&b))
            .or_else(|| self.pairwise_min_dist.get(&b).and_then(|row| row.get(&a)))
            .copied()
    }

    pub fn set_specificity(&mut self, acid: AminoAcid, specificity: Specificity) {
        self.specificity.insert(acid, specificity);
    }

    pub fn set_pairwise_min_dist(&mut self, a: AminoAcid, b: AminoAcid, dist: f64) {
        self.pairwise_min_dist.entry(a).or_default().insert(b, dist);
    }
}
