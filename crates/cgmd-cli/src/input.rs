use crate::error::{CliError, Result};
use cgmd::core::models::amino_acid::AminoAcid;
use cgmd::core::models::chains::Chains;
use cgmd::core::models::state::State;
use cgmd::core::topology::Topology;
use cgmd::engine::error::EngineError;
use cgmd::engine::forces::native::NativeContact;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ParticleRecord {
    /// Chain label. Rows sharing a label must be consecutive; an empty label leaves the
    /// particle outside every chain.
    chain: String,
    residue: AminoAcid,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    mass: Option<f64>,
}

/// Particles read from a `chain,residue,x,y,z[,mass]` table, in file order.
#[derive(Debug, Clone)]
pub struct ParticleTable {
    pub positions: Vec<Vector3<f64>>,
    pub types: Vec<AminoAcid>,
    pub masses: Vec<f64>,
    pub chains: Chains,
}

impl ParticleTable {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn into_state(self, top: Topology) -> (State, Chains) {
        let state = State::new(self.positions, self.types, top).with_masses(self.masses);
        (state, self.chains)
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|source| CliError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn layout_error(path: &Path, message: String) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: anyhow::anyhow!(message),
    }
}

pub fn read_particles(path: &Path) -> Result<ParticleTable> {
    let mut reader = open_reader(path)?;

    let mut positions = Vec::new();
    let mut types = Vec::new();
    let mut masses = Vec::new();
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut labels: Vec<String> = Vec::new();

    for (row, result) in reader.deserialize::<ParticleRecord>().enumerate() {
        let record = result.map_err(|source| CliError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let index = positions.len();

        let mass = record.mass.unwrap_or(1.0);
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(layout_error(
                path,
                format!("row {}: mass must be positive, got {mass}", row + 1),
            ));
        }

        if !record.chain.is_empty() {
            match labels.last() {
                Some(last) if *last == record.chain => {
                    if let Some(range) = ranges.last_mut() {
                        range.end = index + 1;
                    }
                }
                _ => {
                    if labels.contains(&record.chain) {
                        return Err(layout_error(
                            path,
                            format!(
                                "row {}: chain '{}' resumes after other particles; chain rows must be consecutive",
                                row + 1,
                                record.chain
                            ),
                        ));
                    }
                    labels.push(record.chain);
                    ranges.push(index..index + 1);
                }
            }
        } else if ranges.last().is_some_and(|r| r.end == index) {
            // An unchained particle closes the open chain, so a repeated label after it
            // would no longer be contiguous.
            labels.push(String::new());
            ranges.push(index..index);
        }

        positions.push(Vector3::new(record.x, record.y, record.z));
        types.push(record.residue);
        masses.push(mass);
    }

    let ranges: Vec<Range<usize>> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
    let chains = Chains::new(positions.len(), ranges).map_err(EngineError::from)?;
    debug!(
        particles = positions.len(),
        chains = chains.ranges().len(),
        "Read particle table."
    );

    Ok(ParticleTable {
        positions,
        types,
        masses,
        chains,
    })
}

pub fn read_native_contacts(path: &Path) -> Result<Vec<NativeContact>> {
    let mut reader = open_reader(path)?;
    let contacts = reader
        .deserialize::<NativeContact>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|source| CliError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(contacts = contacts.len(), "Read native contacts.");
    Ok(contacts)
}

#[derive(Debug, Serialize)]
struct FinalRecord {
    index: usize,
    residue: &'static str,
    x: f64,
    y: f64,
    z: f64,
    vx: f64,
    vy: f64,
    vz: f64,
}

/// Writes final positions and velocities, one row per particle.
pub fn write_state(path: &Path, state: &State) -> Result<()> {
    let csv_error = |source: csv::Error| CliError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for (index, ((r, v), &residue)) in state
        .positions
        .iter()
        .zip(&state.velocities)
        .zip(&state.types)
        .enumerate()
    {
        writer
            .serialize(FinalRecord {
                index,
                residue: residue.to_three_letter(),
                x: r.x,
                y: r.y,
                z: r.z,
                vx: v.x,
                vy: v.y,
                vz: v.z,
            })
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}
