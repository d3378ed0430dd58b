use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use cgmd::core::topology::Topology;
use cgmd::engine::config::{
    DebyeHuckelConfig, LangevinConfig, NativeContactsConfig, PauliConfig, QuasiAdiabaticConfig,
    SimulationConfig, SimulationConfigBuilder, TetherConfig, VerletConfig,
};
use serde::Deserialize;
use std::path::Path;
use toml::{Table, Value};
use tracing::debug;

/// Contents of a run configuration file. Interaction sections that are absent leave the
/// interaction disabled; an empty section enables it with default parameters.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialRunConfig {
    dt: Option<f64>,
    duration: Option<f64>,
    threads: Option<usize>,
    #[serde(rename = "box")]
    topology: Option<Topology>,
    verlet: Option<VerletConfig>,
    tether: Option<TetherConfig>,
    pauli: Option<PauliConfig>,
    native_contacts: Option<NativeContactsConfig>,
    quasi_adiabatic: Option<QuasiAdiabaticConfig>,
    debye_huckel: Option<DebyeHuckelConfig>,
    /// Present to replace leapfrog with the Langevin predictor-corrector.
    langevin: Option<LangevinConfig>,
}

/// Fully resolved settings for one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub topology: Topology,
    pub duration: f64,
}

impl PartialRunConfig {
    /// Reads `path` and applies `KEY=VALUE` overrides (dotted keys address nested tables)
    /// before the document is interpreted.
    pub fn from_file(path: &Path, set_values: &[String]) -> Result<Self> {
        debug!("Loading run configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let parse_error = |e: toml::de::Error| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        };
        let mut table: Table = toml::from_str(&content).map_err(parse_error)?;
        apply_set_values(&mut table, set_values)?;
        Value::Table(table).try_into().map_err(parse_error)
    }

    /// Combines the file with command-line overrides. `--duration` and `-j` win over the
    /// file.
    pub fn merge_with_cli(self, args: &RunArgs, threads: Option<usize>) -> Result<RunConfig> {
        let duration = args.duration.or(self.duration).ok_or_else(|| {
            CliError::Config(
                "A value for 'duration' is required either in the config file or via --duration."
                    .to_string(),
            )
        })?;

        let mut builder = SimulationConfigBuilder::new();
        if let Some(dt) = self.dt {
            builder = builder.dt(dt);
        }
        if let Some(verlet) = self.verlet {
            builder = builder.verlet(verlet);
        }
        if let Some(tether) = self.tether {
            builder = builder.tether(tether);
        }
        if let Some(pauli) = self.pauli {
            builder = builder.pauli(pauli);
        }
        if let Some(native) = self.native_contacts {
            builder = builder.native_contacts(native);
        }
        if let Some(qa) = self.quasi_adiabatic {
            builder = builder.quasi_adiabatic(qa);
        }
        if let Some(dh) = self.debye_huckel {
            builder = builder.debye_huckel(dh);
        }
        if let Some(langevin) = self.langevin {
            builder = builder.langevin(langevin);
        }
        if let Some(threads) = threads.or(self.threads) {
            builder = builder.threads(threads);
        }

        Ok(RunConfig {
            simulation: builder.build().map_err(|e| CliError::Config(e.to_string()))?,
            topology: self.topology.unwrap_or_else(Topology::open),
            duration,
        })
    }
}

fn apply_set_values(table: &mut Table, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let (key, raw) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            ))
        })?;
        let value = parse_value(raw.trim());

        let mut segments: Vec<&str> = key.trim().split('.').collect();
        let Some(leaf) = segments.pop().filter(|s| !s.is_empty()) else {
            return Err(CliError::Config(format!("Empty key in --set '{kv_pair}'.")));
        };
        let mut current = &mut *table;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            current = match entry {
                Value::Table(inner) => inner,
                _ => {
                    return Err(CliError::Config(format!(
                        "Cannot set '{key}': '{segment}' is not a table."
                    )));
                }
            };
        }
        current.insert(leaf.to_string(), value);
    }
    Ok(())
}

/// Interprets a `--set` value as a TOML literal, falling back to a bare string.
fn parse_value(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
