use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// How the spatial index regenerates its pair list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebuildStrategy {
    /// Cell decomposition of the box; near-linear in the particle count.
    #[default]
    CellGrid,
    /// All-pairs scan. Quadratic; intended for small systems and as a reference.
    BruteForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct VerletConfig {
    /// Skin added to the largest registered cutoff, in Å.
    pub pad: f64,
    pub strategy: RebuildStrategy,
}

impl Default for VerletConfig {
    fn default() -> Self {
        Self {
            pad: 10.0,
            strategy: RebuildStrategy::CellGrid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct QuasiAdiabaticConfig {
    pub formation_time: f64,
    pub breaking_time: f64,
    /// Scales the formation distance threshold of sidechain contacts.
    pub formation_tolerance: f64,
    /// A contact starts breaking once its length exceeds this multiple of its `r_min`.
    pub breaking_tolerance: f64,
    pub hr_abs_min: f64,
    pub hh_abs_min: f64,
    pub nr_max: f64,
    pub bb_r_min: f64,
    pub bs_r_min: f64,
    pub depth: f64,
    pub min_bond_sep: usize,
}

impl Default for QuasiAdiabaticConfig {
    fn default() -> Self {
        Self {
            formation_time: 10.0,
            breaking_time: 10.0,
            formation_tolerance: 1.0,
            breaking_tolerance: 1.0,
            hr_abs_min: 0.92,
            hh_abs_min: 0.75,
            nr_max: 0.5,
            bb_r_min: 5.0,
            bs_r_min: 6.8,
            depth: 1.0,
            min_bond_sep: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PauliConfig {
    pub r_cut: f64,
    pub depth: f64,
    pub min_bond_sep: usize,
}

impl Default for PauliConfig {
    fn default() -> Self {
        Self {
            r_cut: 5.0,
            depth: 1.0,
            min_bond_sep: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct NativeContactsConfig {
    pub depth: f64,
    pub cutoff: f64,
    pub min_bond_sep: usize,
}

impl Default for NativeContactsConfig {
    fn default() -> Self {
        Self {
            depth: 1.0,
            cutoff: 18.0,
            min_bond_sep: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TetherConfig {
    pub h1: f64,
    pub h2: f64,
    /// Equilibrium length used for bonds without an explicit one.
    pub dist0: f64,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            h1: 50.0,
            h2: 0.0,
            dist0: 3.8,
        }
    }
}

/// How the Debye-Hückel interaction models the dielectric medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permittivity {
    /// Uniform medium with a fixed relative permittivity.
    #[default]
    Constant,
    /// Distance-dependent relative permittivity `r / r0`.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DebyeHuckelConfig {
    pub permittivity: Permittivity,
    /// `e^2 / (4 pi eps_0)` in ε·Å.
    pub coulomb: f64,
    pub relative_permittivity: f64,
    pub r0: f64,
    /// Debye screening length, in Å; also the cutoff.
    pub screening_dist: f64,
    pub min_bond_sep: usize,
}

impl Default for DebyeHuckelConfig {
    fn default() -> Self {
        Self {
            permittivity: Permittivity::Constant,
            coulomb: 221.38,
            relative_permittivity: 80.0,
            r0: 4.0,
            screening_dist: 10.0,
            min_bond_sep: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LangevinConfig {
    /// Friction coefficient, in mass per τ.
    pub gamma: f64,
    /// Bath temperature as k_B·T, in ε.
    pub temperature: f64,
    pub seed: u64,
}

impl Default for LangevinConfig {
    fn default() -> Self {
        Self {
            gamma: 2.0,
            temperature: 0.35,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IntegratorConfig {
    pub dt: f64,
    /// Thermostatted predictor-corrector instead of plain leapfrog.
    pub langevin: Option<LangevinConfig>,
}

/// Everything needed to set up a [`crate::engine::simulation::Simulation`], apart from the
/// system itself. Interactions whose config is `None` are not instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub verlet: VerletConfig,
    pub integrator: IntegratorConfig,
    pub tether: Option<TetherConfig>,
    pub pauli: Option<PauliConfig>,
    pub native_contacts: Option<NativeContactsConfig>,
    pub quasi_adiabatic: Option<QuasiAdiabaticConfig>,
    pub debye_huckel: Option<DebyeHuckelConfig>,
    pub threads: Option<usize>,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    verlet: Option<VerletConfig>,
    dt: Option<f64>,
    tether: Option<TetherConfig>,
    pauli: Option<PauliConfig>,
    native_contacts: Option<NativeContactsConfig>,
    quasi_adiabatic: Option<QuasiAdiabaticConfig>,
    debye_huckel: Option<DebyeHuckelConfig>,
    langevin: Option<LangevinConfig>,
    threads: Option<usize>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verlet(mut self, config: VerletConfig) -> Self {
        self.verlet = Some(config);
        self
    }
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }
    pub fn tether(mut self, config: TetherConfig) -> Self {
        self.tether = Some(config);
        self
    }
    pub fn pauli(mut self, config: PauliConfig) -> Self {
        self.pauli = Some(config);
        self
    }
    pub fn native_contacts(mut self, config: NativeContactsConfig) -> Self {
        self.native_contacts = Some(config);
        self
    }
    pub fn quasi_adiabatic(mut self, config: QuasiAdiabaticConfig) -> Self {
        self.quasi_adiabatic = Some(config);
        self
    }
    pub fn debye_huckel(mut self, config: DebyeHuckelConfig) -> Self {
        self.debye_huckel = Some(config);
        self
    }
    pub fn langevin(mut self, config: LangevinConfig) -> Self {
        self.langevin = Some(config);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig {
            verlet: self.verlet.unwrap_or_default(),
            integrator: IntegratorConfig {
                dt: self.dt.ok_or(ConfigError::MissingParameter("dt"))?,
                langevin: self.langevin,
            },
            tether: self.tether,
            pauli: self.pauli,
            native_contacts: self.native_contacts,
            quasi_adiabatic: self.quasi_adiabatic,
            debye_huckel: self.debye_huckel,
            threads: self.threads,
        };
        config.validate()?;
        Ok(config)
    }
}

fn require_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("expected a positive finite number, got {value}"),
        })
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("dt", self.integrator.dt)?;
        require_positive("pad", self.verlet.pad)?;
        if let Some(qa) = &self.quasi_adiabatic {
            require_positive("formation-time", qa.formation_time)?;
            require_positive("breaking-time", qa.breaking_time)?;
            require_positive("bb-r-min", qa.bb_r_min)?;
            require_positive("bs-r-min", qa.bs_r_min)?;
        }
        if let Some(pauli) = &self.pauli {
            require_positive("r-cut", pauli.r_cut)?;
        }
        if let Some(native) = &self.native_contacts {
            require_positive("cutoff", native.cutoff)?;
        }
        if let Some(dh) = &self.debye_huckel {
            require_positive("screening-dist", dh.screening_dist)?;
            match dh.permittivity {
                Permittivity::Constant => {
                    require_positive("relative-permittivity", dh.relative_permittivity)?
                }
                Permittivity::Relative => require_positive("r0", dh.r0)?,
            }
        }
        if let Some(langevin) = &self.integrator.langevin {
            if !(langevin.gamma >= 0.0 && langevin.temperature >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    parameter: "langevin",
                    reason: format!(
                        "gamma and temperature must be non-negative, got {} and {}",
                        langevin.gamma, langevin.temperature
                    ),
                });
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                parameter: "threads",
                reason: "the worker pool needs at least one thread".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_time_step() {
        let result = SimulationConfigBuilder::new().build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("dt"));
    }

    #[test]
    fn build_applies_defaults_and_keeps_unset_interactions_disabled() {
        let config = SimulationConfigBuilder::new()
            .dt(0.005)
            .quasi_adiabatic(QuasiAdiabaticConfig::default())
            .build()
            .unwrap();
        assert_eq!(config.verlet.pad, 10.0);
        assert_eq!(config.verlet.strategy, RebuildStrategy::CellGrid);
        assert!(config.tether.is_none());
        assert!(config.pauli.is_none());
        assert_eq!(config.quasi_adiabatic.unwrap().formation_time, 10.0);
    }

    #[test]
    fn build_rejects_non_positive_values() {
        let err = SimulationConfigBuilder::new().dt(-1.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "dt", .. }));

        let err = SimulationConfigBuilder::new()
            .dt(0.01)
            .verlet(VerletConfig {
                pad: 0.0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "pad", .. }));
    }

    #[test]
    fn build_rejects_an_empty_worker_pool() {
        let err = SimulationConfigBuilder::new()
            .dt(0.01)
            .threads(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "threads", .. }));
    }

    #[test]
    fn sub_configs_deserialize_from_partial_kebab_case_toml() {
        let qa: QuasiAdiabaticConfig = toml::from_str(
            r#"
            formation-time = 5.0
            bb-r-min = 5.6
            "#,
        )
        .unwrap();
        assert_eq!(qa.formation_time, 5.0);
        assert_eq!(qa.bb_r_min, 5.6);
        assert_eq!(qa.breaking_time, 10.0);

        let verlet: VerletConfig = toml::from_str("strategy = \"brute-force\"").unwrap();
        assert_eq!(verlet.strategy, RebuildStrategy::BruteForce);
        assert_eq!(verlet.pad, 10.0);
    }

    #[test]
    fn langevin_and_electrostatics_are_opt_in() {
        let config = SimulationConfigBuilder::new().dt(0.005).build().unwrap();
        assert!(config.integrator.langevin.is_none());
        assert!(config.debye_huckel.is_none());

        let config = SimulationConfigBuilder::new()
            .dt(0.005)
            .langevin(LangevinConfig::default())
            .debye_huckel(toml::from_str("permittivity = \"relative\"").unwrap())
            .build()
            .unwrap();
        assert_eq!(config.integrator.langevin.unwrap().temperature, 0.35);
        let dh = config.debye_huckel.unwrap();
        assert_eq!(dh.permittivity, Permittivity::Relative);
        assert_eq!(dh.screening_dist, 10.0);
    }

    #[test]
    fn negative_temperature_is_rejected() {
        let err = SimulationConfigBuilder::new()
            .dt(0.005)
            .langevin(LangevinConfig {
                temperature: -1.0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "langevin", .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<PauliConfig, _> = toml::from_str("radius = 4.0");
        assert!(result.is_err());
    }
}
