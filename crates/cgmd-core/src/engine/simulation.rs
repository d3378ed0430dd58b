use super::config::{ConfigError, SimulationConfig};
use super::error::EngineError;
use super::forces::native::NativeContact;
use super::forces::qa::contact::Contact;
use super::forces::{
    Electrostatics, Interaction, NativeContacts, PauliExclusion, QuasiAdiabatic, Tether,
};
use super::integrator::Integrator;
use super::progress::{Progress, ProgressReporter, StepReport};
use super::services::Services;
use super::verlet::Pair;
use super::verlet::list::SpatialIndex;
use crate::core::forcefield::dynamics::Dynamics;
use crate::core::forcefield::params::Parameters;
use crate::core::models::chains::Chains;
use crate::core::models::state::State;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drives the step protocol: refresh the pair list, run the parallel phase of every
/// interaction, run the sequential phase of those that need it, then integrate.
pub struct Simulation {
    state: State,
    services: Services,
    index: SpatialIndex,
    interactions: Vec<Interaction>,
    /// Position in `interactions` of each spatial-index listener, by listener id.
    listeners: Vec<usize>,
    integrator: Integrator,
    pool: Option<Arc<ThreadPool>>,
    dynamics: Dynamics,
    steps: u64,
}

impl Simulation {
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Energy and forces of the most recent step.
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    pub fn last_energy(&self) -> f64 {
        self.dynamics.energy
    }

    /// The shared pair list, after claiming interactions removed their pairs.
    pub fn pairs(&self) -> &[Pair] {
        self.index.pairs()
    }

    pub fn rebuild_count(&self) -> usize {
        self.index.rebuild_count()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn quasi_adiabatic(&self) -> Option<&QuasiAdiabatic> {
        self.interactions.iter().find_map(Interaction::as_quasi_adiabatic)
    }

    pub fn quasi_adiabatic_mut(&mut self) -> Option<&mut QuasiAdiabatic> {
        self.interactions
            .iter_mut()
            .find_map(Interaction::as_quasi_adiabatic_mut)
    }

    /// Quasi-adiabatic contacts, or an empty slice if that interaction is disabled.
    pub fn contacts(&self) -> &[Contact] {
        self.quasi_adiabatic()
            .map(QuasiAdiabatic::contacts)
            .unwrap_or_default()
    }

    /// Performs one step. Returns whether the pair list was rebuilt.
    pub fn step(&mut self) -> bool {
        match self.pool.clone() {
            Some(pool) => pool.install(|| self.step_in_pool()),
            None => self.step_in_pool(),
        }
    }

    fn step_in_pool(&mut self) -> bool {
        let Self {
            state,
            index,
            interactions,
            listeners,
            ..
        } = self;

        let rebuilt = index.ensure_valid(state, |id, pairs| {
            interactions[listeners[id]].on_pair_list_changed(pairs);
        });

        let n = state.len();
        let state_ref = &*state;
        let mut dynamics = interactions
            .par_iter_mut()
            .filter(|interaction| interaction.kind().capabilities().parallel_phase)
            .map(|interaction| {
                let mut partial = Dynamics::zeros(n);
                interaction.compute_parallel(state_ref, &mut partial);
                partial
            })
            .reduce(|| Dynamics::zeros(n), |a, b| a + b);

        for interaction in interactions
            .iter_mut()
            .filter(|interaction| interaction.kind().capabilities().sequential_phase)
        {
            interaction.compute_sequential(state_ref, &mut dynamics);
        }

        self.integrator.step(&mut self.state, &dynamics);
        self.dynamics = dynamics;
        self.steps += 1;
        rebuilt
    }

    /// Steps until `duration` has elapsed (rounded to whole steps). Returns the number of
    /// steps taken.
    #[instrument(skip_all, name = "simulation_advance")]
    pub fn advance(&mut self, duration: f64, reporter: &ProgressReporter) -> u64 {
        let dt = self.integrator.dt();
        let total_steps = (duration / dt).round().max(0.0) as u64;
        reporter.report(Progress::DynamicsStart { total_steps, dt });
        for step in 1..=total_steps {
            if self.step() {
                let pairs = self.index.pairs().len();
                debug!(t = self.state.t, pairs, "Pair list rebuilt during advance.");
                reporter.report(Progress::PairListRebuilt { step, pairs });
            }
            if reporter.is_listening() {
                reporter.report(Progress::Step(StepReport {
                    step,
                    t: self.state.t,
                    potential_energy: self.dynamics.energy,
                    contacts: self.contacts().len(),
                }));
            }
        }
        reporter.report(Progress::DynamicsFinish);
        total_steps
    }
}

/// Assembles a [`Simulation`]: resolves the shared services, creates the enabled
/// interactions and registers the nonlocal ones with the spatial index.
///
/// Interactions that claim pairs from the shared list are registered first, so every
/// other listener sees the list without the claimed pairs.
#[derive(Default)]
pub struct SimulationBuilder {
    state: Option<State>,
    chains: Option<Chains>,
    parameters: Option<Parameters>,
    native_contacts: Vec<NativeContact>,
    config: Option<SimulationConfig>,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }
    /// Defaults to one chain spanning every particle.
    pub fn chains(mut self, chains: Chains) -> Self {
        self.chains = Some(chains);
        self
    }
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
    pub fn native_contacts(mut self, contacts: Vec<NativeContact>) -> Self {
        self.native_contacts = contacts;
        self
    }
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Simulation, EngineError> {
        let state = self.state.ok_or(ConfigError::MissingParameter("state"))?;
        let config = self.config.ok_or(ConfigError::MissingParameter("config"))?;
        config.validate()?;

        let n = state.len();
        if state.types.len() != n || state.masses.len() != n || state.velocities.len() != n {
            return Err(EngineError::Initialization(format!(
                "state vectors disagree on the particle count ({n} positions)"
            )));
        }
        let chains = self.chains.unwrap_or_else(|| Chains::single(n));
        let services = Services::new(
            chains,
            self.parameters.unwrap_or_default(),
            state.types.clone(),
        )?;
        if let Some(c) = self.native_contacts.iter().find(|c| c.i.max(c.j) >= n) {
            return Err(EngineError::ParticleOutOfRange {
                index: c.i.max(c.j),
                len: n,
            });
        }

        let mut interactions = create_interactions(&config, &services, self.native_contacts)?;
        interactions.sort_by_key(|interaction| !interaction.kind().capabilities().claims_pairs);

        let mut index = SpatialIndex::new(config.verlet, Arc::clone(services.chains()));
        let mut listeners = Vec::new();
        for (position, interaction) in interactions.iter().enumerate() {
            if let Some(spec) = interaction.spec() {
                let id = index.register(interaction.kind().name(), spec)?;
                if id != listeners.len() {
                    return Err(EngineError::Internal(format!(
                        "listener id {id} does not follow registration order"
                    )));
                }
                listeners.push(position);
            }
        }

        let pool = config
            .threads
            .map(|threads| ThreadPoolBuilder::new().num_threads(threads).build())
            .transpose()
            .map_err(|e| EngineError::Initialization(format!("worker pool: {e}")))?
            .map(Arc::new);

        let integrator = Integrator::new(&config.integrator, &state);

        info!(
            particles = n,
            interactions = interactions.len(),
            nonlocal = listeners.len(),
            cutoff = index.effective_cutoff(),
            threads = ?config.threads,
            "Simulation initialized."
        );

        Ok(Simulation {
            state,
            services,
            index,
            interactions,
            listeners,
            integrator,
            pool,
            dynamics: Dynamics::zeros(n),
            steps: 0,
        })
    }
}

fn create_interactions(
    config: &SimulationConfig,
    services: &Services,
    native_contacts: Vec<NativeContact>,
) -> Result<Vec<Interaction>, EngineError> {
    let mut interactions = Vec::new();
    if let Some(tether) = &config.tether {
        interactions.push(Tether::new(tether, services.chains()).into());
    }
    if let Some(pauli) = &config.pauli {
        interactions.push(PauliExclusion::new(pauli, Arc::clone(services.chains())).into());
    }
    match &config.native_contacts {
        Some(native) => interactions.push(NativeContacts::new(native, native_contacts).into()),
        None if !native_contacts.is_empty() => {
            warn!(
                count = native_contacts.len(),
                "Native contacts supplied but the interaction is disabled; ignoring them."
            );
        }
        None => {}
    }
    if let Some(qa) = &config.quasi_adiabatic {
        interactions.push(QuasiAdiabatic::new(qa, services)?.into());
    }
    if let Some(dh) = &config.debye_huckel {
        interactions.push(Electrostatics::new(dh, services)?.into());
    }
    Ok(interactions)
}
