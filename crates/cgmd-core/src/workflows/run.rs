use crate::core::models::state::State;
use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use crate::engine::forces::qa::contact::ContactKind;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::simulation::SimulationBuilder;
use tracing::{info, instrument};

/// Number of live quasi-adiabatic contacts of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactCounts {
    pub backbone_backbone: usize,
    pub backbone_sidechain: usize,
    pub sidechain_backbone: usize,
    pub sidechain_sidechain: usize,
}

impl ContactCounts {
    pub fn total(&self) -> usize {
        self.backbone_backbone
            + self.backbone_sidechain
            + self.sidechain_backbone
            + self.sidechain_sidechain
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub final_time: f64,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
    pub contacts: ContactCounts,
    pub pairs: usize,
    pub rebuilds: usize,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub summary: RunSummary,
    pub final_state: State,
}

/// Builds the simulation described by `builder` and advances it by `duration`.
#[instrument(skip_all, name = "run_workflow")]
pub fn run(
    builder: SimulationBuilder,
    duration: f64,
    reporter: &ProgressReporter,
) -> Result<RunResult, EngineError> {
    if !(duration >= 0.0 && duration.is_finite()) {
        return Err(ConfigError::InvalidValue {
            parameter: "duration",
            reason: format!("expected a non-negative finite time, got {duration}"),
        }
        .into());
    }

    // === Phase 1: Setup ===
    reporter.report(Progress::PhaseStart { name: "Setup" });
    let mut simulation = builder.build()?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Dynamics ===
    reporter.report(Progress::PhaseStart { name: "Dynamics" });
    info!(
        duration,
        particles = simulation.state().len(),
        "Starting dynamics."
    );
    let steps = simulation.advance(duration, reporter);
    reporter.report(Progress::PhaseFinish);

    let mut contacts = ContactCounts::default();
    for contact in simulation.contacts().iter().filter(|c| c.is_active()) {
        match contact.kind {
            ContactKind::BackboneBackbone => contacts.backbone_backbone += 1,
            ContactKind::BackboneSidechain => contacts.backbone_sidechain += 1,
            ContactKind::SidechainBackbone => contacts.sidechain_backbone += 1,
            ContactKind::SidechainSidechain => contacts.sidechain_sidechain += 1,
        }
    }

    let state = simulation.state();
    let summary = RunSummary {
        steps,
        final_time: state.t,
        potential_energy: simulation.last_energy(),
        kinetic_energy: state.kinetic_energy(),
        contacts,
        pairs: simulation.pairs().len(),
        rebuilds: simulation.rebuild_count(),
    };
    info!(
        steps,
        t = summary.final_time,
        energy = summary.potential_energy,
        contacts = contacts.total(),
        rebuilds = summary.rebuilds,
        "Run complete."
    );

    Ok(RunResult {
        summary,
        final_state: state.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{Parameters, Polarization, Specificity};
    use crate::core::models::amino_acid::AminoAcid;
    use crate::core::models::chains::Chains;
    use crate::core::topology::Topology;
    use crate::engine::config::{PauliConfig, QuasiAdiabaticConfig, SimulationConfigBuilder, TetherConfig};
    use nalgebra::Vector3;
    use std::sync::Mutex;

    fn builder() -> SimulationBuilder {
        let mut positions = Vec::new();
        for z in [0.0, 5.5] {
            positions.push(Vector3::new(-3.0, -2.0, z));
            positions.push(Vector3::new(0.0, 0.0, z));
            positions.push(Vector3::new(3.0, -2.0, z));
        }
        let mut params = Parameters::default();
        params.set_specificity(
            AminoAcid::Valine,
            Specificity {
                polarization: Polarization::Hydrophobic,
                max_sidechain: 2,
                max_hydrophobic_ss: 2,
                max_polar_ss: 0,
            },
        );
        params.set_pairwise_min_dist(AminoAcid::Valine, AminoAcid::Valine, 6.2);
        let config = SimulationConfigBuilder::new()
            .dt(0.01)
            .tether(TetherConfig::default())
            .pauli(PauliConfig::default())
            .quasi_adiabatic(QuasiAdiabaticConfig {
                bb_r_min: 5.6,
                ..Default::default()
            })
            .build()
            .unwrap();
        SimulationBuilder::new()
            .state(State::new(
                positions,
                vec![AminoAcid::Valine; 6],
                Topology::periodic(Vector3::new(80.0, 80.0, 80.0)),
            ))
            .chains(Chains::new(6, vec![0..3, 3..6]).unwrap())
            .parameters(params)
            .config(config)
    }

    #[test]
    fn run_summarizes_the_final_state() {
        let result = run(builder(), 0.5, &ProgressReporter::new()).unwrap();
        let summary = &result.summary;
        assert_eq!(summary.steps, 50);
        assert!((summary.final_time - 0.5).abs() < 1e-9);
        assert_eq!(summary.contacts.backbone_backbone, 1);
        assert_eq!(summary.contacts.total(), 1);
        assert!(summary.rebuilds >= 1);
        assert!(summary.potential_energy.is_finite());
        assert_eq!(result.final_state.len(), 6);
    }

    #[test]
    fn run_reports_setup_and_dynamics_phases() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        run(builder(), 0.1, &reporter).unwrap();
        drop(reporter);
        assert_eq!(phases.into_inner().unwrap(), vec!["Setup", "Dynamics"]);
    }

    #[test]
    fn negative_duration_is_rejected_before_setup() {
        let err = run(builder(), -1.0, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config {
                source: ConfigError::InvalidValue {
                    parameter: "duration",
                    ..
                }
            }
        ));
    }

    #[test]
    fn missing_parameters_surface_as_setup_errors() {
        let builder = builder().parameters(Parameters::default());
        let err = run(builder, 0.1, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::MissingParameter { .. }));
    }
}
