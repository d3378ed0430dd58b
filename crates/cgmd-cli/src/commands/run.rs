use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use crate::input;
use crate::utils::progress::CliProgressHandler;
use cgmd::core::forcefield::params::Parameters;
use cgmd::engine::error::EngineError;
use cgmd::engine::progress::ProgressReporter;
use cgmd::engine::simulation::SimulationBuilder;
use cgmd::workflows::{self, run::RunSummary};
use tracing::{debug, info, warn};

pub fn run(args: RunArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    let partial_config = PartialRunConfig::from_file(&args.config, &args.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args, threads)?;

    info!("Loading particles from {:?}", &args.particles);
    let table = input::read_particles(&args.particles)?;
    if table.is_empty() {
        warn!("The particle table is empty; the run will only advance time.");
    } else {
        info!(particles = table.len(), "Particle table loaded.");
    }
    let (state, chains) = table.into_state(config.topology);

    info!("Loading residue parameters from {:?}", &args.params);
    let parameters = Parameters::load(&args.params).map_err(EngineError::from)?;

    let mut builder = SimulationBuilder::new()
        .state(state)
        .chains(chains)
        .parameters(parameters)
        .config(config.simulation);
    if let Some(path) = &args.native_contacts {
        info!("Loading native contacts from {:?}", path);
        builder = builder.native_contacts(input::read_native_contacts(path)?);
    }

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting dynamics for t = {}...", config.duration);
    let result = workflows::run::run(builder, config.duration, &reporter)?;
    drop(reporter);
    debug!(
        rebuilds = progress_handler.rebuilds(),
        "Progress handler observed pair-list rebuilds."
    );

    print_summary(&result.summary);

    if let Some(path) = &args.output {
        info!("Writing final state to {:?}", path);
        input::write_state(path, &result.final_state)?;
        println!("✓ Final state written to: {}", path.display());
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let contacts = &summary.contacts;
    println!("Run complete.");
    println!("  Steps:             {}", summary.steps);
    println!("  Final time:        {:.4}", summary.final_time);
    println!("  Potential energy:  {:.6}", summary.potential_energy);
    println!("  Kinetic energy:    {:.6}", summary.kinetic_energy);
    println!(
        "  Contacts:          {} (bb {}, bs {}, sb {}, ss {})",
        contacts.total(),
        contacts.backbone_backbone,
        contacts.backbone_sidechain,
        contacts.sidechain_backbone,
        contacts.sidechain_sidechain
    );
    println!("  Pair list:         {} pairs", summary.pairs);
    println!("  Rebuilds:          {}", summary.rebuilds);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::error::CliError;
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    const PARAMS: &str = r#"
[specificity.VAL]
polarization = "hydrophobic"
max-sidechain = 2
max-hydrophobic-ss = 2
max-polar-ss = 0

[pairwise-min-dist.VAL]
VAL = 6.2
"#;

    const CONFIG: &str = r#"
dt = 0.01
duration = 0.2

[box]
cell = [80.0, 80.0, 80.0]
periodic = [true, true, true]

[tether]
[pauli]
[quasi-adiabatic]
bb-r-min = 5.6
"#;

    const PARTICLES: &str = "chain,residue,x,y,z\n\
        A,VAL,-3,-2,0\nA,VAL,0,0,0\nA,VAL,3,-2,0\n\
        B,VAL,-3,-2,5.5\nB,VAL,0,0,5.5\nB,VAL,3,-2,5.5\n";

    fn parse(dir: &Path, extra: &[&str]) -> (RunArgs, Option<usize>) {
        let particles = dir.join("particles.csv");
        let params = dir.join("params.toml");
        let config = dir.join("run.toml");
        let mut argv: Vec<String> = vec![
            "cgmd".into(),
            "run".into(),
            "-p".into(),
            particles.display().to_string(),
            "--params".into(),
            params.display().to_string(),
            "-c".into(),
            config.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let cli = Cli::parse_from(argv);
        let Commands::Run(args) = cli.command;
        (args, cli.threads)
    }

    fn write_inputs(dir: &Path, params: &str) {
        fs::write(dir.join("particles.csv"), PARTICLES).unwrap();
        fs::write(dir.join("params.toml"), params).unwrap();
        fs::write(dir.join("run.toml"), CONFIG).unwrap();
    }

    #[test]
    fn run_writes_the_final_state() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), PARAMS);
        let output = dir.path().join("final.csv");
        let (args, threads) = parse(dir.path(), &["-j", "2", "-o", output.to_str().unwrap()]);

        run(args, threads, true).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 7);
        assert!(content.starts_with("index,residue,x,y,z,vx,vy,vz"));
    }

    #[test]
    fn missing_residue_parameters_fail_setup() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), "");
        let (args, threads) = parse(dir.path(), &[]);

        let err = run(args, threads, true).unwrap_err();
        assert!(matches!(
            err,
            CliError::Core(EngineError::MissingParameter { .. })
        ));
    }

    #[test]
    fn native_contacts_outside_the_system_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path(), PARAMS);
        let native = dir.path().join("native.csv");
        fs::write(&native, "i,j,r_min\n0,40,5.0\n").unwrap();
        let (args, threads) = parse(dir.path(), &["-n", native.to_str().unwrap()]);

        let err = run(args, threads, true).unwrap_err();
        assert!(matches!(
            err,
            CliError::Core(EngineError::ParticleOutOfRange { index: 40, len: 6 })
        ));
    }
}
