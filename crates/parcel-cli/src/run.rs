use crate::cli::Cli;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use parcel::engine::progress::ProgressReporter;
use parcel::workflows;
use tracing::info;

pub fn run(args: &Cli) -> Result<()> {
    info!("Resolving run configuration from defaults, file and CLI arguments...");
    let config = config::resolve(args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting parcel run: {} ascent steps, {} holding steps, output to {}",
        config.n_ascent(),
        config.wait,
        config.outfile.display()
    );
    let summary = workflows::parcel::run_to_file(&config, &reporter)?;

    info!(
        records = summary.records,
        rh_max = summary.rh_max,
        "Parcel run finished."
    );
    println!(
        "✓ {} records written to {} (RH_max = {:.4}, engine {})",
        summary.records,
        config.outfile.display(),
        summary.rh_max,
        summary.engine_version
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use clap::Parser;
    use parcel::core::io::file::FileArchive;
    use parcel::engine::error::SimulationError;
    use tempfile::tempdir;

    #[test]
    fn short_run_writes_the_requested_archive() {
        let dir = tempdir().unwrap();
        let outfile = dir.path().join("parcel.toml");
        let args = Cli::try_parse_from([
            "parcel",
            "--z_max",
            "1",
            "--sd_conc",
            "8",
            "--outfreq",
            "5",
            "--outfile",
            outfile.to_str().unwrap(),
        ])
        .unwrap();
        run(&args).unwrap();

        let contents = FileArchive::read(&outfile).unwrap();
        assert_eq!(contents.record_count(), 3);
        assert!(contents.attributes.contains_key("RH_max"));
    }

    #[test]
    fn supersaturated_start_fails_without_output() {
        let dir = tempdir().unwrap();
        let outfile = dir.path().join("parcel.json");
        let args = Cli::try_parse_from([
            "parcel",
            "--T_0",
            "283",
            "--r_0",
            "0.02",
            "--outfile",
            outfile.to_str().unwrap(),
        ])
        .unwrap();
        let result = run(&args);
        assert!(matches!(
            result,
            Err(CliError::Simulation(SimulationError::Supersaturated { .. }))
        ));
        assert!(!outfile.exists());
    }
}
