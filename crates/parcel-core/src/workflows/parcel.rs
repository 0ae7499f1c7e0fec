use crate::core::io::file::{ArchiveFormat, FileArchive};
use crate::core::io::traits::Archive;
use crate::engine::config::{ConfigError, RunConfig};
use crate::engine::diagnostics::SpectralDiagnostics;
use crate::engine::error::SimulationError;
use crate::engine::micro::adapter::MicrophysicsAdapter;
use crate::engine::micro::{EngineFactory, create_engine};
use crate::engine::pressure;
use crate::engine::progress::{Progress, ProgressReporter, Stage};
use crate::engine::state::{Info, InitialConditions, State};
use std::ops::RangeInclusive;
use tracing::{debug, info, instrument};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Time steps integrated, ascent and holding together.
    pub ticks: usize,
    /// Output records written, including the initial one.
    pub records: usize,
    pub rh_max: f64,
    pub engine_version: String,
    pub final_state: State,
}

/// An initialized parcel, ready to be integrated.
///
/// Holding a `ParcelRun` means the engine exists and the parcel did not start
/// supersaturated; nothing has been written yet.
pub struct ParcelRun {
    config: RunConfig,
    init: InitialConditions,
    state: State,
    info: Info,
    micro: MicrophysicsAdapter,
}

impl ParcelRun {
    #[instrument(skip_all, name = "parcel_init")]
    pub fn initialize(config: &RunConfig, factory: &EngineFactory) -> Result<Self, SimulationError> {
        let init = InitialConditions::from_config(config);
        let mut state = State::initial(config, &init);
        info!(
            p_0 = init.p_0,
            th_0 = init.th_0,
            r_0 = init.r_0,
            "Initial parcel conditions resolved."
        );
        let (micro, info) = MicrophysicsAdapter::initialize(config, &mut state, factory)?;
        Ok(Self {
            config: config.clone(),
            init,
            state,
            info,
            micro,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Integrates the ascent and the holding phase, writing every `outfreq`-th tick.
    ///
    /// The archive is finished on success; run configuration and run information are
    /// stored as its attributes.
    #[instrument(skip_all, name = "parcel_workflow")]
    pub fn execute(
        mut self,
        archive: &mut dyn Archive,
        reporter: &ProgressReporter,
    ) -> Result<RunSummary, SimulationError> {
        // === Phase 0: Archive schema and initial record ===
        let diagnostics = reporter.stage(Stage::Setup, 0, || {
            let diagnostics = SpectralDiagnostics::output_init(archive, &self.config)?;
            self.micro.harvest_initial_ammonia(&mut self.state)?;
            self.output(&diagnostics, archive, reporter, 0)?;
            Ok::<_, SimulationError>(diagnostics)
        })?;
        let mut records = 1;

        let n_ascent = self.config.n_ascent();
        let total = n_ascent + self.config.wait;
        info!(
            n_ascent,
            wait = self.config.wait,
            outfreq = self.config.outfreq,
            "Starting parcel integration."
        );

        // === Phase 1: Ascent at constant vertical velocity ===
        let dz = self.config.w * self.config.dt;
        records += reporter.stage(Stage::Ascent, n_ascent as u64, || {
            self.integrate(1..=n_ascent, dz, total, &diagnostics, archive, reporter)
        })?;

        // === Phase 2: Holding at the final height (optional) ===
        if self.config.wait > 0 {
            records += reporter.stage(Stage::Holding, self.config.wait as u64, || {
                self.integrate(
                    n_ascent + 1..=total,
                    0.0,
                    total,
                    &diagnostics,
                    archive,
                    reporter,
                )
            })?;
        }

        // === Phase 3: Finalization ===
        for (name, value) in self
            .info
            .attributes()
            .into_iter()
            .chain(self.config.attributes())
        {
            archive.set_attribute(&name, value)?;
        }
        archive.finish()?;
        reporter.report(Progress::Finished {
            ticks: total,
            records,
        });

        info!(
            ticks = total,
            records,
            rh_max = self.info.rh_max,
            "Parcel run complete."
        );
        Ok(RunSummary {
            ticks: total,
            records,
            rh_max: self.info.rh_max,
            engine_version: self.info.engine_version.clone(),
            final_state: self.state,
        })
    }

    /// Integrates `ticks`, moving the parcel by `dz` per tick, and returns the number of
    /// records written.
    fn integrate(
        &mut self,
        ticks: RangeInclusive<usize>,
        dz: f64,
        total: usize,
        diagnostics: &SpectralDiagnostics,
        archive: &mut dyn Archive,
        reporter: &ProgressReporter,
    ) -> Result<usize, SimulationError> {
        debug!(first = ticks.start(), last = ticks.end(), dz, "Integrating.");

        let mut records = 0;
        for it in ticks {
            self.state.t = it as f64 * self.config.dt;
            self.state.z += dz;
            pressure::update(self.config.pprof, &self.init, dz, &mut self.state);
            self.micro.step(&mut self.state, &mut self.info)?;

            if it % self.config.outfreq == 0 {
                let rec = it / self.config.outfreq;
                info!(
                    record = rec,
                    "{:.2} %",
                    100.0 * it as f64 / total as f64
                );
                self.output(diagnostics, archive, reporter, rec)?;
                records += 1;
            }
            reporter.report(Progress::Tick);
        }
        Ok(records)
    }

    fn output(
        &mut self,
        diagnostics: &SpectralDiagnostics,
        archive: &mut dyn Archive,
        reporter: &ProgressReporter,
        rec: usize,
    ) -> Result<(), SimulationError> {
        diagnostics.output_bins(archive, &mut self.micro, rec)?;
        diagnostics.output_save(archive, &self.state, rec)?;
        reporter.report(Progress::Record {
            index: rec,
            time: self.state.t,
            z: self.state.z,
        });
        Ok(())
    }
}

/// Runs a parcel with the built-in super-droplet engine into any archive.
pub fn run(
    config: &RunConfig,
    archive: &mut dyn Archive,
    reporter: &ProgressReporter,
) -> Result<RunSummary, SimulationError> {
    ParcelRun::initialize(config, &create_engine)?.execute(archive, reporter)
}

/// Runs a parcel into the file named by `config.outfile`.
///
/// The archive format is resolved from the file extension and the engine is
/// initialized before the file is created, so a rejected run leaves no file behind.
#[instrument(skip_all, name = "parcel_run", fields(outfile = %config.outfile.display()))]
pub fn run_to_file(
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<RunSummary, SimulationError> {
    let format = ArchiveFormat::from_path(&config.outfile).ok_or_else(|| {
        ConfigError::UnknownArchiveFormat(config.outfile.display().to_string())
    })?;
    let run = ParcelRun::initialize(config, &create_engine)?;
    let mut archive = FileArchive::create(&config.outfile, format)?;
    run.execute(&mut archive, reporter)
}
