use super::superdroplet::{DEFAULT_SEED, LARGE_TAIL_N_SD_MAX};
use super::{Backend, EngineFactory, InitOptions, Microphysics, StepOptions};
use crate::core::aerosol::dry_distributions;
use crate::core::chem::ChemSpecies;
use crate::core::spectrum::RadiusKind;
use crate::engine::config::{ChemistryProcesses, RunConfig};
use crate::engine::error::{MicrophysicsError, SimulationError};
use crate::engine::state::{Info, State};
use crate::engine::stats;
use tracing::{debug, info, instrument};

/// Couples a [`Microphysics`] engine to the parcel state.
///
/// The adapter owns the engine for the whole run and is the only place that drives its
/// step protocol, so the sync/async ordering and the selection-before-query rule hold by
/// construction for every caller.
pub struct MicrophysicsAdapter {
    engine: Box<dyn Microphysics>,
    step_options: StepOptions,
    chemistry: bool,
}

impl MicrophysicsAdapter {
    /// Engine options derived from a validated run configuration.
    pub fn init_options(config: &RunConfig) -> InitOptions {
        let dry_distros = dry_distributions(&config.aerosol);
        let n_sd_max = if config.large_tail {
            LARGE_TAIL_N_SD_MAX
        } else {
            config.sd_conc * dry_distros.len().max(1)
        };
        InitOptions {
            dt: config.dt,
            sd_conc: config.sd_conc,
            n_sd_max,
            chem_rho: config.chem_rho,
            sstp_cond: config.sstp_cond,
            sstp_chem: config.sstp_chem,
            dry_distros,
            sedimentation: false,
            coalescence: false,
            chemistry: config.chemistry_enabled(),
            large_tail: config.large_tail,
            seed: DEFAULT_SEED,
        }
    }

    pub fn step_options(config: &RunConfig) -> StepOptions {
        StepOptions {
            condensation: true,
            coalescence: false,
            advection: false,
            sedimentation: false,
            chem: if config.chemistry_enabled() {
                config.chemistry
            } else {
                ChemistryProcesses::default()
            },
        }
    }

    /// Creates and initializes the engine, then diagnoses the initial state.
    ///
    /// Fails with [`SimulationError::Supersaturated`] if the parcel starts above
    /// saturation, before anything has been written.
    #[instrument(skip_all, name = "microphysics_init")]
    pub fn initialize(
        config: &RunConfig,
        state: &mut State,
        factory: &EngineFactory,
    ) -> Result<(Self, Info), SimulationError> {
        let opts = Self::init_options(config);
        debug!(
            sd_conc = opts.sd_conc,
            n_sd_max = opts.n_sd_max,
            kappas = opts.dry_distros.len(),
            chemistry = opts.chemistry,
            "Creating microphysics engine."
        );
        let mut engine = factory(Backend::Serial, opts)?;
        engine.init(state.ambient())?;

        let mut info = Info::new(engine.version());
        stats::update(state, &mut info);
        if state.rh > 1.0 {
            return Err(SimulationError::Supersaturated { rh: state.rh });
        }
        info!(
            engine = %info.engine_version,
            rh = state.rh,
            temperature = state.temperature,
            "Microphysics engine initialized."
        );

        Ok((
            Self {
                engine,
                step_options: Self::step_options(config),
                chemistry: config.chemistry_enabled(),
            },
            info,
        ))
    }

    /// One full time step: synchronous exchange, asynchronous processes, derived
    /// quantities and (with chemistry) the dissolved tracers.
    pub fn step(&mut self, state: &mut State, info: &mut Info) -> Result<(), SimulationError> {
        self.engine.step_sync(&self.step_options, state.ambient())?;
        self.engine.step_async(&self.step_options)?;
        stats::update(state, info);
        if self.chemistry {
            self.harvest(state, &ChemSpecies::GASES)?;
        }
        Ok(())
    }

    /// Records the ammonia present in the particles right after initialization.
    pub fn harvest_initial_ammonia(&mut self, state: &mut State) -> Result<(), SimulationError> {
        if self.chemistry {
            self.harvest(state, &[ChemSpecies::NH3])?;
        }
        Ok(())
    }

    fn harvest(
        &mut self,
        state: &mut State,
        species: &[ChemSpecies],
    ) -> Result<(), MicrophysicsError> {
        self.engine.select_all()?;
        for &s in species {
            state.aqueous.insert(s, self.engine.chem_mass(s)?);
        }
        Ok(())
    }

    pub fn diagnose_radius_range(
        &mut self,
        kind: RadiusKind,
        lo: f64,
        hi: f64,
    ) -> Result<(), MicrophysicsError> {
        match kind {
            RadiusKind::Wet => self.engine.select_wet_range(lo, hi),
            RadiusKind::Dry => self.engine.select_dry_range(lo, hi),
        }
    }

    pub fn diagnose_moment(&self, kind: RadiusKind, k: i32) -> Result<f64, MicrophysicsError> {
        match kind {
            RadiusKind::Wet => self.engine.wet_moment(k),
            RadiusKind::Dry => self.engine.dry_moment(k),
        }
    }

    pub fn diagnose_chemical(&self, species: ChemSpecies) -> Result<f64, MicrophysicsError> {
        self.engine.chem_mass(species)
    }
}
