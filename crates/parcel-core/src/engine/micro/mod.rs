//! The particle-based microphysics contract.
//!
//! An engine is created from [`InitOptions`] by an [`EngineFactory`], initialized once
//! from the ambient state, and then advanced with a strictly ordered two-phase step:
//! [`Microphysics::step_sync`] exchanges the ambient thermodynamic and gas-phase fields
//! in place, after which [`Microphysics::step_async`] performs the remaining
//! per-particle work. Diagnostic queries are scoped by the most recent `select_*` call
//! and are only valid once the asynchronous phase has completed.

pub mod adapter;
pub(crate) mod chemistry;
#[cfg(test)]
pub(crate) mod fake;
pub mod superdroplet;

use super::config::ChemistryProcesses;
use super::error::MicrophysicsError;
use crate::core::aerosol::DryDistributions;
use crate::core::chem::ChemSpecies;
use std::collections::BTreeMap;
use std::fmt;

/// Computational back end of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Serial,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Serial => f.write_str("serial"),
        }
    }
}

/// Options fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct InitOptions {
    pub dt: f64,
    /// Super-particles per hygroscopicity class.
    pub sd_conc: usize,
    /// Capacity of the particle store.
    pub n_sd_max: usize,
    /// Density of the dry aerosol material [kg/m3].
    pub chem_rho: f64,
    pub sstp_cond: u32,
    pub sstp_chem: u32,
    pub dry_distros: DryDistributions,
    pub sedimentation: bool,
    pub coalescence: bool,
    pub chemistry: bool,
    /// Adds super-particles resolving the large-radius tail of the distributions.
    pub large_tail: bool,
    /// Seed of the random sampling of the initial spectrum.
    pub seed: u64,
}

/// Process switches of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOptions {
    pub condensation: bool,
    pub coalescence: bool,
    pub advection: bool,
    pub sedimentation: bool,
    pub chem: ChemistryProcesses,
}

/// The ambient fields lent to the engine; updates are applied in place.
#[derive(Debug)]
pub struct Ambient<'a> {
    pub th_d: &'a mut f64,
    pub r_v: &'a mut f64,
    pub rhod: &'a mut f64,
    /// Gas-phase mixing ratios; empty when chemistry is off.
    pub gas: &'a mut BTreeMap<ChemSpecies, f64>,
}

pub trait Microphysics {
    /// Identifier of the engine implementation and version.
    fn version(&self) -> String;

    fn init(&mut self, ambient: Ambient<'_>) -> Result<(), MicrophysicsError>;

    fn step_sync(
        &mut self,
        opts: &StepOptions,
        ambient: Ambient<'_>,
    ) -> Result<(), MicrophysicsError>;

    fn step_async(&mut self, opts: &StepOptions) -> Result<(), MicrophysicsError>;

    fn select_all(&mut self) -> Result<(), MicrophysicsError>;

    /// Selects particles with wet radius in `[lo, hi)`.
    fn select_wet_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError>;

    /// Selects particles with dry radius in `[lo, hi)`.
    fn select_dry_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError>;

    /// `k`-th moment of the wet-radius distribution of the selection, per kg of dry air.
    fn wet_moment(&self, k: i32) -> Result<f64, MicrophysicsError>;

    /// `k`-th moment of the dry-radius distribution of the selection, per kg of dry air.
    fn dry_moment(&self, k: i32) -> Result<f64, MicrophysicsError>;

    /// Dissolved mass of a compound in the selection, per kg of dry air.
    fn chem_mass(&self, species: ChemSpecies) -> Result<f64, MicrophysicsError>;
}

/// Creates an engine for a back end; injected into the integration loop.
pub type EngineFactory =
    dyn Fn(Backend, InitOptions) -> Result<Box<dyn Microphysics>, MicrophysicsError>;

/// The production factory: the super-droplet engine.
pub fn create_engine(
    backend: Backend,
    opts: InitOptions,
) -> Result<Box<dyn Microphysics>, MicrophysicsError> {
    Ok(Box::new(superdroplet::SuperdropletEngine::new(
        backend, opts,
    )?))
}

/// Protocol phase of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Created,
    /// Initialized, or the asynchronous phase of the last step has completed.
    Ready,
    /// Between `step_sync` and `step_async`.
    Synced,
}

impl Phase {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Ready => "ready",
            Phase::Synced => "synced",
        }
    }

    pub(crate) fn require(
        self,
        expected: Phase,
        operation: &'static str,
    ) -> Result<(), MicrophysicsError> {
        if self == expected {
            Ok(())
        } else {
            Err(MicrophysicsError::Protocol {
                operation,
                phase: self.name(),
            })
        }
    }
}
