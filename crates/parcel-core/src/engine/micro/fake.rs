use super::{Ambient, Backend, InitOptions, Microphysics, Phase, StepOptions};
use crate::core::chem::ChemSpecies;
use crate::engine::error::MicrophysicsError;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Init,
    StepSync,
    StepAsync,
    SelectAll,
    SelectWet(f64, f64),
    SelectDry(f64, f64),
    WetMoment(i32),
    DryMoment(i32),
    ChemMass(ChemSpecies),
}

/// Shared record of everything a [`FakeEngine`] was asked to do.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog {
    pub(crate) calls: Arc<Mutex<Vec<Call>>>,
    pub(crate) init_options: Arc<Mutex<Option<InitOptions>>>,
    pub(crate) step_options: Arc<Mutex<Vec<StepOptions>>>,
}

impl CallLog {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// In-memory engine that records the protocol and returns predictable diagnostics.
///
/// Every synchronous phase moves `condensed` kg/kg of vapour into the particles and
/// heats the air accordingly; moments return the lower bound of the active selection
/// plus the order, chemical masses the lower bound plus the species index.
pub(crate) struct FakeEngine {
    log: CallLog,
    phase: Phase,
    selection: Option<(f64, f64)>,
    condensed: f64,
}

impl FakeEngine {
    pub(crate) fn factory(
        log: CallLog,
        condensed: f64,
    ) -> impl Fn(Backend, InitOptions) -> Result<Box<dyn Microphysics>, MicrophysicsError> {
        move |_, opts| {
            *log.init_options.lock().unwrap() = Some(opts);
            Ok(Box::new(FakeEngine {
                log: log.clone(),
                phase: Phase::Created,
                selection: None,
                condensed,
            }) as Box<dyn Microphysics>)
        }
    }

    fn lower_bound(&self) -> Result<f64, MicrophysicsError> {
        self.phase.require(Phase::Ready, "query diagnostics")?;
        self.selection
            .map(|(lo, _)| lo)
            .ok_or(MicrophysicsError::NoSelection)
    }
}

impl Microphysics for FakeEngine {
    fn version(&self) -> String {
        "fake".to_string()
    }

    fn init(&mut self, _ambient: Ambient<'_>) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Created, "init")?;
        self.log.push(Call::Init);
        self.phase = Phase::Ready;
        Ok(())
    }

    fn step_sync(
        &mut self,
        opts: &StepOptions,
        ambient: Ambient<'_>,
    ) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, "step_sync")?;
        self.log.push(Call::StepSync);
        self.log.step_options.lock().unwrap().push(*opts);
        *ambient.r_v -= self.condensed;
        *ambient.th_d += self.condensed * 2.5e6 / 1005.0;
        self.selection = None;
        self.phase = Phase::Synced;
        Ok(())
    }

    fn step_async(&mut self, _opts: &StepOptions) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Synced, "step_async")?;
        self.log.push(Call::StepAsync);
        self.phase = Phase::Ready;
        Ok(())
    }

    fn select_all(&mut self) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, "select_all")?;
        self.log.push(Call::SelectAll);
        self.selection = Some((0.0, f64::INFINITY));
        Ok(())
    }

    fn select_wet_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, "select_wet_range")?;
        self.log.push(Call::SelectWet(lo, hi));
        self.selection = Some((lo, hi));
        Ok(())
    }

    fn select_dry_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, "select_dry_range")?;
        self.log.push(Call::SelectDry(lo, hi));
        self.selection = Some((lo, hi));
        Ok(())
    }

    fn wet_moment(&self, k: i32) -> Result<f64, MicrophysicsError> {
        let lo = self.lower_bound()?;
        self.log.push(Call::WetMoment(k));
        Ok(lo + k as f64)
    }

    fn dry_moment(&self, k: i32) -> Result<f64, MicrophysicsError> {
        let lo = self.lower_bound()?;
        self.log.push(Call::DryMoment(k));
        Ok(lo + k as f64)
    }

    fn chem_mass(&self, species: ChemSpecies) -> Result<f64, MicrophysicsError> {
        let lo = self.lower_bound()?;
        self.log.push(Call::ChemMass(species));
        Ok(lo + species.index() as f64)
    }
}
