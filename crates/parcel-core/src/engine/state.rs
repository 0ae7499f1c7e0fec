use super::config::{RunConfig, defaults};
use super::micro::Ambient;
use crate::core::chem::ChemSpecies;
use crate::core::io::traits::AttrValue;
use crate::core::thermo;
use std::collections::BTreeMap;
use tracing::warn;

/// Version identifier of this driver, stored with every archive.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conditions at the start of the ascent, referenced by the pressure-profile policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialConditions {
    pub p_0: f64,
    /// Standard potential temperature `T_0 (p_1000 / p_0)^(R_d / c_pd)`.
    pub th_0: f64,
    /// Initial vapour mixing ratio, after resolving `r_0` / `RH_0`.
    pub r_0: f64,
}

impl InitialConditions {
    pub fn from_config(config: &RunConfig) -> Self {
        let r_0 = if config.r_0 < 0.0 && config.rh_0 < 0.0 {
            warn!(
                "Both r_0 and RH_0 negative, using default r_0 = {}",
                defaults::FALLBACK_R_0
            );
            defaults::FALLBACK_R_0
        } else if config.r_0 < 0.0 {
            thermo::r_v_from_rh(config.rh_0, config.t_0, config.p_0)
        } else {
            config.r_0
        };
        Self {
            p_0: config.p_0,
            th_0: config.t_0 / thermo::exner(config.p_0),
            r_0,
        }
    }
}

/// The thermodynamic and chemical state of the parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub t: f64,
    pub z: f64,
    pub p: f64,
    pub rhod: f64,
    pub th_d: f64,
    pub r_v: f64,
    /// Derived by [`super::stats::update`].
    pub temperature: f64,
    /// Derived by [`super::stats::update`].
    pub rh: f64,
    /// Gas-phase mixing ratios; empty when chemistry is off.
    pub gas: BTreeMap<ChemSpecies, f64>,
    /// Dissolved masses per kg of dry air; empty when chemistry is off.
    pub aqueous: BTreeMap<ChemSpecies, f64>,
}

impl State {
    pub fn initial(config: &RunConfig, init: &InitialConditions) -> Self {
        let (gas, aqueous) = if config.chemistry_enabled() {
            (
                ChemSpecies::GASES
                    .iter()
                    .map(|&s| (s, config.initial_gas(s)))
                    .collect(),
                ChemSpecies::GASES.iter().map(|&s| (s, 0.0)).collect(),
            )
        } else {
            (BTreeMap::new(), BTreeMap::new())
        };
        Self {
            t: 0.0,
            z: 0.0,
            p: init.p_0,
            rhod: thermo::rhod(init.p_0, init.th_0, init.r_0),
            th_d: thermo::th_std2dry(init.th_0, init.r_0),
            r_v: init.r_0,
            temperature: f64::NAN,
            rh: f64::NAN,
            gas,
            aqueous,
        }
    }

    /// Lends the fields the microphysics may modify during its synchronous phase.
    pub fn ambient(&mut self) -> Ambient<'_> {
        Ambient {
            th_d: &mut self.th_d,
            r_v: &mut self.r_v,
            rhod: &mut self.rhod,
            gas: &mut self.gas,
        }
    }

    /// Scalar time series in archive order, followed by the chemical tracers.
    pub fn series(&self) -> Vec<(String, f64)> {
        let mut series: Vec<(String, f64)> = [
            ("z", self.z),
            ("t", self.t),
            ("r_v", self.r_v),
            ("th_d", self.th_d),
            ("rhod", self.rhod),
            ("p", self.p),
            ("T", self.temperature),
            ("RH", self.rh),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
        for (species, &value) in &self.gas {
            if let Some(id) = species.gas_id() {
                series.push((id.to_string(), value));
            }
        }
        for (species, &value) in &self.aqueous {
            series.push((species.aqueous_id().to_string(), value));
        }
        series
    }
}

/// Run-level information persisted as archive attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub rh_max: f64,
    pub engine_version: String,
    pub driver_version: String,
}

impl Info {
    pub fn new(engine_version: impl Into<String>) -> Self {
        Self {
            rh_max: 0.0,
            engine_version: engine_version.into(),
            driver_version: DRIVER_VERSION.to_string(),
        }
    }

    pub fn record_rh(&mut self, rh: f64) {
        self.rh_max = self.rh_max.max(rh);
    }

    pub fn attributes(&self) -> Vec<(String, AttrValue)> {
        vec![
            ("RH_max".to_string(), self.rh_max.into()),
            (
                "engine_version".to_string(),
                self.engine_version.clone().into(),
            ),
            (
                "driver_version".to_string(),
                self.driver_version.clone().into(),
            ),
        ]
    }
}
