use super::validation;
use crate::core::aerosol::AerosolMode;
use crate::core::chem::ChemSpecies;
use crate::core::io::traits::AttrValue;
use crate::core::spectrum::SpectrumBinSpec;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Built-in defaults of every run option.
pub mod defaults {
    pub const DT: f64 = 0.1;
    pub const Z_MAX: f64 = 200.0;
    pub const W: f64 = 1.0;
    pub const T_0: f64 = 300.0;
    pub const P_0: f64 = 101_300.0;
    /// Negative means "not specified".
    pub const R_0: f64 = -1.0;
    /// Negative means "not specified".
    pub const RH_0: f64 = -1.0;
    /// Vapour mixing ratio used when neither `r_0` nor `RH_0` is given.
    pub const FALLBACK_R_0: f64 = 0.022;
    pub const OUTFILE: &str = "test.json";
    pub const PPROF: &str = "piecewise_const_rhod";
    pub const OUTFREQ: usize = 100;
    pub const SD_CONC: usize = 64;
    pub const AEROSOL: &str = r#"{"ammonium_sulfate": {"kappa": 0.61, "mean_r": [0.02e-6], "gstdev": [1.4], "n_tot": [60.0e6]}}"#;
    pub const OUT_BIN: &str = r#"{"radii": {"rght": 0.0001, "moms": [0], "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-09}}"#;
    pub const CHEM_RHO: f64 = 1.8e3;
    pub const SSTP_COND: u32 = 1;
    pub const SSTP_CHEM: u32 = 1;
    pub const WAIT: usize = 0;
    pub const LARGE_TAIL: bool = false;
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid JSON in >>{field}<<: {message}")]
    InvalidJson { field: &'static str, message: String },

    #[error(">>{key}<< is missing in {section}[{name}]")]
    MissingKey {
        section: &'static str,
        name: String,
        key: &'static str,
    },

    #[error("invalid key >>{key}<< in {section}[{name}]")]
    UnknownKey {
        section: &'static str,
        name: String,
        key: String,
    },

    #[error(">>{key}<< in {section}[{name}] must be {expected}")]
    InvalidType {
        section: &'static str,
        name: String,
        key: String,
        expected: &'static str,
    },

    #[error("{quantity} should be > 0 for aerosol[{name}]")]
    NonPositive {
        name: String,
        quantity: &'static str,
    },

    #[error("mean_r, n_tot and gstdev lists should have same sizes for aerosol[{name}]")]
    LengthMismatch { name: String },

    #[error(
        "standard deviation should be != 1 to avoid monodisperse distribution for aerosol[{name}]"
    )]
    Monodisperse { name: String },

    #[error(">>left<< is greater than or equal to >>rght<< in out_bin[{name}]")]
    EmptyRange { name: String },

    #[error(">>{key}<< key in out_bin[{name}] must be either {allowed} (got '{value}')")]
    InvalidChoice {
        name: String,
        key: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error(
        ">>moms<< key in out_bin[{name}] must be a list of integer numbers or valid chemical compounds ({valid}), got {value}"
    )]
    InvalidMoment {
        name: String,
        value: String,
        valid: String,
    },

    #[error("out_bin[{name}]: >>{name}<< is already used by the output archive")]
    ReservedName { name: String },

    #[error(
        "out_bin[{name}] requests >>{species}<< but aqueous chemistry is off (enable chem_dsl, chem_dsc or chem_rct)"
    )]
    ChemistryDisabled {
        name: String,
        species: &'static str,
    },

    #[error("temperature should be at least 273.15 K (got {t_0}) - microphysics works only for warm clouds")]
    TooCold { t_0: f64 },

    #[error("both r_0 and RH_0 specified, please use only one")]
    ConflictingWaterContent,

    #[error("vertical velocity should not be negative (got {w})")]
    NegativeVelocity { w: f64 },

    #[error("invalid value for >>{option}<<: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error(
        "pprof should be const_th_rv, const_rhod, or piecewise_const_rhod (got '{0}')"
    )]
    UnknownPressureProfile(String),

    #[error("unsupported archive format for '{0}' (expected a .json or .toml file)")]
    UnknownArchiveFormat(String),
}

/// Hydrostatic pressure-profile policy used to evolve pressure and dry-air density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressureProfile {
    /// Hydrostatic integral for constant potential temperature and vapour mixing ratio.
    ConstThRv,
    /// Hydrostatic pressure for a single fixed reference density.
    ConstRhod,
    /// Hydrostatic pressure with the density held constant within each time step.
    #[default]
    PiecewiseConstRhod,
}

impl PressureProfile {
    pub fn name(&self) -> &'static str {
        match self {
            PressureProfile::ConstThRv => "const_th_rv",
            PressureProfile::ConstRhod => "const_rhod",
            PressureProfile::PiecewiseConstRhod => "piecewise_const_rhod",
        }
    }
}

impl FromStr for PressureProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("pprof_").unwrap_or(s) {
            "const_th_rv" => Ok(PressureProfile::ConstThRv),
            "const_rhod" => Ok(PressureProfile::ConstRhod),
            "piecewise_const_rhod" => Ok(PressureProfile::PiecewiseConstRhod),
            _ => Err(ConfigError::UnknownPressureProfile(s.to_string())),
        }
    }
}

impl fmt::Display for PressureProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aqueous-chemistry processes requested for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChemistryProcesses {
    pub dissolving: bool,
    pub dissociation: bool,
    pub reactions: bool,
}

impl ChemistryProcesses {
    /// Chemistry is switched on in the engine as soon as any process is requested.
    pub fn any(&self) -> bool {
        self.dissolving || self.dissociation || self.reactions
    }
}

/// A fully validated run configuration.
///
/// Only obtainable through [`RunConfigBuilder::build`], which runs the configuration
/// validator; holding a `RunConfig` therefore means every structural and range check
/// has passed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub dt: f64,
    pub z_max: f64,
    pub w: f64,
    pub t_0: f64,
    pub p_0: f64,
    pub r_0: f64,
    pub rh_0: f64,
    pub outfile: PathBuf,
    pub pprof: PressureProfile,
    pub outfreq: usize,
    pub sd_conc: usize,
    pub aerosol: Vec<AerosolMode>,
    pub spectra: Vec<SpectrumBinSpec>,
    pub aerosol_json: String,
    pub out_bin_json: String,
    pub gas: BTreeMap<ChemSpecies, f64>,
    pub chemistry: ChemistryProcesses,
    pub chem_rho: f64,
    pub sstp_cond: u32,
    pub sstp_chem: u32,
    pub wait: usize,
    pub large_tail: bool,
}

impl RunConfig {
    pub fn chemistry_enabled(&self) -> bool {
        self.chemistry.any()
    }

    /// Number of ascent ticks, `floor(z_max / (w dt))`.
    pub fn n_ascent(&self) -> usize {
        if self.z_max <= 0.0 {
            return 0;
        }
        (self.z_max / (self.w * self.dt)).floor() as usize
    }

    /// Initial gas-phase mixing ratio of a compound (zero when not configured).
    pub fn initial_gas(&self, species: ChemSpecies) -> f64 {
        self.gas.get(&species).copied().unwrap_or(0.0)
    }

    /// Archive attributes describing the configuration as it was given.
    pub fn attributes(&self) -> Vec<(String, AttrValue)> {
        let mut attrs: Vec<(String, AttrValue)> = vec![
            ("dt".into(), self.dt.into()),
            ("z_max".into(), self.z_max.into()),
            ("w".into(), self.w.into()),
            ("T_0".into(), self.t_0.into()),
            ("p_0".into(), self.p_0.into()),
            ("r_0".into(), self.r_0.into()),
            ("RH_0".into(), self.rh_0.into()),
            ("outfile".into(), self.outfile.display().to_string().into()),
            ("pprof".into(), self.pprof.name().into()),
            ("outfreq".into(), self.outfreq.into()),
            ("sd_conc".into(), self.sd_conc.into()),
            ("aerosol".into(), self.aerosol_json.clone().into()),
            ("out_bin".into(), self.out_bin_json.clone().into()),
        ];
        for species in ChemSpecies::GASES {
            if let Some(id) = species.gas_id() {
                attrs.push((id.into(), self.initial_gas(species).into()));
            }
        }
        attrs.extend([
            ("chem_dsl".into(), self.chemistry.dissolving.into()),
            ("chem_dsc".into(), self.chemistry.dissociation.into()),
            ("chem_rct".into(), self.chemistry.reactions.into()),
            ("chem_rho".into(), self.chem_rho.into()),
            ("sstp_cond".into(), (self.sstp_cond as i64).into()),
            ("sstp_chem".into(), (self.sstp_chem as i64).into()),
            ("wait".into(), self.wait.into()),
            ("large_tail".into(), self.large_tail.into()),
        ]);
        attrs
    }
}

#[derive(Default)]
pub struct RunConfigBuilder {
    dt: Option<f64>,
    z_max: Option<f64>,
    w: Option<f64>,
    t_0: Option<f64>,
    p_0: Option<f64>,
    r_0: Option<f64>,
    rh_0: Option<f64>,
    outfile: Option<PathBuf>,
    pprof: Option<PressureProfile>,
    outfreq: Option<usize>,
    sd_conc: Option<usize>,
    aerosol: Option<String>,
    out_bin: Option<String>,
    gas: BTreeMap<ChemSpecies, f64>,
    chemistry: ChemistryProcesses,
    chem_rho: Option<f64>,
    sstp_cond: Option<u32>,
    sstp_chem: Option<u32>,
    wait: Option<usize>,
    large_tail: Option<bool>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-populated with every built-in default.
    pub fn with_defaults() -> Self {
        Self::new()
            .dt(defaults::DT)
            .z_max(defaults::Z_MAX)
            .w(defaults::W)
            .t_0(defaults::T_0)
            .p_0(defaults::P_0)
            .r_0(defaults::R_0)
            .rh_0(defaults::RH_0)
            .outfile(PathBuf::from(defaults::OUTFILE))
            .pprof(PressureProfile::default())
            .outfreq(defaults::OUTFREQ)
            .sd_conc(defaults::SD_CONC)
            .aerosol_json(defaults::AEROSOL)
            .out_bin_json(defaults::OUT_BIN)
            .chem_rho(defaults::CHEM_RHO)
            .sstp_cond(defaults::SSTP_COND)
            .sstp_chem(defaults::SSTP_CHEM)
            .wait(defaults::WAIT)
            .large_tail(defaults::LARGE_TAIL)
    }

    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }
    pub fn z_max(mut self, z_max: f64) -> Self {
        self.z_max = Some(z_max);
        self
    }
    pub fn w(mut self, w: f64) -> Self {
        self.w = Some(w);
        self
    }
    pub fn t_0(mut self, t_0: f64) -> Self {
        self.t_0 = Some(t_0);
        self
    }
    pub fn p_0(mut self, p_0: f64) -> Self {
        self.p_0 = Some(p_0);
        self
    }
    pub fn r_0(mut self, r_0: f64) -> Self {
        self.r_0 = Some(r_0);
        self
    }
    pub fn rh_0(mut self, rh_0: f64) -> Self {
        self.rh_0 = Some(rh_0);
        self
    }
    pub fn outfile(mut self, path: PathBuf) -> Self {
        self.outfile = Some(path);
        self
    }
    pub fn pprof(mut self, profile: PressureProfile) -> Self {
        self.pprof = Some(profile);
        self
    }
    pub fn outfreq(mut self, outfreq: usize) -> Self {
        self.outfreq = Some(outfreq);
        self
    }
    pub fn sd_conc(mut self, sd_conc: usize) -> Self {
        self.sd_conc = Some(sd_conc);
        self
    }
    pub fn aerosol_json(mut self, json: impl Into<String>) -> Self {
        self.aerosol = Some(json.into());
        self
    }
    pub fn out_bin_json(mut self, json: impl Into<String>) -> Self {
        self.out_bin = Some(json.into());
        self
    }
    pub fn gas(mut self, species: ChemSpecies, mixing_ratio: f64) -> Self {
        self.gas.insert(species, mixing_ratio);
        self
    }
    pub fn chem_dsl(mut self, on: bool) -> Self {
        self.chemistry.dissolving = on;
        self
    }
    pub fn chem_dsc(mut self, on: bool) -> Self {
        self.chemistry.dissociation = on;
        self
    }
    pub fn chem_rct(mut self, on: bool) -> Self {
        self.chemistry.reactions = on;
        self
    }
    pub fn chem_rho(mut self, rho: f64) -> Self {
        self.chem_rho = Some(rho);
        self
    }
    pub fn sstp_cond(mut self, n: u32) -> Self {
        self.sstp_cond = Some(n);
        self
    }
    pub fn sstp_chem(mut self, n: u32) -> Self {
        self.sstp_chem = Some(n);
        self
    }
    pub fn wait(mut self, n: usize) -> Self {
        self.wait = Some(n);
        self
    }
    pub fn large_tail(mut self, on: bool) -> Self {
        self.large_tail = Some(on);
        self
    }

    /// Assembles the configuration and runs every validation check.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let aerosol_json = self
            .aerosol
            .ok_or(ConfigError::MissingParameter("aerosol"))?;
        let out_bin_json = self
            .out_bin
            .ok_or(ConfigError::MissingParameter("out_bin"))?;

        let mut gas = self.gas;
        for species in ChemSpecies::GASES {
            gas.entry(species).or_insert(0.0);
        }

        let mut config = RunConfig {
            dt: self.dt.ok_or(ConfigError::MissingParameter("dt"))?,
            z_max: self.z_max.ok_or(ConfigError::MissingParameter("z_max"))?,
            w: self.w.ok_or(ConfigError::MissingParameter("w"))?,
            t_0: self.t_0.ok_or(ConfigError::MissingParameter("T_0"))?,
            p_0: self.p_0.ok_or(ConfigError::MissingParameter("p_0"))?,
            r_0: self.r_0.ok_or(ConfigError::MissingParameter("r_0"))?,
            rh_0: self.rh_0.ok_or(ConfigError::MissingParameter("RH_0"))?,
            outfile: self
                .outfile
                .ok_or(ConfigError::MissingParameter("outfile"))?,
            pprof: self.pprof.ok_or(ConfigError::MissingParameter("pprof"))?,
            outfreq: self
                .outfreq
                .ok_or(ConfigError::MissingParameter("outfreq"))?,
            sd_conc: self
                .sd_conc
                .ok_or(ConfigError::MissingParameter("sd_conc"))?,
            aerosol: Vec::new(),
            spectra: Vec::new(),
            aerosol_json,
            out_bin_json,
            gas,
            chemistry: self.chemistry,
            chem_rho: self
                .chem_rho
                .ok_or(ConfigError::MissingParameter("chem_rho"))?,
            sstp_cond: self
                .sstp_cond
                .ok_or(ConfigError::MissingParameter("sstp_cond"))?,
            sstp_chem: self
                .sstp_chem
                .ok_or(ConfigError::MissingParameter("sstp_chem"))?,
            wait: self.wait.ok_or(ConfigError::MissingParameter("wait"))?,
            large_tail: self
                .large_tail
                .ok_or(ConfigError::MissingParameter("large_tail"))?,
        };

        config.aerosol = validation::parse_aerosol(&config.aerosol_json)?;
        config.spectra = validation::parse_spectra(&config.out_bin_json)?;
        validation::check_run_options(&config)?;
        Ok(config)
    }
}
