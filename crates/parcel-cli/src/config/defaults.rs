use parcel::engine::config::defaults;
use std::path::PathBuf;

/// Values used for every option given neither on the command line nor in a file.
pub struct DefaultsConfig {
    pub dt: f64,
    pub z_max: f64,
    pub w: f64,
    pub t_0: f64,
    pub p_0: f64,
    pub r_0: f64,
    pub rh_0: f64,
    pub outfile: PathBuf,
    pub pprof: String,
    pub outfreq: usize,
    pub sd_conc: usize,
    pub aerosol: String,
    pub out_bin: String,
    pub gas: f64,
    pub chem_switch: bool,
    pub chem_rho: f64,
    pub sstp_cond: u32,
    pub sstp_chem: u32,
    pub wait: usize,
    pub large_tail: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            dt: defaults::DT,
            z_max: defaults::Z_MAX,
            w: defaults::W,
            t_0: defaults::T_0,
            p_0: defaults::P_0,
            r_0: defaults::R_0,
            rh_0: defaults::RH_0,
            outfile: PathBuf::from(defaults::OUTFILE),
            pprof: defaults::PPROF.to_string(),
            outfreq: defaults::OUTFREQ,
            sd_conc: defaults::SD_CONC,
            aerosol: defaults::AEROSOL.to_string(),
            out_bin: defaults::OUT_BIN.to_string(),
            gas: 0.0,
            chem_switch: false,
            chem_rho: defaults::CHEM_RHO,
            sstp_cond: defaults::SSTP_COND,
            sstp_chem: defaults::SSTP_CHEM,
            wait: defaults::WAIT,
            large_tail: defaults::LARGE_TAIL,
        }
    }
}
