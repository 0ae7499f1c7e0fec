pub mod defaults;
pub mod file;

use crate::cli::Cli;
use crate::error::Result;
use defaults::DefaultsConfig;
use file::{FileConfig, JsonOption};
use parcel::core::chem::ChemSpecies;
use parcel::engine::config::{PressureProfile, RunConfig, RunConfigBuilder};
use tracing::debug;

/// Resolves the run configuration: command-line flag, then config file (with `--set`
/// overrides applied), then built-in default.
pub fn resolve(args: &Cli) -> Result<RunConfig> {
    let mut file = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    file.apply_set_values(&args.set_values)?;
    let defaults = DefaultsConfig::default();

    let json = |cli: &Option<String>, file: Option<JsonOption>, key: &str, default: &str| {
        match (cli, file) {
            (Some(s), _) => Ok(s.clone()),
            (None, Some(option)) => option.into_json(key),
            (None, None) => Ok(default.to_string()),
        }
    };
    let aerosol = json(&args.aerosol, file.aerosol.take(), "aerosol", &defaults.aerosol)?;
    let out_bin = json(&args.out_bin, file.out_bin.take(), "out_bin", &defaults.out_bin)?;

    let pprof: PressureProfile = args
        .pprof
        .clone()
        .or(file.pprof.take())
        .unwrap_or(defaults.pprof)
        .parse()?;

    let gases = [
        (ChemSpecies::SO2, args.so2_g.or(file.so2_g)),
        (ChemSpecies::O3, args.o3_g.or(file.o3_g)),
        (ChemSpecies::H2O2, args.h2o2_g.or(file.h2o2_g)),
        (ChemSpecies::CO2, args.co2_g.or(file.co2_g)),
        (ChemSpecies::HNO3, args.hno3_g.or(file.hno3_g)),
        (ChemSpecies::NH3, args.nh3_g.or(file.nh3_g)),
    ];

    let mut builder = RunConfigBuilder::new()
        .dt(args.dt.or(file.dt).unwrap_or(defaults.dt))
        .z_max(args.z_max.or(file.z_max).unwrap_or(defaults.z_max))
        .w(args.w.or(file.w).unwrap_or(defaults.w))
        .t_0(args.t_0.or(file.t_0).unwrap_or(defaults.t_0))
        .p_0(args.p_0.or(file.p_0).unwrap_or(defaults.p_0))
        .r_0(args.r_0.or(file.r_0).unwrap_or(defaults.r_0))
        .rh_0(args.rh_0.or(file.rh_0).unwrap_or(defaults.rh_0))
        .outfile(
            args.outfile
                .clone()
                .or(file.outfile.take())
                .unwrap_or(defaults.outfile),
        )
        .pprof(pprof)
        .outfreq(args.outfreq.or(file.outfreq).unwrap_or(defaults.outfreq))
        .sd_conc(args.sd_conc.or(file.sd_conc).unwrap_or(defaults.sd_conc))
        .aerosol_json(aerosol)
        .out_bin_json(out_bin)
        .chem_dsl(args.chem_dsl.or(file.chem_dsl).unwrap_or(defaults.chem_switch))
        .chem_dsc(args.chem_dsc.or(file.chem_dsc).unwrap_or(defaults.chem_switch))
        .chem_rct(args.chem_rct.or(file.chem_rct).unwrap_or(defaults.chem_switch))
        .chem_rho(args.chem_rho.or(file.chem_rho).unwrap_or(defaults.chem_rho))
        .sstp_cond(args.sstp_cond.or(file.sstp_cond).unwrap_or(defaults.sstp_cond))
        .sstp_chem(args.sstp_chem.or(file.sstp_chem).unwrap_or(defaults.sstp_chem))
        .wait(args.wait.or(file.wait).unwrap_or(defaults.wait))
        .large_tail(
            args.large_tail
                .or(file.large_tail)
                .unwrap_or(defaults.large_tail),
        );
    for (species, value) in gases {
        builder = builder.gas(species, value.unwrap_or(defaults.gas));
    }

    let config = builder.build()?;
    debug!("Resolved run configuration: {:?}", config);
    Ok(config)
}
