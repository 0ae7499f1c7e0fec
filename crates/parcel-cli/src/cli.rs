use clap::Parser;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

/// Every run option mirrors the option of the same name in a TOML configuration file.
/// A flag given on the command line wins over the file, which wins over the built-in
/// default.
#[derive(Parser, Debug, Default)]
#[command(
    name = "parcel",
    version,
    about = "Parcel CLI - An adiabatic rising-parcel driver for particle-based cloud microphysics and aqueous chemistry.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    // --- Ambient Options ---
    /// Path to a run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S sd_conc=128
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    // --- Time Stepping and Ascent ---
    /// Timestep [s] [default: 0.1]
    #[arg(long, value_name = "FLOAT")]
    pub dt: Option<f64>,

    /// Maximum height [m] [default: 200]
    #[arg(long = "z_max", value_name = "FLOAT")]
    pub z_max: Option<f64>,

    /// Updraft velocity [m/s] [default: 1]
    #[arg(long, value_name = "FLOAT")]
    pub w: Option<f64>,

    /// Number of timesteps to keep integrating at zero vertical velocity after the ascent
    /// [default: 0]
    #[arg(long, value_name = "INT")]
    pub wait: Option<usize>,

    // --- Initial Thermodynamic State ---
    /// Initial temperature [K] [default: 300]
    #[arg(long = "T_0", value_name = "FLOAT")]
    pub t_0: Option<f64>,

    /// Initial pressure [Pa] [default: 101300]
    #[arg(long = "p_0", value_name = "FLOAT")]
    pub p_0: Option<f64>,

    /// Initial water vapour mixing ratio [kg/kg]; negative means unspecified [default: -1]
    #[arg(long = "r_0", value_name = "FLOAT", allow_negative_numbers = true)]
    pub r_0: Option<f64>,

    /// Initial relative humidity; negative means unspecified [default: -1]
    #[arg(long = "RH_0", value_name = "FLOAT", allow_negative_numbers = true)]
    pub rh_0: Option<f64>,

    /// Pressure profile: const_th_rv, const_rhod or piecewise_const_rhod, optionally with a
    /// pprof_ prefix [default: piecewise_const_rhod]
    #[arg(long, value_name = "NAME")]
    pub pprof: Option<String>,

    // --- Output ---
    /// Output archive path (.json or .toml) [default: test.json]
    #[arg(long, value_name = "PATH")]
    pub outfile: Option<PathBuf>,

    /// Output interval, in number of timesteps [default: 100]
    #[arg(long, value_name = "INT")]
    pub outfreq: Option<usize>,

    /// Output spectra as a JSON object [default: one log-spaced wet-radius bin "radii"
    /// from 1e-9 to 1e-4 m with moment 0]
    #[arg(long = "out_bin", value_name = "JSON")]
    pub out_bin: Option<String>,

    // --- Aerosol and Particles ---
    /// Number of super-droplets per hygroscopicity class [default: 64]
    #[arg(long = "sd_conc", value_name = "INT")]
    pub sd_conc: Option<usize>,

    /// Dry aerosol modes as a JSON object [default: one ammonium_sulfate mode, kappa 0.61,
    /// mean_r 0.02e-6 m, gstdev 1.4, n_tot 60e6]
    #[arg(long, value_name = "JSON")]
    pub aerosol: Option<String>,

    /// Resolve the large-radius tail of the aerosol spectrum with additional super-droplets
    /// [default: false]
    #[arg(long = "large_tail", value_name = "BOOL", num_args(0..=1), default_missing_value = "true")]
    pub large_tail: Option<bool>,

    /// Number of condensation substeps per timestep [default: 1]
    #[arg(long = "sstp_cond", value_name = "INT")]
    pub sstp_cond: Option<u32>,

    // --- Chemistry ---
    /// Initial SO2 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "SO2_g", value_name = "FLOAT")]
    pub so2_g: Option<f64>,

    /// Initial O3 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "O3_g", value_name = "FLOAT")]
    pub o3_g: Option<f64>,

    /// Initial H2O2 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "H2O2_g", value_name = "FLOAT")]
    pub h2o2_g: Option<f64>,

    /// Initial CO2 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "CO2_g", value_name = "FLOAT")]
    pub co2_g: Option<f64>,

    /// Initial HNO3 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "HNO3_g", value_name = "FLOAT")]
    pub hno3_g: Option<f64>,

    /// Initial NH3 gas-phase mixing ratio [kg/kg] [default: 0]
    #[arg(long = "NH3_g", value_name = "FLOAT")]
    pub nh3_g: Option<f64>,

    /// Switch on dissolving of trace gases into droplets [default: false]
    #[arg(long = "chem_dsl", value_name = "BOOL", num_args(0..=1), default_missing_value = "true")]
    pub chem_dsl: Option<bool>,

    /// Switch on dissociation of dissolved compounds [default: false]
    #[arg(long = "chem_dsc", value_name = "BOOL", num_args(0..=1), default_missing_value = "true")]
    pub chem_dsc: Option<bool>,

    /// Switch on aqueous oxidation reactions [default: false]
    #[arg(long = "chem_rct", value_name = "BOOL", num_args(0..=1), default_missing_value = "true")]
    pub chem_rct: Option<bool>,

    /// Density of the dry aerosol material [kg/m3] [default: 1800]
    #[arg(long = "chem_rho", value_name = "FLOAT")]
    pub chem_rho: Option<f64>,

    /// Number of chemistry substeps per timestep [default: 1]
    #[arg(long = "sstp_chem", value_name = "INT")]
    pub sstp_chem: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_option_names_are_accepted() {
        let cli = Cli::try_parse_from([
            "parcel", "--T_0", "285", "--RH_0", "0.95", "--SO2_g", "2e-10", "--chem_dsl",
            "--chem_rct", "false", "--outfreq", "10",
        ])
        .unwrap();
        assert_eq!(cli.t_0, Some(285.0));
        assert_eq!(cli.rh_0, Some(0.95));
        assert_eq!(cli.so2_g, Some(2e-10));
        assert_eq!(cli.chem_dsl, Some(true));
        assert_eq!(cli.chem_rct, Some(false));
        assert_eq!(cli.chem_dsc, None);
        assert_eq!(cli.outfreq, Some(10));
        assert_eq!(cli.dt, None);
    }

    #[test]
    fn negative_sentinels_parse() {
        let cli = Cli::try_parse_from(["parcel", "--r_0", "-1", "--RH_0", "-1"]).unwrap();
        assert_eq!(cli.r_0, Some(-1.0));
        assert_eq!(cli.rh_0, Some(-1.0));
    }

    #[test]
    fn malformed_values_fail_argument_parsing() {
        assert!(Cli::try_parse_from(["parcel", "--dt", "fast"]).is_err());
        assert!(Cli::try_parse_from(["parcel", "--sd_conc", "-3"]).is_err());
        assert!(Cli::try_parse_from(["parcel", "--large_tail", "maybe"]).is_err());
        assert!(Cli::try_parse_from(["parcel", "--unknown"]).is_err());
    }

    #[test]
    fn help_states_every_run_default() {
        use clap::CommandFactory;
        let command = Cli::command();
        for arg in command.get_arguments() {
            let id = arg.get_id().as_str();
            if matches!(
                id,
                "config" | "set_values" | "verbose" | "quiet" | "log_file" | "help" | "version"
            ) {
                continue;
            }
            let help = arg.get_long_help().or(arg.get_help()).map(|h| h.to_string());
            assert!(
                help.is_some_and(|h| h.contains("[default: ")),
                "--{id} does not state its default"
            );
        }
        let pprof = command
            .get_arguments()
            .find(|arg| arg.get_id() == "pprof")
            .and_then(|arg| arg.get_help())
            .map(|h| h.to_string());
        assert!(pprof.is_some_and(|h| h.ends_with("[default: piecewise_const_rhod]")));
    }

    #[test]
    fn verbosity_and_overrides_are_collected() {
        let cli = Cli::try_parse_from(["parcel", "-vv", "-S", "dt=0.5", "-S", "wait=3"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.set_values, vec!["dt=0.5", "wait=3"]);
        assert!(Cli::try_parse_from(["parcel", "-v", "-q"]).is_err());
    }
}
