use crate::error::{CliError, Result};
use parcel::core::chem::ChemSpecies;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// A JSON-valued option, given either verbatim or as a TOML table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum JsonOption {
    Json(String),
    Table(toml::Table),
}

impl JsonOption {
    pub fn into_json(self, key: &str) -> Result<String> {
        match self {
            JsonOption::Json(s) => Ok(s),
            JsonOption::Table(table) => serde_json::to_string(&table).map_err(|e| {
                CliError::Config(format!("Cannot convert `{}` to JSON: {}", key, e))
            }),
        }
    }
}

/// A run configuration file; every key is optional and named as on the command line.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub dt: Option<f64>,
    pub z_max: Option<f64>,
    pub w: Option<f64>,
    #[serde(rename = "T_0")]
    pub t_0: Option<f64>,
    pub p_0: Option<f64>,
    pub r_0: Option<f64>,
    #[serde(rename = "RH_0")]
    pub rh_0: Option<f64>,
    pub outfile: Option<PathBuf>,
    pub pprof: Option<String>,
    pub outfreq: Option<usize>,
    pub sd_conc: Option<usize>,
    pub aerosol: Option<JsonOption>,
    pub out_bin: Option<JsonOption>,
    #[serde(rename = "SO2_g")]
    pub so2_g: Option<f64>,
    #[serde(rename = "O3_g")]
    pub o3_g: Option<f64>,
    #[serde(rename = "H2O2_g")]
    pub h2o2_g: Option<f64>,
    #[serde(rename = "CO2_g")]
    pub co2_g: Option<f64>,
    #[serde(rename = "HNO3_g")]
    pub hno3_g: Option<f64>,
    #[serde(rename = "NH3_g")]
    pub nh3_g: Option<f64>,
    pub chem_dsl: Option<bool>,
    pub chem_dsc: Option<bool>,
    pub chem_rct: Option<bool>,
    pub chem_rho: Option<f64>,
    pub sstp_cond: Option<u32>,
    pub sstp_chem: Option<u32>,
    pub wait: Option<usize>,
    pub large_tail: Option<bool>,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<Option<T>> {
    value.parse().map(Some).map_err(|_| {
        CliError::Config(format!(
            "Invalid value for {}: '{}' (expected {})",
            key,
            value,
            std::any::type_name::<T>()
        ))
    })
}

impl FileConfig {
    /// Initial mixing ratio slot of a gas-phase compound.
    fn gas_mut(&mut self, species: ChemSpecies) -> Option<&mut Option<f64>> {
        match species {
            ChemSpecies::SO2 => Some(&mut self.so2_g),
            ChemSpecies::O3 => Some(&mut self.o3_g),
            ChemSpecies::H2O2 => Some(&mut self.h2o2_g),
            ChemSpecies::CO2 => Some(&mut self.co2_g),
            ChemSpecies::HNO3 => Some(&mut self.hno3_g),
            ChemSpecies::NH3 => Some(&mut self.nh3_g),
            _ => None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Applies `KEY=VALUE` overrides for scalar options.
    pub fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            debug!("Overriding {} = {}", key, value);
            match key {
                "dt" => self.dt = parse_value(key, value)?,
                "z_max" => self.z_max = parse_value(key, value)?,
                "w" => self.w = parse_value(key, value)?,
                "T_0" => self.t_0 = parse_value(key, value)?,
                "p_0" => self.p_0 = parse_value(key, value)?,
                "r_0" => self.r_0 = parse_value(key, value)?,
                "RH_0" => self.rh_0 = parse_value(key, value)?,
                "outfile" => self.outfile = Some(PathBuf::from(value)),
                "pprof" => self.pprof = Some(value.to_string()),
                "outfreq" => self.outfreq = parse_value(key, value)?,
                "sd_conc" => self.sd_conc = parse_value(key, value)?,
                "chem_dsl" => self.chem_dsl = parse_value(key, value)?,
                "chem_dsc" => self.chem_dsc = parse_value(key, value)?,
                "chem_rct" => self.chem_rct = parse_value(key, value)?,
                "chem_rho" => self.chem_rho = parse_value(key, value)?,
                "sstp_cond" => self.sstp_cond = parse_value(key, value)?,
                "sstp_chem" => self.sstp_chem = parse_value(key, value)?,
                "wait" => self.wait = parse_value(key, value)?,
                "large_tail" => self.large_tail = parse_value(key, value)?,
                _ => {
                    let Some(slot) = ChemSpecies::from_gas_id(key).and_then(|s| self.gas_mut(s))
                    else {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    };
                    *slot = parse_value(key, value)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn tables_and_json_strings_are_both_accepted() {
        let config: FileConfig = toml::from_str(
            r#"
            T_0 = 285
            RH_0 = 0.99
            chem_dsl = true
            aerosol = '{"x": {"kappa": 0.61, "mean_r": [2e-8], "gstdev": [1.4], "n_tot": [6e7]}}'

            [out_bin.radii]
            left = 1e-9
            rght = 1e-4
            nbin = 26
            lnli = "log"
            drwt = "wet"
            moms = [0, 3, "S_VI"]
            "#,
        )
        .unwrap();
        assert_eq!(config.t_0, Some(285.0));
        assert_eq!(config.chem_dsl, Some(true));
        assert!(matches!(config.aerosol, Some(JsonOption::Json(_))));

        let json = config.out_bin.unwrap().into_json("out_bin").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["radii"]["nbin"], 26);
        assert_eq!(value["radii"]["moms"][2], "S_VI");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parcel.toml");
        fs::write(&path, "dt = 0.5\nupdraft = 2.0\n").unwrap();
        let result = FileConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn set_values_override_scalar_keys() {
        let mut config = FileConfig {
            dt: Some(1.0),
            ..Default::default()
        };
        config
            .apply_set_values(&[
                "dt=0.25".to_string(),
                "RH_0=0.9".to_string(),
                "chem_rct=true".to_string(),
                "outfile=run.toml".to_string(),
            ])
            .unwrap();
        assert_eq!(config.dt, Some(0.25));
        assert_eq!(config.rh_0, Some(0.9));
        assert_eq!(config.chem_rct, Some(true));
        assert_eq!(config.outfile, Some(PathBuf::from("run.toml")));
    }

    #[test]
    fn set_values_reach_every_gas_phase_compound() {
        let mut config = FileConfig::default();
        config
            .apply_set_values(&["SO2_g=1e-10".to_string(), "NH3_g=2e-10".to_string()])
            .unwrap();
        assert_eq!(config.so2_g, Some(1e-10));
        assert_eq!(config.nh3_g, Some(2e-10));
        assert_eq!(config.o3_g, None);

        for species in ChemSpecies::GASES {
            let id = species.gas_id().unwrap();
            config.apply_set_values(&[format!("{id}=3e-9")]).unwrap();
            assert_eq!(*config.gas_mut(species).unwrap(), Some(3e-9), "{id}");
        }
    }

    #[test]
    fn malformed_set_values_are_configuration_errors() {
        let mut config = FileConfig::default();
        for bad in ["dt", "sd_conc=many", "aerosol={}", "updraft=1", "SO2_a=1e-9", "NH3_g=lots"] {
            let result = config.apply_set_values(&[bad.to_string()]);
            assert!(matches!(result, Err(CliError::Config(_))), "{bad}");
        }
    }
}
