use super::config::{ConfigError, RunConfig};
use super::diagnostics::reserved_names;
use crate::core::aerosol::AerosolMode;
use crate::core::chem::ChemSpecies;
use crate::core::spectrum::{Moment, RadiusKind, Spacing, SpectrumBinSpec};
use crate::core::thermo::T_FREEZE;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const AEROSOL_KEYS: [&str; 4] = ["kappa", "mean_r", "n_tot", "gstdev"];
const SPECTRUM_KEYS: [&str; 6] = ["left", "rght", "nbin", "drwt", "lnli", "moms"];

fn parse_object(field: &'static str, json: &str) -> Result<Map<String, Value>, ConfigError> {
    let value: Value = serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson {
        field,
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::InvalidJson {
            field,
            message: "expected an object mapping names to definitions".to_string(),
        }),
    }
}

fn entry_object<'a>(
    section: &'static str,
    name: &str,
    value: &'a Value,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value.as_object().ok_or_else(|| ConfigError::InvalidType {
        section,
        name: name.to_string(),
        key: name.to_string(),
        expected: "an object",
    })
}

fn check_keys(
    section: &'static str,
    name: &str,
    entry: &Map<String, Value>,
    required: &[&'static str],
) -> Result<(), ConfigError> {
    if let Some(key) = required.iter().copied().find(|k| !entry.contains_key(*k)) {
        return Err(ConfigError::MissingKey {
            section,
            name: name.to_string(),
            key,
        });
    }
    if let Some(key) = entry.keys().find(|k| !required.contains(&k.as_str())) {
        return Err(ConfigError::UnknownKey {
            section,
            name: name.to_string(),
            key: key.clone(),
        });
    }
    Ok(())
}

fn number(
    section: &'static str,
    name: &str,
    key: &str,
    value: &Value,
    expected: &'static str,
) -> Result<f64, ConfigError> {
    value.as_f64().ok_or_else(|| ConfigError::InvalidType {
        section,
        name: name.to_string(),
        key: key.to_string(),
        expected,
    })
}

fn number_list(
    name: &str,
    key: &'static str,
    entry: &Map<String, Value>,
) -> Result<Vec<f64>, ConfigError> {
    let list = entry[key]
        .as_array()
        .ok_or_else(|| ConfigError::InvalidType {
            section: "aerosol",
            name: name.to_string(),
            key: key.to_string(),
            expected: "a list",
        })?;
    list.iter()
        .map(|v| number("aerosol", name, key, v, "a list of numbers"))
        .collect()
}

/// Parses and validates the aerosol description (a JSON object of named modes).
pub(crate) fn parse_aerosol(json: &str) -> Result<Vec<AerosolMode>, ConfigError> {
    let entries = parse_object("aerosol", json)?;
    let mut modes = Vec::with_capacity(entries.len());

    for (name, value) in &entries {
        let entry = entry_object("aerosol", name, value)?;
        check_keys("aerosol", name, entry, &AEROSOL_KEYS)?;

        let kappa = number("aerosol", name, "kappa", &entry["kappa"], "a number")?;
        if kappa <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: name.clone(),
                quantity: "kappa hygroscopicity parameter",
            });
        }

        let mean_r = number_list(name, "mean_r", entry)?;
        let gstdev = number_list(name, "gstdev", entry)?;
        let n_tot = number_list(name, "n_tot", entry)?;
        if mean_r.len() != n_tot.len() || n_tot.len() != gstdev.len() {
            return Err(ConfigError::LengthMismatch { name: name.clone() });
        }

        if mean_r.iter().any(|&r| r <= 0.0) {
            return Err(ConfigError::NonPositive {
                name: name.clone(),
                quantity: "mean radius",
            });
        }
        if n_tot.iter().any(|&n| n <= 0.0) {
            return Err(ConfigError::NonPositive {
                name: name.clone(),
                quantity: "concentration",
            });
        }
        for &s in &gstdev {
            if s <= 0.0 {
                return Err(ConfigError::NonPositive {
                    name: name.clone(),
                    quantity: "standard deviation",
                });
            }
            if s == 1.0 {
                return Err(ConfigError::Monodisperse { name: name.clone() });
            }
        }

        modes.push(AerosolMode {
            name: name.clone(),
            kappa,
            mean_r,
            gstdev,
            n_tot,
        });
    }
    Ok(modes)
}

fn parse_moment(name: &str, value: &Value) -> Result<Moment, ConfigError> {
    let invalid = || ConfigError::InvalidMoment {
        name: name.to_string(),
        value: value.to_string(),
        valid: ChemSpecies::aqueous_ids().join(", "),
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|k| i32::try_from(k).ok())
            .map(Moment::Order)
            .ok_or_else(invalid),
        Value::String(id) => ChemSpecies::from_aqueous_id(id)
            .map(Moment::Chem)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Parses and validates the output spectra description (a JSON object of named spectra).
///
/// Spectra are returned in ascending name order.
pub(crate) fn parse_spectra(json: &str) -> Result<Vec<SpectrumBinSpec>, ConfigError> {
    let entries = parse_object("out_bin", json)?;
    let mut spectra = Vec::with_capacity(entries.len());

    for (name, value) in &entries {
        let entry = entry_object("out_bin", name, value)?;
        check_keys("out_bin", name, entry, &SPECTRUM_KEYS)?;

        let left = number("out_bin", name, "left", &entry["left"], "int or float")?;
        let rght = number("out_bin", name, "rght", &entry["rght"], "int or float")?;
        if left >= rght {
            return Err(ConfigError::EmptyRange { name: name.clone() });
        }

        let text = |key: &'static str| entry[key].as_str().unwrap_or_default().to_string();
        let kind: RadiusKind = text("drwt")
            .parse()
            .map_err(|value| ConfigError::InvalidChoice {
                name: name.clone(),
                key: "drwt",
                value,
                allowed: ">>dry<< or >>wet<<",
            })?;
        let spacing: Spacing = text("lnli")
            .parse()
            .map_err(|value| ConfigError::InvalidChoice {
                name: name.clone(),
                key: "lnli",
                value,
                allowed: ">>lin<< or >>log<<",
            })?;
        if spacing == Spacing::Logarithmic && left <= 0.0 {
            return Err(ConfigError::InvalidType {
                section: "out_bin",
                name: name.clone(),
                key: "left".to_string(),
                expected: "positive for logarithmic spacing",
            });
        }

        let nbin = entry["nbin"]
            .as_u64()
            .filter(|&n| n >= 1)
            .ok_or_else(|| ConfigError::InvalidType {
                section: "out_bin",
                name: name.clone(),
                key: "nbin".to_string(),
                expected: "a positive integer number",
            })? as usize;

        let moments = entry["moms"]
            .as_array()
            .ok_or_else(|| ConfigError::InvalidType {
                section: "out_bin",
                name: name.clone(),
                key: "moms".to_string(),
                expected: "a list",
            })?
            .iter()
            .map(|m| parse_moment(name, m))
            .collect::<Result<Vec<_>, _>>()?;

        spectra.push(SpectrumBinSpec {
            name: name.clone(),
            left,
            rght,
            nbin,
            spacing,
            kind,
            moments,
        });
    }
    check_output_names(&spectra)?;
    Ok(spectra)
}

/// Rejects spectra named after a dimension or variable the archive already declares.
fn check_output_names(spectra: &[SpectrumBinSpec]) -> Result<(), ConfigError> {
    let reserved: BTreeSet<&str> = reserved_names().collect();
    match spectra.iter().find(|s| reserved.contains(s.name.as_str())) {
        Some(spec) => Err(ConfigError::ReservedName {
            name: spec.name.clone(),
        }),
        None => Ok(()),
    }
}

fn invalid(option: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        option,
        reason: reason.into(),
    }
}

/// Run-level range checks on an assembled configuration.
pub(crate) fn check_run_options(config: &RunConfig) -> Result<(), ConfigError> {
    if !config.t_0.is_finite() {
        return Err(invalid("T_0", format!("must be finite (got {})", config.t_0)));
    }
    if config.t_0 < T_FREEZE {
        return Err(ConfigError::TooCold { t_0: config.t_0 });
    }
    if config.r_0 >= 0.0 && config.rh_0 >= 0.0 {
        return Err(ConfigError::ConflictingWaterContent);
    }
    if config.r_0.is_nan() || config.rh_0.is_nan() {
        return Err(invalid("r_0", "r_0 and RH_0 must be numbers"));
    }
    if !config.w.is_finite() {
        return Err(invalid("w", format!("must be finite (got {})", config.w)));
    }
    if config.w < 0.0 {
        return Err(ConfigError::NegativeVelocity { w: config.w });
    }

    if config.dt <= 0.0 || !config.dt.is_finite() {
        return Err(invalid("dt", format!("must be > 0 (got {})", config.dt)));
    }
    if config.z_max < 0.0 || !config.z_max.is_finite() {
        return Err(invalid("z_max", format!("must be >= 0 (got {})", config.z_max)));
    }
    if config.z_max > 0.0 && config.w == 0.0 {
        return Err(invalid("w", "must be > 0 when z_max > 0"));
    }
    if !config.p_0.is_finite() || config.p_0 <= 0.0 {
        return Err(invalid("p_0", format!("must be > 0 (got {})", config.p_0)));
    }
    if config.outfreq == 0 {
        return Err(invalid("outfreq", "must be >= 1"));
    }
    if config.sd_conc == 0 {
        return Err(invalid("sd_conc", "must be >= 1"));
    }
    if config.sstp_cond == 0 {
        return Err(invalid("sstp_cond", "must be >= 1"));
    }
    if config.sstp_chem == 0 {
        return Err(invalid("sstp_chem", "must be >= 1"));
    }
    if !config.chem_rho.is_finite() || config.chem_rho <= 0.0 {
        return Err(invalid(
            "chem_rho",
            format!("must be > 0 (got {})", config.chem_rho),
        ));
    }
    for (species, &mixing_ratio) in &config.gas {
        if mixing_ratio.is_nan() || mixing_ratio < 0.0 {
            return Err(invalid(
                "gas",
                format!(
                    "initial {} mixing ratio must be >= 0 (got {})",
                    species.gas_id().unwrap_or("gas"),
                    mixing_ratio
                ),
            ));
        }
    }

    if !config.chemistry_enabled() {
        for spec in &config.spectra {
            let chem = spec.moments.iter().find_map(|m| match m {
                Moment::Chem(species) => Some(*species),
                Moment::Order(_) => None,
            });
            if let Some(species) = chem {
                return Err(ConfigError::ChemistryDisabled {
                    name: spec.name.clone(),
                    species: species.aqueous_id(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::config::{RunConfigBuilder, defaults};
    use super::*;

    fn aerosol_err(json: &str) -> ConfigError {
        parse_aerosol(json).unwrap_err()
    }

    fn spectra_err(json: &str) -> ConfigError {
        parse_spectra(json).unwrap_err()
    }

    #[test]
    fn default_aerosol_parses_to_one_mode() {
        let modes = parse_aerosol(defaults::AEROSOL).unwrap();
        assert_eq!(modes.len(), 1);
        assert_eq!(modes[0].kappa, 0.61);
        assert_eq!(modes[0].mean_r, vec![0.02e-6]);
        assert_eq!(modes[0].gstdev, vec![1.4]);
        assert_eq!(modes[0].n_tot, vec![60.0e6]);
    }

    #[test]
    fn aerosol_missing_and_extraneous_keys_are_rejected() {
        assert_eq!(
            aerosol_err(r#"{"a": {"kappa": 0.6, "mean_r": [1e-8], "gstdev": [1.4]}}"#),
            ConfigError::MissingKey {
                section: "aerosol",
                name: "a".into(),
                key: "n_tot"
            }
        );
        assert_eq!(
            aerosol_err(
                r#"{"a": {"kappa": 0.6, "mean_r": [1e-8], "gstdev": [1.4], "n_tot": [1e6], "rho": 1}}"#
            ),
            ConfigError::UnknownKey {
                section: "aerosol",
                name: "a".into(),
                key: "rho".into()
            }
        );
    }

    #[test]
    fn aerosol_value_checks_are_classified() {
        assert!(matches!(
            aerosol_err(r#"{"a": {"kappa": 0, "mean_r": [1e-8], "gstdev": [1.4], "n_tot": [1e6]}}"#),
            ConfigError::NonPositive { quantity: "kappa hygroscopicity parameter", .. }
        ));
        assert!(matches!(
            aerosol_err(r#"{"a": {"kappa": 0.6, "mean_r": 1e-8, "gstdev": [1.4], "n_tot": [1e6]}}"#),
            ConfigError::InvalidType { expected: "a list", .. }
        ));
        assert_eq!(
            aerosol_err(
                r#"{"a": {"kappa": 0.6, "mean_r": [1e-8, 2e-8], "gstdev": [1.4], "n_tot": [1e6]}}"#
            ),
            ConfigError::LengthMismatch { name: "a".into() }
        );
        assert!(matches!(
            aerosol_err(r#"{"a": {"kappa": 0.6, "mean_r": [-1e-8], "gstdev": [1.4], "n_tot": [1e6]}}"#),
            ConfigError::NonPositive { quantity: "mean radius", .. }
        ));
        assert!(matches!(
            aerosol_err(r#"{"a": {"kappa": 0.6, "mean_r": [1e-8], "gstdev": [1.4], "n_tot": [0]}}"#),
            ConfigError::NonPositive { quantity: "concentration", .. }
        ));
        assert_eq!(
            aerosol_err(r#"{"a": {"kappa": 0.6, "mean_r": [1e-8], "gstdev": [1.0], "n_tot": [1e6]}}"#),
            ConfigError::Monodisperse { name: "a".into() }
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            aerosol_err("{not json"),
            ConfigError::InvalidJson { field: "aerosol", .. }
        ));
        assert!(matches!(
            spectra_err("[1, 2]"),
            ConfigError::InvalidJson { field: "out_bin", .. }
        ));
    }

    #[test]
    fn spectra_parse_in_name_order_with_moments() {
        let spectra = parse_spectra(
            r#"{"wradii": {"rght": 1e-4, "moms": [0, 1, 3], "drwt": "wet", "nbin": 26, "lnli": "log", "left": 1e-9},
                "chem": {"rght": 1e-6, "moms": ["S_VI", "H", 0], "drwt": "dry", "nbin": 2, "lnli": "lin", "left": 1e-8}}"#,
        )
        .unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].name, "chem");
        assert_eq!(spectra[0].kind, RadiusKind::Dry);
        assert_eq!(spectra[0].spacing, Spacing::Linear);
        assert_eq!(
            spectra[0].moments,
            vec![
                Moment::Chem(ChemSpecies::SVI),
                Moment::Chem(ChemSpecies::H),
                Moment::Order(0)
            ]
        );
        assert_eq!(spectra[1].nbin, 26);
        assert_eq!(
            spectra[1].moments,
            vec![Moment::Order(0), Moment::Order(1), Moment::Order(3)]
        );
    }

    #[test]
    fn spectrum_checks_are_classified() {
        let base = |patch: &str| {
            format!(
                r#"{{"s": {{"rght": 1e-4, "moms": [0], "drwt": "wet", "nbin": 1, "lnli": "log", {patch}}}}}"#
            )
        };
        assert_eq!(
            spectra_err(&base(r#""left": 1e-3"#)),
            ConfigError::EmptyRange { name: "s".into() }
        );
        assert_eq!(
            spectra_err(&base(r#""left": 1e-4"#)),
            ConfigError::EmptyRange { name: "s".into() }
        );
        assert!(matches!(
            spectra_err(&base(r#""left": "small""#)),
            ConfigError::InvalidType { ref key, .. } if key == "left"
        ));
        assert!(matches!(
            spectra_err(&base(r#""left": 1e-9, "extra": 1"#)),
            ConfigError::UnknownKey { ref key, .. } if key == "extra"
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": [0], "drwt": "moist", "nbin": 1, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidChoice { key: "drwt", .. }
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": [0], "drwt": "wet", "nbin": 1, "lnli": "exp", "left": 1e-9}}"#),
            ConfigError::InvalidChoice { key: "lnli", .. }
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": [0], "drwt": "wet", "nbin": 2.5, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidType { ref key, .. } if key == "nbin"
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": [0], "drwt": "wet", "nbin": 0, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidType { ref key, .. } if key == "nbin"
        ));
    }

    #[test]
    fn invalid_moments_are_rejected() {
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": ["XYZ"], "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidMoment { .. }
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": [1.5], "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidMoment { .. }
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": "0", "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidType { ref key, .. } if key == "moms"
        ));
        assert!(matches!(
            spectra_err(r#"{"s": {"rght": 1e-4, "moms": ["SO2_g"], "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-9}}"#),
            ConfigError::InvalidMoment { .. }
        ));
    }

    #[test]
    fn run_level_checks_reject_unphysical_options() {
        let err = RunConfigBuilder::with_defaults().t_0(250.0).build().unwrap_err();
        assert_eq!(err, ConfigError::TooCold { t_0: 250.0 });

        let err = RunConfigBuilder::with_defaults()
            .r_0(0.01)
            .rh_0(0.9)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ConflictingWaterContent);

        let err = RunConfigBuilder::with_defaults().w(-1.0).build().unwrap_err();
        assert_eq!(err, ConfigError::NegativeVelocity { w: -1.0 });

        let err = RunConfigBuilder::with_defaults().w(0.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "w", .. }));

        let err = RunConfigBuilder::with_defaults().outfreq(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "outfreq", .. }));

        let err = RunConfigBuilder::with_defaults().dt(0.0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "dt", .. }));

        let err = RunConfigBuilder::with_defaults()
            .gas(ChemSpecies::O3, -1e-9)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "gas", .. }));
    }

    #[test]
    fn non_finite_run_options_are_rejected() {
        let err = RunConfigBuilder::with_defaults().t_0(f64::NAN).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "T_0", .. }));

        let err = RunConfigBuilder::with_defaults().w(f64::NAN).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "w", .. }));

        let err = RunConfigBuilder::with_defaults()
            .w(f64::INFINITY)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "w", .. }));

        let err = RunConfigBuilder::with_defaults().p_0(f64::NAN).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "p_0", .. }));

        let err = RunConfigBuilder::with_defaults().rh_0(f64::NAN).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { option: "r_0", .. }));
    }

    #[test]
    fn chemical_moments_need_chemistry_switched_on() {
        let out_bin = r#"{"c": {"rght": 1e-4, "moms": [0, "S_VI"], "drwt": "wet", "nbin": 2, "lnli": "log", "left": 1e-9}}"#;
        let err = RunConfigBuilder::with_defaults()
            .out_bin_json(out_bin)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ChemistryDisabled {
                name: "c".into(),
                species: "S_VI"
            }
        );

        for config in [
            RunConfigBuilder::with_defaults().chem_dsl(true),
            RunConfigBuilder::with_defaults().chem_dsc(true),
            RunConfigBuilder::with_defaults().chem_rct(true),
        ] {
            assert!(config.out_bin_json(out_bin).build().is_ok());
        }
    }

    #[test]
    fn spectra_may_not_take_archive_names() {
        let spectrum = |name: &str| {
            format!(
                r#"{{"{name}": {{"rght": 1e-4, "moms": [0], "drwt": "wet", "nbin": 1, "lnli": "log", "left": 1e-9}}}}"#
            )
        };
        for name in ["t", "z", "RH", "SO2_g", "NH3_a"] {
            assert_eq!(
                spectra_err(&spectrum(name)),
                ConfigError::ReservedName { name: name.into() },
                "{name}"
            );
        }
        assert!(parse_spectra(&spectrum("radii")).is_ok());
    }

    #[test]
    fn zero_velocity_is_allowed_without_ascent() {
        let config = RunConfigBuilder::with_defaults()
            .w(0.0)
            .z_max(0.0)
            .wait(5)
            .build()
            .unwrap();
        assert_eq!(config.n_ascent(), 0);
    }
}
