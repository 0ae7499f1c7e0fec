use super::config::RunConfig;
use super::error::SimulationError;
use super::micro::adapter::MicrophysicsAdapter;
use super::state::State;
use crate::core::chem::ChemSpecies;
use crate::core::io::traits::Archive;
use crate::core::spectrum::{BinEdges, Moment, SpectrumBinSpec};
use std::collections::BTreeSet;
use tracing::debug;

/// Name of the unlimited record dimension.
pub const RECORD_DIM: &str = "t";

const SERIES_UNITS: [(&str, &str); 8] = [
    ("z", "m"),
    ("t", "s"),
    ("r_v", "kg/kg"),
    ("th_d", "K"),
    ("rhod", "kg/m3"),
    ("p", "Pa"),
    ("T", "K"),
    ("RH", "1"),
];

const GAS_DESCRIPTION: &str = "gas mixing ratio [kg / kg dry air]";
const AQUEOUS_DESCRIPTION: &str =
    "kg of chem species (both undissociated and ions) dissolved in cloud droplets (kg of dry air)^-1";
const CHEM_MOMENT_UNIT: &str = "kg of chem species dissolved in cloud droplets (kg of dry air)^-1";

/// Archive names owned by the scalar series and the chemical tracers.
///
/// Tracer names are reserved whether or not chemistry is switched on.
pub(crate) fn reserved_names() -> impl Iterator<Item = &'static str> {
    let gases = ChemSpecies::GASES.into_iter();
    std::iter::once(RECORD_DIM)
        .chain(SERIES_UNITS.iter().map(|(name, _)| *name))
        .chain(gases.clone().filter_map(ChemSpecies::gas_id))
        .chain(gases.map(ChemSpecies::aqueous_id))
}

struct Spectrum {
    spec: SpectrumBinSpec,
    edges: BinEdges,
    /// Distinct requested quantities with their output variable names.
    outputs: Vec<(Moment, String)>,
}

/// Writes the archive schema and the per-record spectral and scalar output.
///
/// Bin geometry is computed once, when the schema is declared.
pub struct SpectralDiagnostics {
    spectra: Vec<Spectrum>,
}

impl SpectralDiagnostics {
    /// Declares every dimension and variable and stores the bin geometry.
    pub fn output_init(
        archive: &mut dyn Archive,
        config: &RunConfig,
    ) -> Result<Self, SimulationError> {
        archive.create_dimension(RECORD_DIM, None)?;

        let mut spectra = Vec::with_capacity(config.spectra.len());
        for spec in &config.spectra {
            let edges = spec.bin_edges();
            archive.create_dimension(&spec.name, Some(edges.nbin()))?;

            let kind = spec.kind.to_string();
            let r_var = spec.radius_variable();
            let dr_var = spec.width_variable();
            archive.create_variable(
                &r_var,
                &[spec.name.as_str()],
                "m",
                Some(format!("particle {kind} radius (left bin edge)").as_str()),
            )?;
            archive.create_variable(&dr_var, &[spec.name.as_str()], "m", Some("bin width"))?;
            archive.write_slice(&r_var, edges.left())?;
            archive.write_slice(&dr_var, &edges.widths())?;

            let mut seen = BTreeSet::new();
            let mut outputs = Vec::new();
            for moment in &spec.moments {
                let name = spec.moment_variable(moment);
                if !seen.insert(name.clone()) {
                    continue;
                }
                let unit = match moment {
                    Moment::Order(k) => format!("m^{k} (kg of dry air)^-1"),
                    Moment::Chem(_) => CHEM_MOMENT_UNIT.to_string(),
                };
                archive.create_variable(&name, &[RECORD_DIM, spec.name.as_str()], &unit, None)?;
                outputs.push((*moment, name));
            }
            debug!(
                spectrum = %spec.name,
                nbin = edges.nbin(),
                outputs = outputs.len(),
                "Declared output spectrum."
            );
            spectra.push(Spectrum {
                spec: spec.clone(),
                edges,
                outputs,
            });
        }

        for (name, unit) in SERIES_UNITS {
            archive.create_variable(name, &[RECORD_DIM], unit, None)?;
        }
        if config.chemistry_enabled() {
            for species in ChemSpecies::GASES {
                if let Some(id) = species.gas_id() {
                    archive.create_variable(id, &[RECORD_DIM], "kg/kg", Some(GAS_DESCRIPTION))?;
                }
            }
            for species in ChemSpecies::GASES {
                archive.create_variable(
                    species.aqueous_id(),
                    &[RECORD_DIM],
                    "kg/kg",
                    Some(AQUEOUS_DESCRIPTION),
                )?;
            }
        }

        Ok(Self { spectra })
    }

    /// Writes every requested quantity of every bin of every spectrum at record `rec`.
    ///
    /// Bins are visited in ascending order; each is selected once and then queried for
    /// all of its outputs.
    pub fn output_bins(
        &self,
        archive: &mut dyn Archive,
        micro: &mut MicrophysicsAdapter,
        rec: usize,
    ) -> Result<(), SimulationError> {
        for spectrum in &self.spectra {
            let kind = spectrum.spec.kind;
            for bin in 0..spectrum.edges.nbin() {
                let (lo, hi) = spectrum.edges.range(bin);
                micro.diagnose_radius_range(kind, lo, hi)?;
                for (moment, name) in &spectrum.outputs {
                    let value = match *moment {
                        Moment::Order(k) => micro.diagnose_moment(kind, k)?,
                        Moment::Chem(species) => micro.diagnose_chemical(species)?,
                    };
                    archive.write(name, &[rec, bin], value)?;
                }
            }
        }
        Ok(())
    }

    /// Writes the scalar series and, when present, the chemical tracers at record `rec`.
    pub fn output_save(
        &self,
        archive: &mut dyn Archive,
        state: &State,
        rec: usize,
    ) -> Result<(), SimulationError> {
        for (name, value) in state.series() {
            archive.write(&name, &[rec], value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::RunConfigBuilder;
    use super::super::micro::fake::{Call, CallLog, FakeEngine};
    use super::super::state::InitialConditions;
    use super::*;
    use crate::core::io::memory::MemoryArchive;

    const TWO_SPECTRA: &str = r#"{
        "wradii": {"rght": 1e-4, "left": 1e-9, "drwt": "wet", "lnli": "log", "nbin": 3, "moms": [0, 3, 0]},
        "dradii": {"rght": 4e-8, "left": 1e-8, "drwt": "dry", "lnli": "lin", "nbin": 3, "moms": [1]}
    }"#;

    fn config(chem: bool) -> RunConfig {
        RunConfigBuilder::with_defaults()
            .rh_0(0.9)
            .out_bin_json(TWO_SPECTRA)
            .chem_dsl(chem)
            .build()
            .unwrap()
    }

    #[test]
    fn schema_declares_bins_moments_and_series() {
        let config = config(false);
        let mut archive = MemoryArchive::new();
        SpectralDiagnostics::output_init(&mut archive, &config).unwrap();
        let contents = archive.contents();

        assert_eq!(contents.dimensions[RECORD_DIM].size, None);
        assert_eq!(contents.dimensions["wradii"].size, Some(3));
        let r = &contents.variables["dradii_r_dry"];
        assert_eq!(r.unit, "m");
        assert_eq!(
            r.description.as_deref(),
            Some("particle dry radius (left bin edge)")
        );
        assert!((contents.value("dradii_r_dry", &[1]).unwrap() - 2e-8).abs() < 1e-20);
        assert!((contents.value("dradii_dr_dry", &[2]).unwrap() - 1e-8).abs() < 1e-20);
        let second_edge = 10f64.powf(-9.0 + 5.0 / 3.0);
        assert!((contents.value("wradii_r_wet", &[1]).unwrap() / second_edge - 1.0).abs() < 1e-12);
        assert_eq!(contents.variables["wradii_m3"].unit, "m^3 (kg of dry air)^-1");
        assert_eq!(
            contents.variables["wradii_m0"].dims,
            vec!["t".to_string(), "wradii".to_string()]
        );
        for (name, unit) in SERIES_UNITS {
            assert_eq!(contents.variables[name].unit, unit);
        }
        assert!(!contents.variables.contains_key("SO2_g"));
        assert!(!contents.variables.contains_key("SO2_a"));
        let moments: Vec<_> = contents
            .variables
            .keys()
            .map(String::as_str)
            .filter(|name| name.contains("radii_m"))
            .collect();
        assert_eq!(moments, ["dradii_m1", "wradii_m0", "wradii_m3"]);
    }

    #[test]
    fn chemistry_declares_gas_and_aqueous_tracers() {
        let config = config(true);
        let mut archive = MemoryArchive::new();
        SpectralDiagnostics::output_init(&mut archive, &config).unwrap();
        let contents = archive.contents();
        for species in ChemSpecies::GASES {
            let gas = &contents.variables[species.gas_id().unwrap()];
            assert_eq!(gas.description.as_deref(), Some(GAS_DESCRIPTION));
            assert!(contents.variables.contains_key(species.aqueous_id()));
        }
        assert!(!contents.variables.contains_key("S_VI"));
    }

    #[test]
    fn bins_are_selected_in_ascending_order_before_their_queries() {
        let config = config(false);
        let mut state = State::initial(&config, &InitialConditions::from_config(&config));
        let log = CallLog::default();
        let factory = FakeEngine::factory(log.clone(), 0.0);
        let (mut micro, _) =
            MicrophysicsAdapter::initialize(&config, &mut state, &factory).unwrap();

        let mut archive = MemoryArchive::new();
        let diag = SpectralDiagnostics::output_init(&mut archive, &config).unwrap();
        diag.output_bins(&mut archive, &mut micro, 0).unwrap();

        let calls = log.calls();
        assert_eq!(calls.len(), 1 + 3 * 2 + 3 * 3);
        assert!(matches!(calls[1], Call::SelectDry(lo, _) if (lo - 1e-8).abs() < 1e-20));
        assert_eq!(calls[2], Call::DryMoment(1));
        assert!(matches!(calls[7], Call::SelectWet(lo, _) if (lo / 1e-9 - 1.0).abs() < 1e-12));
        assert_eq!(calls[8..10], [Call::WetMoment(0), Call::WetMoment(3)]);

        let contents = archive.contents();
        for bin in 0..3 {
            let (lo, hi) = config.spectra[1].bin_edges().range(bin);
            let m0 = contents.value("wradii_m0", &[0, bin]).unwrap();
            assert_eq!(m0, lo);
            assert!(m0 < hi);
        }
    }

    #[test]
    fn scalar_series_are_written_per_record() {
        let config = config(true);
        let mut state = State::initial(&config, &InitialConditions::from_config(&config));
        state.z = 12.5;
        let mut archive = MemoryArchive::new();
        let diag = SpectralDiagnostics::output_init(&mut archive, &config).unwrap();
        diag.output_save(&mut archive, &state, 0).unwrap();
        state.z = 25.0;
        diag.output_save(&mut archive, &state, 1).unwrap();

        let contents = archive.contents();
        assert_eq!(contents.records("z"), Some(2));
        assert_eq!(contents.value("z", &[1]), Some(25.0));
        assert_eq!(contents.value("NH3_a", &[0]), Some(0.0));
        assert_eq!(contents.value("SO2_g", &[1]), Some(0.0));
    }
}
