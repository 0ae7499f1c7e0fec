use phf::{Map, phf_map};
use std::fmt;

/// Chemical compounds tracked by the aqueous-chemistry scheme.
///
/// The same compound may appear in the gas phase (e.g. `SO2_g`) and dissolved in
/// droplets (e.g. `SO2_a`); `H` (hydrogen ions) and `S_VI` (sulfate) only exist in
/// the aqueous phase.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChemSpecies {
    SO2,
    H2O2,
    O3,
    HNO3,
    NH3,
    CO2,
    H,
    SVI,
}

static GAS_PHASE_IDS: Map<&'static str, ChemSpecies> = phf_map! {
    "SO2_g" => ChemSpecies::SO2,
    "H2O2_g" => ChemSpecies::H2O2,
    "O3_g" => ChemSpecies::O3,
    "HNO3_g" => ChemSpecies::HNO3,
    "NH3_g" => ChemSpecies::NH3,
    "CO2_g" => ChemSpecies::CO2,
};

static AQUEOUS_PHASE_IDS: Map<&'static str, ChemSpecies> = phf_map! {
    "SO2_a" => ChemSpecies::SO2,
    "H2O2_a" => ChemSpecies::H2O2,
    "O3_a" => ChemSpecies::O3,
    "CO2_a" => ChemSpecies::CO2,
    "HNO3_a" => ChemSpecies::HNO3,
    "NH3_a" => ChemSpecies::NH3,
    "H" => ChemSpecies::H,
    "S_VI" => ChemSpecies::SVI,
};

impl ChemSpecies {
    /// Compounds exchanged between the gas phase and the droplets, in output order.
    pub const GASES: [ChemSpecies; 6] = [
        ChemSpecies::SO2,
        ChemSpecies::H2O2,
        ChemSpecies::O3,
        ChemSpecies::HNO3,
        ChemSpecies::NH3,
        ChemSpecies::CO2,
    ];

    /// Every compound with an aqueous-phase identifier.
    pub const AQUEOUS: [ChemSpecies; 8] = [
        ChemSpecies::SO2,
        ChemSpecies::H2O2,
        ChemSpecies::O3,
        ChemSpecies::HNO3,
        ChemSpecies::NH3,
        ChemSpecies::CO2,
        ChemSpecies::H,
        ChemSpecies::SVI,
    ];

    /// Looks up a gas-phase identifier such as `"SO2_g"`.
    pub fn from_gas_id(id: &str) -> Option<Self> {
        GAS_PHASE_IDS.get(id).copied()
    }

    /// Looks up an aqueous-phase identifier such as `"S_VI"` or `"NH3_a"`.
    pub fn from_aqueous_id(id: &str) -> Option<Self> {
        AQUEOUS_PHASE_IDS.get(id).copied()
    }

    /// All valid aqueous-phase identifiers, sorted for stable error messages.
    pub fn aqueous_ids() -> Vec<&'static str> {
        let mut ids: Vec<_> = AQUEOUS_PHASE_IDS.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn gas_id(self) -> Option<&'static str> {
        match self {
            ChemSpecies::SO2 => Some("SO2_g"),
            ChemSpecies::H2O2 => Some("H2O2_g"),
            ChemSpecies::O3 => Some("O3_g"),
            ChemSpecies::HNO3 => Some("HNO3_g"),
            ChemSpecies::NH3 => Some("NH3_g"),
            ChemSpecies::CO2 => Some("CO2_g"),
            ChemSpecies::H | ChemSpecies::SVI => None,
        }
    }

    pub fn aqueous_id(self) -> &'static str {
        match self {
            ChemSpecies::SO2 => "SO2_a",
            ChemSpecies::H2O2 => "H2O2_a",
            ChemSpecies::O3 => "O3_a",
            ChemSpecies::HNO3 => "HNO3_a",
            ChemSpecies::NH3 => "NH3_a",
            ChemSpecies::CO2 => "CO2_a",
            ChemSpecies::H => "H",
            ChemSpecies::SVI => "S_VI",
        }
    }

    /// Molar mass of the compound as it is accounted for in mass diagnostics [kg/mol].
    ///
    /// `S_VI` is accounted for as H2SO4.
    pub fn molar_mass(self) -> f64 {
        match self {
            ChemSpecies::SO2 => 0.064_066,
            ChemSpecies::H2O2 => 0.034_015,
            ChemSpecies::O3 => 0.047_998,
            ChemSpecies::HNO3 => 0.063_013,
            ChemSpecies::NH3 => 0.017_031,
            ChemSpecies::CO2 => 0.044_010,
            ChemSpecies::H => 0.001_008,
            ChemSpecies::SVI => 0.098_079,
        }
    }

    /// Dense index used for per-particle storage.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ChemSpecies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.aqueous_id())
    }
}
