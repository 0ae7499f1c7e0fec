use super::chem::ChemSpecies;
use std::fmt;
use std::str::FromStr;

/// Bin spacing rule of an output spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    Linear,
    Logarithmic,
}

impl FromStr for Spacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lin" => Ok(Spacing::Linear),
            "log" => Ok(Spacing::Logarithmic),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Spacing::Linear => "lin",
            Spacing::Logarithmic => "log",
        })
    }
}

/// Which particle radius a spectrum is binned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusKind {
    Dry,
    Wet,
}

impl FromStr for RadiusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry" => Ok(RadiusKind::Dry),
            "wet" => Ok(RadiusKind::Wet),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for RadiusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RadiusKind::Dry => "dry",
            RadiusKind::Wet => "wet",
        })
    }
}

/// A quantity requested for every bin of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    /// Statistical moment of the given order of the radius distribution.
    Order(i32),
    /// Mass of a dissolved chemical compound.
    Chem(ChemSpecies),
}

/// One named output spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBinSpec {
    pub name: String,
    pub left: f64,
    pub rght: f64,
    pub nbin: usize,
    pub spacing: Spacing,
    pub kind: RadiusKind,
    pub moments: Vec<Moment>,
}

/// Immutable bin geometry of a spectrum, derived once at archive creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    edges: Vec<f64>,
    /// Common width of linearly spaced bins.
    dr: Option<f64>,
}

impl BinEdges {
    /// All `nbin + 1` edges in ascending order.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn nbin(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Left edge of every bin.
    pub fn left(&self) -> &[f64] {
        &self.edges[..self.nbin()]
    }

    /// Width of bin `i`.
    pub fn width(&self, i: usize) -> f64 {
        self.dr.unwrap_or_else(|| self.edges[i + 1] - self.edges[i])
    }

    /// Width of every bin.
    pub fn widths(&self) -> Vec<f64> {
        (0..self.nbin()).map(|i| self.width(i)).collect()
    }

    /// Half-open radius range `[edge_i, edge_i + width_i)` of bin `i`.
    pub fn range(&self, i: usize) -> (f64, f64) {
        let lo = self.edges[i];
        (lo, lo + self.width(i))
    }
}

impl SpectrumBinSpec {
    pub fn bin_edges(&self) -> BinEdges {
        let n = self.nbin as f64;
        match self.spacing {
            Spacing::Logarithmic => {
                let (ln_left, ln_rght) = (self.left.ln(), self.rght.ln());
                let dlnr = (ln_rght - ln_left) / n;
                BinEdges {
                    edges: (0..=self.nbin)
                        .map(|i| (ln_left + i as f64 * dlnr).exp())
                        .collect(),
                    dr: None,
                }
            }
            Spacing::Linear => {
                let dr = (self.rght - self.left) / n;
                BinEdges {
                    edges: (0..=self.nbin).map(|i| self.left + i as f64 * dr).collect(),
                    dr: Some(dr),
                }
            }
        }
    }

    /// Name of the left-edge variable, e.g. `radii_r_wet`.
    pub fn radius_variable(&self) -> String {
        format!("{}_r_{}", self.name, self.kind)
    }

    /// Name of the bin-width variable, e.g. `radii_dr_wet`.
    pub fn width_variable(&self) -> String {
        format!("{}_dr_{}", self.name, self.kind)
    }

    /// Name of the output series of a requested moment, e.g. `radii_m0` or `chem_S_VI`.
    pub fn moment_variable(&self, moment: &Moment) -> String {
        match moment {
            Moment::Order(k) => format!("{}_m{}", self.name, k),
            Moment::Chem(species) => format!("{}_{}", self.name, species.aqueous_id()),
        }
    }
}
