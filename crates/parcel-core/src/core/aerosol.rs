use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// A single lognormal mode of an aerosol population.
///
/// Evaluated as a number density per unit natural logarithm of radius,
/// `dN / d(ln r)`, in the units of `n_tot`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lognormal {
    pub mean_r: f64,
    pub gstdev: f64,
    pub n_tot: f64,
}

impl Lognormal {
    pub fn new(mean_r: f64, gstdev: f64, n_tot: f64) -> Self {
        Self {
            mean_r,
            gstdev,
            n_tot,
        }
    }

    #[inline]
    pub fn density(&self, ln_r: f64) -> f64 {
        let ln_sigma = self.gstdev.ln();
        self.n_tot * (-(ln_r - self.mean_r.ln()).powi(2) / 2.0 / ln_sigma.powi(2)).exp()
            / ln_sigma
            / (2.0 * PI).sqrt()
    }
}

/// A composite distribution: the sum of any number of lognormal modes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SumOfLognormals {
    modes: Vec<Lognormal>,
}

impl SumOfLognormals {
    pub fn new(modes: Vec<Lognormal>) -> Self {
        Self { modes }
    }

    pub fn push(&mut self, mode: Lognormal) {
        self.modes.push(mode);
    }

    pub fn modes(&self) -> &[Lognormal] {
        &self.modes
    }

    #[inline]
    pub fn density(&self, ln_r: f64) -> f64 {
        self.modes.iter().map(|m| m.density(ln_r)).sum()
    }

    /// Sum of the `n_tot` of all modes, i.e. the analytic integral over `ln r`.
    pub fn total_concentration(&self) -> f64 {
        self.modes.iter().map(|m| m.n_tot).sum()
    }

    /// A range of `ln r` that holds all but a negligible fraction of every mode,
    /// `width` geometric standard deviations either side of the mode radii.
    pub fn ln_r_range(&self, width: f64) -> Option<(f64, f64)> {
        self.modes.iter().fold(None, |acc, m| {
            let half = width * m.gstdev.ln().abs();
            let (lo, hi) = (m.mean_r.ln() - half, m.mean_r.ln() + half);
            Some(match acc {
                None => (lo, hi),
                Some((a, b)) => (f64::min(a, lo), f64::max(b, hi)),
            })
        })
    }
}

/// Hygroscopicity parameter used as a distribution key.
///
/// Ordered by `f64::total_cmp` so that it can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
pub struct Kappa(pub f64);

impl PartialEq for Kappa {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Kappa {}

impl PartialOrd for Kappa {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Kappa {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Dry-radius distributions, one composite per hygroscopicity class.
pub type DryDistributions = BTreeMap<Kappa, SumOfLognormals>;

/// One named entry of the aerosol configuration.
///
/// The lists are parallel: index `i` of `mean_r`, `gstdev` and `n_tot` describes one
/// lognormal mode. Instances are produced by the configuration validator, which
/// guarantees equal lengths and positive values.
#[derive(Debug, Clone, PartialEq)]
pub struct AerosolMode {
    pub name: String,
    pub kappa: f64,
    pub mean_r: Vec<f64>,
    pub gstdev: Vec<f64>,
    pub n_tot: Vec<f64>,
}

impl AerosolMode {
    pub fn lognormals(&self) -> impl Iterator<Item = Lognormal> + '_ {
        self.mean_r
            .iter()
            .zip(&self.gstdev)
            .zip(&self.n_tot)
            .map(|((&mean_r, &gstdev), &n_tot)| Lognormal::new(mean_r, gstdev, n_tot))
    }
}

/// Builds one composite distribution per kappa, summing every mode that shares it.
pub fn dry_distributions(modes: &[AerosolMode]) -> DryDistributions {
    let mut distros = DryDistributions::new();
    for mode in modes {
        let entry = distros.entry(Kappa(mode.kappa)).or_default();
        for lognormal in mode.lognormals() {
            entry.push(lognormal);
        }
    }
    distros
}
