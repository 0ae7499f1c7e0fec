use super::chemistry;
use super::{Ambient, Backend, InitOptions, Microphysics, Phase, StepOptions};
use crate::core::aerosol::SumOfLognormals;
use crate::core::chem::ChemSpecies;
use crate::core::thermo::{self, C_PD, R_D, R_V, RHO_W};
use crate::engine::error::MicrophysicsError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::{debug, trace};

pub const DEFAULT_SEED: u64 = 44;
/// Capacity of the particle store when the large tail is resolved.
pub const LARGE_TAIL_N_SD_MAX: usize = 1_000_000;

/// Dry-air density at the reference conditions of aerosol concentrations
/// (20 C, 1013.25 hPa) [kg/m3].
const RHO_STP: f64 = 101_325.0 / (R_D * 293.15);
/// Half-width of the sampled `ln r` range, in multiples of `ln gstdev`.
const SAMPLING_WIDTH: f64 = 5.0;
const TAIL_WIDTH: f64 = 8.0;
/// Ceiling on the humidity used to equilibrate the initial wet radii.
const INIT_RH_MAX: f64 = 0.95;
/// Surface tension of water [N/m].
const SIGMA_W: f64 = 0.072;
/// Thermal conductivity of air [W/(m K)].
const K_AIR: f64 = 2.4e-2;
/// Diffusivity of water vapour in air [m2/s].
const D_VAPOUR: f64 = 2.21e-5;
const BISECTIONS: usize = 64;

pub(crate) const CHEM_LEN: usize = ChemSpecies::AQUEOUS.len();

/// Structure-of-arrays particle store.
#[derive(Debug, Clone, Default)]
pub(crate) struct Particles {
    /// Multiplicity per kg of dry air.
    pub(crate) n: Vec<f64>,
    /// Dry radius cubed [m3].
    pub(crate) rd3: Vec<f64>,
    /// Wet radius squared [m2].
    pub(crate) rw2: Vec<f64>,
    pub(crate) kappa: Vec<f64>,
    /// Dissolved mass per particle [kg], indexed by `ChemSpecies::index`.
    pub(crate) chem: Vec<[f64; CHEM_LEN]>,
}

impl Particles {
    pub(crate) fn len(&self) -> usize {
        self.n.len()
    }

    fn push(&mut self, n: f64, rd3: f64, kappa: f64) {
        self.n.push(n);
        self.rd3.push(rd3);
        self.rw2.push(rd3.powf(2.0 / 3.0));
        self.kappa.push(kappa);
        self.chem.push([0.0; CHEM_LEN]);
    }

    /// Volume of solution water held by particle `i` [m3].
    pub(crate) fn water_volume(&self, i: usize) -> f64 {
        4.0 / 3.0 * PI * (self.rw2[i].powf(1.5) - self.rd3[i]).max(0.0)
    }

    fn wet_radius(&self, i: usize) -> f64 {
        self.rw2[i].sqrt()
    }

    fn dry_radius(&self, i: usize) -> f64 {
        self.rd3[i].cbrt()
    }
}

/// Thermodynamic conditions derived from the ambient fields.
#[derive(Debug, Clone, Copy)]
struct Conditions {
    t: f64,
    rh: f64,
}

impl Conditions {
    fn derive(th_d: f64, r_v: f64, rhod: f64) -> Result<Self, MicrophysicsError> {
        if !(th_d.is_finite() && th_d > 0.0) {
            return Err(MicrophysicsError::Ambient(format!("th_d = {th_d}")));
        }
        if !(r_v.is_finite() && r_v >= 0.0) {
            return Err(MicrophysicsError::Ambient(format!("r_v = {r_v}")));
        }
        if !(rhod.is_finite() && rhod > 0.0) {
            return Err(MicrophysicsError::Ambient(format!("rhod = {rhod}")));
        }
        let t = thermo::temperature(th_d, rhod);
        let p = thermo::pressure(rhod, r_v, t);
        Ok(Self {
            t,
            rh: thermo::relative_humidity(p, r_v, t),
        })
    }
}

/// Curvature (Kelvin) coefficient `2 sigma / (R_v T rho_w)` [m].
fn kelvin_coefficient(t: f64) -> f64 {
    2.0 * SIGMA_W / (R_V * t * RHO_W)
}

/// `1 / (F_k + F_d)`: diffusional growth coefficient of `r dr/dt` [m2/s].
fn growth_coefficient(t: f64) -> f64 {
    let l = thermo::l_v(t);
    let f_k = (l / (R_V * t) - 1.0) * l * RHO_W / (K_AIR * t);
    let f_d = RHO_W * R_V * t / (D_VAPOUR * thermo::p_vs(t));
    1.0 / (f_k + f_d)
}

/// Kappa-Koehler equilibrium saturation ratio over a solution droplet.
fn equilibrium_saturation(rw2: f64, rd3: f64, kappa: f64, a: f64) -> f64 {
    let rw3 = rw2.powf(1.5);
    if rw3 <= rd3 {
        return 0.0;
    }
    (rw3 - rd3) / (rw3 - rd3 * (1.0 - kappa)) * (a / rw2.sqrt()).exp()
}

/// Root of an increasing-through-zero function on `[lo, hi]`, with `f(lo) <= 0 < f(hi)`.
fn bisect(mut lo: f64, mut hi: f64, f: impl Fn(f64) -> f64) -> f64 {
    for _ in 0..BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if f(mid) > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Squared wet radius of a particle in equilibrium with relative humidity `rh < 1`.
fn equilibrium_rw2(rd3: f64, kappa: f64, rh: f64, a: f64) -> f64 {
    let rd2 = rd3.powf(2.0 / 3.0);
    if rh <= 0.0 {
        return rd2;
    }
    // without curvature the equilibrium is analytic and bounds the root from above
    let hi3 = rd3 * (1.0 - (1.0 - kappa) * rh) / (1.0 - rh);
    bisect(rd2, hi3.powf(2.0 / 3.0), |x| {
        equilibrium_saturation(x, rd3, kappa, a) - rh
    })
}

/// Particle-based engine tracking a fixed population of super-droplets.
///
/// Only diffusional growth and aqueous chemistry are modelled; coalescence,
/// sedimentation and advection are rejected.
pub struct SuperdropletEngine {
    backend: Backend,
    opts: InitOptions,
    phase: Phase,
    particles: Particles,
    selection: Option<Vec<usize>>,
    /// Temperature and density seen by the last synchronous phase.
    last_sync: Option<(f64, f64)>,
}

impl SuperdropletEngine {
    pub fn new(backend: Backend, opts: InitOptions) -> Result<Self, MicrophysicsError> {
        let unsupported = |option: &'static str| MicrophysicsError::Unsupported {
            backend: "serial",
            option,
        };
        if opts.coalescence {
            return Err(unsupported("coalescence"));
        }
        if opts.sedimentation {
            return Err(unsupported("sedimentation"));
        }
        if opts.dt.is_nan()
            || opts.dt <= 0.0
            || opts.sd_conc == 0
            || opts.sstp_cond == 0
            || opts.sstp_chem == 0
        {
            return Err(MicrophysicsError::Initialization(
                "dt, sd_conc, sstp_cond and sstp_chem must be positive".to_string(),
            ));
        }
        if opts.chemistry && (opts.chem_rho.is_nan() || opts.chem_rho <= 0.0) {
            return Err(MicrophysicsError::Initialization(
                "chem_rho must be positive when chemistry is on".to_string(),
            ));
        }
        Ok(Self {
            backend,
            opts,
            phase: Phase::Created,
            particles: Particles::default(),
            selection: None,
            last_sync: None,
        })
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn sample(
        &mut self,
        rng: &mut StdRng,
        distro: &SumOfLognormals,
        kappa: f64,
        (lo, hi): (f64, f64),
        count: usize,
    ) {
        let width = (hi - lo) / count as f64;
        for i in 0..count {
            let ln_r = lo + (i as f64 + rng.r#gen::<f64>()) * width;
            let n = distro.density(ln_r) * width / RHO_STP;
            self.particles.push(n, (3.0 * ln_r).exp(), kappa);
        }
    }

    fn populate(&mut self) -> Result<(), MicrophysicsError> {
        let mut rng = StdRng::seed_from_u64(self.opts.seed);
        let distros = std::mem::take(&mut self.opts.dry_distros);
        for (kappa, distro) in &distros {
            let Some(range) = distro.ln_r_range(SAMPLING_WIDTH) else {
                continue;
            };
            self.sample(&mut rng, distro, kappa.0, range, self.opts.sd_conc);
            if self.opts.large_tail {
                if let Some((_, tail_hi)) = distro.ln_r_range(TAIL_WIDTH) {
                    self.sample(
                        &mut rng,
                        distro,
                        kappa.0,
                        (range.1, tail_hi),
                        self.opts.sd_conc,
                    );
                }
            }
        }
        self.opts.dry_distros = distros;

        if self.particles.len() > self.opts.n_sd_max {
            return Err(MicrophysicsError::Initialization(format!(
                "{} super-particles exceed the capacity n_sd_max = {}",
                self.particles.len(),
                self.opts.n_sd_max
            )));
        }
        if self.particles.n.is_empty() {
            return Err(MicrophysicsError::Initialization(
                "no aerosol distribution to sample".to_string(),
            ));
        }
        Ok(())
    }

    fn condensation_substep(
        &mut self,
        dt: f64,
        th_d: &mut f64,
        r_v: &mut f64,
        rhod: f64,
    ) -> Result<(), MicrophysicsError> {
        let Conditions { t, rh } = Conditions::derive(*th_d, *r_v, rhod)?;
        let a = kelvin_coefficient(t);
        let g = growth_coefficient(t);
        let p = &mut self.particles;

        let mut condensed = 0.0;
        for i in 0..p.len() {
            let (x_old, rd3, kappa) = (p.rw2[i], p.rd3[i], p.kappa[i]);
            let residual = |x: f64| {
                x - x_old - 2.0 * dt * g * (rh - equilibrium_saturation(x, rd3, kappa, a))
            };
            let lo = rd3.powf(2.0 / 3.0);
            let x_new = if residual(lo) >= 0.0 {
                lo
            } else {
                bisect(lo, x_old + 2.0 * dt * g * rh, residual)
            };
            condensed += p.n[i] * 4.0 / 3.0 * PI * RHO_W * (x_new.powf(1.5) - x_old.powf(1.5));
            p.rw2[i] = x_new;
        }

        *r_v -= condensed;
        if *r_v < 0.0 {
            return Err(MicrophysicsError::Ambient(format!(
                "condensation depleted water vapour (r_v = {})",
                *r_v
            )));
        }
        *th_d += condensed * thermo::l_v(t) / C_PD * *th_d / t;
        Ok(())
    }

    fn check_step_options(&self, opts: &StepOptions) -> Result<(), MicrophysicsError> {
        let unsupported = |option: &'static str| MicrophysicsError::Unsupported {
            backend: "serial",
            option,
        };
        if opts.coalescence {
            return Err(unsupported("coalescence"));
        }
        if opts.advection {
            return Err(unsupported("advection"));
        }
        if opts.sedimentation {
            return Err(unsupported("sedimentation"));
        }
        if opts.chem.any() && !self.opts.chemistry {
            return Err(unsupported("chemistry processes without chemistry switched on"));
        }
        Ok(())
    }

    fn selected(&self) -> Result<&[usize], MicrophysicsError> {
        self.phase.require(Phase::Ready, "query diagnostics")?;
        self.selection
            .as_deref()
            .ok_or(MicrophysicsError::NoSelection)
    }

    fn select_where(
        &mut self,
        operation: &'static str,
        keep: impl Fn(&Particles, usize) -> bool,
    ) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, operation)?;
        let p = &self.particles;
        self.selection = Some((0..p.len()).filter(|&i| keep(p, i)).collect());
        Ok(())
    }
}

impl Microphysics for SuperdropletEngine {
    fn version(&self) -> String {
        format!("superdroplet-{}/{}", self.backend, env!("CARGO_PKG_VERSION"))
    }

    fn init(&mut self, ambient: Ambient<'_>) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Created, "init")?;
        let conditions = Conditions::derive(*ambient.th_d, *ambient.r_v, *ambient.rhod)?;
        if self.opts.chemistry {
            if let Some(missing) = ChemSpecies::GASES
                .iter()
                .find(|s| !ambient.gas.contains_key(*s))
            {
                return Err(MicrophysicsError::Initialization(format!(
                    "ambient concentration of {} missing",
                    missing.gas_id().unwrap_or("gas")
                )));
            }
        }

        self.populate()?;

        let rh = conditions.rh.min(INIT_RH_MAX);
        let a = kelvin_coefficient(conditions.t);
        let p = &mut self.particles;
        for i in 0..p.len() {
            p.rw2[i] = equilibrium_rw2(p.rd3[i], p.kappa[i], rh, a);
        }
        if self.opts.chemistry {
            chemistry::init_composition(p, self.opts.chem_rho);
        }

        debug!(
            "Initialized {} super-particles over {} hygroscopicity class(es) (RH = {:.4})",
            p.len(),
            self.opts.dry_distros.len(),
            conditions.rh
        );
        self.phase = Phase::Ready;
        Ok(())
    }

    fn step_sync(
        &mut self,
        opts: &StepOptions,
        ambient: Ambient<'_>,
    ) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Ready, "step_sync")?;
        self.check_step_options(opts)?;
        self.selection = None;

        if opts.condensation {
            let dt = self.opts.dt / self.opts.sstp_cond as f64;
            for _ in 0..self.opts.sstp_cond {
                self.condensation_substep(dt, ambient.th_d, ambient.r_v, *ambient.rhod)?;
            }
        }

        let Conditions { t, .. } = Conditions::derive(*ambient.th_d, *ambient.r_v, *ambient.rhod)?;
        if opts.chem.dissolving {
            chemistry::dissolve(
                &mut self.particles,
                ambient.gas,
                t,
                *ambient.rhod,
                opts.chem.dissociation,
            );
        }
        self.last_sync = Some((t, *ambient.rhod));
        trace!("Synchronous phase done (T = {:.3} K, r_v = {:.6e})", t, *ambient.r_v);
        self.phase = Phase::Synced;
        Ok(())
    }

    fn step_async(&mut self, opts: &StepOptions) -> Result<(), MicrophysicsError> {
        self.phase.require(Phase::Synced, "step_async")?;
        if opts.chem.dissociation || opts.chem.reactions {
            let dt = self.opts.dt / self.opts.sstp_chem as f64;
            for _ in 0..self.opts.sstp_chem {
                if opts.chem.dissociation {
                    chemistry::dissociate(&mut self.particles);
                }
                if opts.chem.reactions {
                    chemistry::react(&mut self.particles, dt);
                }
            }
        }
        if let Some((t, rhod)) = self.last_sync {
            trace!("Asynchronous phase done (T = {:.3} K, rhod = {:.4})", t, rhod);
        }
        self.phase = Phase::Ready;
        Ok(())
    }

    fn select_all(&mut self) -> Result<(), MicrophysicsError> {
        self.select_where("select_all", |_, _| true)
    }

    fn select_wet_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError> {
        self.select_where("select_wet_range", |p, i| {
            let r = p.wet_radius(i);
            lo <= r && r < hi
        })
    }

    fn select_dry_range(&mut self, lo: f64, hi: f64) -> Result<(), MicrophysicsError> {
        self.select_where("select_dry_range", |p, i| {
            let r = p.dry_radius(i);
            lo <= r && r < hi
        })
    }

    fn wet_moment(&self, k: i32) -> Result<f64, MicrophysicsError> {
        let p = &self.particles;
        Ok(self
            .selected()?
            .iter()
            .map(|&i| p.n[i] * p.wet_radius(i).powi(k))
            .sum())
    }

    fn dry_moment(&self, k: i32) -> Result<f64, MicrophysicsError> {
        let p = &self.particles;
        Ok(self
            .selected()?
            .iter()
            .map(|&i| p.n[i] * p.dry_radius(i).powi(k))
            .sum())
    }

    fn chem_mass(&self, species: ChemSpecies) -> Result<f64, MicrophysicsError> {
        if !self.opts.chemistry {
            return Err(MicrophysicsError::Unsupported {
                backend: "serial",
                option: "chemical diagnostics without chemistry switched on",
            });
        }
        let p = &self.particles;
        let idx = species.index();
        Ok(self
            .selected()?
            .iter()
            .map(|&i| p.n[i] * p.chem[i][idx])
            .sum())
    }
}
