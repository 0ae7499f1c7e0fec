//! Aqueous-phase chemistry of the super-droplet engine.
//!
//! Masses are stored per particle in kg; concentrations used by the rate laws are in
//! mol/L of solution water.

use super::superdroplet::Particles;
use crate::core::chem::ChemSpecies;
use crate::core::thermo::R;
use std::collections::BTreeMap;
use std::f64::consts::PI;

const M_AMMONIUM_SULFATE: f64 = 0.132_14;
/// Hydrogen-ion concentration of pure water [mol/L].
const H_PURE_WATER: f64 = 1e-7;
const T_REF: f64 = 298.15;
const ATM: f64 = 101_325.0;

/// S(IV) + H2O2 rate constant [M^-2 s^-1] and the accompanying equilibrium constant [M^-1].
const K_H2O2: f64 = 7.45e7;
const K_H2O2_EQ: f64 = 13.0;
/// S(IV) + O3 rate constant [M^-1 s^-1].
const K_O3: f64 = 3.7e5;

/// Henry constant at 298 K [M/atm] and its temperature coefficient `-dH/R` [K].
fn henry_coefficients(species: ChemSpecies) -> Option<(f64, f64)> {
    match species {
        ChemSpecies::SO2 => Some((1.23, 3120.0)),
        ChemSpecies::H2O2 => Some((7.45e4, 7300.0)),
        ChemSpecies::O3 => Some((1.13e-2, 2540.0)),
        ChemSpecies::CO2 => Some((3.4e-2, 2440.0)),
        _ => None,
    }
}

/// Acid dissociation constants `(K1, K2)` [M] enhancing the effective solubility.
fn dissociation_constants(species: ChemSpecies) -> (f64, f64) {
    match species {
        ChemSpecies::SO2 => (1.3e-2, 6.6e-8),
        ChemSpecies::CO2 => (4.3e-7, 4.7e-11),
        _ => (0.0, 0.0),
    }
}

/// Effective Henry constant in SI units [mol/(m3 Pa)].
fn effective_henry(species: ChemSpecies, t: f64, h: Option<f64>) -> f64 {
    let Some((h_298, dh)) = henry_coefficients(species) else {
        return 0.0;
    };
    let henry = h_298 * (dh * (1.0 / t - 1.0 / T_REF)).exp() * 1e3 / ATM;
    match h {
        Some(h) => {
            let (k1, k2) = dissociation_constants(species);
            henry * (1.0 + k1 / h + k1 * k2 / (h * h))
        }
        None => henry,
    }
}

fn moles(particles: &Particles, i: usize, species: ChemSpecies) -> f64 {
    particles.chem[i][species.index()] / species.molar_mass()
}

fn set_moles(particles: &mut Particles, i: usize, species: ChemSpecies, mol: f64) {
    particles.chem[i][species.index()] = mol.max(0.0) * species.molar_mass();
}

fn litres(particles: &Particles, i: usize) -> f64 {
    particles.water_volume(i) * 1e3
}

/// Assigns the soluble mass of every particle, assuming ammonium sulfate.
pub(crate) fn init_composition(particles: &mut Particles, chem_rho: f64) {
    for i in 0..particles.len() {
        let dry_mass = 4.0 / 3.0 * PI * particles.rd3[i] * chem_rho;
        let mol = dry_mass / M_AMMONIUM_SULFATE;
        set_moles(particles, i, ChemSpecies::SVI, mol);
        set_moles(particles, i, ChemSpecies::NH3, 2.0 * mol);
        let h = H_PURE_WATER * litres(particles, i);
        set_moles(particles, i, ChemSpecies::H, h);
    }
}

/// Partitions the trace gases between the gas phase and the droplets.
///
/// Henry-law compounds are brought to equilibrium with the gas phase, each particle
/// holding an amount proportional to its water volume and effective solubility. NH3
/// and HNO3 are taken up completely.
pub(crate) fn dissolve(
    particles: &mut Particles,
    gas: &mut BTreeMap<ChemSpecies, f64>,
    t: f64,
    rhod: f64,
    dissociation: bool,
) {
    let volumes: Vec<f64> = (0..particles.len())
        .map(|i| particles.water_volume(i))
        .collect();
    let total_water: f64 = volumes
        .iter()
        .zip(&particles.n)
        .map(|(v, n)| v * n)
        .sum();
    if total_water <= 0.0 {
        return;
    }

    for species in ChemSpecies::GASES {
        let Some(c_gas) = gas.get_mut(&species) else {
            continue;
        };
        let idx = species.index();
        match species {
            ChemSpecies::NH3 | ChemSpecies::HNO3 => {
                for (i, v) in volumes.iter().enumerate() {
                    particles.chem[i][idx] += *c_gas * v / total_water;
                }
                *c_gas = 0.0;
            }
            _ => {
                // per-particle partition coefficient (aqueous over gas) times R T rhod
                let uptake: Vec<f64> = volumes
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let h = dissociation.then(|| {
                            let l = v * 1e3;
                            if l > 0.0 {
                                (moles(particles, i, ChemSpecies::H) / l).max(H_PURE_WATER)
                            } else {
                                H_PURE_WATER
                            }
                        });
                        v * effective_henry(species, t, h) * rhod * R * t
                    })
                    .collect();
                let dissolved: f64 = particles
                    .n
                    .iter()
                    .zip(&particles.chem)
                    .map(|(n, c)| n * c[idx])
                    .sum();
                let k_sum: f64 = uptake.iter().zip(&particles.n).map(|(k, n)| k * n).sum();
                let c_new = (*c_gas + dissolved) / (1.0 + k_sum);
                *c_gas = c_new;
                for (i, k) in uptake.iter().enumerate() {
                    particles.chem[i][idx] = c_new * k;
                }
            }
        }
    }
}

/// Sets the hydrogen ions of every particle from electroneutrality of the strong
/// electrolytes, bounded below by pure water.
pub(crate) fn dissociate(particles: &mut Particles) {
    for i in 0..particles.len() {
        let l = litres(particles, i);
        if l <= 0.0 {
            continue;
        }
        let h = 2.0 * moles(particles, i, ChemSpecies::SVI) + moles(particles, i, ChemSpecies::HNO3)
            - moles(particles, i, ChemSpecies::NH3);
        set_moles(particles, i, ChemSpecies::H, h.max(H_PURE_WATER * l));
    }
}

/// Oxidises dissolved S(IV) to S(VI) by H2O2 and O3 over `dt`.
pub(crate) fn react(particles: &mut Particles, dt: f64) {
    for i in 0..particles.len() {
        let l = litres(particles, i);
        if l <= 0.0 {
            continue;
        }
        let h = (moles(particles, i, ChemSpecies::H) / l).max(H_PURE_WATER);

        let mut s4 = moles(particles, i, ChemSpecies::SO2);
        let mut h2o2 = moles(particles, i, ChemSpecies::H2O2);
        let mut o3 = moles(particles, i, ChemSpecies::O3);
        let mut s6 = moles(particles, i, ChemSpecies::SVI);

        let rate = K_H2O2 * h * (h2o2 / l) * (s4 / l) / (1.0 + K_H2O2_EQ * h);
        let d = (rate * dt * l).min(s4).min(h2o2);
        s4 -= d;
        h2o2 -= d;
        s6 += d;

        let rate = K_O3 * (o3 / l) * (s4 / l);
        let d = (rate * dt * l).min(s4).min(o3);
        s4 -= d;
        o3 -= d;
        s6 += d;

        set_moles(particles, i, ChemSpecies::SO2, s4);
        set_moles(particles, i, ChemSpecies::H2O2, h2o2);
        set_moles(particles, i, ChemSpecies::O3, o3);
        set_moles(particles, i, ChemSpecies::SVI, s6);
    }
}
