//! Moist-air thermodynamics used by the parcel driver and the super-droplet engine.
//!
//! Potential temperatures come in two flavours: the "standard" one (`th_std`, defined
//! with the total pressure) and the "dry" one (`th_d`, defined with the dry-air partial
//! pressure). The parcel state carries `th_d`; hydrostatic profiles are expressed in
//! terms of `th_std`.

/// Universal gas constant [J/(mol K)].
pub const R: f64 = 8.314_462_618;
/// Molar mass of dry air [kg/mol].
pub const M_D: f64 = 0.028_97;
/// Molar mass of water vapour [kg/mol].
pub const M_V: f64 = 0.018_015;
/// Gas constant for dry air [J/(kg K)].
pub const R_D: f64 = R / M_D;
/// Gas constant for water vapour [J/(kg K)].
pub const R_V: f64 = R / M_V;
/// Ratio of the dry-air and vapour gas constants.
pub const EPS: f64 = R_D / R_V;
/// Specific heat of dry air at constant pressure [J/(kg K)].
pub const C_PD: f64 = 1005.0;
/// Specific heat of water vapour at constant pressure [J/(kg K)].
pub const C_PV: f64 = 1850.0;
/// Specific heat of liquid water [J/(kg K)].
pub const C_PW: f64 = 4218.0;
/// Reference pressure of the potential temperature definition [Pa].
pub const P_1000: f64 = 100_000.0;
/// Gravitational acceleration [m/s^2].
pub const G: f64 = 9.81;
/// Density of liquid water [kg/m^3].
pub const RHO_W: f64 = 1000.0;
/// Triple point temperature [K].
pub const T_TRI: f64 = 273.16;
/// Triple point pressure [Pa].
pub const P_TRI: f64 = 611.73;
/// Latent heat of evaporation at the triple point [J/kg].
pub const L_TRI: f64 = 2.5e6;
/// Freezing temperature; the driver only supports warm clouds above it [K].
pub const T_FREEZE: f64 = 273.15;

const KAPPA_D: f64 = R_D / C_PD;

/// Exner function `(p / p_1000)^(R_d / c_pd)`.
#[inline]
pub fn exner(p: f64) -> f64 {
    (p / P_1000).powf(KAPPA_D)
}

/// Converts standard potential temperature into dry potential temperature.
#[inline]
pub fn th_std2dry(th_std: f64, r_v: f64) -> f64 {
    th_std * (1.0 + r_v * R_V / R_D).powf(KAPPA_D)
}

/// Converts dry potential temperature into standard potential temperature.
#[inline]
pub fn th_dry2std(th_d: f64, r_v: f64) -> f64 {
    th_d / (1.0 + r_v * R_V / R_D).powf(KAPPA_D)
}

/// Temperature from dry potential temperature and dry-air density.
#[inline]
pub fn temperature(th_d: f64, rhod: f64) -> f64 {
    th_d * (rhod * th_d * R_D / P_1000).powf(KAPPA_D / (1.0 - KAPPA_D))
}

/// Partial pressure of water vapour for a given total pressure and mixing ratio.
#[inline]
pub fn p_v(p: f64, r_v: f64) -> f64 {
    p * r_v / (r_v + EPS)
}

/// Saturation vapour pressure over a flat water surface (Clausius-Clapeyron with a
/// temperature-dependent latent heat).
#[inline]
pub fn p_vs(t: f64) -> f64 {
    let dc = C_PW - C_PV;
    P_TRI
        * ((L_TRI + dc * T_TRI) / R_V * (1.0 / T_TRI - 1.0 / t) - dc / R_V * (t / T_TRI).ln())
            .exp()
}

/// Latent heat of evaporation [J/kg].
#[inline]
pub fn l_v(t: f64) -> f64 {
    L_TRI + (C_PV - C_PW) * (t - T_TRI)
}

/// Dry-air density from total pressure, standard potential temperature and mixing ratio.
#[inline]
pub fn rhod(p: f64, th_std: f64, r_v: f64) -> f64 {
    (p - p_v(p, r_v)) / (exner(p) * R_D * th_std)
}

/// Total pressure of moist air (ideal gas for both components).
#[inline]
pub fn pressure(rhod: f64, r_v: f64, t: f64) -> f64 {
    rhod * (R_D + r_v * R_V) * t
}

/// Relative humidity with respect to liquid water.
#[inline]
pub fn relative_humidity(p: f64, r_v: f64, t: f64) -> f64 {
    p * r_v / (r_v + EPS) / p_vs(t)
}

/// Vapour mixing ratio giving relative humidity `rh` at temperature `t` and pressure `p`.
#[inline]
pub fn r_v_from_rh(rh: f64, t: f64, p: f64) -> f64 {
    let e = rh * p_vs(t);
    EPS * e / (p - e)
}

/// Hydrostatic pressure at height `z` assuming constant standard potential temperature
/// and vapour mixing ratio between `z_0` (where the pressure is `p_0`) and `z`.
pub fn p_hydro(z: f64, th_std: f64, r_v: f64, z_0: f64, p_0: f64) -> f64 {
    let r_mix = (R_D + r_v * R_V) / (1.0 + r_v);
    let c = KAPPA_D;
    (p_0.powf(c) - c * G * P_1000.powf(c) / (r_mix * th_std) * (z - z_0)).powf(1.0 / c)
}

/// Hydrostatic pressure after a displacement `dz` through air of constant density `rho`.
#[inline]
pub fn p_hydro_const_rho(dz: f64, p: f64, rho: f64) -> f64 {
    p - rho * G * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn rel_close(a: f64, b: f64) -> bool {
        ((a - b) / b).abs() < TOLERANCE
    }

    #[test]
    fn eps_is_close_to_textbook_value() {
        assert!((EPS - 0.622).abs() < 1e-3);
    }

    #[test]
    fn th_std_and_th_dry_conversions_are_inverse() {
        let th = 301.7;
        let r_v = 0.015;
        assert!(rel_close(th_dry2std(th_std2dry(th, r_v), r_v), th));
    }

    #[test]
    fn dry_potential_temperature_exceeds_standard_one_in_moist_air() {
        assert!(th_std2dry(300.0, 0.02) > 300.0);
        assert!(rel_close(th_std2dry(300.0, 0.0), 300.0));
    }

    #[test]
    fn temperature_recovers_initial_value_from_derived_density() {
        let (t_0, p_0, r_0) = (300.0, 101_300.0, 0.022);
        let th_0 = t_0 * (P_1000 / p_0).powf(R_D / C_PD);
        let th_d = th_std2dry(th_0, r_0);
        let rho = rhod(p_0, th_0, r_0);
        assert!(rel_close(temperature(th_d, rho), t_0));
    }

    #[test]
    fn pressure_is_consistent_with_density_and_temperature() {
        let (t_0, p_0, r_0) = (285.0, 90_000.0, 0.008);
        let th_0 = t_0 * (P_1000 / p_0).powf(R_D / C_PD);
        let rho = rhod(p_0, th_0, r_0);
        assert!(rel_close(pressure(rho, r_0, t_0), p_0));
    }

    #[test]
    fn saturation_pressure_matches_reference_points() {
        assert!(rel_close(p_vs(T_TRI), P_TRI));
        // About 3.5 kPa at 300 K.
        let p300 = p_vs(300.0);
        assert!(p300 > 3400.0 && p300 < 3650.0);
    }

    #[test]
    fn relative_humidity_roundtrips_through_mixing_ratio() {
        let r_v = r_v_from_rh(0.95, 290.0, 95_000.0);
        assert!(rel_close(relative_humidity(95_000.0, r_v, 290.0), 0.95));
    }

    #[test]
    fn p_hydro_returns_surface_pressure_at_origin_and_decreases_with_height() {
        let p0 = 101_300.0;
        assert!(rel_close(p_hydro(0.0, 300.0, 0.01, 0.0, p0), p0));
        let p100 = p_hydro(100.0, 300.0, 0.01, 0.0, p0);
        assert!(p100 < p0);
        // Roughly 1.15 kg/m^3 * g * 100 m below the surface value.
        assert!((p0 - p100 - 1130.0).abs() < 60.0);
    }

    #[test]
    fn p_hydro_const_rho_subtracts_column_weight() {
        assert_eq!(p_hydro_const_rho(10.0, 1000.0, 1.0), 1000.0 - G * 10.0);
    }

    #[test]
    fn latent_heat_decreases_with_temperature() {
        assert!(l_v(300.0) < l_v(280.0));
        assert!(rel_close(l_v(T_TRI), L_TRI));
    }
}
