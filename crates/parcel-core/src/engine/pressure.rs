//! Hydrostatic pressure-profile policies.
//!
//! Every policy leaves `p` and `rhod` consistent with the moist ideal-gas relation for
//! the current `th_d` and `r_v`.

use super::config::PressureProfile;
use super::state::{InitialConditions, State};
use crate::core::thermo;

/// Reference density of the constant-density profile [kg/m3].
pub const RHO_FIXED: f64 = 1.13;

/// Updates pressure and dry-air density after the parcel moved by `dz`.
///
/// `state.z` must already hold the new height.
pub fn update(profile: PressureProfile, init: &InitialConditions, dz: f64, state: &mut State) {
    match profile {
        PressureProfile::ConstThRv => {
            let p_hydro = thermo::p_hydro(state.z, init.th_0, init.r_0, 0.0, init.p_0);
            state.rhod = thermo::rhod(p_hydro, init.th_0, init.r_0);
            state.p = thermo::pressure(
                state.rhod,
                state.r_v,
                thermo::temperature(state.th_d, state.rhod),
            );
        }
        PressureProfile::ConstRhod => {
            state.p = thermo::p_hydro_const_rho(state.z, init.p_0, RHO_FIXED);
            rederive_rhod(state);
        }
        PressureProfile::PiecewiseConstRhod => {
            state.p = thermo::p_hydro_const_rho(dz, state.p, state.rhod);
            rederive_rhod(state);
        }
    }
}

fn rederive_rhod(state: &mut State) {
    state.rhod = thermo::rhod(
        state.p,
        thermo::th_dry2std(state.th_d, state.r_v),
        state.r_v,
    );
}
