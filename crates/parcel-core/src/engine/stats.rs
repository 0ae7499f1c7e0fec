use super::state::{Info, State};
use crate::core::thermo;

/// Derives temperature and relative humidity and tracks the running RH maximum.
pub fn update(state: &mut State, info: &mut Info) {
    state.temperature = thermo::temperature(state.th_d, state.rhod);
    state.rh = thermo::relative_humidity(state.p, state.r_v, state.temperature);
    info.record_rh(state.rh);
}

#[cfg(test)]
mod tests {
    use super::super::config::RunConfigBuilder;
    use super::super::state::InitialConditions;
    use super::*;

    #[test]
    fn stats_recover_initial_temperature_and_humidity() {
        let config = RunConfigBuilder::with_defaults()
            .t_0(290.0)
            .p_0(100_000.0)
            .rh_0(0.9)
            .build()
            .unwrap();
        let init = InitialConditions::from_config(&config);
        let mut state = State::initial(&config, &init);
        let mut info = Info::new("test");
        update(&mut state, &mut info);
        assert!((state.temperature - 290.0).abs() < 1e-9);
        assert!((state.rh - 0.9).abs() < 1e-9);
        assert_eq!(info.rh_max, state.rh);
    }

    #[test]
    fn rh_max_keeps_the_largest_value() {
        let config = RunConfigBuilder::with_defaults().r_0(0.01).build().unwrap();
        let init = InitialConditions::from_config(&config);
        let mut state = State::initial(&config, &init);
        let mut info = Info::new("test");
        update(&mut state, &mut info);
        let first = info.rh_max;
        state.r_v *= 0.5;
        update(&mut state, &mut info);
        assert!(state.rh < first);
        assert_eq!(info.rh_max, first);
    }
}
