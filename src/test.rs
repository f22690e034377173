//! End-to-end scenarios exercising the full time step.

use {
    crate::{
        model::{self, diagnostics, step, State},
        parameters::Parameters,
    },
    approx::assert_abs_diff_eq,
    lazy_static::lazy_static,
    tempdir::TempDir,
};

fn params(ny: usize, ischeme: u8) -> Parameters {
    let mut params = Parameters::default();
    params.numerical.grid_latitudes = ny;
    params.scheme.ischeme = ischeme;
    params
}

fn advance(state: &mut State, steps: usize) {
    for _ in 0..steps {
        step::step(state).unwrap();
        diagnostics::diagnose(state);
    }
}

fn mass_drift(state: &State) -> f64 {
    let mass = diagnostics::total_mass(&state.grid, &state.phi);
    ((mass - state.mass_init) / state.mass_init).abs()
}

lazy_static! {
    /// Twelve semi-Lagrangian steps of the balanced solid-body case, shared
    /// by the steady-state assertions below.
    static ref TC2_RUN: State = {
        let params = params(32, 1);
        let mut state = State::build(&params, 2, false).unwrap();
        advance(&mut state, 12);
        state
    };
}

#[test]
fn tc2_remains_steady_over_short_run() {
    let state = &*TC2_RUN;

    // The sampled analytic state adjusts to the nearest discrete balance, so
    // the tolerance scales with the O(dy^2) truncation at this resolution.
    let u_err = diagnostics::l2_error(&state.u, &state.u_init);
    assert!(u_err < 2e-2, "u error {:e} after 12 steps", u_err);

    let h_err = diagnostics::linf_error(&state.phi, &state.phi_init) / state.config.gravity;
    assert!(h_err < 5.0, "height error {} m", h_err);
}

#[test]
fn tc2_stays_finite_with_small_mass_drift() {
    let state = &*TC2_RUN;
    assert!(state.phi.iter().all(|x| x.is_finite()));
    assert!(state.v.iter().all(|x| x.is_finite()));
    assert!(mass_drift(state) < 1e-5);
    assert!(!state.output.monitor.is_empty());
}

#[test]
fn tc2_slice_conserves_mass() {
    let params = params(32, 3);
    let mut state = State::build(&params, 2, false).unwrap();
    advance(&mut state, 6);

    assert!(
        mass_drift(&state) < 1e-7,
        "conservative remap drifted by {:e}",
        mass_drift(&state)
    );
    let u_err = diagnostics::l2_error(&state.u, &state.u_init);
    assert!(u_err < 2e-2, "u error {:e}", u_err);
}

#[test]
fn tc105_bell_advection_preserves_shape_and_mass() {
    let params = params(32, 3);
    let mut state = State::build(&params, 105, false).unwrap();
    let peak0 = state.phi.iter().fold(0.0_f64, |m, &x| m.max(x));

    advance(&mut state, 10);

    let peak = state.phi.iter().fold(0.0_f64, |m, &x| m.max(x));
    assert!(
        peak > 0.7 * peak0 && peak < 1.05 * peak0,
        "bell peak drifted from {:e} to {:e}",
        peak0,
        peak
    );
    // Undershoots stay small relative to the peak.
    let trough = state.phi.iter().fold(0.0_f64, |m, &x| m.min(x));
    assert!(trough > -0.05 * peak0, "undershoot {:e}", trough);
    assert!(mass_drift(&state) < 1e-7);
    // Winds are frozen.
    assert_eq!(state.u, state.u_init);
}

#[test]
fn tc9_gravity_waves_expand_without_blowup() {
    let params = params(32, 1);
    let mut state = State::build(&params, 9, false).unwrap();
    assert_eq!(state.two_omega, 0.0);
    advance(&mut state, 8);

    assert!(state.phi.iter().all(|x| x.is_finite() && *x > 0.0));
    assert!(state.u.iter().all(|x| x.is_finite()));
    // The bump radiates outward; nothing may grow above the initial peak.
    let peak0 = state
        .phi_init
        .iter()
        .fold(0.0_f64, |m, &x| m.max(x));
    let peak = state.phi.iter().fold(0.0_f64, |m, &x| m.max(x));
    assert!(peak < 1.005 * peak0, "peak grew from {:e} to {:e}", peak0, peak);
}

#[test]
fn tc7_jet_survives_a_few_steps() {
    let params = params(32, 1);
    let mut state = State::build(&params, 7, false).unwrap();
    advance(&mut state, 4);
    assert!(state.u.iter().all(|x| x.is_finite()));
    let umax = state.u.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    assert!(umax > 40.0 && umax < 160.0, "jet speed {}", umax);
}

#[test]
fn tc6_rossby_haurwitz_a_few_steps() {
    let params = params(32, 1);
    let mut state = State::build(&params, 6, false).unwrap();
    advance(&mut state, 4);
    assert!(state.phi.iter().all(|x| x.is_finite() && *x > 0.0));
}

#[test]
fn coriolis_variants_all_run() {
    for name in &["simple", "jt", "new"] {
        let mut params = params(16, 1);
        params.scheme.coriolis = name.to_string();
        let mut state = State::build(&params, 2, false).unwrap();
        advance(&mut state, 3);
        assert!(
            state.u.iter().all(|x| x.is_finite()),
            "scheme {} produced non-finite winds",
            name
        );
    }
}

#[test]
fn rotated_grid_resting_fluid_runs() {
    let mut params = params(16, 1);
    params.physical.rotation_angle = 0.4;
    let mut state = State::build(&params, 1, false).unwrap();
    advance(&mut state, 3);
    assert!(state.phi.iter().all(|x| x.is_finite()));
}

#[test]
fn run_writes_dump_files() {
    let tempdir = TempDir::new("sw-sphere").unwrap();
    let mut params = params(8, 1);
    params.environment.output_directory = tempdir.path().to_owned();
    params.numerical.duration = 0.1;

    let output = model::run(&params, 1, true).unwrap();
    assert!(!output.monitor.is_empty());
    assert!(!output.dump_times.is_empty());

    for field in &["u", "v", "h", "vort", "pv", "herr"] {
        let path = tempdir
            .path()
            .join(format!("sw_ic1_cor1_sl1_{}_t0_16x8.dat", field));
        assert!(path.exists(), "missing dump {:?}", path);
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 16 * 8 * 4);
    }
    assert!(tempdir.path().join("TC1_times.dat").exists());
    assert!(tempdir.path().join("sw_ic1_cor1_sl1_ref8_h_t0.dat").exists());
}

#[test]
fn resting_fluid_stays_at_rest() {
    let params = params(16, 1);
    let mut state = State::build(&params, 1, false).unwrap();
    advance(&mut state, 5);
    let umax = state.u.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    assert!(umax < 1e-8, "spurious wind {:e}", umax);
    assert_abs_diff_eq!(
        diagnostics::linf_error(&state.phi, &state.phi_init),
        0.0,
        epsilon = 1e-6
    );
}

/// One simulated day at a 100 s time step; run with `cargo test -- --ignored`.
#[test]
#[ignore]
fn tc2_one_day_at_small_time_step() {
    let mut params = params(32, 3);
    params.numerical.time_step = 100.0;
    let mut state = State::build(&params, 2, false).unwrap();
    advance(&mut state, 864);

    let h_err = diagnostics::linf_error(&state.phi, &state.phi_init) / state.config.gravity;
    assert!(h_err < 5.0, "height error {} m after one day", h_err);
    assert!(mass_drift(&state) < 1e-10);
}

/// 12-day rotational bell advection; run with `cargo test -- --ignored`.
#[test]
#[ignore]
fn tc105_twelve_day_rotation() {
    let params = params(32, 3);
    let mut state = State::build(&params, 105, false).unwrap();
    let peak0 = state.phi.iter().fold(0.0_f64, |m, &x| m.max(x));
    let steps = (12.0 * crate::constants::SEC_PER_DAY / state.config.dt) as usize;
    advance(&mut state, steps);

    let peak = state.phi.iter().fold(0.0_f64, |m, &x| m.max(x));
    let trough = state.phi.iter().fold(0.0_f64, |m, &x| m.min(x));
    assert!(peak > 0.5 * peak0);
    assert!(trough > -1e-3 * peak0);
    assert!(mass_drift(&state) < 1e-9);
}
