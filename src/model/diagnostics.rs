//! Per-step flow monitoring: extrema, mass and steady-state error norms.

use {
    super::State,
    crate::grid::Grid,
    log::debug,
    ndarray::Array2,
};

/// Total mass functional sum(phi * A) over the sphere (unit-sphere areas).
pub fn total_mass(grid: &Grid, phi: &Array2<f64>) -> f64 {
    let mut mass = 0.0;
    for i in 0..grid.nx {
        for j in 0..grid.ny {
            mass += phi[[i, j]] * grid.area[j];
        }
    }
    mass
}

/// Relative l2 error of a field against its initial state.
pub fn l2_error(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        num += (x - y) * (x - y);
        den += y * y;
    }
    if den > 0.0 {
        (num / den).sqrt()
    } else {
        num.sqrt()
    }
}

pub fn linf_error(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0_f64, |m, (&x, &y)| m.max((x - y).abs()))
}

/// Computes the monitor quantities, appends one line to the run output and
/// echoes it at debug level.
pub fn diagnose(state: &mut State) {
    let umax = state.u.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    let vmax = state.v.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    let mass = total_mass(&state.grid, &state.phi);
    let drift = (mass - state.mass_init) / state.mass_init;

    let line = if state.config.steady {
        format!(
            "{:.1} {:.6} {:.6} {:.14e} {:.6e} {:.6e}\n",
            state.t,
            umax,
            vmax,
            drift,
            l2_error(&state.u, &state.u_init),
            linf_error(&state.phi, &state.phi_init) / state.config.gravity,
        )
    } else {
        format!("{:.1} {:.6} {:.6} {:.14e}\n", state.t, umax, vmax, drift)
    };

    debug!("{}", line.trim());
    state.output.monitor += &line;
}
