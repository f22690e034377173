use core::f64::consts::PI;

/// Mean Earth radius [m].
pub const R_EARTH: f64 = 6.3712e6;

/// Gravitational acceleration [m/s^2].
pub const GRAVITY: f64 = 9.80665;

/// Twice the Earth's rotation rate [1/s].
pub const TWO_OMEGA: f64 = 1.458_42e-4;

pub const SEC_PER_DAY: f64 = 86_400.0;

/// Reference geopotential of the Williamson test suite [m^2/s^2].
pub const PHI_REF: f64 = 2.94e4;

pub const TWO_PI: f64 = 2.0 * PI;
pub const HALF_PI: f64 = 0.5 * PI;

/// Base time step for a 64x32 grid [s]; halves with each doubling of Nx.
pub const DT_BASE: f64 = 1600.0;

pub fn default_time_step(nx: usize) -> f64 {
    DT_BASE * 64.0 / nx as f64
}
