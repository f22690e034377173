use ndarray::{Array2, ShapeBuilder};

use crate::constants::TWO_PI;

/// Longitude-contiguous zero array, first index longitude, second latitude.
pub fn arr2zero(nx: usize, ny: usize) -> Array2<f64> {
    Array2::from_shape_vec((nx, ny).strides((1, nx)), vec![0.0; nx * ny]).unwrap()
}

/// Wraps a longitude into [0, 2*pi).
pub fn wrap_lon(lambda: f64) -> f64 {
    lambda.rem_euclid(TWO_PI)
}

/// Wraps a longitude difference into (-pi, pi].
pub fn wrap_dlon(dlambda: f64) -> f64 {
    let d = dlambda.rem_euclid(TWO_PI);
    if d > core::f64::consts::PI {
        d - TWO_PI
    } else {
        d
    }
}
