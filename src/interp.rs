//! Semi-Lagrangian interpolation kernels on the staggered sphere grid.
//!
//! Bilinear gathers drive the trajectory iteration; 4x4 cubic Lagrange
//! gathers evaluate the departure-point right-hand sides. Both interpolate
//! in longitude first and latitude second, and share one polar-reflection
//! primitive: a row beyond a pole maps to its mirror row with the column
//! shifted half the domain and, for vector fields, the sign flipped.

use {crate::grid::Grid, ndarray::Array2};

/// Which staggered sub-grid a field lives on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stagger {
    /// West cell edges: longitudes i*dx, phi-row latitudes.
    U,
    /// South cell edges: phi-column longitudes, v-row latitudes (ny+1 rows).
    V,
    /// Cell centres.
    P,
    /// Cell corners: u-column longitudes, v-row latitudes (ny+1 rows).
    Z,
}

impl Stagger {
    /// Continuous (column, row) coordinates of a point; integer values sit
    /// exactly on grid locations of this stagger.
    pub fn fractional(self, grid: &Grid, lambda: f64, theta: f64) -> (f64, f64) {
        let half_ny = grid.ny as f64 / 2.0;
        let fi = match self {
            Stagger::U | Stagger::Z => lambda / grid.dx,
            Stagger::V | Stagger::P => lambda / grid.dx - 0.5,
        };
        let fj = match self {
            Stagger::U | Stagger::P => theta / grid.dy + half_ny - 0.5,
            Stagger::V | Stagger::Z => theta / grid.dy + half_ny,
        };
        (fi, fj)
    }

    /// Resolves a possibly out-of-range (column, row) index pair to a stored
    /// location plus the reflection sign for vector quantities.
    pub fn reflect(self, grid: &Grid, i: isize, j: isize) -> (usize, usize, f64) {
        let nx = grid.nx as isize;
        let ny = grid.ny as isize;
        let (mut i, mut j) = (i, j);
        let mut sign = 1.0;

        match self {
            Stagger::U | Stagger::P => {
                if j < 0 {
                    j = -1 - j;
                    i += nx / 2;
                    sign = -sign;
                } else if j > ny - 1 {
                    j = 2 * ny - 1 - j;
                    i += nx / 2;
                    sign = -sign;
                }
            }
            Stagger::V | Stagger::Z => {
                if j < 0 {
                    j = -j;
                    i += nx / 2;
                    sign = -sign;
                } else if j > ny {
                    j = 2 * ny - j;
                    i += nx / 2;
                    sign = -sign;
                }
            }
        }

        (i.rem_euclid(nx) as usize, j as usize, sign)
    }
}

/// Splits a continuous index into cell and fraction, snapping away the
/// roundoff of the coordinate-to-index division so that a point sitting on a
/// grid location gets a fraction of exactly zero (the interpolators are then
/// bitwise-exact there).
fn split_index(f: f64) -> (isize, f64) {
    let mut i0 = f.floor() as isize;
    let mut frac = f - i0 as f64;
    if frac > 1.0 - 1e-12 {
        i0 += 1;
        frac = 0.0;
    } else if frac < 1e-12 {
        frac = 0.0;
    }
    (i0, frac)
}

fn fetch(field: &Array2<f64>, grid: &Grid, st: Stagger, vector: bool, i: isize, j: isize) -> f64 {
    let (ii, jj, sign) = st.reflect(grid, i, j);
    if vector {
        sign * field[[ii, jj]]
    } else {
        field[[ii, jj]]
    }
}

/// Bilinear interpolation with polar wrap; used by the trajectory solver.
pub fn bilinear(
    field: &Array2<f64>,
    grid: &Grid,
    st: Stagger,
    vector: bool,
    lambda: f64,
    theta: f64,
) -> f64 {
    let (fi, fj) = st.fractional(grid, lambda, theta);
    let (i0, p) = split_index(fi);
    let (j0, q) = split_index(fj);

    let f00 = fetch(field, grid, st, vector, i0, j0);
    let f10 = fetch(field, grid, st, vector, i0 + 1, j0);
    let f01 = fetch(field, grid, st, vector, i0, j0 + 1);
    let f11 = fetch(field, grid, st, vector, i0 + 1, j0 + 1);

    (1.0 - q) * ((1.0 - p) * f00 + p * f10) + q * ((1.0 - p) * f01 + p * f11)
}

/// Cubic Lagrange basis on the uniform mesh; `p` is the offset from the
/// second stencil node in grid units.
fn lagrange_weights(p: f64) -> [f64; 4] {
    let pm1 = p - 1.0;
    let pm2 = p - 2.0;
    let pp1 = p + 1.0;
    [
        -p * pm1 * pm2 * (1.0 / 6.0),
        pp1 * pm1 * pm2 * 0.5,
        -p * pp1 * pm2 * 0.5,
        p * pp1 * pm1 * (1.0 / 6.0),
    ]
}

/// 4x4 cubic Lagrange interpolation, longitude first, then latitude.
pub fn cubic(
    field: &Array2<f64>,
    grid: &Grid,
    st: Stagger,
    vector: bool,
    lambda: f64,
    theta: f64,
) -> f64 {
    let (fi, fj) = st.fractional(grid, lambda, theta);
    let (i0, p) = split_index(fi);
    let (j0, q) = split_index(fj);
    let wx = lagrange_weights(p);
    let wy = lagrange_weights(q);

    let mut acc = 0.0;
    for (l, wyl) in wy.iter().enumerate() {
        let j = j0 - 1 + l as isize;
        let mut row = 0.0;
        for (k, wxk) in wx.iter().enumerate() {
            let i = i0 - 1 + k as isize;
            row += wxk * fetch(field, grid, st, vector, i, j);
        }
        acc += wyl * row;
    }
    acc
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{constants::R_EARTH, utils::arr2zero};
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid {
        Grid::new(32, 16, R_EARTH, 0.0)
    }

    fn smooth_p_field(grid: &Grid) -> Array2<f64> {
        let mut f = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                f[[i, j]] = (2.0 * grid.xp[i]).sin() * grid.yp[j].cos();
            }
        }
        f
    }

    #[test]
    fn arrival_point_identity_is_bitwise() {
        let grid = grid();
        let f = smooth_p_field(&grid);
        for &(i, j) in &[(0usize, 0usize), (7, 3), (31, 15), (16, 8)] {
            let got = cubic(&f, &grid, Stagger::P, false, grid.xp[i], grid.yp[j]);
            assert_eq!(got, f[[i, j]]);
            let got = bilinear(&f, &grid, Stagger::P, false, grid.xp[i], grid.yp[j]);
            assert_eq!(got, f[[i, j]]);
        }
    }

    #[test]
    fn cubic_reproduces_cubics_in_longitude() {
        // Away from the poles a cubic in the column coordinate is exact.
        let grid = grid();
        let mut f = arr2zero(grid.nx, grid.ny);
        let poly = |x: f64| 0.5 + 1.5 * x - 0.25 * x * x + 0.03 * x * x * x;
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                f[[i, j]] = poly(i as f64);
            }
        }
        let j = 8;
        for &fi in &[4.25, 4.5, 4.75, 5.0] {
            let lam = (fi + 0.5) * grid.dx;
            let got = cubic(&f, &grid, Stagger::P, false, lam, grid.yp[j]);
            assert_abs_diff_eq!(got, poly(fi), epsilon = 1e-10);
        }
    }

    #[test]
    fn periodicity_under_column_shift() {
        let grid = grid();
        let f = smooth_p_field(&grid);

        // Shift the field by 5 columns and compare interpolants.
        let mut shifted = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                shifted[[(i + 5) % grid.nx, j]] = f[[i, j]];
            }
        }
        let lam = 0.37;
        let th = 0.61;
        let a = cubic(&f, &grid, Stagger::P, false, lam, th);
        let b = cubic(
            &shifted,
            &grid,
            Stagger::P,
            false,
            crate::utils::wrap_lon(lam + 5.0 * grid.dx),
            th,
        );
        assert_abs_diff_eq!(a, b, epsilon = 1e-13);
    }

    #[test]
    fn scalar_pole_reflection_is_continuous() {
        // A zonally symmetric scalar is even across the pole; interpolating
        // just inside and "beyond" the last row must agree.
        let grid = grid();
        let mut f = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                f[[i, j]] = grid.yp[j].sin().powi(2);
            }
        }
        let th = grid.yp[grid.ny - 1] + 0.4 * grid.dy;
        let a = cubic(&f, &grid, Stagger::P, false, 0.3, th);
        let b = cubic(&f, &grid, Stagger::P, false, 0.3 + core::f64::consts::PI, th);
        assert_abs_diff_eq!(a, b, epsilon = 1e-13);
    }

    #[test]
    fn vector_reflection_flips_sign() {
        let grid = grid();
        let (ii, jj, sign) = Stagger::U.reflect(&grid, 3, -1);
        assert_eq!((ii, jj), (3 + grid.nx / 2, 0));
        assert_eq!(sign, -1.0);
        let (ii, jj, sign) = Stagger::V.reflect(&grid, 0, grid.ny as isize + 1);
        assert_eq!((ii, jj), (grid.nx / 2, grid.ny - 1));
        assert_eq!(sign, -1.0);
    }
}
