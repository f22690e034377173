//! Polar wind reconstruction and C-grid staggered averaging.
//!
//! At each pole the nearest zonal u-ring determines a single horizontal
//! vector by least squares; that vector supplies the polar v row and the
//! polar values of every staggered average. The polar v rows are therefore
//! derived data and are refreshed whenever u changes.

use {
    crate::{grid::Grid, utils::arr2zero},
    ndarray::Array2,
};

/// Horizontal wind vector at a pole: magnitude and the longitude its tip
/// points toward.
#[derive(Debug, Clone, Copy)]
pub struct PolarWind {
    pub vmag: f64,
    pub azimuth: f64,
}

impl PolarWind {
    /// Zonal component of the polar vector seen at longitude `lambda`.
    pub fn u_at(&self, lambda: f64) -> f64 {
        -self.vmag * (lambda - self.azimuth).sin()
    }

    /// Meridional component; the sign flips at the north pole where local
    /// north points toward the pole itself.
    pub fn v_at(&self, lambda: f64, north: bool) -> f64 {
        let v = self.vmag * (lambda - self.azimuth).cos();
        if north {
            -v
        } else {
            v
        }
    }
}

/// Least-squares fit u(lambda) = a sin(lambda) + b cos(lambda) over the
/// u-ring nearest the pole (`j = 0` south, `j = ny-1` north). On the equally
/// spaced ring the normal equations collapse to discrete Fourier sums.
pub fn fit_polar_wind(grid: &Grid, u: &Array2<f64>, north: bool) -> PolarWind {
    let nx = grid.nx;
    let j = if north { grid.ny - 1 } else { 0 };

    let mut a = 0.0;
    let mut b = 0.0;
    for i in 0..nx {
        a += u[[i, j]] * grid.xu[i].sin();
        b += u[[i, j]] * grid.xu[i].cos();
    }
    a *= 2.0 / nx as f64;
    b *= 2.0 / nx as f64;

    // u = -V sin(lambda - azimuth) expands to a = -V cos(az), b = V sin(az).
    PolarWind {
        vmag: a.hypot(b),
        azimuth: b.atan2(-a),
    }
}

/// Refreshes the polar v rows from the adjacent u-rings.
pub fn fill_polar_v(grid: &Grid, u: &Array2<f64>, v: &mut Array2<f64>) {
    let ny = grid.ny;
    let south = fit_polar_wind(grid, u, false);
    let north = fit_polar_wind(grid, u, true);
    for i in 0..grid.nx {
        v[[i, 0]] = south.v_at(grid.xp[i], false);
        v[[i, ny]] = north.v_at(grid.xp[i], true);
    }
}

/// v averaged to u points (nx x ny); expects the polar v rows to be filled.
pub fn v_at_u(grid: &Grid, v: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 0..ny {
            out[[i, j]] =
                0.25 * (v[[im1, j]] + v[[im1, j + 1]] + v[[i, j]] + v[[i, j + 1]]);
        }
    }
    out
}

/// u averaged to v points (nx x (ny+1)); polar rows come from the fit.
pub fn u_at_v(grid: &Grid, u: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny + 1);
    for i in 0..nx {
        let ip1 = (i + 1) % nx;
        for j in 1..ny {
            out[[i, j]] =
                0.25 * (u[[i, j - 1]] + u[[ip1, j - 1]] + u[[i, j]] + u[[ip1, j]]);
        }
    }
    let south = fit_polar_wind(grid, u, false);
    let north = fit_polar_wind(grid, u, true);
    for i in 0..nx {
        out[[i, 0]] = south.u_at(grid.xp[i]);
        out[[i, ny]] = north.u_at(grid.xp[i]);
    }
    out
}

/// u averaged to phi points.
pub fn u_at_p(grid: &Grid, u: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny);
    for i in 0..nx {
        let ip1 = (i + 1) % nx;
        for j in 0..ny {
            out[[i, j]] = 0.5 * (u[[i, j]] + u[[ip1, j]]);
        }
    }
    out
}

/// v averaged to phi points; expects the polar v rows to be filled.
pub fn v_at_p(grid: &Grid, v: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny);
    for i in 0..nx {
        for j in 0..ny {
            out[[i, j]] = 0.5 * (v[[i, j]] + v[[i, j + 1]]);
        }
    }
    out
}

/// u averaged to vorticity points (nx x (ny+1)); polar rows from the fit.
pub fn u_at_z(grid: &Grid, u: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny + 1);
    for i in 0..nx {
        for j in 1..ny {
            out[[i, j]] = 0.5 * (u[[i, j - 1]] + u[[i, j]]);
        }
    }
    let south = fit_polar_wind(grid, u, false);
    let north = fit_polar_wind(grid, u, true);
    for i in 0..nx {
        out[[i, 0]] = south.u_at(grid.xu[i]);
        out[[i, ny]] = north.u_at(grid.xu[i]);
    }
    out
}

/// v averaged to vorticity points; expects the polar v rows to be filled.
pub fn v_at_z(grid: &Grid, v: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny + 1);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 0..=ny {
            out[[i, j]] = 0.5 * (v[[im1, j]] + v[[i, j]]);
        }
    }
    out
}
