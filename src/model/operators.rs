//! Discrete C-grid differential operators on the sphere.

use {
    crate::{grid::Grid, utils::arr2zero},
    ndarray::Array2,
};

/// Zonal pressure-gradient component at u points.
pub fn grad_x(grid: &Grid, f: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 0..ny {
            out[[i, j]] = (f[[i, j]] - f[[im1, j]]) / (grid.radius * grid.cosp[j] * grid.dx);
        }
    }
    out
}

/// Meridional pressure-gradient component at v points; zero on the polar
/// rows, whose v values are reconstructed rather than prognosed.
pub fn grad_y(grid: &Grid, f: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny + 1);
    for i in 0..nx {
        for j in 1..ny {
            out[[i, j]] = (f[[i, j]] - f[[i, j - 1]]) / (grid.radius * grid.dy);
        }
    }
    out
}

/// Horizontal divergence at cell centres. The polar v rows drop out with
/// cos(latitude), so the column sums telescope to zero over the sphere.
pub fn divergence(grid: &Grid, u: &Array2<f64>, v: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny);
    for i in 0..nx {
        let ip1 = (i + 1) % nx;
        for j in 0..ny {
            let du = (u[[ip1, j]] - u[[i, j]]) / (grid.radius * grid.cosp[j] * grid.dx);
            let dv = (v[[i, j + 1]] * grid.cosv[j + 1] - v[[i, j]] * grid.cosv[j])
                / (grid.radius * grid.cosp[j] * grid.dy);
            out[[i, j]] = du + dv;
        }
    }
    out
}

/// Relative vorticity at vorticity points; the polar rows use the ring
/// circulation over the residual polar cap.
pub fn vorticity(grid: &Grid, u: &Array2<f64>, v: &Array2<f64>) -> Array2<f64> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = arr2zero(nx, ny + 1);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 1..ny {
            let dv = (v[[i, j]] - v[[im1, j]]) / (grid.radius * grid.cosv[j] * grid.dx);
            let du = (u[[i, j]] * grid.cosp[j] - u[[i, j - 1]] * grid.cosp[j - 1])
                / (grid.radius * grid.cosv[j] * grid.dy);
            out[[i, j]] = dv - du;
        }
    }

    // Polar caps by Stokes' theorem around the nearest u-ring.
    let mut circ_s = 0.0;
    let mut circ_n = 0.0;
    for i in 0..nx {
        circ_s += u[[i, 0]];
        circ_n += u[[i, ny - 1]];
    }
    let cap_s = crate::constants::TWO_PI * (1.0 + grid.sinp[0]) * grid.radius;
    let cap_n = crate::constants::TWO_PI * (1.0 - grid.sinp[ny - 1]) * grid.radius;
    let zeta_s = -circ_s * grid.dx * grid.cosp[0] / cap_s;
    let zeta_n = circ_n * grid.dx * grid.cosp[ny - 1] / cap_n;
    for i in 0..nx {
        out[[i, 0]] = zeta_s;
        out[[i, ny]] = zeta_n;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::R_EARTH;
    use approx::assert_abs_diff_eq;

    #[test]
    fn divergence_integrates_to_zero() {
        let grid = Grid::new(64, 32, R_EARTH, 0.0);
        let mut u = arr2zero(grid.nx, grid.ny);
        let mut v = arr2zero(grid.nx, grid.ny + 1);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                u[[i, j]] = (3.0 * grid.xu[i]).sin() * grid.yp[j].cos() + 2.0;
            }
            for j in 0..=grid.ny {
                v[[i, j]] = (grid.xp[i]).cos() * (2.0 * grid.yv[j]).sin();
            }
        }
        let div = divergence(&grid, &u, &v);
        let total: f64 = (0..grid.nx)
            .flat_map(|i| (0..grid.ny).map(move |j| (i, j)))
            .map(|(i, j)| div[[i, j]] * grid.area[j])
            .sum();
        let scale: f64 = div.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
        assert_abs_diff_eq!(total, 0.0, epsilon = 1e-12 * scale.max(1e-30));
    }

    #[test]
    fn solid_body_vorticity_is_constant() {
        let grid = Grid::new(64, 32, R_EARTH, 0.0);
        let omega = 3.0e-6;
        let mut u = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                u[[i, j]] = omega * grid.radius * grid.yp[j].cos();
            }
        }
        let v = arr2zero(grid.nx, grid.ny + 1);
        let zeta = vorticity(&grid, &u, &v);
        for j in 1..grid.ny {
            // zeta = 2*omega*sin(theta) for solid-body rotation.
            assert_abs_diff_eq!(
                zeta[[7, j]],
                2.0 * omega * grid.sinv[j],
                epsilon = 2.0 * omega * grid.dy * grid.dy
            );
        }
        assert_abs_diff_eq!(zeta[[0, 0]], -2.0 * omega, epsilon = 2.0 * omega * 0.05);
        assert_abs_diff_eq!(zeta[[0, grid.ny]], 2.0 * omega, epsilon = 2.0 * omega * 0.05);
    }

    #[test]
    fn gradient_of_constant_vanishes() {
        let grid = Grid::new(32, 16, R_EARTH, 0.0);
        let mut f = arr2zero(grid.nx, grid.ny);
        f.fill(7.5);
        assert!(grad_x(&grid, &f).iter().all(|&x| x == 0.0));
        assert!(grad_y(&grid, &f).iter().all(|&x| x == 0.0));
    }
}
