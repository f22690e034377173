//! Departure-point iteration on the sphere.
//!
//! Trajectories are traced backward from every arrival point (u, v, phi and
//! corner families) by a fixed-point iteration in the arrival point's local
//! Cartesian tangent frame. Winds interpolated at the departure estimate are
//! parallel-transported into that frame by the spherical rotation matrix
//! before the midpoint displacement is formed, and the displaced point is
//! projected back onto the sphere.

use {
    crate::{
        grid::Grid,
        interp::{bilinear, Stagger},
        polar,
        utils::{arr2zero, wrap_dlon, wrap_lon},
    },
    crate::constants::HALF_PI,
    ndarray::Array2,
};

/// Departure longitude/latitude pairs for every arrival-point family, plus
/// the polar-cap modified fields required by the conservative remap.
#[derive(Debug, Clone)]
pub struct DeparturePoints {
    pub xdu: Array2<f64>,
    pub ydu: Array2<f64>,
    pub xdv: Array2<f64>,
    pub ydv: Array2<f64>,
    pub xdp: Array2<f64>,
    pub ydp: Array2<f64>,
    pub xdz: Array2<f64>,
    pub ydz: Array2<f64>,

    pub xdp_mod: Array2<f64>,
    pub ydp_mod: Array2<f64>,
    pub xdv_mod: Array2<f64>,
    pub ydv_mod: Array2<f64>,

    /// False until the first computation; selects the wind-based first guess.
    pub initialized: bool,
}

impl DeparturePoints {
    pub fn new(grid: &Grid) -> Self {
        let (nx, ny) = (grid.nx, grid.ny);
        DeparturePoints {
            xdu: arr2zero(nx, ny),
            ydu: arr2zero(nx, ny),
            xdv: arr2zero(nx, ny + 1),
            ydv: arr2zero(nx, ny + 1),
            xdp: arr2zero(nx, ny),
            ydp: arr2zero(nx, ny),
            xdz: arr2zero(nx, ny + 1),
            ydz: arr2zero(nx, ny + 1),
            xdp_mod: arr2zero(nx, ny),
            ydp_mod: arr2zero(nx, ny),
            xdv_mod: arr2zero(nx, ny + 1),
            ydv_mod: arr2zero(nx, ny + 1),
            initialized: false,
        }
    }
}

/// Rotation coefficients (m11, m12) carrying a tangent vector at the
/// departure point into the arrival point's frame; `dlam` is the arrival
/// longitude minus the departure longitude.
pub fn rotation(theta_a: f64, theta_d: f64, dlam: f64) -> (f64, f64) {
    let (sa, ca) = theta_a.sin_cos();
    let (sd, cd) = theta_d.sin_cos();
    let (sl, cl) = dlam.sin_cos();
    let den = 1.0 + sa * sd + ca * cd * cl;
    let m11 = (ca * cd + (1.0 + sa * sd) * cl) / den;
    let m12 = (sa + sd) * sl / den;
    (m11, m12)
}

/// Parallel transport of the wind vector (u, v) from the departure point to
/// the arrival frame.
pub fn rotate_to_arrival(theta_a: f64, theta_d: f64, dlam: f64, u: f64, v: f64) -> (f64, f64) {
    let (m11, m12) = rotation(theta_a, theta_d, dlam);
    (m11 * u + m12 * v, -m12 * u + m11 * v)
}

/// Projects a local Cartesian displacement (x east, y north, metres) at an
/// arrival point of latitude `theta_a` back onto the sphere; returns the
/// longitude increment and the departure latitude.
fn project(radius: f64, theta_a: f64, x: f64, y: f64) -> (f64, f64) {
    let (sa, ca) = theta_a.sin_cos();
    let r = (x * x + y * y + radius * radius).sqrt();
    let sin_td = ((y * ca + radius * sa) / r).max(-1.0).min(1.0);
    let dlam = x.atan2(radius * ca - y * sa);
    (dlam, sin_td.asin())
}

#[allow(clippy::too_many_arguments)]
fn solve_family(
    grid: &Grid,
    dt: f64,
    niter: usize,
    u0: &Array2<f64>,
    v0: &Array2<f64>,
    lam_a: &[f64],
    th_a: &[f64],
    ua: &Array2<f64>,
    va: &Array2<f64>,
    xd: &mut Array2<f64>,
    yd: &mut Array2<f64>,
    fresh: bool,
) {
    let rows = th_a.len();

    if fresh {
        for i in 0..grid.nx {
            for j in 0..rows {
                let (dlam, td) = project(grid.radius, th_a[j], -dt * ua[[i, j]], -dt * va[[i, j]]);
                xd[[i, j]] = wrap_lon(lam_a[i] + dlam);
                yd[[i, j]] = td;
            }
        }
    }

    for _ in 0..niter {
        for i in 0..grid.nx {
            for j in 0..rows {
                let ud = bilinear(u0, grid, Stagger::U, true, xd[[i, j]], yd[[i, j]]);
                let vd = bilinear(v0, grid, Stagger::V, true, xd[[i, j]], yd[[i, j]]);
                let dlam_ad = wrap_dlon(lam_a[i] - xd[[i, j]]);
                let (ur, vr) = rotate_to_arrival(th_a[j], yd[[i, j]], dlam_ad, ud, vd);

                let x = -0.5 * dt * (ua[[i, j]] + ur);
                let y = -0.5 * dt * (va[[i, j]] + vr);
                let (dlam, td) = project(grid.radius, th_a[j], x, y);
                xd[[i, j]] = wrap_lon(lam_a[i] + dlam);
                yd[[i, j]] = td;
            }
        }
    }
}

/// Recomputes departure points for all four arrival families. `u0`/`v0` are
/// the previous-level winds (interpolated along the trajectory), `u`/`v` the
/// current iterate supplying the arrival-point wind; the polar v rows of both
/// must already be reconstructed.
#[allow(clippy::too_many_arguments)]
pub fn compute(
    grid: &Grid,
    dt: f64,
    niter: usize,
    u0: &Array2<f64>,
    v0: &Array2<f64>,
    u: &Array2<f64>,
    v: &Array2<f64>,
    dep: &mut DeparturePoints,
) {
    let fresh = !dep.initialized;

    let va_u = polar::v_at_u(grid, v);
    solve_family(
        grid, dt, niter, u0, v0, &grid.xu, &grid.yp, u, &va_u, &mut dep.xdu, &mut dep.ydu, fresh,
    );

    let ua_v = polar::u_at_v(grid, u);
    solve_family(
        grid, dt, niter, u0, v0, &grid.xp, &grid.yv, &ua_v, v, &mut dep.xdv, &mut dep.ydv, fresh,
    );

    let ua_p = polar::u_at_p(grid, u);
    let va_p = polar::v_at_p(grid, v);
    solve_family(
        grid, dt, niter, u0, v0, &grid.xp, &grid.yp, &ua_p, &va_p, &mut dep.xdp, &mut dep.ydp,
        fresh,
    );

    let ua_z = polar::u_at_z(grid, u);
    let va_z = polar::v_at_z(grid, v);
    solve_family(
        grid, dt, niter, u0, v0, &grid.xu, &grid.yv, &ua_z, &va_z, &mut dep.xdz, &mut dep.ydz,
        fresh,
    );

    dep.initialized = true;
}

/// Cosine taper used for both the modified departure points and the damped
/// winds: 1 equatorward of the 4*dy buffer rings, 0 at the poles.
pub fn polar_weight(grid: &Grid, theta: f64) -> f64 {
    let buffer = 4.0 * grid.dy;
    let south = -HALF_PI + buffer;
    let north = HALF_PI - buffer;
    if theta < south {
        let c = (HALF_PI * (south - theta) / buffer).cos();
        c * c
    } else if theta > north {
        let c = (HALF_PI * (theta - north) / buffer).cos();
        c * c
    } else {
        1.0
    }
}

/// Pulls one departure point toward its arrival point in the polar-Cartesian
/// projection of the nearer cap.
fn pull_toward_arrival(
    lam_a: f64,
    th_a: f64,
    lam_d: f64,
    th_d: f64,
    w: f64,
    north: bool,
) -> (f64, f64) {
    let (ra, rd) = if north {
        (HALF_PI - th_a, HALF_PI - th_d)
    } else {
        (th_a + HALF_PI, th_d + HALF_PI)
    };
    let x = w * rd * lam_d.cos() + (1.0 - w) * ra * lam_a.cos();
    let y = w * rd * lam_d.sin() + (1.0 - w) * ra * lam_a.sin();
    let r = x.hypot(y);
    let lam = wrap_lon(y.atan2(x));
    let th = if north { HALF_PI - r } else { r - HALF_PI };
    (lam, th.max(-HALF_PI).min(HALF_PI))
}

/// Builds the polar-cap modified phi- and v-point departure fields.
pub fn modify_polar(grid: &Grid, dep: &mut DeparturePoints) {
    let (nx, ny) = (grid.nx, grid.ny);

    for i in 0..nx {
        for j in 0..ny {
            let w = polar_weight(grid, grid.yp[j]);
            if w < 1.0 {
                let north = grid.yp[j] > 0.0;
                let (lam, th) = pull_toward_arrival(
                    grid.xp[i],
                    grid.yp[j],
                    dep.xdp[[i, j]],
                    dep.ydp[[i, j]],
                    w,
                    north,
                );
                dep.xdp_mod[[i, j]] = lam;
                dep.ydp_mod[[i, j]] = th;
            } else {
                dep.xdp_mod[[i, j]] = dep.xdp[[i, j]];
                dep.ydp_mod[[i, j]] = dep.ydp[[i, j]];
            }
        }

        for j in 0..=ny {
            if j == 0 || j == ny {
                // Polar v points never leave the pole.
                dep.xdv_mod[[i, j]] = grid.xp[i];
                dep.ydv_mod[[i, j]] = grid.yv[j];
                continue;
            }
            let w = polar_weight(grid, grid.yv[j]);
            if w < 1.0 {
                let north = grid.yv[j] > 0.0;
                let (lam, th) = pull_toward_arrival(
                    grid.xp[i],
                    grid.yv[j],
                    dep.xdv[[i, j]],
                    dep.ydv[[i, j]],
                    w,
                    north,
                );
                dep.xdv_mod[[i, j]] = lam;
                dep.ydv_mod[[i, j]] = th;
            } else {
                dep.xdv_mod[[i, j]] = dep.xdv[[i, j]];
                dep.ydv_mod[[i, j]] = dep.ydv[[i, j]];
            }
        }
    }
}

/// Damps the wind field in the same polar strips so that remap and
/// trajectories stay consistent.
pub fn damp_polar_winds(grid: &Grid, u: &Array2<f64>, v: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut um = u.clone();
    let mut vm = v.clone();
    for j in 0..ny {
        let w = polar_weight(grid, grid.yp[j]);
        if w < 1.0 {
            for i in 0..nx {
                um[[i, j]] *= w;
            }
        }
    }
    for j in 0..=ny {
        let w = polar_weight(grid, grid.yv[j]);
        if w < 1.0 {
            for i in 0..nx {
                vm[[i, j]] *= w;
            }
        }
    }
    (um, vm)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::R_EARTH;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid {
        Grid::new(32, 16, R_EARTH, 0.0)
    }

    #[test]
    fn zero_wind_departure_equals_arrival() {
        let grid = grid();
        let u = arr2zero(grid.nx, grid.ny);
        let v = arr2zero(grid.nx, grid.ny + 1);
        let mut dep = DeparturePoints::new(&grid);
        compute(&grid, 1600.0, 10, &u, &v, &u, &v, &mut dep);

        for i in 0..grid.nx {
            for j in 0..grid.ny {
                assert_abs_diff_eq!(dep.xdu[[i, j]], grid.xu[i], epsilon = 1e-14);
                assert_abs_diff_eq!(dep.ydu[[i, j]], grid.yp[j], epsilon = 1e-14);
                assert_abs_diff_eq!(dep.xdp[[i, j]], grid.xp[i], epsilon = 1e-14);
                assert_abs_diff_eq!(dep.ydp[[i, j]], grid.yp[j], epsilon = 1e-14);
            }
            for j in 0..=grid.ny {
                assert_abs_diff_eq!(dep.xdv[[i, j]], grid.xp[i], epsilon = 1e-14);
                assert_abs_diff_eq!(dep.ydv[[i, j]], grid.yv[j], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn solid_body_zonal_flow_traces_latitude_circles() {
        let grid = grid();
        let omega = 2.0e-6; // angular speed, rad/s
        let mut u = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                u[[i, j]] = omega * grid.radius * grid.yp[j].cos();
            }
        }
        let v = arr2zero(grid.nx, grid.ny + 1);
        let dt = 1600.0;
        let mut dep = DeparturePoints::new(&grid);
        compute(&grid, dt, 10, &u, &v, &u, &v, &mut dep);

        let shift = omega * dt;
        for i in 0..grid.nx {
            for j in 2..grid.ny - 2 {
                let dlam = wrap_dlon(grid.xp[i] - dep.xdp[[i, j]]);
                assert_abs_diff_eq!(dlam, shift, epsilon = shift * 0.02);
                assert_abs_diff_eq!(dep.ydp[[i, j]], grid.yp[j], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn rotation_is_identity_along_meridians_and_equator() {
        let (m11, m12) = rotation(0.3, -0.2, 0.0);
        assert_abs_diff_eq!(m11, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(m12, 0.0, epsilon = 1e-14);
        let (m11, m12) = rotation(0.0, 0.0, 0.7);
        assert_abs_diff_eq!(m11, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(m12, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn rotation_flips_across_the_pole() {
        use core::f64::consts::PI;
        let th = 80.0_f64.to_radians();
        let (m11, m12) = rotation(th, th, PI);
        assert_abs_diff_eq!(m11, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m12, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn modified_points_pin_polar_v_rows() {
        let grid = grid();
        let u = arr2zero(grid.nx, grid.ny);
        let v = arr2zero(grid.nx, grid.ny + 1);
        let mut dep = DeparturePoints::new(&grid);
        compute(&grid, 1600.0, 10, &u, &v, &u, &v, &mut dep);
        modify_polar(&grid, &mut dep);

        for i in 0..grid.nx {
            assert_eq!(dep.xdv_mod[[i, 0]], grid.xp[i]);
            assert_eq!(dep.ydv_mod[[i, 0]], grid.yv[0]);
            assert_eq!(dep.ydv_mod[[i, grid.ny]], grid.yv[grid.ny]);
        }
    }

    #[test]
    fn polar_weight_profile() {
        let grid = grid();
        assert_eq!(polar_weight(&grid, 0.0), 1.0);
        assert_abs_diff_eq!(polar_weight(&grid, -HALF_PI), 0.0, epsilon = 1e-30);
        let inside = -HALF_PI + 2.0 * grid.dy;
        let w = polar_weight(&grid, inside);
        assert!(w > 0.0 && w < 1.0);
    }
}
