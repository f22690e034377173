//! Interchangeable Coriolis discretizations on the C grid.
//!
//! All three return `fv` at u points and `fu` at v points (the terms entering
//! the u- and v-momentum equations respectively) and force `fu = 0` on the
//! polar v rows. The scheme is chosen once at model construction.

use {
    crate::{grid::Grid, polar, utils::arr2zero},
    anyhow::{bail, Result},
    ndarray::Array2,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoriolisScheme {
    /// Quarter-weight staggered averaging of the momentum components.
    Simple,
    /// Geopotential-weighted averaging through the cell centres; preserves
    /// the Rossby-mode dispersion relation.
    Jt,
    /// Vorticity-point variant; more stable, poorer Rossby dispersion.
    New,
}

impl CoriolisScheme {
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "simple" => CoriolisScheme::Simple,
            "jt" => CoriolisScheme::Jt,
            "new" => CoriolisScheme::New,
            other => bail!("unknown Coriolis method \"{}\"", other),
        })
    }

    pub fn tag(self) -> u8 {
        match self {
            CoriolisScheme::Simple => 1,
            CoriolisScheme::Jt => 2,
            CoriolisScheme::New => 3,
        }
    }

    /// Computes (fu at v points, fv at u points). The polar v rows of `v`
    /// must be reconstructed beforehand.
    pub fn apply(
        self,
        grid: &Grid,
        two_omega: f64,
        u: &Array2<f64>,
        v: &Array2<f64>,
        phi: &Array2<f64>,
    ) -> (Array2<f64>, Array2<f64>) {
        match self {
            CoriolisScheme::Simple => simple(grid, two_omega, u, v),
            CoriolisScheme::Jt => jt(grid, two_omega, u, v, phi),
            CoriolisScheme::New => new_scheme(grid, two_omega, u, v, phi),
        }
    }
}

/// f at u points from the vorticity-point geolocation table.
fn f_at_u(grid: &Grid, two_omega: f64, i: usize, j: usize) -> f64 {
    two_omega * 0.5 * (grid.singz[[i, j]] + grid.singz[[i, j + 1]])
}

/// f at v points.
fn f_at_v(grid: &Grid, two_omega: f64, i: usize, j: usize) -> f64 {
    let ip1 = (i + 1) % grid.nx;
    two_omega * 0.5 * (grid.singz[[i, j]] + grid.singz[[ip1, j]])
}

fn simple(
    grid: &Grid,
    two_omega: f64,
    u: &Array2<f64>,
    v: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let (nx, ny) = (grid.nx, grid.ny);
    let vbar = polar::v_at_u(grid, v);
    let ubar = polar::u_at_v(grid, u);

    let mut fu = arr2zero(nx, ny + 1);
    let mut fv = arr2zero(nx, ny);
    for i in 0..nx {
        for j in 0..ny {
            fv[[i, j]] = f_at_u(grid, two_omega, i, j) * vbar[[i, j]];
        }
        for j in 1..ny {
            fu[[i, j]] = f_at_v(grid, two_omega, i, j) * ubar[[i, j]];
        }
    }
    (fu, fv)
}

fn jt(
    grid: &Grid,
    two_omega: f64,
    u: &Array2<f64>,
    v: &Array2<f64>,
    phi: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let (nx, ny) = (grid.nx, grid.ny);

    // phi*v*cos(theta) at v points; the polar rows vanish with cos.
    let mut wv = arr2zero(nx, ny + 1);
    for i in 0..nx {
        for j in 1..ny {
            wv[[i, j]] = 0.5 * (phi[[i, j - 1]] + phi[[i, j]]) * v[[i, j]] * grid.cosv[j];
        }
    }

    let mut gp = arr2zero(nx, ny);
    let mut gq = arr2zero(nx, ny);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        let ip1 = (i + 1) % nx;
        for j in 0..ny {
            let fp = two_omega * grid.singp[[i, j]];
            let wp = 0.5 * (wv[[i, j]] + wv[[i, j + 1]]);
            gp[[i, j]] = fp * wp / phi[[i, j]];

            let wu_w = 0.5 * (phi[[im1, j]] + phi[[i, j]]) * u[[i, j]];
            let wu_e = 0.5 * (phi[[i, j]] + phi[[ip1, j]]) * u[[ip1, j]];
            gq[[i, j]] = fp * 0.5 * (wu_w + wu_e) / phi[[i, j]];
        }
    }

    let mut fu = arr2zero(nx, ny + 1);
    let mut fv = arr2zero(nx, ny);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 0..ny {
            fv[[i, j]] = 0.5 * (gp[[im1, j]] + gp[[i, j]]) / grid.cosp[j];
        }
        for j in 1..ny {
            fu[[i, j]] = (grid.cosp[j - 1] * gq[[i, j - 1]] + grid.cosp[j] * gq[[i, j]])
                / (2.0 * grid.cosv[j]);
        }
    }
    (fu, fv)
}

fn new_scheme(
    grid: &Grid,
    two_omega: f64,
    u: &Array2<f64>,
    v: &Array2<f64>,
    phi: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let (nx, ny) = (grid.nx, grid.ny);

    // Geopotential and momenta gathered at the vorticity corners.
    let mut phi_z = arr2zero(nx, ny + 1);
    let mut pv_z = arr2zero(nx, ny + 1);
    let mut pu_z = arr2zero(nx, ny + 1);
    for i in 0..nx {
        let im1 = (i + nx - 1) % nx;
        for j in 0..=ny {
            if j == 0 || j == ny {
                let r = if j == 0 { 0 } else { ny - 1 };
                phi_z[[i, j]] = 0.5 * (phi[[im1, r]] + phi[[i, r]]);
                let pvw = phi[[im1, r]] * v[[im1, j]];
                let pve = phi[[i, r]] * v[[i, j]];
                pv_z[[i, j]] = 0.5 * (pvw + pve);
                // pu_z is only consumed on interior rows.
            } else {
                let cw = grid.cosp[j - 1];
                let ce = grid.cosp[j];
                phi_z[[i, j]] = (cw * (phi[[im1, j - 1]] + phi[[i, j - 1]])
                    + ce * (phi[[im1, j]] + phi[[i, j]]))
                    / (2.0 * (cw + ce));
                let pvw = 0.5 * (phi[[im1, j - 1]] + phi[[im1, j]]) * v[[im1, j]];
                let pve = 0.5 * (phi[[i, j - 1]] + phi[[i, j]]) * v[[i, j]];
                pv_z[[i, j]] = 0.5 * (pvw + pve);
                let pus = 0.5 * (phi[[im1, j - 1]] + phi[[i, j - 1]]) * u[[i, j - 1]];
                let pun = 0.5 * (phi[[im1, j]] + phi[[i, j]]) * u[[i, j]];
                pu_z[[i, j]] = (cw * pus + ce * pun) / (cw + ce);
            }
        }
    }

    let mut gamma = arr2zero(nx, ny + 1);
    let mut lambda = arr2zero(nx, ny + 1);
    for i in 0..nx {
        for j in 0..=ny {
            let fz = two_omega * grid.singz[[i, j]];
            gamma[[i, j]] = fz * pv_z[[i, j]] / phi_z[[i, j]];
            if j > 0 && j < ny {
                lambda[[i, j]] = fz * pu_z[[i, j]] / phi_z[[i, j]];
            }
        }
    }

    let mut fu = arr2zero(nx, ny + 1);
    let mut fv = arr2zero(nx, ny);
    for i in 0..nx {
        let ip1 = (i + 1) % nx;
        for j in 0..ny {
            fv[[i, j]] = 0.5 * (gamma[[i, j]] + gamma[[i, j + 1]]);
        }
        for j in 1..ny {
            fu[[i, j]] = 0.5 * (lambda[[i, j]] + lambda[[ip1, j]]);
        }
    }
    (fu, fv)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::{R_EARTH, TWO_OMEGA};
    use approx::assert_abs_diff_eq;

    fn setup() -> (Grid, Array2<f64>, Array2<f64>, Array2<f64>) {
        let grid = Grid::new(32, 16, R_EARTH, 0.0);
        let mut u = arr2zero(grid.nx, grid.ny);
        let mut v = arr2zero(grid.nx, grid.ny + 1);
        let mut phi = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                u[[i, j]] = 12.0 * grid.yp[j].cos();
                phi[[i, j]] = 2.9e4 + 300.0 * grid.yp[j].sin();
            }
            for j in 1..grid.ny {
                v[[i, j]] = 3.0 * (2.0 * grid.xp[i]).sin() * grid.yv[j].cos();
            }
        }
        polar::fill_polar_v(&grid, &u, &mut v);
        (grid, u, v, phi)
    }

    #[test]
    fn polar_fu_is_zero_for_every_scheme() {
        let (grid, u, v, phi) = setup();
        for scheme in &[CoriolisScheme::Simple, CoriolisScheme::Jt, CoriolisScheme::New] {
            let (fu, _) = scheme.apply(&grid, TWO_OMEGA, &u, &v, &phi);
            for i in 0..grid.nx {
                assert_eq!(fu[[i, 0]], 0.0);
                assert_eq!(fu[[i, grid.ny]], 0.0);
            }
        }
    }

    #[test]
    fn zero_wind_gives_zero_forcing() {
        let grid = Grid::new(32, 16, R_EARTH, 0.0);
        let u = arr2zero(grid.nx, grid.ny);
        let v = arr2zero(grid.nx, grid.ny + 1);
        let mut phi = arr2zero(grid.nx, grid.ny);
        phi.fill(2.9e4);
        for scheme in &[CoriolisScheme::Simple, CoriolisScheme::Jt, CoriolisScheme::New] {
            let (fu, fv) = scheme.apply(&grid, TWO_OMEGA, &u, &v, &phi);
            assert!(fu.iter().all(|&x| x == 0.0));
            assert!(fv.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn simple_matches_staggered_average() {
        let (grid, u, v, phi) = setup();
        let (_, fv) = CoriolisScheme::Simple.apply(&grid, TWO_OMEGA, &u, &v, &phi);
        let vbar = polar::v_at_u(&grid, &v);
        let (i, j) = (4, 9);
        let f = TWO_OMEGA * 0.5 * (grid.singz[[i, j]] + grid.singz[[i, j + 1]]);
        assert_abs_diff_eq!(fv[[i, j]], f * vbar[[i, j]], epsilon = 1e-12);
    }

    #[test]
    fn uniform_phi_jt_reduces_to_weighted_average() {
        // With constant phi the geopotential weights cancel and the jt path
        // collapses to a cos-weighted momentum average.
        let (grid, u, mut v, _) = setup();
        let mut phi = arr2zero(grid.nx, grid.ny);
        phi.fill(3.0e4);
        polar::fill_polar_v(&grid, &u, &mut v);
        let (_, fv) = CoriolisScheme::Jt.apply(&grid, TWO_OMEGA, &u, &v, &phi);
        let (i, j) = (7, 8);
        let im1 = i - 1;
        let fp = |ii: usize| TWO_OMEGA * grid.singp[[ii, j]];
        let wp = |ii: usize| {
            0.5 * (v[[ii, j]] * grid.cosv[j] + v[[ii, j + 1]] * grid.cosv[j + 1])
        };
        let expect = 0.5 * (fp(im1) * wp(im1) + fp(i) * wp(i)) / grid.cosp[j];
        assert_abs_diff_eq!(fv[[i, j]], expect, epsilon = 1e-12);
    }
}
