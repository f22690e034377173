//! Staggered latitude-longitude C-grid geometry.
//!
//! phi points sit at cell centres, u points on west edges, v points on south
//! edges; the v array carries one extra row so that its first and last rows
//! lie exactly on the poles. All tables are built once at construction.

use {
    crate::{constants::*, utils::arr2zero},
    core::f64::consts::PI,
    ndarray::Array2,
};

#[derive(Debug, Clone)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
    pub radius: f64,
    pub rotation_angle: f64,

    /// u-point (and vorticity-point) longitudes, nx.
    pub xu: Vec<f64>,
    /// phi-point (and v-point) longitudes, nx.
    pub xp: Vec<f64>,
    /// phi-point (and u-point) latitudes, ny.
    pub yp: Vec<f64>,
    /// v-point (and vorticity-point) latitudes, ny + 1; poles at both ends.
    pub yv: Vec<f64>,

    pub sinp: Vec<f64>,
    pub cosp: Vec<f64>,
    pub sinv: Vec<f64>,
    pub cosv: Vec<f64>,

    /// Unit-sphere cell solid angle per row: dx * (sin(yv[j+1]) - sin(yv[j])),
    /// the exact integral of dx * dy * cos(theta) over the row band.
    pub area: Vec<f64>,

    /// sin(geographic latitude) at phi points, nx x ny.
    pub singp: Array2<f64>,
    /// sin(geographic latitude) at vorticity points, nx x (ny + 1).
    pub singz: Array2<f64>,
}

impl Grid {
    pub fn new(nx: usize, ny: usize, radius: f64, rotation_angle: f64) -> Self {
        let dx = TWO_PI / nx as f64;
        let dy = PI / ny as f64;

        let xu = (0..nx).map(|i| i as f64 * dx).collect::<Vec<f64>>();
        let xp = (0..nx).map(|i| (i as f64 + 0.5) * dx).collect::<Vec<f64>>();
        let yp = (0..ny)
            .map(|j| (j as f64 - ny as f64 / 2.0 + 0.5) * dy)
            .collect::<Vec<f64>>();
        let yv = (0..=ny)
            .map(|j| (j as f64 - ny as f64 / 2.0) * dy)
            .collect::<Vec<f64>>();

        let sinp = yp.iter().map(|y| y.sin()).collect::<Vec<f64>>();
        let cosp = yp.iter().map(|y| y.cos()).collect::<Vec<f64>>();
        let sinv = yv.iter().map(|y| y.sin()).collect::<Vec<f64>>();
        // The polar rows carry an exact zero so that metric terms vanish there.
        let cosv = yv
            .iter()
            .enumerate()
            .map(|(j, y)| if j == 0 || j == ny { 0.0 } else { y.cos() })
            .collect::<Vec<f64>>();

        let area = (0..ny)
            .map(|j| dx * (sinv[j + 1] - sinv[j]))
            .collect::<Vec<f64>>();

        let mut singp = arr2zero(nx, ny);
        let mut singz = arr2zero(nx, ny + 1);
        for i in 0..nx {
            for j in 0..ny {
                singp[[i, j]] = geographic_sin_lat(rotation_angle, xp[i], yp[j]);
            }
            for j in 0..=ny {
                singz[[i, j]] = geographic_sin_lat(rotation_angle, xu[i], yv[j]);
            }
        }

        Grid {
            nx,
            ny,
            dx,
            dy,
            radius,
            rotation_angle,
            xu,
            xp,
            yp,
            yv,
            sinp,
            cosp,
            sinv,
            cosv,
            area,
            singp,
            singz,
        }
    }

    /// Total unit-sphere solid angle of one latitude row.
    pub fn row_area(&self, j: usize) -> f64 {
        self.nx as f64 * self.area[j]
    }
}

/// sin of the geographic latitude of a model-grid location, for a model grid
/// rotated by `alpha` about the y-axis of the geographic frame.
pub fn geographic_sin_lat(alpha: f64, lambda: f64, theta: f64) -> f64 {
    alpha.cos() * theta.sin() - alpha.sin() * theta.cos() * lambda.sin()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn areas_tile_the_sphere() {
        let grid = Grid::new(64, 32, R_EARTH, 0.0);
        let total: f64 = (0..grid.ny).map(|j| grid.row_area(j)).sum();
        assert_abs_diff_eq!(total, 4.0 * PI, epsilon = 1e-12);
        assert!(grid.area.iter().all(|&a| a > 0.0));
    }

    #[test]
    fn v_rows_reach_the_poles() {
        let grid = Grid::new(32, 16, R_EARTH, 0.0);
        assert_abs_diff_eq!(grid.yv[0], -HALF_PI, epsilon = 1e-15);
        assert_abs_diff_eq!(grid.yv[16], HALF_PI, epsilon = 1e-15);
        assert_eq!(grid.cosv[0], 0.0);
        assert_eq!(grid.cosv[16], 0.0);
    }

    #[test]
    fn unrotated_geographic_latitude_is_model_latitude() {
        let grid = Grid::new(32, 16, R_EARTH, 0.0);
        for j in 0..grid.ny {
            assert_abs_diff_eq!(grid.singp[[5, j]], grid.sinp[j], epsilon = 1e-15);
        }
    }

    #[test]
    fn rotated_pole_moves_the_equator() {
        // With alpha = pi/2 the model equator point at lambda = 3pi/2 lands on
        // the geographic north pole.
        let s = geographic_sin_lat(HALF_PI, 1.5 * PI, 0.0);
        assert_abs_diff_eq!(s, 1.0, epsilon = 1e-15);
    }
}
