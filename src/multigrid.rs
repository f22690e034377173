//! Full multigrid solver for the variable-coefficient Helmholtz problem
//! `lap(phi) - nu*phi = r` on the sphere.
//!
//! The hierarchy halves both grid directions per level; the latitude metric
//! on coarse levels is injected from the fine vorticity-row cosines (even
//! rows become coarse cell edges, odd rows coarse cell centres), so every
//! level discretizes the same sphere. The polar boundary needs no ghost
//! rows: the meridional coefficients vanish with cos at the poles.

use {
    crate::{grid::Grid, tridiag, utils::arr2zero},
    anyhow::{bail, Result},
    ndarray::Array2,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relaxation {
    /// Simultaneous periodic line solves on odd rows then even rows.
    Lines,
    RedBlack,
    GaussSeidel,
    /// A red-black pass followed by a line pass.
    Mixed,
}

impl Relaxation {
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "lines" => Relaxation::Lines,
            "redblack" => Relaxation::RedBlack,
            "gaussseidel" => Relaxation::GaussSeidel,
            "mixed" => Relaxation::Mixed,
            other => bail!("unknown relaxation mode \"{}\"", other),
        })
    }
}

/// FMG prolongation weights at the quarter-cell offsets.
const CUBIC: [f64; 4] = [-0.1318, 0.8439, 0.4575, -0.1696];

struct Level {
    nx: usize,
    ny: usize,
    cosv: Vec<f64>,
    cosp: Vec<f64>,
    /// North-neighbour coefficient per row.
    a: Vec<f64>,
    /// South-neighbour coefficient per row.
    c: Vec<f64>,
    /// East/west coefficient per row.
    b: Vec<f64>,
    /// Diagonal magnitude a + c + 2b + nu per row.
    d: Vec<f64>,
    phi: Array2<f64>,
    rhs: Array2<f64>,
    res: Array2<f64>,
}

impl Level {
    fn new(nx: usize, ny: usize, cosp: Vec<f64>, cosv: Vec<f64>, radius: f64, nu: f64) -> Self {
        let dx = crate::constants::TWO_PI / nx as f64;
        let dy = core::f64::consts::PI / ny as f64;
        let rdy2 = 1.0 / (radius * radius * dy * dy);
        let rdx2 = 1.0 / (radius * radius * dx * dx);

        let mut a = vec![0.0; ny];
        let mut c = vec![0.0; ny];
        let mut b = vec![0.0; ny];
        let mut d = vec![0.0; ny];
        for j in 0..ny {
            a[j] = cosv[j + 1] / cosp[j] * rdy2;
            c[j] = cosv[j] / cosp[j] * rdy2;
            b[j] = rdx2 / (cosp[j] * cosp[j]);
        }
        // The polar rows have no neighbour beyond the pole.
        c[0] = 0.0;
        a[ny - 1] = 0.0;
        for j in 0..ny {
            d[j] = a[j] + c[j] + 2.0 * b[j] + nu;
        }

        Level {
            nx,
            ny,
            cosv,
            cosp,
            a,
            c,
            b,
            d,
            phi: arr2zero(nx, ny),
            rhs: arr2zero(nx, ny),
            res: arr2zero(nx, ny),
        }
    }

    /// L(phi) at one point; neighbours beyond the poles carry zero
    /// coefficients and are never read.
    fn operator_at(&self, i: usize, j: usize) -> f64 {
        let (nx, ny) = (self.nx, self.ny);
        let im1 = (i + nx - 1) % nx;
        let ip1 = (i + 1) % nx;
        let mut acc = self.b[j] * (self.phi[[im1, j]] + self.phi[[ip1, j]])
            - self.d[j] * self.phi[[i, j]];
        if j + 1 < ny {
            acc += self.a[j] * self.phi[[i, j + 1]];
        }
        if j > 0 {
            acc += self.c[j] * self.phi[[i, j - 1]];
        }
        acc
    }

    fn gauss_seidel_point(&mut self, i: usize, j: usize) {
        let (nx, ny) = (self.nx, self.ny);
        let im1 = (i + nx - 1) % nx;
        let ip1 = (i + 1) % nx;
        let mut acc = self.b[j] * (self.phi[[im1, j]] + self.phi[[ip1, j]]);
        if j + 1 < ny {
            acc += self.a[j] * self.phi[[i, j + 1]];
        }
        if j > 0 {
            acc += self.c[j] * self.phi[[i, j - 1]];
        }
        self.phi[[i, j]] = (acc - self.rhs[[i, j]]) / self.d[j];
    }

    fn relax_gauss_seidel(&mut self) {
        for j in 0..self.ny {
            for i in 0..self.nx {
                self.gauss_seidel_point(i, j);
            }
        }
    }

    fn relax_red_black(&mut self) {
        for colour in 0..2 {
            for j in 0..self.ny {
                for i in 0..self.nx {
                    if (i + j) % 2 == colour {
                        self.gauss_seidel_point(i, j);
                    }
                }
            }
        }
    }

    fn relax_line(&mut self, j: usize) {
        let nx = self.nx;
        let ar = vec![self.b[j]; nx];
        let br = vec![-self.d[j]; nx];
        let cr = vec![self.b[j]; nx];
        let mut rr = vec![0.0; nx];
        for i in 0..nx {
            let mut r = self.rhs[[i, j]];
            if j + 1 < self.ny {
                r -= self.a[j] * self.phi[[i, j + 1]];
            }
            if j > 0 {
                r -= self.c[j] * self.phi[[i, j - 1]];
            }
            rr[i] = r;
        }
        let x = tridiag::solve_periodic(&ar, &br, &cr, &rr);
        for i in 0..nx {
            self.phi[[i, j]] = x[i];
        }
    }

    fn relax_lines(&mut self) {
        let mut j = 1;
        while j < self.ny {
            self.relax_line(j);
            j += 2;
        }
        let mut j = 0;
        while j < self.ny {
            self.relax_line(j);
            j += 2;
        }
    }

    fn relax(&mut self, mode: Relaxation, sweeps: usize) {
        for _ in 0..sweeps {
            match mode {
                Relaxation::Lines => self.relax_lines(),
                Relaxation::RedBlack => self.relax_red_black(),
                Relaxation::GaussSeidel => self.relax_gauss_seidel(),
                Relaxation::Mixed => {
                    self.relax_red_black();
                    self.relax_lines();
                }
            }
        }
    }

    fn compute_residual(&mut self) {
        for j in 0..self.ny {
            for i in 0..self.nx {
                self.res[[i, j]] = self.rhs[[i, j]] - self.operator_at(i, j);
            }
        }
    }

    /// Cell-centred fetch with polar reflection for prolongation stencils.
    fn fetch(phi: &Array2<f64>, nx: usize, ny: usize, i: isize, j: isize) -> f64 {
        let (mut i, mut j) = (i, j);
        if j < 0 {
            j = -1 - j;
            i += nx as isize / 2;
        } else if j > ny as isize - 1 {
            j = 2 * ny as isize - 1 - j;
            i += nx as isize / 2;
        }
        phi[[i.rem_euclid(nx as isize) as usize, j as usize]]
    }
}

pub struct Helmholtz {
    levels: Vec<Level>,
    relaxation: Relaxation,
    pub nu: f64,
    /// Relaxation sweeps within a V-cycle leg.
    nrelax: usize,
    /// Relaxation sweeps on the coarsest grid.
    ncoarse: usize,
    /// V-cycle passes on the finest level.
    npass: usize,
}

impl Helmholtz {
    pub fn new(grid: &Grid, nu: f64, relaxation: Relaxation) -> Self {
        let p = (grid.nx as f64).log2().round() as usize;
        let nlev = p - 2;

        let mut levels = Vec::with_capacity(nlev);
        levels.push(Level::new(
            grid.nx,
            grid.ny,
            grid.cosp.clone(),
            grid.cosv.clone(),
            grid.radius,
            nu,
        ));
        for _ in 1..nlev {
            let fine = levels.last().unwrap();
            let (nxc, nyc) = (fine.nx / 2, fine.ny / 2);
            // Even fine vorticity rows are coarse edges, odd rows coarse centres.
            let cosv = (0..=nyc).map(|j| fine.cosv[2 * j]).collect::<Vec<f64>>();
            let cosp = (0..nyc).map(|j| fine.cosv[2 * j + 1]).collect::<Vec<f64>>();
            levels.push(Level::new(nxc, nyc, cosp, cosv, grid.radius, nu));
        }

        Helmholtz {
            levels,
            relaxation,
            nu,
            nrelax: 4,
            ncoarse: 20,
            npass: 4,
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Area-weighted full-weighting restriction of the fine-level field
    /// `src` onto the coarse rhs.
    fn restrict(&mut self, k: usize, from_residual: bool) {
        let (head, tail) = self.levels.split_at_mut(k + 1);
        let fine = &head[k];
        let coarse = &mut tail[0];
        let src = if from_residual { &fine.res } else { &fine.rhs };
        for jc in 0..coarse.ny {
            let js = 2 * jc;
            let jn = js + 1;
            let ws = fine.cosp[js];
            let wn = fine.cosp[jn];
            let norm = 1.0 / (2.0 * (ws + wn));
            for ic in 0..coarse.nx {
                let is = 2 * ic;
                let ie = is + 1;
                coarse.rhs[[ic, jc]] = norm
                    * (ws * (src[[is, js]] + src[[ie, js]])
                        + wn * (src[[is, jn]] + src[[ie, jn]]));
            }
        }
    }

    /// Bilinear 1/16-3/16-9/16 prolongation of the coarse correction, added
    /// into the fine solution.
    fn prolong_linear(&mut self, k: usize) {
        let (head, tail) = self.levels.split_at_mut(k + 1);
        let fine = &mut head[k];
        let coarse = &tail[0];
        let (nxc, nyc) = (coarse.nx, coarse.ny);
        for j in 0..fine.ny {
            let jc = (j / 2) as isize;
            let dj: isize = if j % 2 == 1 { 1 } else { -1 };
            for i in 0..fine.nx {
                let ic = (i / 2) as isize;
                let di: isize = if i % 2 == 1 { 1 } else { -1 };
                let f = |ii: isize, jj: isize| Level::fetch(&coarse.phi, nxc, nyc, ii, jj);
                fine.phi[[i, j]] += (9.0 * f(ic, jc)
                    + 3.0 * f(ic + di, jc)
                    + 3.0 * f(ic, jc + dj)
                    + f(ic + di, jc + dj))
                    / 16.0;
            }
        }
    }

    /// Bicubic FMG prolongation of the coarse solution onto the fine level,
    /// overwriting the fine solution.
    fn prolong_cubic(&mut self, k: usize) {
        let (head, tail) = self.levels.split_at_mut(k + 1);
        let fine = &mut head[k];
        let coarse = &tail[0];
        let (nxc, nyc) = (coarse.nx, coarse.ny);
        let nxf = fine.nx;

        // Longitude pass on the coarse rows.
        let mut tmp = arr2zero(nxf, nyc);
        for j in 0..nyc {
            for ic in 0..nxc as isize {
                let g = |ii: isize| coarse.phi[[ii.rem_euclid(nxc as isize) as usize, j]];
                tmp[[2 * ic as usize + 1, j]] = CUBIC[0] * g(ic - 1)
                    + CUBIC[1] * g(ic)
                    + CUBIC[2] * g(ic + 1)
                    + CUBIC[3] * g(ic + 2);
                tmp[[2 * ic as usize, j]] = CUBIC[3] * g(ic - 2)
                    + CUBIC[2] * g(ic - 1)
                    + CUBIC[1] * g(ic)
                    + CUBIC[0] * g(ic + 1);
            }
        }

        // Latitude pass with polar reflection in the half-prolonged field.
        for i in 0..nxf {
            for jc in 0..nyc as isize {
                let g = |jj: isize| Level::fetch(&tmp, nxf, nyc, i as isize, jj);
                fine.phi[[i, 2 * jc as usize + 1]] = CUBIC[0] * g(jc - 1)
                    + CUBIC[1] * g(jc)
                    + CUBIC[2] * g(jc + 1)
                    + CUBIC[3] * g(jc + 2);
                fine.phi[[i, 2 * jc as usize]] = CUBIC[3] * g(jc - 2)
                    + CUBIC[2] * g(jc - 1)
                    + CUBIC[1] * g(jc)
                    + CUBIC[0] * g(jc + 1);
            }
        }
    }

    fn vcycle(&mut self, k0: usize) {
        let nlev = self.levels.len();
        for k in k0..nlev - 1 {
            self.levels[k].relax(self.relaxation, self.nrelax);
            self.levels[k].compute_residual();
            self.restrict(k, true);
            self.levels[k + 1].phi.fill(0.0);
        }
        self.levels[nlev - 1].relax(self.relaxation, self.ncoarse);
        for k in (k0..nlev - 1).rev() {
            self.prolong_linear(k);
            self.levels[k].relax(self.relaxation, self.nrelax);
        }
    }

    /// Full multigrid solve; `phi` receives the solution.
    pub fn solve(&mut self, rhs: &Array2<f64>, phi: &mut Array2<f64>) {
        let nlev = self.levels.len();

        self.levels[0].rhs.assign(rhs);
        for k in 0..nlev - 1 {
            self.restrict(k, false);
        }

        self.levels[nlev - 1].phi.fill(0.0);
        self.levels[nlev - 1].relax(self.relaxation, self.ncoarse);

        for k in (0..nlev - 1).rev() {
            self.prolong_cubic(k);
            self.vcycle(k);
        }
        for _ in 1..self.npass {
            self.vcycle(0);
        }

        phi.assign(&self.levels[0].phi);
    }

    /// Applies the finest-level operator; used to manufacture test problems.
    pub fn apply_operator(&mut self, phi: &Array2<f64>, out: &mut Array2<f64>) {
        self.levels[0].phi.assign(phi);
        for j in 0..self.levels[0].ny {
            for i in 0..self.levels[0].nx {
                out[[i, j]] = self.levels[0].operator_at(i, j);
            }
        }
    }

    /// Max-norm residual of a candidate solution on the finest level.
    pub fn residual_inf(&mut self, rhs: &Array2<f64>, phi: &Array2<f64>) -> f64 {
        self.levels[0].phi.assign(phi);
        let mut worst = 0.0_f64;
        for j in 0..self.levels[0].ny {
            for i in 0..self.levels[0].nx {
                let r = rhs[[i, j]] - self.levels[0].operator_at(i, j);
                worst = worst.max(r.abs());
            }
        }
        worst
    }
}
