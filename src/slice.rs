//! SLICE conservative remap: parabolic-spline 1D remaps composed into a
//! two-sweep 2D mass transport.
//!
//! The east-west sweep moves arrival-cell mass into intermediate control
//! volumes bounded by the u-edge trajectory curves; the north-south sweep
//! then remaps each Lagrangian column onto the departure strips, using
//! either latitude arc length or cumulative cell area as the monotone
//! coordinate. Both sweeps integrate a parabolic spline whose cell-edge
//! values come from the shared tridiagonal solver.

use {
    crate::{
        departure::DeparturePoints,
        grid::Grid,
        tridiag,
        utils::{arr2zero, wrap_dlon},
    },
    crate::constants::HALF_PI,
    ndarray::Array2,
};

/// Monotone coordinate of the north-south sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NsCoordinate {
    ArcLength,
    /// Cumulative cell area, evolved with the flow divergence (areafix).
    Area,
}

/// Parabolic-spline cell-edge values on a uniform periodic mesh; edge m sits
/// between cells m-1 and m.
pub fn spline_edges_periodic(q: &[f64]) -> Vec<f64> {
    let n = q.len();
    let a = vec![1.0; n];
    let b = vec![4.0; n];
    let c = vec![1.0; n];
    let r = (0..n)
        .map(|m| 3.0 * (q[(m + n - 1) % n] + q[m]))
        .collect::<Vec<f64>>();
    tridiag::solve_periodic(&a, &b, &c, &r)
}

/// Edge values on a bounded non-uniform mesh with zero-curvature end cells.
pub fn spline_edges_bounded(q: &[f64], h: &[f64]) -> Vec<f64> {
    let n = q.len();
    let mut a = vec![0.0; n + 1];
    let mut b = vec![0.0; n + 1];
    let mut c = vec![0.0; n + 1];
    let mut r = vec![0.0; n + 1];

    b[0] = 1.0;
    c[0] = 1.0;
    r[0] = 2.0 * q[0];
    for m in 1..n {
        let hw = 1.0 / h[m - 1];
        let he = 1.0 / h[m];
        a[m] = hw;
        b[m] = 2.0 * (hw + he);
        c[m] = he;
        r[m] = 3.0 * (q[m - 1] * hw + q[m] * he);
    }
    a[n] = 1.0;
    b[n] = 1.0;
    r[n] = 2.0 * q[n - 1];

    tridiag::solve(&a, &b, &c, &r)
}

/// Mass integral over [cell origin, origin + f*width] of the cell parabola.
fn partial_mass(qbar: f64, e0: f64, e1: f64, f: f64, width: f64) -> f64 {
    let a0 = e0;
    let a1 = 3.0 * qbar - 2.0 * e0 - e1;
    let a2 = e0 + e1 - 2.0 * qbar;
    ((a2 * f + a1) * f + a0) * f * width
}

/// Periodic 1D remap on unit-width cells. `mass[k]` is the integral over
/// arrival cell k (edges at integers); `edges_d[k]` is the unwrapped
/// departure position of arrival edge k. Target cell k receives the mass of
/// [edges_d[k], edges_d[k+1]], with edges_d[n] = edges_d[0] + n implied.
pub fn slice1d(mass: &[f64], edges_d: &[f64], out: &mut [f64]) {
    let n = mass.len();
    let edges = spline_edges_periodic(mass);
    let mut prefix = vec![0.0; n + 1];
    for k in 0..n {
        prefix[k + 1] = prefix[k] + mass[k];
    }
    let total = prefix[n];

    let cum = |xi: f64| -> f64 {
        let m = xi.floor() as i64;
        let cell = m.rem_euclid(n as i64) as usize;
        let wraps = m.div_euclid(n as i64) as f64;
        let f = xi - m as f64;
        let e0 = edges[cell];
        let e1 = edges[(cell + 1) % n];
        wraps * total + prefix[cell] + partial_mass(mass[cell], e0, e1, f, 1.0)
    };

    for k in 0..n {
        let hi = if k + 1 < n {
            edges_d[k + 1]
        } else {
            edges_d[0] + n as f64
        };
        out[k] = cum(hi) - cum(edges_d[k]);
    }
}

/// Bounded 1D remap on non-uniform cells. Source cell j has mass `mass[j]`
/// and width `h[j]`; `sd` holds the n+1 target edges in the same coordinate,
/// clamped to the domain.
pub fn slice1db(mass: &[f64], h: &[f64], sd: &[f64], out: &mut [f64]) {
    let n = mass.len();
    let mut s = vec![0.0; n + 1];
    for j in 0..n {
        s[j + 1] = s[j] + h[j];
    }
    let span = s[n];

    let q = (0..n).map(|j| mass[j] / h[j]).collect::<Vec<f64>>();
    let edges = spline_edges_bounded(&q, h);
    let mut prefix = vec![0.0; n + 1];
    for j in 0..n {
        prefix[j + 1] = prefix[j] + mass[j];
    }

    let cum = |si: f64| -> f64 {
        let si = si.max(0.0).min(span);
        // Locate the source cell containing si.
        let j = match s.binary_search_by(|e| e.partial_cmp(&si).unwrap()) {
            Ok(j) => j.min(n - 1),
            Err(j) => j.saturating_sub(1).min(n - 1),
        };
        let f = (si - s[j]) / h[j];
        prefix[j] + partial_mass(q[j], edges[j], edges[j + 1], f, h[j])
    };

    for k in 0..n {
        out[k] = cum(sd[k + 1]) - cum(sd[k]);
    }
}

/// Departure longitude offset (radians, relative to the arrival u edge) of
/// edge-curve `i` at latitude `theta`, by linear-in-latitude interpolation
/// along the curve's departure points. The u points and the corner points of
/// the column sit on the same trajectory curve, so both sample it: even
/// profile entries are corners, odd entries u points.
fn edge_curve_offset(grid: &Grid, dep: &DeparturePoints, i: usize, theta: f64) -> f64 {
    let ny = grid.ny;
    let npts = 2 * ny + 1;
    let lat = |k: usize| {
        if k % 2 == 0 {
            dep.ydz[[i, k / 2]]
        } else {
            dep.ydu[[i, k / 2]]
        }
    };
    let off = |k: usize| {
        let xd = if k % 2 == 0 {
            dep.xdz[[i, k / 2]]
        } else {
            dep.xdu[[i, k / 2]]
        };
        wrap_dlon(xd - grid.xu[i])
    };

    if theta <= lat(0) {
        return off(0);
    }
    if theta >= lat(npts - 1) {
        return off(npts - 1);
    }
    let mut k = ((theta / (0.5 * grid.dy) + ny as f64).floor() as isize)
        .max(0)
        .min(npts as isize - 2) as usize;
    while k > 0 && lat(k) > theta {
        k -= 1;
    }
    while k < npts - 2 && lat(k + 1) < theta {
        k += 1;
    }
    let denom = lat(k + 1) - lat(k);
    let w = if denom.abs() > 1e-14 {
        (theta - lat(k)) / denom
    } else {
        0.5
    };
    (1.0 - w) * off(k) + w * off(k + 1)
}

/// Two-sweep conservative remap of cell-integrated mass. `aread` supplies the
/// departure areas for the area-coordinate variant and is ignored for arc
/// length. Returns the remapped mass on the arrival cells.
pub fn slice2d(
    grid: &Grid,
    dep: &DeparturePoints,
    mass: &Array2<f64>,
    aread: &Array2<f64>,
    coord: NsCoordinate,
    cgrid_correction: bool,
    out: &mut Array2<f64>,
) {
    let (nx, ny) = (grid.nx, grid.ny);

    // East-west sweep: arrival cells -> intermediate control volumes.
    let mut curve = arr2zero(nx, ny);
    let mut inter = arr2zero(nx, ny);
    {
        let mut row_mass = vec![0.0; nx];
        let mut row_edges = vec![0.0; nx];
        let mut row_out = vec![0.0; nx];
        for j in 0..ny {
            for i in 0..nx {
                curve[[i, j]] = edge_curve_offset(grid, dep, i, grid.yp[j]);
                row_mass[i] = mass[[i, j]];
                row_edges[i] = i as f64 + curve[[i, j]] / grid.dx;
            }
            slice1d(&row_mass, &row_edges, &mut row_out);
            for i in 0..nx {
                inter[[i, j]] = row_out[i];
            }
        }
    }

    // North-south sweep: intermediate volumes -> Lagrangian strips.
    {
        let mut col_mass = vec![0.0; ny];
        let mut col_out = vec![0.0; ny];
        let mut sd = vec![0.0; ny + 1];
        match coord {
            NsCoordinate::ArcLength => {
                let h = vec![grid.dy; ny];
                for i in 0..nx {
                    for j in 0..ny {
                        col_mass[j] = inter[[i, j]];
                    }
                    for j in 0..=ny {
                        sd[j] = dep.ydv_mod[[i, j]] + HALF_PI;
                    }
                    slice1db(&col_mass, &h, &sd, &mut col_out);
                    for j in 0..ny {
                        out[[i, j]] = col_out[j];
                    }
                }
            }
            NsCoordinate::Area => {
                let h = grid.area.clone();
                let span: f64 = h.iter().sum();
                for i in 0..nx {
                    let mut col_total = 0.0;
                    for j in 0..ny {
                        col_mass[j] = inter[[i, j]];
                        col_total += aread[[i, j]];
                    }
                    // Rescale so the departure strips tile the column exactly.
                    let scale = span / col_total;
                    sd[0] = 0.0;
                    for j in 0..ny {
                        sd[j + 1] = sd[j] + scale * aread[[i, j]];
                    }
                    slice1db(&col_mass, &h, &sd, &mut col_out);
                    for j in 0..ny {
                        out[[i, j]] = col_out[j];
                    }
                }
            }
        }
    }

    // Edge correction for the gap between the exact u-point departure
    // longitudes and the intermediate-volume boundaries.
    if cgrid_correction {
        for j in 0..ny {
            for i in 0..nx {
                let im1 = (i + nx - 1) % nx;
                let exact = wrap_dlon(dep.xdu[[i, j]] - grid.xu[i]);
                let dxi = (exact - curve[[i, j]]) / grid.dx;
                let q_edge = 0.5 * (out[[im1, j]] + out[[i, j]]);
                let dm = dxi * q_edge;
                out[[im1, j]] += dm;
                out[[i, j]] -= dm;
            }
        }
    }
}

/// Rows blended between the conservative and semi-Lagrangian estimates, with
/// the SLICE weight per row counted from the cap edge outward.
const BLEND_WEIGHTS: [f64; 3] = [5.0 / 32.0, 0.5, 27.0 / 32.0];
const CAP_ROWS: usize = 4;

fn region_masses(grid: &Grid, vals_slice: &Array2<f64>, vals_sl: &Array2<f64>, rows: &[usize]) -> (f64, f64) {
    let mut mass1 = 0.0;
    let mut mass2 = 0.0;
    for &j in rows {
        for i in 0..grid.nx {
            mass1 += vals_slice[[i, j]] * grid.area[j];
            mass2 += vals_sl[[i, j]] * grid.area[j];
        }
    }
    (mass1, mass2)
}

/// Splices the pure semi-Lagrangian estimate into the polar caps of the
/// SLICE result, rescaling the SL values so the spliced field carries the
/// SLICE mass (total mass is unchanged). Operates on value fields.
pub fn merge_polar(grid: &Grid, slice_vals: &mut Array2<f64>, sl_vals: &Array2<f64>) {
    let ny = grid.ny;

    // Per-cap correction over the cap rows.
    for cap in 0..2 {
        let rows = (0..CAP_ROWS)
            .map(|k| if cap == 0 { k } else { ny - 1 - k })
            .collect::<Vec<usize>>();
        let (mass1, mass2) = region_masses(grid, slice_vals, sl_vals, &rows);
        let factor = if mass2.abs() > 0.0 { mass1 / mass2 } else { 1.0 };
        for &j in &rows {
            for i in 0..grid.nx {
                slice_vals[[i, j]] = factor * sl_vals[[i, j]];
            }
        }
    }

    // Per-row corrected blend just outside each cap.
    for cap in 0..2 {
        for (k, &w) in BLEND_WEIGHTS.iter().enumerate() {
            let j = if cap == 0 {
                CAP_ROWS + k
            } else {
                ny - 1 - CAP_ROWS - k
            };
            let (mass1, mass2) = region_masses(grid, slice_vals, sl_vals, &[j]);
            let factor = if mass2.abs() > 0.0 { mass1 / mass2 } else { 1.0 };
            for i in 0..grid.nx {
                slice_vals[[i, j]] =
                    w * slice_vals[[i, j]] + (1.0 - w) * factor * sl_vals[[i, j]];
            }
        }
    }
}

/// Evolves the departure areas consistently with the (damped) divergence and
/// remaps the mass field under them; the driver for ischeme 3. For ischeme 2
/// call `slice2d` with `NsCoordinate::ArcLength` directly.
#[allow(clippy::too_many_arguments)]
pub fn transport_area(
    grid: &Grid,
    dep: &DeparturePoints,
    mass0: &Array2<f64>,
    div_mod0: &Array2<f64>,
    div_mod: &Array2<f64>,
    dt: f64,
    cgrid_correction: bool,
    aread: &mut Array2<f64>,
    out: &mut Array2<f64>,
) {
    let (nx, ny) = (grid.nx, grid.ny);

    // Seed the departure-strip divergence by remapping the current one
    // under the previous departure areas.
    let mut div_mass = arr2zero(nx, ny);
    for i in 0..nx {
        for j in 0..ny {
            div_mass[[i, j]] = div_mod0[[i, j]] * grid.area[j];
        }
    }
    let mut divd_mass = arr2zero(nx, ny);
    slice2d(
        grid,
        dep,
        &div_mass,
        aread,
        NsCoordinate::Area,
        false,
        &mut divd_mass,
    );

    for i in 0..nx {
        for j in 0..ny {
            let divd = divd_mass[[i, j]] / aread[[i, j]];
            aread[[i, j]] = (1.0 - 0.5 * dt * (div_mod[[i, j]] + divd)) * grid.area[j];
        }
    }

    slice2d(
        grid,
        dep,
        mass0,
        aread,
        NsCoordinate::Area,
        cgrid_correction,
        out,
    );
}
