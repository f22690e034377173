//! Tridiagonal solves shared by the SLICE spline reconstruction and the
//! multigrid line relaxation.
//!
//! Row i of the system reads `a[i]*x[i-1] + b[i]*x[i] + c[i]*x[i+1] = r[i]`,
//! with the neighbour indices taken modulo n in the periodic variant.

/// Thomas algorithm for the bounded system; `a[0]` and `c[n-1]` are ignored.
pub fn solve(a: &[f64], b: &[f64], c: &[f64], r: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut gam = vec![0.0; n];
    let mut x = vec![0.0; n];

    let mut bet = b[0];
    x[0] = r[0] / bet;
    for i in 1..n {
        gam[i] = c[i - 1] / bet;
        bet = b[i] - a[i] * gam[i];
        x[i] = (r[i] - a[i] * x[i - 1]) / bet;
    }
    for i in (0..n - 1).rev() {
        x[i] -= gam[i + 1] * x[i + 1];
    }
    x
}

/// Periodic (cyclic) system via the Sherman-Morrison correction.
pub fn solve_periodic(a: &[f64], b: &[f64], c: &[f64], r: &[f64]) -> Vec<f64> {
    let n = b.len();
    assert!(n >= 3);

    let gamma = -b[0];
    let mut bb = b.to_vec();
    bb[0] = b[0] - gamma;
    bb[n - 1] = b[n - 1] - a[0] * c[n - 1] / gamma;

    let x = solve(a, &bb, c, r);

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = c[n - 1];
    let z = solve(a, &bb, c, &u);

    let fact = (x[0] + a[0] * x[n - 1] / gamma) / (1.0 + z[0] + a[0] * z[n - 1] / gamma);
    x.iter().zip(&z).map(|(xi, zi)| xi - fact * zi).collect()
}

/// Applies the periodic tridiagonal operator; used by the round-trip tests.
#[cfg(test)]
pub fn apply_periodic(a: &[f64], b: &[f64], c: &[f64], x: &[f64]) -> Vec<f64> {
    let n = b.len();
    (0..n)
        .map(|i| a[i] * x[(i + n - 1) % n] + b[i] * x[i] + c[i] * x[(i + 1) % n])
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn roundtrip_periodic(n: usize) {
        // Diagonally dominant system with pseudo-random off-diagonals.
        let a = (0..n).map(|i| 0.7 + 0.2 * (i as f64 * 1.3).sin()).collect::<Vec<f64>>();
        let c = (0..n).map(|i| 0.9 + 0.1 * (i as f64 * 2.1).cos()).collect::<Vec<f64>>();
        let b = (0..n).map(|i| 4.0 + (i as f64 * 0.7).sin()).collect::<Vec<f64>>();
        let x = (0..n).map(|i| (i as f64 * 0.37).cos()).collect::<Vec<f64>>();

        let r = apply_periodic(&a, &b, &c, &x);
        let got = solve_periodic(&a, &b, &c, &r);
        for i in 0..n {
            assert_abs_diff_eq!(got[i], x[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn periodic_roundtrip() {
        roundtrip_periodic(8);
        roundtrip_periodic(64);
        roundtrip_periodic(129);
    }

    #[test]
    fn bounded_roundtrip() {
        let n = 33;
        let a = vec![1.0; n];
        let c = vec![1.0; n];
        let b = vec![4.0; n];
        let x = (0..n).map(|i| (i as f64 * 0.5).sin()).collect::<Vec<f64>>();

        let mut r = vec![0.0; n];
        for i in 0..n {
            r[i] = b[i] * x[i];
            if i > 0 {
                r[i] += a[i] * x[i - 1];
            }
            if i < n - 1 {
                r[i] += c[i] * x[i + 1];
            }
        }
        let got = solve(&a, &b, &c, &r);
        for i in 0..n {
            assert_abs_diff_eq!(got[i], x[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_system() {
        // The uniform parabolic-spline edge system (1, 4, 1) applied to a
        // constant field returns the same constant.
        let n = 16;
        let a = vec![1.0; n];
        let b = vec![4.0; n];
        let c = vec![1.0; n];
        let r = vec![6.0 * 2.5; n];
        let e = solve_periodic(&a, &b, &c, &r);
        for v in e {
            assert_abs_diff_eq!(v, 2.5, epsilon = 1e-13);
        }
    }
}
