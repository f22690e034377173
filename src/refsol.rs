//! Reference-solution exporter: projects the height field onto a hierarchy
//! of equiangular cubed-sphere grids with the cubic Lagrange kernel. One-way
//! output only; nothing is read back.

use {
    crate::{
        interp::{cubic, Stagger},
        model::State,
        utils::wrap_lon,
    },
    anyhow::Result,
    byteorder::{ByteOrder, LittleEndian},
    ndarray::Array2,
    std::{fs::File, io::Write},
};

/// Latitude/longitude of an equiangular cubed-sphere cell centre.
fn face_point(face: usize, n: usize, a: usize, b: usize) -> (f64, f64) {
    use core::f64::consts::FRAC_PI_4;
    let d = 2.0 * FRAC_PI_4 / n as f64;
    let xi = -FRAC_PI_4 + (a as f64 + 0.5) * d;
    let eta = -FRAC_PI_4 + (b as f64 + 0.5) * d;
    let x = xi.tan();
    let y = eta.tan();

    let p = match face {
        0 => [1.0, x, y],
        1 => [-x, 1.0, y],
        2 => [-1.0, -x, y],
        3 => [x, -1.0, y],
        4 => [-y, x, 1.0],
        _ => [y, x, -1.0],
    };
    let norm = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
    let lambda = wrap_lon(p[1].atan2(p[0]));
    let theta = (p[2] / norm).asin();
    (lambda, theta)
}

/// Writes one f32 stream of the interpolated height per cubed-sphere
/// resolution (faces outermost), from n = 8 up to the model row count.
pub fn dump(state: &State, h: &Array2<f64>, t_sec: u64) -> Result<()> {
    let grid = &state.grid;
    let mut n = 8usize;
    while n <= grid.ny {
        let path = state.config.output_directory.join(format!(
            "sw_ic{}_cor{}_sl{}_ref{}_h_t{}.dat",
            state.config.ic,
            state.config.coriolis.tag(),
            state.config.phi_scheme.tag(),
            n,
            t_sec,
        ));
        let mut f = File::create(path)?;
        let mut buf = [0u8; 4];
        for face in 0..6 {
            for b in 0..n {
                for a in 0..n {
                    let (lambda, theta) = face_point(face, n, a, b);
                    let val = cubic(h, grid, Stagger::P, false, lambda, theta);
                    LittleEndian::write_f32(&mut buf, val as f32);
                    f.write_all(&buf)?;
                }
            }
        }
        n *= 2;
    }
    Ok(())
}
