//! Raw binary field dumps at phi points.
//!
//! Every dump writes one little-endian f32 stream per field, longitude
//! outermost, no header. File names encode the test case, the Coriolis
//! method, the advection scheme and the resolution so that several runs can
//! share one directory.

use {
    super::{operators, State},
    crate::{polar, refsol, utils::arr2zero},
    anyhow::Result,
    byteorder::{ByteOrder, LittleEndian},
    log::info,
    ndarray::Array2,
    std::{fs::File, io::Write, path::PathBuf},
};

pub fn field_path(state: &State, field: &str, t_sec: u64) -> PathBuf {
    state.config.output_directory.join(format!(
        "sw_ic{}_cor{}_sl{}_{}_t{}_{}x{}.dat",
        state.config.ic,
        state.config.coriolis.tag(),
        state.config.phi_scheme.tag(),
        field,
        t_sec,
        state.grid.nx,
        state.grid.ny,
    ))
}

pub fn write_f32(path: &PathBuf, data: &Array2<f64>, nx: usize, ny: usize) -> Result<()> {
    let mut f = File::create(path)?;
    let mut buf = [0u8; 4];
    for i in 0..nx {
        for j in 0..ny {
            LittleEndian::write_f32(&mut buf, data[[i, j]] as f32);
            f.write_all(&buf)?;
        }
    }
    Ok(())
}

/// Dumps u, v, h, relative vorticity and potential vorticity at cell
/// centres, plus the height error for steady cases.
pub fn savegrid(state: &mut State) -> Result<()> {
    let grid = &state.grid;
    let (nx, ny) = (grid.nx, grid.ny);
    let g = state.config.gravity;
    let t_sec = state.t.round() as u64;

    let mut v_filled = state.v.clone();
    polar::fill_polar_v(grid, &state.u, &mut v_filled);

    let up = polar::u_at_p(grid, &state.u);
    let vp = polar::v_at_p(grid, &v_filled);

    let mut h = arr2zero(nx, ny);
    for i in 0..nx {
        for j in 0..ny {
            h[[i, j]] = (state.phi[[i, j]] + state.phis[[i, j]]) / g;
        }
    }

    let zeta_z = operators::vorticity(grid, &state.u, &v_filled);
    let mut zeta = arr2zero(nx, ny);
    let mut pv = arr2zero(nx, ny);
    for i in 0..nx {
        let ip1 = (i + 1) % nx;
        for j in 0..ny {
            zeta[[i, j]] = 0.25
                * (zeta_z[[i, j]] + zeta_z[[ip1, j]] + zeta_z[[i, j + 1]] + zeta_z[[ip1, j + 1]]);
            let f = state.two_omega * grid.singp[[i, j]];
            pv[[i, j]] = (zeta[[i, j]] + f) * g / state.phi[[i, j]];
        }
    }

    write_f32(&field_path(state, "u", t_sec), &up, nx, ny)?;
    write_f32(&field_path(state, "v", t_sec), &vp, nx, ny)?;
    write_f32(&field_path(state, "h", t_sec), &h, nx, ny)?;
    write_f32(&field_path(state, "vort", t_sec), &zeta, nx, ny)?;
    write_f32(&field_path(state, "pv", t_sec), &pv, nx, ny)?;

    if state.config.steady {
        let mut herr = arr2zero(nx, ny);
        for i in 0..nx {
            for j in 0..ny {
                herr[[i, j]] = (state.phi[[i, j]] - state.phi_init[[i, j]]) / g;
            }
        }
        write_f32(&field_path(state, "herr", t_sec), &herr, nx, ny)?;
    }

    if state.config.dump_ref {
        refsol::dump(state, &h, t_sec)?;
    }

    info!("dumped fields at t = {} s", t_sec);
    state.output.dump_times.push(t_sec);
    Ok(())
}

/// Writes the dump-time index consumed by the plotting pipeline.
pub fn write_times(state: &State) -> Result<()> {
    let path = state
        .config
        .output_directory
        .join(format!("TC{}_times.dat", state.config.ic));
    let mut f = File::create(path)?;
    for t in &state.output.dump_times {
        writeln!(f, "{}", t)?;
    }
    Ok(())
}
