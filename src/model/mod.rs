pub mod diagnostics;
pub mod operators;
pub mod output;
pub mod step;

use {
    crate::{
        constants::SEC_PER_DAY,
        coriolis::CoriolisScheme,
        departure::DeparturePoints,
        grid::Grid,
        initial,
        multigrid::{Helmholtz, Relaxation},
        parameters::Parameters,
        polar,
        utils::arr2zero,
    },
    anyhow::{bail, Result},
    log::{info, warn},
    ndarray::Array2,
    std::{fs::create_dir_all, path::PathBuf},
};

/// Geopotential advection path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhiScheme {
    /// Cubic-Lagrange interpolation at the departure points.
    SemiLagrangian,
    /// SLICE remap with latitude arc length as the north-south coordinate.
    SliceArc,
    /// SLICE remap with evolved departure areas; fully conservative.
    SliceArea,
}

impl PhiScheme {
    pub fn from_ischeme(ischeme: u8) -> Result<Self> {
        Ok(match ischeme {
            1 => PhiScheme::SemiLagrangian,
            2 => PhiScheme::SliceArc,
            3 => PhiScheme::SliceArea,
            other => bail!("unknown ischeme {}", other),
        })
    }

    pub fn tag(self) -> u8 {
        match self {
            PhiScheme::SemiLagrangian => 1,
            PhiScheme::SliceArc => 2,
            PhiScheme::SliceArea => 3,
        }
    }

    pub fn uses_slice(self) -> bool {
        self != PhiScheme::SemiLagrangian
    }
}

/// Everything fixed over a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub ic: u32,
    pub dump_ref: bool,
    pub coriolis: CoriolisScheme,
    pub phi_scheme: PhiScheme,
    pub cgrid_correction: bool,
    /// Implicit off-centering weight (0.5 centred) and its complement.
    pub alpha: f64,
    pub beta: f64,
    pub dt: f64,
    pub nouter: usize,
    pub ninner: usize,
    pub ndepit: usize,
    pub t_stop: f64,
    pub save_interval: f64,
    pub gravity: f64,
    pub frozen_velocity: bool,
    pub steady: bool,
    pub output_directory: PathBuf,
}

/// Plain-text diagnostics and dump bookkeeping accumulated over a run.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub monitor: String,
    pub dump_times: Vec<u64>,
    /// Model time at which the ic=8 instability detector tripped, if it did.
    pub instability_at: Option<f64>,
}

pub struct State {
    pub grid: Grid,
    pub config: Config,
    pub two_omega: f64,
    pub phi_ref: f64,

    // Current iterate and previous time level.
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub phi: Array2<f64>,
    pub u0: Array2<f64>,
    pub v0: Array2<f64>,
    pub phi0: Array2<f64>,

    // Static fields.
    pub phis: Array2<f64>,
    pub u_init: Array2<f64>,
    pub v_init: Array2<f64>,
    pub phi_init: Array2<f64>,

    pub dep: DeparturePoints,
    /// Departure cell areas for the conservative remap.
    pub aread: Array2<f64>,
    pub helmholtz: Helmholtz,

    pub t: f64,
    pub mass_init: f64,
    pub output: Output,
}

impl State {
    pub fn build(params: &Parameters, ic: u32, dump_ref: bool) -> Result<State> {
        params.validate()?;

        let grid = Grid::new(
            params.nx(),
            params.ny(),
            params.physical.radius,
            params.physical.rotation_angle,
        );
        let init = initial::build(ic, &grid, params.physical.gravity, params.physical.two_omega)?;

        let alpha = params.numerical.off_centering;
        let dt = params.time_step();
        let t_stop = if params.numerical.duration > 0.0 {
            params.numerical.duration * SEC_PER_DAY
        } else {
            init.t_stop_days * SEC_PER_DAY
        };

        let config = Config {
            ic,
            dump_ref,
            coriolis: CoriolisScheme::from_name(&params.scheme.coriolis)?,
            phi_scheme: PhiScheme::from_ischeme(params.scheme.ischeme)?,
            cgrid_correction: params.scheme.cgrid_correction,
            alpha,
            beta: 1.0 - alpha,
            dt,
            nouter: params.numerical.outer_iterations,
            ninner: params.numerical.inner_iterations,
            ndepit: params.numerical.departure_iterations,
            t_stop,
            save_interval: params.numerical.save_interval * SEC_PER_DAY,
            gravity: params.physical.gravity,
            frozen_velocity: init.frozen_velocity,
            steady: init.steady,
            output_directory: params.environment.output_directory.clone(),
        };

        let nu = 1.0 / ((alpha * dt) * (alpha * dt) * init.phi_ref);
        let helmholtz = Helmholtz::new(&grid, nu, Relaxation::from_name(&params.scheme.relaxation)?);

        let mut v = init.v.clone();
        polar::fill_polar_v(&grid, &init.u, &mut v);

        // Departure areas start as the arrival areas.
        let mut aread = arr2zero(grid.nx, grid.ny);
        for i in 0..grid.nx {
            for j in 0..grid.ny {
                aread[[i, j]] = grid.area[j];
            }
        }

        let mass_init = diagnostics::total_mass(&grid, &init.phi);

        let state = State {
            dep: DeparturePoints::new(&grid),
            u: init.u.clone(),
            v: v.clone(),
            phi: init.phi.clone(),
            u0: init.u.clone(),
            v0: v.clone(),
            phi0: init.phi.clone(),
            phis: init.phis,
            u_init: init.u,
            v_init: v,
            phi_init: init.phi,
            two_omega: init.two_omega,
            phi_ref: init.phi_ref,
            aread,
            helmholtz,
            grid,
            config,
            t: 0.0,
            mass_init,
            output: Output::default(),
        };
        Ok(state)
    }
}

/// Runs a complete simulation: initialization, time loop, dumps.
pub fn run(params: &Parameters, ic: u32, dump_ref: bool) -> Result<Output> {
    let mut state = State::build(params, ic, dump_ref)?;
    create_dir_all(&state.config.output_directory)?;

    let ngsave = (state.config.save_interval / state.config.dt).round().max(1.0) as usize;
    let nsteps = (state.config.t_stop / state.config.dt).round() as usize;

    info!(
        "ic={} {}x{} dt={}s steps={} scheme={:?} coriolis={:?}",
        ic,
        state.grid.nx,
        state.grid.ny,
        state.config.dt,
        nsteps,
        state.config.phi_scheme,
        state.config.coriolis
    );

    output::savegrid(&mut state)?;

    for istep in 1..=nsteps {
        step::step(&mut state)?;
        diagnostics::diagnose(&mut state);

        if state.config.ic == 8 {
            let worst = state
                .u
                .iter()
                .zip(state.u_init.iter())
                .fold(0.0_f64, |m, (&a, &b)| m.max((a - b).abs()));
            if worst > 10.0 {
                warn!(
                    "instability detected at t = {:.0} s: max|u - u_init| = {:.2} m/s",
                    state.t, worst
                );
                state.output.instability_at = Some(state.t);
                output::savegrid(&mut state)?;
                break;
            }
        }

        if istep % ngsave == 0 {
            output::savegrid(&mut state)?;
        }
    }

    output::write_times(&state)?;
    Ok(state.output)
}
