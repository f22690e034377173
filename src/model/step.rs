//! One semi-implicit semi-Lagrangian time step.
//!
//! The step follows the outer/inner iteration: the outer loop refreshes the
//! departure points and the departure-point right-hand sides, the inner loop
//! refreshes the Coriolis terms, solves the Helmholtz problem for the new
//! geopotential and back-substitutes the winds.

use {
    super::{operators, PhiScheme, State},
    crate::{
        departure,
        interp::{cubic, Stagger},
        polar, slice,
        utils::{arr2zero, wrap_dlon},
    },
    anyhow::Result,
};

pub fn step(state: &mut State) -> Result<()> {
    let State {
        ref grid,
        ref config,
        two_omega,
        phi_ref,
        ref mut u,
        ref mut v,
        ref mut phi,
        ref mut u0,
        ref mut v0,
        ref mut phi0,
        ref phis,
        ref mut dep,
        ref mut aread,
        ref mut helmholtz,
        ..
    } = *state;

    let (nx, ny) = (grid.nx, grid.ny);
    let dt = config.dt;
    let adt = config.alpha * dt;
    let bdt = config.beta * dt;

    polar::fill_polar_v(grid, u0, v0);
    polar::fill_polar_v(grid, u, v);

    // Current-level residuals.
    let (fu0, fv0) = config.coriolis.apply(grid, two_omega, u0, v0, phi0);
    let mut phitot0 = phi0.clone();
    phitot0 += phis;
    let gx0 = operators::grad_x(grid, &phitot0);
    let gy0 = operators::grad_y(grid, &phitot0);

    let mut ru0 = arr2zero(nx, ny);
    let mut rv0 = arr2zero(nx, ny + 1);
    for i in 0..nx {
        for j in 0..ny {
            ru0[[i, j]] = u0[[i, j]] - bdt * (gx0[[i, j]] - fv0[[i, j]]);
        }
        for j in 1..ny {
            rv0[[i, j]] = v0[[i, j]] - bdt * (gy0[[i, j]] + fu0[[i, j]]);
        }
    }
    // Polar rows of the residual wind follow the same reconstruction as v.
    polar::fill_polar_v(grid, &ru0, &mut rv0);

    let div0 = operators::divergence(grid, u0, v0);
    let mut rphi0 = arr2zero(nx, ny);
    for i in 0..nx {
        for j in 0..ny {
            rphi0[[i, j]] = phi0[[i, j]] * (1.0 - bdt * div0[[i, j]]);
        }
    }

    let gsx = operators::grad_x(grid, phis);
    let gsy = operators::grad_y(grid, phis);

    for _ in 0..config.nouter {
        departure::compute(grid, dt, config.ndepit, u0, v0, u, v, dep);
        if config.phi_scheme.uses_slice() {
            departure::modify_polar(grid, dep);
        }

        // Departure-point momentum residuals, rotated into the arrival frame.
        let mut rud = arr2zero(nx, ny);
        let mut rvd = arr2zero(nx, ny + 1);
        for i in 0..nx {
            for j in 0..ny {
                let (lam_d, th_d) = (dep.xdu[[i, j]], dep.ydu[[i, j]]);
                let ur = cubic(&ru0, grid, Stagger::U, true, lam_d, th_d);
                let vr = cubic(&rv0, grid, Stagger::V, true, lam_d, th_d);
                let dlam = wrap_dlon(grid.xu[i] - lam_d);
                let (rx, _) = departure::rotate_to_arrival(grid.yp[j], th_d, dlam, ur, vr);
                rud[[i, j]] = rx - adt * gsx[[i, j]];
            }
            for j in 1..ny {
                let (lam_d, th_d) = (dep.xdv[[i, j]], dep.ydv[[i, j]]);
                let ur = cubic(&ru0, grid, Stagger::U, true, lam_d, th_d);
                let vr = cubic(&rv0, grid, Stagger::V, true, lam_d, th_d);
                let dlam = wrap_dlon(grid.xp[i] - lam_d);
                let (_, ry) = departure::rotate_to_arrival(grid.yv[j], th_d, dlam, ur, vr);
                rvd[[i, j]] = ry - adt * gsy[[i, j]];
            }
        }

        // Semi-Lagrangian geopotential estimate; also the polar-cap donor
        // for the SLICE merge.
        let mut rphi_sl = arr2zero(nx, ny);
        for i in 0..nx {
            for j in 0..ny {
                rphi_sl[[i, j]] =
                    cubic(&rphi0, grid, Stagger::P, false, dep.xdp[[i, j]], dep.ydp[[i, j]]);
            }
        }

        let rphid = match config.phi_scheme {
            PhiScheme::SemiLagrangian => rphi_sl,
            PhiScheme::SliceArc => {
                let mut mass0 = arr2zero(nx, ny);
                for i in 0..nx {
                    for j in 0..ny {
                        mass0[[i, j]] = phi0[[i, j]] * grid.area[j];
                    }
                }
                let mut remapped = arr2zero(nx, ny);
                slice::slice2d(
                    grid,
                    dep,
                    &mass0,
                    aread,
                    slice::NsCoordinate::ArcLength,
                    config.cgrid_correction,
                    &mut remapped,
                );
                let mut vals = arr2zero(nx, ny);
                for i in 0..nx {
                    for j in 0..ny {
                        vals[[i, j]] = remapped[[i, j]] / grid.area[j];
                    }
                }
                slice::merge_polar(grid, &mut vals, &rphi_sl);
                vals
            }
            PhiScheme::SliceArea => {
                let (u0m, v0m) = departure::damp_polar_winds(grid, u0, v0);
                let div_mod0 = operators::divergence(grid, &u0m, &v0m);
                let (um, vm) = departure::damp_polar_winds(grid, u, v);
                let div_mod = operators::divergence(grid, &um, &vm);

                let mut mass0 = arr2zero(nx, ny);
                for i in 0..nx {
                    for j in 0..ny {
                        mass0[[i, j]] = phi0[[i, j]] * grid.area[j];
                    }
                }
                let mut remapped = arr2zero(nx, ny);
                slice::transport_area(
                    grid,
                    dep,
                    &mass0,
                    &div_mod0,
                    &div_mod,
                    dt,
                    config.cgrid_correction,
                    aread,
                    &mut remapped,
                );
                let mut vals = arr2zero(nx, ny);
                for i in 0..nx {
                    for j in 0..ny {
                        vals[[i, j]] = remapped[[i, j]] / grid.area[j];
                    }
                }
                slice::merge_polar(grid, &mut vals, &rphi_sl);
                vals
            }
        };

        if config.frozen_velocity {
            // Pure advection: the remapped field is the new geopotential.
            phi.assign(&rphid);
            continue;
        }

        for _ in 0..config.ninner {
            let (fu, fv) = config.coriolis.apply(grid, two_omega, u, v, phi);

            let mut ru = arr2zero(nx, ny);
            let mut rv = arr2zero(nx, ny + 1);
            for i in 0..nx {
                for j in 0..ny {
                    ru[[i, j]] = rud[[i, j]] + adt * fv[[i, j]];
                }
                for j in 1..ny {
                    rv[[i, j]] = rvd[[i, j]] - adt * fu[[i, j]];
                }
            }

            let divr = operators::divergence(grid, &ru, &rv);
            let nu = helmholtz.nu;
            let mut rhs = arr2zero(nx, ny);
            for i in 0..nx {
                for j in 0..ny {
                    rhs[[i, j]] = -nu * (rphid[[i, j]] - phi_ref * adt * divr[[i, j]]);
                }
            }
            helmholtz.solve(&rhs, phi);

            let gx = operators::grad_x(grid, phi);
            let gy = operators::grad_y(grid, phi);
            for i in 0..nx {
                for j in 0..ny {
                    u[[i, j]] = ru[[i, j]] - adt * gx[[i, j]];
                }
                for j in 1..ny {
                    v[[i, j]] = rv[[i, j]] - adt * gy[[i, j]];
                }
            }
            polar::fill_polar_v(grid, u, v);
        }
    }

    // Promote the iterate to the new time level.
    u0.assign(u);
    v0.assign(v);
    phi0.assign(phi);
    state.t += dt;
    Ok(())
}
