use {
    crate::constants::*,
    anyhow::{bail, Result},
    serde::Deserialize,
    std::path::PathBuf,
};

/// Simulation parameters
#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub numerical: Numerical,
    pub physical: Physical,
    pub scheme: Scheme,
    pub environment: Environment,
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Numerical {
    /// Number of latitude rows; longitudes are twice this. Must be a power of two.
    pub grid_latitudes: usize,
    /// Time step size [s]; 0 selects the resolution-scaled default.
    pub time_step: f64,
    /// Total duration [days]; 0 selects the test-case default.
    pub duration: f64,
    /// Interval between field dumps [days].
    pub save_interval: f64,
    /// Outer (trajectory) iterations per step.
    pub outer_iterations: usize,
    /// Inner (Helmholtz) iterations per outer iteration.
    pub inner_iterations: usize,
    /// Fixed-point sweeps of the departure-point solver.
    pub departure_iterations: usize,
    /// Implicit off-centering weight; 0.5 is centred.
    pub off_centering: f64,
}

impl Default for Numerical {
    fn default() -> Self {
        Numerical {
            grid_latitudes: 32,
            time_step: 0.0,
            duration: 0.0,
            save_interval: 1.0,
            outer_iterations: 2,
            inner_iterations: 2,
            departure_iterations: 10,
            off_centering: 0.5,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Physical {
    /// Sphere radius [m].
    pub radius: f64,
    /// Gravitational acceleration [m/s^2].
    pub gravity: f64,
    /// Planetary vorticity scale 2*Omega [1/s].
    pub two_omega: f64,
    /// Rotation of the model grid about the geographic y-axis [rad].
    pub rotation_angle: f64,
}

impl Default for Physical {
    fn default() -> Self {
        Physical {
            radius: R_EARTH,
            gravity: GRAVITY,
            two_omega: TWO_OMEGA,
            rotation_angle: 0.0,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scheme {
    /// Coriolis discretization: "simple", "jt" or "new".
    pub coriolis: String,
    /// Geopotential advection: 1 = semi-Lagrangian, 2 = SLICE (arc length),
    /// 3 = SLICE with the area-coordinate fix.
    pub ischeme: u8,
    /// Helmholtz relaxation: "lines", "redblack", "gaussseidel" or "mixed".
    pub relaxation: String,
    /// Apply the SLICE C-grid edge correction.
    pub cgrid_correction: bool,
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme {
            coriolis: "simple".to_string(),
            ischeme: 1,
            relaxation: "lines".to_string(),
            cgrid_correction: false,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub output_directory: PathBuf,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            output_directory: PathBuf::from("dump"),
        }
    }
}

impl Parameters {
    /// Fail-fast validation of everything that would otherwise surface as a
    /// mid-run panic.
    pub fn validate(&self) -> Result<()> {
        let ny = self.numerical.grid_latitudes;
        if !ny.is_power_of_two() || ny < 8 {
            bail!(
                "grid_latitudes must be a power of two >= 8 (got {}), required by the multigrid hierarchy",
                ny
            );
        }
        match self.scheme.coriolis.as_str() {
            "simple" | "jt" | "new" => {}
            other => bail!("unknown Coriolis method \"{}\"", other),
        }
        match self.scheme.relaxation.as_str() {
            "lines" | "redblack" | "gaussseidel" | "mixed" => {}
            other => bail!("unknown relaxation mode \"{}\"", other),
        }
        if self.scheme.ischeme != 1 && ny < 16 {
            bail!(
                "SLICE needs at least 16 latitude rows for its polar caps, got {}",
                ny
            );
        }
        match self.scheme.ischeme {
            1 | 2 => {}
            3 => {
                if (self.numerical.off_centering - 0.5).abs() > 1e-12 {
                    bail!(
                        "ischeme 3 (conservative SLICE) requires a centred scheme; \
                         got off_centering = {}",
                        self.numerical.off_centering
                    );
                }
            }
            other => bail!("unknown ischeme {}", other),
        }
        if self.numerical.off_centering <= 0.0 || self.numerical.off_centering >= 1.0 {
            bail!(
                "off_centering must lie in (0, 1), got {}",
                self.numerical.off_centering
            );
        }
        Ok(())
    }

    pub fn nx(&self) -> usize {
        2 * self.numerical.grid_latitudes
    }

    pub fn ny(&self) -> usize {
        self.numerical.grid_latitudes
    }

    pub fn time_step(&self) -> f64 {
        if self.numerical.time_step > 0.0 {
            self.numerical.time_step
        } else {
            default_time_step(self.nx())
        }
    }
}
