//! Adaptive Dormand-Prince RK4(5) integration onto a fixed output grid.
//!
//! Each grid interval is integrated with its own adaptive sub-steps. Steps are
//! bounded by both the grid spacing and `max_step`, so input pulses as short
//! as the dosing activation window are resolved on any output grid.

use crate::dosing::ACTIVATION_WINDOW;
use crate::error::{BiosimError, BiosimResult};
use log::debug;
use serde::{Deserialize, Serialize};

/// `rhs` takes `&mut self` so implementations can record each evaluation.
pub trait OdeSystem {
    fn ndim(&self) -> usize;

    fn rhs(&mut self, t: f64, y: &[f64], dydt: &mut [f64]);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
    pub samples_per_hour: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub max_steps_per_interval: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            samples_per_hour: 100.0,
            min_step: 1e-10,
            max_step: ACTIVATION_WINDOW / 5.0,
            max_steps_per_interval: 10_000,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> BiosimResult<()> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(BiosimError::Validation("rtol must be finite and > 0".to_string()));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(BiosimError::Validation("atol must be finite and > 0".to_string()));
        }
        if !self.samples_per_hour.is_finite() || self.samples_per_hour <= 0.0 {
            return Err(BiosimError::Validation(
                "samples_per_hour must be finite and > 0".to_string(),
            ));
        }
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return Err(BiosimError::Validation("min_step must be finite and > 0".to_string()));
        }
        if !self.max_step.is_finite() || self.max_step < self.min_step {
            return Err(BiosimError::Validation(
                "max_step must be finite and >= min_step".to_string(),
            ));
        }
        if self.max_steps_per_interval == 0 {
            return Err(BiosimError::Validation(
                "max_steps_per_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Evenly spaced sample times over `[0, duration]`, both ends included.
    pub fn output_grid(&self, duration: f64) -> Vec<f64> {
        let n = ((duration * self.samples_per_hour).round() as usize).max(2);
        let last = (n - 1) as f64;
        (0..n)
            .map(|i| if i == n - 1 { duration } else { duration * i as f64 / last })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    pub accepted: usize,
    pub rejected: usize,
    pub rhs_evaluations: usize,
}

#[derive(Debug, Clone)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub stats: SolverStats,
}

// Dormand-Prince coefficients
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (advancing solution)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// y5 - y4
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

struct Workspace {
    k: [Vec<f64>; 7],
    y_tmp: Vec<f64>,
    y_new: Vec<f64>,
}

impl Workspace {
    fn new(n: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![0.0; n]),
            y_tmp: vec![0.0; n],
            y_new: vec![0.0; n],
        }
    }
}

/// Fails with [`BiosimError::SimulationFailed`] on step collapse, an exhausted
/// per-interval step budget or a non-finite state.
pub fn rk45_on_grid<S: OdeSystem>(
    sys: &mut S,
    y0: &[f64],
    grid: &[f64],
    opts: &SolverOptions,
) -> BiosimResult<OdeSolution> {
    opts.validate()?;
    let n = sys.ndim();
    if y0.len() != n {
        return Err(BiosimError::Validation(format!(
            "rk45: y0.len()={} != ndim()={}",
            y0.len(),
            n
        )));
    }
    if grid.is_empty() {
        return Err(BiosimError::Validation("rk45: empty output grid".to_string()));
    }
    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(BiosimError::Validation(
            "rk45: output grid must be strictly increasing".to_string(),
        ));
    }

    let mut stats = SolverStats::default();
    let mut ws = Workspace::new(n);
    let mut t = grid[0];
    let mut y = y0.to_vec();

    let mut sol_t = Vec::with_capacity(grid.len());
    let mut sol_y = Vec::with_capacity(grid.len());
    sol_t.push(t);
    sol_y.push(y.clone());

    sys.rhs(t, &y, &mut ws.k[0]);
    stats.rhs_evaluations += 1;
    let mut h = (grid.get(1).copied().unwrap_or(t) - t).clamp(opts.min_step, opts.max_step);

    for &t_next in &grid[1..] {
        let mut steps = 0;
        while t < t_next {
            if steps == opts.max_steps_per_interval {
                return Err(BiosimError::SimulationFailed {
                    time: t,
                    reason: format!(
                        "exceeded {} steps before reaching t={:.4}",
                        opts.max_steps_per_interval, t_next
                    ),
                });
            }
            steps += 1;

            let remaining = t_next - t;
            let last_step = h >= remaining || remaining - h < opts.min_step;
            let step = if last_step { remaining } else { h };

            let err_norm = dopri_step(sys, t, &y, step, opts, &mut ws);
            stats.rhs_evaluations += 6;

            if err_norm <= 1.0 {
                t = if last_step { t_next } else { t + step };
                y.copy_from_slice(&ws.y_new);
                ws.k.swap(0, 6);
                stats.accepted += 1;
            } else {
                stats.rejected += 1;
            }

            let factor = if err_norm == 0.0 {
                5.0
            } else if err_norm.is_finite() {
                (0.9 * err_norm.powf(-0.2)).clamp(0.2, 5.0)
            } else {
                0.2
            };
            if err_norm > 1.0 || !last_step {
                h = (step * factor).min(opts.max_step);
            }

            if h < opts.min_step {
                return Err(BiosimError::SimulationFailed {
                    time: t,
                    reason: format!("step size collapsed to {:.3e}", h),
                });
            }
        }

        if y.iter().any(|v| !v.is_finite()) {
            return Err(BiosimError::SimulationFailed {
                time: t,
                reason: "state became non-finite".to_string(),
            });
        }
        sol_t.push(t_next);
        sol_y.push(y.clone());
    }

    debug!(
        "rk45: {} accepted, {} rejected steps, {} rhs evaluations",
        stats.accepted, stats.rejected, stats.rhs_evaluations
    );

    Ok(OdeSolution {
        t: sol_t,
        y: sol_y,
        stats,
    })
}

/// One Dormand-Prince trial step of size `h` from `(t, y)`. Expects `ws.k[0]`
/// to hold `f(t, y)`; leaves the candidate in `ws.y_new` and `f` at the
/// candidate in `ws.k[6]`. Returns the scaled RMS error norm.
fn dopri_step<S: OdeSystem>(
    sys: &mut S,
    t: f64,
    y: &[f64],
    h: f64,
    opts: &SolverOptions,
    ws: &mut Workspace,
) -> f64 {
    let n = y.len();
    let Workspace { k, y_tmp, y_new } = ws;

    for i in 0..n {
        y_tmp[i] = y[i] + h * A21 * k[0][i];
    }
    sys.rhs(t + C2 * h, y_tmp, &mut k[1]);

    for i in 0..n {
        y_tmp[i] = y[i] + h * (A31 * k[0][i] + A32 * k[1][i]);
    }
    sys.rhs(t + C3 * h, y_tmp, &mut k[2]);

    for i in 0..n {
        y_tmp[i] = y[i] + h * (A41 * k[0][i] + A42 * k[1][i] + A43 * k[2][i]);
    }
    sys.rhs(t + C4 * h, y_tmp, &mut k[3]);

    for i in 0..n {
        y_tmp[i] = y[i] + h * (A51 * k[0][i] + A52 * k[1][i] + A53 * k[2][i] + A54 * k[3][i]);
    }
    sys.rhs(t + C5 * h, y_tmp, &mut k[4]);

    for i in 0..n {
        y_tmp[i] = y[i]
            + h * (A61 * k[0][i] + A62 * k[1][i] + A63 * k[2][i] + A64 * k[3][i] + A65 * k[4][i]);
    }
    sys.rhs(t + h, y_tmp, &mut k[5]);

    for i in 0..n {
        y_new[i] = y[i]
            + h * (B1 * k[0][i] + B3 * k[2][i] + B4 * k[3][i] + B5 * k[4][i] + B6 * k[5][i]);
    }

    // FSAL
    sys.rhs(t + h, y_new, &mut k[6]);

    let mut err_norm = 0.0;
    for i in 0..n {
        let ei = h
            * (E1 * k[0][i] + E3 * k[2][i] + E4 * k[3][i] + E5 * k[4][i] + E6 * k[5][i]
                + E7 * k[6][i]);
        let scale = opts.atol + opts.rtol * y[i].abs().max(y_new[i].abs());
        err_norm += (ei / scale) * (ei / scale);
    }
    let err_norm = (err_norm / n as f64).sqrt();
    if err_norm.is_nan() {
        f64::INFINITY
    } else {
        err_norm
    }
}

pub fn euler_step<S: OdeSystem>(sys: &mut S, t: f64, y: &mut [f64], dt: f64) {
    let mut dydt = vec![0.0; y.len()];
    sys.rhs(t, y, &mut dydt);
    for (yi, di) in y.iter_mut().zip(&dydt) {
        *yi += di * dt;
    }
}
