use crate::traits::{Point, Reversed, VectorField};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Trajectories stop once either coordinate leaves [-bound, bound].
pub const DIVERGENCE_BOUND: f64 = 1000.0;

/// Upper limit on steps per trajectory so one click cannot stall the UI.
pub const MAX_STEPS: usize = 20_000;

/// Classic Runge-Kutta 4th order step for an autonomous planar field.
pub fn rk4_step(field: &impl VectorField, state: Point, dt: f64) -> Point {
    let half = 0.5 * dt;

    // k1 = f(y)
    let k1 = field.velocity(state);
    // k2 = f(y + dt*k1/2)
    let k2 = field.velocity(state + k1 * half);
    // k3 = f(y + dt*k2/2)
    let k3 = field.velocity(state + k2 * half);
    // k4 = f(y + dt*k3)
    let k4 = field.velocity(state + k3 * dt);

    // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
    state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Why an integration run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// All requested steps were taken.
    Completed,
    /// A step left the square bounded by `DIVERGENCE_BOUND`.
    OutOfBounds,
    /// A step (or the initial point) produced NaN or infinity.
    NonFinite,
    /// A step landed exactly where it started; the point is an equilibrium.
    Stationary,
}

/// A discretized solution curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    points: Vec<Point>,
    termination: Termination,
}

impl Trajectory {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as `[x0, y0, x1, y1, ...]`.
    pub fn flatten(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSettings {
    pub steps: usize,
    pub dt: f64,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            steps: 1200,
            dt: 0.01,
        }
    }
}

impl IntegrationSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            bail!("Step size dt must be positive and finite (got {}).", self.dt);
        }
        if self.steps > MAX_STEPS {
            bail!(
                "Step count {} exceeds the limit of {} steps.",
                self.steps,
                MAX_STEPS
            );
        }
        Ok(())
    }
}

fn escape_reason(p: &Point) -> Option<Termination> {
    if !p.x.is_finite() || !p.y.is_finite() {
        Some(Termination::NonFinite)
    } else if p.x.abs() > DIVERGENCE_BOUND || p.y.abs() > DIVERGENCE_BOUND {
        Some(Termination::OutOfBounds)
    } else {
        None
    }
}

/// Integrates `field` forward from `initial` with fixed-step RK4.
///
/// The result always starts at `initial` (unless `initial` itself is not
/// finite, which yields an empty trajectory). A step that produces a
/// non-finite point, or one beyond `DIVERGENCE_BOUND`, ends the run without
/// being recorded. `steps` is clamped to `MAX_STEPS`; a non-positive or
/// non-finite `dt` takes no steps.
pub fn integrate(field: &impl VectorField, initial: Point, steps: usize, dt: f64) -> Trajectory {
    if !initial.x.is_finite() || !initial.y.is_finite() {
        return Trajectory {
            points: Vec::new(),
            termination: Termination::NonFinite,
        };
    }

    let steps = if dt.is_finite() && dt > 0.0 {
        steps.min(MAX_STEPS)
    } else {
        0
    };

    let mut points = Vec::with_capacity(steps + 1);
    points.push(initial);

    let mut state = initial;
    for _ in 0..steps {
        let next = rk4_step(field, state, dt);
        if let Some(termination) = escape_reason(&next) {
            return Trajectory {
                points,
                termination,
            };
        }
        if next == state {
            return Trajectory {
                points,
                termination: Termination::Stationary,
            };
        }
        points.push(next);
        state = next;
    }

    Trajectory {
        points,
        termination: Termination::Completed,
    }
}

pub fn integrate_with(
    field: &impl VectorField,
    initial: Point,
    settings: &IntegrationSettings,
) -> Trajectory {
    integrate(field, initial, settings.steps, settings.dt)
}

/// Integrates into the past. Points are returned in forward-time order, so
/// the last point is `initial`.
pub fn integrate_backward(
    field: &impl VectorField,
    initial: Point,
    steps: usize,
    dt: f64,
) -> Trajectory {
    let mut trajectory = integrate(&Reversed(field), initial, steps, dt);
    trajectory.points.reverse();
    trajectory
}
