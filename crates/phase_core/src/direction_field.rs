use crate::traits::{Point, VectorField};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on `columns * rows` for one sampling pass.
pub const MAX_ARROWS: usize = 100_000;

/// Visible region of the phase plane, in domain coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x_min: -5.0,
            x_max: 5.0,
            y_min: -5.0,
            y_max: 5.0,
        }
    }
}

impl Viewport {
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.x_min, self.x_max, self.y_min, self.y_max];
        if bounds.iter().any(|v| !v.is_finite()) {
            bail!("Viewport bounds must be finite.");
        }
        if self.x_max <= self.x_min || self.y_max <= self.y_min {
            bail!("Viewport ranges must satisfy max > min.");
        }
        Ok(())
    }
}

/// One arrow of the direction field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldArrow {
    /// Center of the grid cell.
    pub anchor: Point,
    /// Unit vector along the flow.
    pub direction: Point,
    /// Magnitude of the velocity before normalization.
    pub speed: f64,
}

/// Samples `field` at the centers of a `columns` x `rows` grid over `viewport`.
/// Cells where the velocity is zero or not finite are skipped.
pub fn sample_direction_field(
    field: &impl VectorField,
    viewport: &Viewport,
    columns: usize,
    rows: usize,
) -> Result<Vec<FieldArrow>> {
    viewport.validate()?;
    if columns == 0 || rows == 0 {
        bail!("Direction field needs at least one column and one row.");
    }
    let cells = match columns.checked_mul(rows) {
        Some(cells) if cells <= MAX_ARROWS => cells,
        _ => bail!("Direction field grid is limited to {} cells.", MAX_ARROWS),
    };

    let cell_w = (viewport.x_max - viewport.x_min) / columns as f64;
    let cell_h = (viewport.y_max - viewport.y_min) / rows as f64;

    let mut arrows = Vec::with_capacity(cells);
    for row in 0..rows {
        let y = viewport.y_min + (row as f64 + 0.5) * cell_h;
        for col in 0..columns {
            let x = viewport.x_min + (col as f64 + 0.5) * cell_w;
            let anchor = Point::new(x, y);
            let velocity = field.velocity(anchor);
            let speed = velocity.norm();
            if !speed.is_finite() || speed == 0.0 {
                continue;
            }
            arrows.push(FieldArrow {
                anchor,
                direction: velocity / speed,
                speed,
            });
        }
    }
    Ok(arrows)
}
