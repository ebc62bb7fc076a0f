//! Overlay geometry: eigen-analysis, equilibria and the direction field.

use crate::system::WasmPhasePortrait;
use anyhow::Context;
use js_sys::Float64Array;
use num_complex::Complex;
use phase_core::direction_field::{sample_direction_field, Viewport};
use phase_core::linear::{EigenAnalysis, PortraitKind};
use phase_core::models::Equilibrium;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Serialize)]
struct ComplexNumber {
    re: f64,
    im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// JS-facing shape of `EigenAnalysis`: plain objects instead of nalgebra vectors.
#[derive(Debug, Clone, Serialize)]
struct EigenAnalysisPayload {
    trace: f64,
    determinant: f64,
    discriminant: f64,
    kind: PortraitKind,
    eigenvalues: Vec<ComplexNumber>,
    eigenvectors: Vec<[f64; 2]>,
}

impl From<&EigenAnalysis> for EigenAnalysisPayload {
    fn from(analysis: &EigenAnalysis) -> Self {
        Self {
            trace: analysis.trace,
            determinant: analysis.determinant,
            discriminant: analysis.discriminant,
            kind: analysis.classify(),
            eigenvalues: analysis
                .eigenvalues
                .iter()
                .copied()
                .map(ComplexNumber::from)
                .collect(),
            eigenvectors: analysis.eigenvectors.iter().map(|v| [v.x, v.y]).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EquilibriumPayload {
    point: [f64; 2],
    kind: PortraitKind,
    analysis: EigenAnalysisPayload,
}

impl From<&Equilibrium> for EquilibriumPayload {
    fn from(eq: &Equilibrium) -> Self {
        Self {
            point: [eq.point.x, eq.point.y],
            kind: eq.kind,
            analysis: EigenAnalysisPayload::from(&eq.analysis),
        }
    }
}

impl WasmPhasePortrait {
    /// `[ax, ay, ux, uy, speed]` per arrow.
    pub(crate) fn direction_field_flat(
        &self,
        viewport: Viewport,
        columns: usize,
        rows: usize,
    ) -> anyhow::Result<Vec<f64>> {
        let arrows = sample_direction_field(&self.field, &viewport, columns, rows)
            .context("Direction field sampling failed")?;
        Ok(arrows
            .iter()
            .flat_map(|a| [a.anchor.x, a.anchor.y, a.direction.x, a.direction.y, a.speed])
            .collect())
    }
}

#[wasm_bindgen]
impl WasmPhasePortrait {
    /// Trace, determinant, eigenvalues and eigenvectors; `null` unless the model is linear.
    pub fn eigen_analysis(&self) -> Result<JsValue, JsValue> {
        match self.config.eigen_analysis() {
            Some(analysis) => to_value(&EigenAnalysisPayload::from(&analysis))
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e))),
            None => Ok(JsValue::NULL),
        }
    }

    /// Unit eigenvectors as `[x0, y0, x1, y1]` (0, 2 or 4 entries).
    pub fn eigenvectors(&self) -> Vec<f64> {
        self.config
            .eigen_analysis()
            .map(|analysis| analysis.eigenvectors.iter().flat_map(|v| [v.x, v.y]).collect())
            .unwrap_or_default()
    }

    /// Eigenvalues as `[re0, im0, re1, im1]`; empty unless the model is linear.
    pub fn eigenvalues(&self) -> Vec<f64> {
        self.config
            .eigen_analysis()
            .map(|analysis| {
                analysis
                    .eigenvalues
                    .iter()
                    .flat_map(|l| [l.re, l.im])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn equilibria(&self) -> Result<JsValue, JsValue> {
        let payload: Vec<EquilibriumPayload> = self
            .config
            .equilibria()
            .iter()
            .map(EquilibriumPayload::from)
            .collect();
        to_value(&payload)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn equilibrium_count(&self) -> usize {
        self.config.equilibria().len()
    }

    pub fn direction_field(
        &self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        columns: usize,
        rows: usize,
    ) -> Result<Float64Array, JsValue> {
        let viewport = Viewport {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        let flat = self
            .direction_field_flat(viewport, columns, rows)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        Ok(Float64Array::from(flat.as_slice()))
    }
}
