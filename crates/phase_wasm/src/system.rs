//! Core WASM wrapper: model selection and trajectory seeding.

use phase_core::field::ExpressionField;
use phase_core::history::TrajectoryHistory;
use phase_core::linear::LinearCoefficients;
use phase_core::models::{LotkaVolterra, ModelConfig, ModelField};
use phase_core::solvers::{integrate_backward, integrate_with, IntegrationSettings, Termination};
use phase_core::traits::{Point, VectorField};
use phase_core::Trajectory;
use serde_wasm_bindgen::{from_value, to_value};
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmPhasePortrait {
    pub(crate) config: ModelConfig,
    pub(crate) field: ModelField,
    settings: IntegrationSettings,
    history: TrajectoryHistory,
}

impl WasmPhasePortrait {
    /// Swaps the model; existing trajectories belong to the old field and are dropped.
    fn install(&mut self, config: ModelConfig) {
        let field = match config.try_build_field() {
            Ok(field) => field,
            Err(err) => {
                console_log!("Custom field rejected ({}); using the zero field", err);
                ModelField::Custom(ExpressionField::inert())
            }
        };
        console_log!("Switched to {} model", config.kind_name());
        self.config = config;
        self.field = field;
        self.history.clear();
    }

    fn record(&mut self, trajectory: Trajectory) -> Vec<f64> {
        match trajectory.termination() {
            Termination::OutOfBounds | Termination::NonFinite => console_log!(
                "Trajectory stopped early after {} points ({:?})",
                trajectory.len(),
                trajectory.termination()
            ),
            Termination::Completed | Termination::Stationary => {}
        }
        self.history.push(trajectory).trajectory.flatten()
    }
}

impl Default for WasmPhasePortrait {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmPhasePortrait {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmPhasePortrait {
        console_error_panic_hook::set_once();

        let config = ModelConfig::default();
        let field = config.build_field();
        WasmPhasePortrait {
            config,
            field,
            settings: IntegrationSettings::default(),
            history: TrajectoryHistory::default(),
        }
    }

    /// Accepts `{ kind: "linear" | "lotka_volterra" | "custom", ... }`.
    pub fn set_model(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config: ModelConfig = from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid model config: {}", e)))?;
        self.install(config);
        Ok(())
    }

    pub fn set_linear(&mut self, a: f64, b: f64, c: f64, d: f64) {
        self.install(ModelConfig::Linear(LinearCoefficients::new(a, b, c, d)));
    }

    pub fn set_lotka_volterra(&mut self, alpha: f64, beta: f64, gamma: f64, delta: f64) {
        self.install(ModelConfig::LotkaVolterra(LotkaVolterra {
            alpha,
            beta,
            gamma,
            delta,
        }));
    }

    /// Returns false when an expression failed to compile and the zero field is in use.
    pub fn set_custom(
        &mut self,
        dx: String,
        dy: String,
        constant_names: Vec<String>,
        constant_values: Vec<f64>,
    ) -> Result<bool, JsValue> {
        if constant_names.len() != constant_values.len() {
            return Err(JsValue::from_str(
                "Constant names and values must have the same length.",
            ));
        }
        let constants: BTreeMap<String, f64> =
            constant_names.into_iter().zip(constant_values).collect();
        self.install(ModelConfig::Custom { dx, dy, constants });
        Ok(!self.field.is_inert())
    }

    /// Retunes one constant of a custom model without recompiling it.
    /// Returns false for other model kinds and unknown names.
    pub fn set_constant(&mut self, name: &str, value: f64) -> bool {
        let (ModelConfig::Custom { constants, .. }, ModelField::Custom(field)) =
            (&mut self.config, &mut self.field)
        else {
            return false;
        };
        if !field.set_constant(name, value) {
            return false;
        }
        constants.insert(name.to_string(), value);
        self.history.clear();
        true
    }

    pub fn model_kind(&self) -> String {
        self.config.kind_name().to_string()
    }

    pub fn model_config(&self) -> Result<JsValue, JsValue> {
        to_value(&self.config)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn field_is_inert(&self) -> bool {
        self.field.is_inert()
    }

    pub fn set_integration(&mut self, steps: u32, dt: f64) -> Result<(), JsValue> {
        let settings = IntegrationSettings {
            steps: steps as usize,
            dt,
        };
        settings
            .validate()
            .map_err(|e| JsValue::from_str(&format!("Invalid integration settings: {}", e)))?;
        self.settings = settings;
        Ok(())
    }

    pub fn integration_steps(&self) -> u32 {
        self.settings.steps as u32
    }

    pub fn integration_dt(&self) -> f64 {
        self.settings.dt
    }

    pub fn velocity(&self, x: f64, y: f64) -> Vec<f64> {
        let v = self.field.velocity(Point::new(x, y));
        vec![v.x, v.y]
    }

    /// Integrates forward from (x, y), stores the curve and returns it as `[x0, y0, x1, y1, ...]`.
    pub fn seed_trajectory(&mut self, x: f64, y: f64) -> Vec<f64> {
        let trajectory = integrate_with(&self.field, Point::new(x, y), &self.settings);
        self.record(trajectory)
    }

    /// Like `seed_trajectory`, but follows the flow into the past; the curve ends at (x, y).
    pub fn seed_backward_trajectory(&mut self, x: f64, y: f64) -> Vec<f64> {
        let trajectory = integrate_backward(
            &self.field,
            Point::new(x, y),
            self.settings.steps,
            self.settings.dt,
        );
        self.record(trajectory)
    }

    pub fn trajectory_count(&self) -> usize {
        self.history.len()
    }

    /// Flat points of the `index`-th stored trajectory, oldest first.
    pub fn trajectory_points(&self, index: usize) -> Option<Vec<f64>> {
        self.history
            .iter()
            .nth(index)
            .map(|entry| entry.trajectory.flatten())
    }

    pub fn trajectory_color(&self, index: usize) -> Option<String> {
        self.history
            .iter()
            .nth(index)
            .map(|entry| entry.color.to_string())
    }

    /// All stored trajectories with ids, colors and termination reasons.
    pub fn trajectories(&self) -> Result<JsValue, JsValue> {
        let entries: Vec<_> = self.history.iter().collect();
        to_value(&entries)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn clear_trajectories(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(flat: &[f64]) -> Vec<(f64, f64)> {
        flat.chunks(2).map(|c| (c[0], c[1])).collect()
    }

    #[test]
    fn default_portrait_is_linear() {
        let portrait = WasmPhasePortrait::new();
        assert_eq!(portrait.model_kind(), "linear");
        assert!(!portrait.field_is_inert());
        assert_eq!(portrait.integration_steps(), 1200);
    }

    #[test]
    fn seed_trajectory_starts_at_seed() {
        let mut portrait = WasmPhasePortrait::new();
        portrait.set_linear(0.0, 1.0, -1.0, 0.0);
        portrait.set_integration(1000, 0.02).expect("valid settings");

        let flat = portrait.seed_trajectory(1.0, 0.0);
        let pts = points(&flat);
        assert_eq!(pts.len(), 1001);
        assert_eq!(pts[0], (1.0, 0.0));
        for (x, y) in pts {
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < 1e-2);
        }
        assert_eq!(portrait.trajectory_count(), 1);
    }

    #[test]
    fn backward_trajectory_ends_at_seed() {
        let mut portrait = WasmPhasePortrait::new();
        portrait.set_integration(50, 0.1).expect("valid settings");
        let flat = portrait.seed_backward_trajectory(0.5, -0.5);
        assert_eq!(&flat[flat.len() - 2..], &[0.5, -0.5]);
    }

    #[test]
    fn history_keeps_five_most_recent() {
        let mut portrait = WasmPhasePortrait::new();
        portrait.set_integration(10, 0.1).expect("valid settings");
        for i in 0..8 {
            portrait.seed_trajectory(i as f64, 0.0);
        }
        assert_eq!(portrait.trajectory_count(), 5);
        let oldest = portrait.trajectory_points(0).expect("stored");
        assert_eq!(&oldest[..2], &[3.0, 0.0]);
        assert!(portrait.trajectory_points(5).is_none());
        assert!(portrait.trajectory_color(4).is_some());

        portrait.clear_trajectories();
        assert_eq!(portrait.trajectory_count(), 0);
    }

    #[test]
    fn switching_model_clears_history() {
        let mut portrait = WasmPhasePortrait::new();
        portrait.seed_trajectory(1.0, 1.0);
        portrait.set_lotka_volterra(1.1, 0.4, 0.4, 0.1);
        assert_eq!(portrait.model_kind(), "lotka_volterra");
        assert_eq!(portrait.trajectory_count(), 0);
        assert_eq!(portrait.velocity(1.0, 1.0), vec![1.1 - 0.4, 0.1 - 0.4]);
    }

    #[test]
    fn custom_model_binds_constants() {
        let mut portrait = WasmPhasePortrait::new();
        let compiled = portrait
            .set_custom(
                "k * y".to_string(),
                "-x".to_string(),
                vec!["k".to_string()],
                vec![2.0],
            )
            .expect("matching constants");
        assert!(compiled);
        assert_eq!(portrait.velocity(3.0, 4.0), vec![8.0, -3.0]);
    }

    #[test]
    fn malformed_custom_model_falls_back_to_zero_field() {
        let mut portrait = WasmPhasePortrait::new();
        let compiled = portrait
            .set_custom("(x".to_string(), "y".to_string(), Vec::new(), Vec::new())
            .expect("matching constants");
        assert!(!compiled);
        assert!(portrait.field_is_inert());
        assert_eq!(portrait.velocity(3.0, 4.0), vec![0.0, 0.0]);

        let flat = portrait.seed_trajectory(3.0, 4.0);
        assert_eq!(flat, vec![3.0, 4.0]);
    }

    #[test]
    fn set_constant_retunes_custom_model() {
        let mut portrait = WasmPhasePortrait::new();
        portrait
            .set_custom(
                "k * y".to_string(),
                "-x".to_string(),
                vec!["k".to_string()],
                vec![2.0],
            )
            .expect("matching constants");
        portrait.seed_trajectory(1.0, 1.0);

        assert!(portrait.set_constant("k", 5.0));
        assert_eq!(portrait.velocity(3.0, 4.0), vec![20.0, -3.0]);
        assert_eq!(portrait.trajectory_count(), 0);
        assert!(!portrait.set_constant("missing", 1.0));

        portrait.set_linear(1.0, 0.0, 0.0, 1.0);
        assert!(!portrait.set_constant("k", 1.0));
    }
}
