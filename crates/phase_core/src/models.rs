//! The model families offered by the visualizer.

use crate::field::{make_field, try_make_field, ExpressionField, FieldError};
use crate::linear::{EigenAnalysis, LinearCoefficients, PortraitKind, TOLERANCE};
use crate::traits::{Point, VectorField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Predator-prey rates: x' = αx − βxy, y' = δxy − γy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LotkaVolterra {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Default for LotkaVolterra {
    fn default() -> Self {
        Self {
            alpha: 1.1,
            beta: 0.4,
            gamma: 0.4,
            delta: 0.1,
        }
    }
}

impl LotkaVolterra {
    /// Jacobian entries [a, b, c, d] at `p`.
    pub fn jacobian(&self, p: Point) -> LinearCoefficients {
        LinearCoefficients::new(
            self.alpha - self.beta * p.y,
            -self.beta * p.x,
            self.delta * p.y,
            self.delta * p.x - self.gamma,
        )
    }
}

impl VectorField for LotkaVolterra {
    fn velocity(&self, p: Point) -> Point {
        Point::new(
            self.alpha * p.x - self.beta * p.x * p.y,
            self.delta * p.x * p.y - self.gamma * p.y,
        )
    }
}

/// User-facing model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    Linear(LinearCoefficients),
    LotkaVolterra(LotkaVolterra),
    Custom {
        dx: String,
        dy: String,
        #[serde(default)]
        constants: BTreeMap<String, f64>,
    },
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Linear(LinearCoefficients::new(-0.2, 1.0, -1.0, -0.2))
    }
}

impl ModelConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ModelConfig::Linear(_) => "linear",
            ModelConfig::LotkaVolterra(_) => "lotka_volterra",
            ModelConfig::Custom { .. } => "custom",
        }
    }

    /// Builds the model's field; malformed custom expressions give the inert field.
    pub fn build_field(&self) -> ModelField {
        match self {
            ModelConfig::Linear(coeffs) => ModelField::Linear(*coeffs),
            ModelConfig::LotkaVolterra(lv) => ModelField::LotkaVolterra(*lv),
            ModelConfig::Custom { dx, dy, constants } => {
                ModelField::Custom(make_field(dx, dy, constants))
            }
        }
    }

    /// Like `build_field`, but reports expression errors.
    pub fn try_build_field(&self) -> Result<ModelField, FieldError> {
        match self {
            ModelConfig::Custom { dx, dy, constants } => {
                try_make_field(dx, dy, constants).map(ModelField::Custom)
            }
            other => Ok(other.build_field()),
        }
    }

    /// Eigenvector overlay source; only linear models have one.
    pub fn eigen_analysis(&self) -> Option<EigenAnalysis> {
        match self {
            ModelConfig::Linear(coeffs) => Some(coeffs.analyze()),
            _ => None,
        }
    }

    /// Isolated equilibria with the spectral analysis of their linearization.
    pub fn equilibria(&self) -> Vec<Equilibrium> {
        match self {
            ModelConfig::Linear(coeffs) => {
                let analysis = coeffs.analyze();
                if analysis.determinant.abs() <= TOLERANCE {
                    return Vec::new();
                }
                vec![Equilibrium::new(Point::zeros(), analysis)]
            }
            ModelConfig::LotkaVolterra(lv) => {
                let mut points = vec![Point::zeros()];
                if lv.beta.abs() > TOLERANCE && lv.delta.abs() > TOLERANCE {
                    points.push(Point::new(lv.gamma / lv.delta, lv.alpha / lv.beta));
                }
                points
                    .into_iter()
                    .map(|p| Equilibrium::new(p, lv.jacobian(p).analyze()))
                    .collect()
            }
            ModelConfig::Custom { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equilibrium {
    pub point: Point,
    pub kind: PortraitKind,
    pub analysis: EigenAnalysis,
}

impl Equilibrium {
    fn new(point: Point, analysis: EigenAnalysis) -> Self {
        Self {
            point,
            kind: analysis.classify(),
            analysis,
        }
    }
}

/// The vector field of a configured model.
#[derive(Debug)]
pub enum ModelField {
    Linear(LinearCoefficients),
    LotkaVolterra(LotkaVolterra),
    Custom(ExpressionField),
}

impl ModelField {
    /// True for a custom model whose expressions failed to compile.
    pub fn is_inert(&self) -> bool {
        matches!(self, ModelField::Custom(field) if field.is_inert())
    }
}

impl VectorField for ModelField {
    fn velocity(&self, p: Point) -> Point {
        match self {
            ModelField::Linear(coeffs) => coeffs.velocity(p),
            ModelField::LotkaVolterra(lv) => lv.velocity(p),
            ModelField::Custom(field) => field.velocity(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::{integrate, Termination};

    #[test]
    fn kind_names_match_serde_tags() {
        let config = ModelConfig::LotkaVolterra(LotkaVolterra::default());
        assert_eq!(config.kind_name(), "lotka_volterra");
        assert_eq!(ModelConfig::default().kind_name(), "linear");
    }

    #[test]
    fn linear_model_exposes_eigen_analysis() {
        let config = ModelConfig::Linear(LinearCoefficients::new(1.0, 0.0, 0.0, -1.0));
        let analysis = config.eigen_analysis().expect("linear model");
        assert_eq!(analysis.eigenvectors.len(), 2);
        assert!(ModelConfig::LotkaVolterra(LotkaVolterra::default())
            .eigen_analysis()
            .is_none());
    }

    #[test]
    fn singular_linear_model_has_no_isolated_equilibrium() {
        let config = ModelConfig::Linear(LinearCoefficients::new(1.0, 2.0, 2.0, 4.0));
        assert!(config.equilibria().is_empty());
        let config = ModelConfig::default();
        let equilibria = config.equilibria();
        assert_eq!(equilibria.len(), 1);
        assert_eq!(equilibria[0].kind, PortraitKind::StableSpiral);
    }

    #[test]
    fn lotka_volterra_coexistence_point_is_a_center() {
        let lv = LotkaVolterra::default();
        let equilibria = ModelConfig::LotkaVolterra(lv).equilibria();
        assert_eq!(equilibria.len(), 2);

        assert_eq!(equilibria[0].point, Point::zeros());
        assert_eq!(equilibria[0].kind, PortraitKind::Saddle);

        let coexistence = equilibria[1].point;
        assert!((coexistence.x - 4.0).abs() < 1e-12);
        assert!((coexistence.y - 2.75).abs() < 1e-12);
        assert!(lv.velocity(coexistence).norm() < 1e-12);
        assert_eq!(equilibria[1].kind, PortraitKind::Center);
    }

    #[test]
    fn lotka_volterra_orbits_stay_positive() {
        let field = ModelConfig::LotkaVolterra(LotkaVolterra::default()).build_field();
        let trajectory = integrate(&field, Point::new(2.0, 1.0), 1500, 0.01);
        assert_eq!(trajectory.termination(), Termination::Completed);
        assert!(trajectory.points().iter().all(|p| p.x > 0.0 && p.y > 0.0));
    }

    #[test]
    fn custom_model_matches_equivalent_linear_model() {
        let custom = ModelConfig::Custom {
            dx: "a*x + b*y".to_string(),
            dy: "c*x + d*y".to_string(),
            constants: [("a", -0.2), ("b", 1.0), ("c", -1.0), ("d", -0.2)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        };
        let custom_field = custom.try_build_field().expect("valid expressions");
        let linear_field = ModelConfig::default().build_field();
        let p = Point::new(0.7, -1.3);
        assert!((custom_field.velocity(p) - linear_field.velocity(p)).norm() < 1e-12);
        assert!(custom.equilibria().is_empty());
    }

    #[test]
    fn malformed_custom_model_is_inert() {
        let config = ModelConfig::Custom {
            dx: "x +* y".to_string(),
            dy: "y".to_string(),
            constants: BTreeMap::new(),
        };
        assert!(config.try_build_field().is_err());
        let field = config.build_field();
        assert!(field.is_inert());
        assert_eq!(field.velocity(Point::new(1.0, 2.0)), Point::zeros());
    }
}
