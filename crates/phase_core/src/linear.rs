//! Spectral analysis of planar linear systems x' = A x.

use crate::traits::{Point, VectorField};
use nalgebra::Matrix2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Magnitudes at or below this are treated as zero.
pub const TOLERANCE: f64 = 1e-9;

/// Coefficients of A = [[a, b], [c, d]].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl LinearCoefficients {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    pub fn matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.a, self.b, self.c, self.d)
    }

    pub fn analyze(&self) -> EigenAnalysis {
        analyze_linear(self.a, self.b, self.c, self.d)
    }
}

impl VectorField for LinearCoefficients {
    fn velocity(&self, p: Point) -> Point {
        self.matrix() * p
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenAnalysis {
    pub trace: f64,
    pub determinant: f64,
    pub discriminant: f64,
    /// Always two entries: a real pair (larger first) or a conjugate pair
    /// (positive imaginary part first).
    pub eigenvalues: [Complex<f64>; 2],
    /// Unit real eigenvectors; empty when the eigenvalues are complex.
    pub eigenvectors: Vec<Point>,
}

impl EigenAnalysis {
    pub fn classify(&self) -> PortraitKind {
        classify(self)
    }
}

/// Computes trace, determinant, eigenvalues and real eigenvectors of
/// [[a, b], [c, d]] in closed form.
pub fn analyze_linear(a: f64, b: f64, c: f64, d: f64) -> EigenAnalysis {
    let trace = a + d;
    let determinant = a * d - b * c;
    let discriminant = trace * trace - 4.0 * determinant;

    if discriminant < 0.0 {
        let re = trace / 2.0;
        let im = (-discriminant).sqrt() / 2.0;
        return EigenAnalysis {
            trace,
            determinant,
            discriminant,
            eigenvalues: [Complex::new(re, im), Complex::new(re, -im)],
            eigenvectors: Vec::new(),
        };
    }

    let root = discriminant.sqrt();
    let l1 = (trace + root) / 2.0;
    let l2 = (trace - root) / 2.0;

    let mut eigenvectors = Vec::with_capacity(2);
    if let Some(v) = unit(eigen_direction(a, b, c, d, l1)) {
        eigenvectors.push(v);
    }
    // A repeated eigenvalue contributes a single direction.
    if (l1 - l2).abs() > TOLERANCE {
        if let Some(v) = unit(eigen_direction(a, b, c, d, l2)) {
            eigenvectors.push(v);
        }
    }

    EigenAnalysis {
        trace,
        determinant,
        discriminant,
        eigenvalues: [Complex::new(l1, 0.0), Complex::new(l2, 0.0)],
        eigenvectors,
    }
}

/// Unnormalized direction in the kernel of A - λI.
fn eigen_direction(a: f64, b: f64, c: f64, d: f64, lambda: f64) -> Point {
    if b.abs() > TOLERANCE {
        Point::new(b, lambda - a)
    } else if c.abs() > TOLERANCE {
        Point::new(lambda - d, c)
    } else if (lambda - a).abs() <= TOLERANCE {
        Point::new(1.0, 0.0)
    } else if (lambda - d).abs() <= TOLERANCE {
        Point::new(0.0, 1.0)
    } else {
        Point::zeros()
    }
}

fn unit(v: Point) -> Option<Point> {
    let norm = v.norm();
    if norm < TOLERANCE || !norm.is_finite() {
        None
    } else {
        Some(v / norm)
    }
}

/// Qualitative type of the equilibrium at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortraitKind {
    Saddle,
    StableNode,
    UnstableNode,
    StableSpiral,
    UnstableSpiral,
    Center,
    /// Singular matrix: the equilibria form a line (or the whole plane).
    Degenerate,
}

pub fn classify(analysis: &EigenAnalysis) -> PortraitKind {
    let EigenAnalysis {
        trace,
        determinant,
        discriminant,
        ..
    } = *analysis;

    if determinant.abs() <= TOLERANCE {
        PortraitKind::Degenerate
    } else if determinant < 0.0 {
        PortraitKind::Saddle
    } else if discriminant < 0.0 {
        if trace.abs() <= TOLERANCE {
            PortraitKind::Center
        } else if trace < 0.0 {
            PortraitKind::StableSpiral
        } else {
            PortraitKind::UnstableSpiral
        }
    } else if trace < 0.0 {
        PortraitKind::StableNode
    } else {
        PortraitKind::UnstableNode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn assert_parallel(v: &Point, expected: Point) {
        let cross = v.x * expected.y - v.y * expected.x;
        assert!(cross.abs() < 1e-12, "{v:?} is not parallel to {expected:?}");
        assert_close(v.norm(), 1.0);
    }

    #[test]
    fn rotation_has_conjugate_pair_and_no_eigenvectors() {
        let result = analyze_linear(0.0, -1.0, 1.0, 0.0);
        assert_eq!(result.trace, 0.0);
        assert_eq!(result.determinant, 1.0);
        assert_eq!(result.discriminant, -4.0);
        assert_eq!(result.eigenvalues, [Complex::new(0.0, 1.0), Complex::new(0.0, -1.0)]);
        assert!(result.eigenvectors.is_empty());
        assert_eq!(result.classify(), PortraitKind::Center);
    }

    #[test]
    fn scalar_matrix_has_single_eigenvector() {
        let result = analyze_linear(2.0, 0.0, 0.0, 2.0);
        assert_eq!(result.eigenvalues, [Complex::new(2.0, 0.0), Complex::new(2.0, 0.0)]);
        assert_eq!(result.eigenvectors, vec![Point::new(1.0, 0.0)]);
        assert_eq!(result.classify(), PortraitKind::UnstableNode);
    }

    #[test]
    fn saddle_has_axis_eigenvectors() {
        let result = analyze_linear(1.0, 0.0, 0.0, -1.0);
        assert!(result.discriminant > 0.0);
        assert_eq!(result.eigenvalues, [Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0)]);
        assert_eq!(
            result.eigenvectors,
            vec![Point::new(1.0, 0.0), Point::new(0.0, 1.0)]
        );
        assert_eq!(result.classify(), PortraitKind::Saddle);
    }

    #[test]
    fn diagonal_with_inexact_eigenvalues_keeps_both_directions() {
        let result = analyze_linear(0.1, 0.0, 0.0, 0.3);
        assert_eq!(result.eigenvectors.len(), 2);
        assert_parallel(&result.eigenvectors[0], Point::new(0.0, 1.0));
        assert_parallel(&result.eigenvectors[1], Point::new(1.0, 0.0));
    }

    #[test]
    fn upper_branch_uses_b_column() {
        // A = [[1, 2], [2, 1]]: eigenvalues 3 and -1.
        let result = analyze_linear(1.0, 2.0, 2.0, 1.0);
        assert_close(result.eigenvalues[0].re, 3.0);
        assert_close(result.eigenvalues[1].re, -1.0);
        assert_parallel(&result.eigenvectors[0], Point::new(1.0, 1.0));
        assert_parallel(&result.eigenvectors[1], Point::new(1.0, -1.0));
    }

    #[test]
    fn lower_triangular_uses_c_row() {
        // A = [[2, 0], [1, 3]]: eigenvalues 3 and 2.
        let result = analyze_linear(2.0, 0.0, 1.0, 3.0);
        assert_parallel(&result.eigenvectors[0], Point::new(0.0, 1.0));
        assert_parallel(&result.eigenvectors[1], Point::new(-1.0, 1.0));
    }

    #[test]
    fn eigenvectors_satisfy_definition() {
        let coeffs = LinearCoefficients::new(-3.0, 1.5, 0.5, -1.0);
        let result = coeffs.analyze();
        let matrix = coeffs.matrix();
        for (v, lambda) in result.eigenvectors.iter().zip(result.eigenvalues.iter()) {
            let residual = matrix * *v - *v * lambda.re;
            assert!(residual.norm() < 1e-9);
        }
        assert_eq!(result.classify(), PortraitKind::StableNode);
    }

    #[test]
    fn zero_matrix_keeps_axis_eigenvector() {
        let result = analyze_linear(0.0, 0.0, 0.0, 0.0);
        assert_eq!(result.eigenvalues, [Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)]);
        // Candidate (1, 0) survives: λ = 0 equals a.
        assert_eq!(result.eigenvectors, vec![Point::new(1.0, 0.0)]);
        assert_eq!(result.classify(), PortraitKind::Degenerate);
    }

    #[test]
    fn jordan_block_has_one_eigenvector() {
        let result = analyze_linear(1.0, 1.0, 0.0, 1.0);
        assert_eq!(result.discriminant, 0.0);
        assert_eq!(result.eigenvectors, vec![Point::new(1.0, 0.0)]);
    }

    #[test]
    fn spirals_follow_trace_sign() {
        assert_eq!(
            analyze_linear(-0.5, 1.0, -1.0, -0.5).classify(),
            PortraitKind::StableSpiral
        );
        assert_eq!(
            analyze_linear(0.5, 1.0, -1.0, 0.5).classify(),
            PortraitKind::UnstableSpiral
        );
    }

    #[test]
    fn eigenvalues_match_nalgebra() {
        let cases = [
            [0.0, -1.0, 1.0, 0.0],
            [1.0, 2.0, 3.0, 4.0],
            [-0.5, 1.0, -1.0, -0.5],
            [2.0, -5.0, 1.0, -2.0],
        ];
        for [a, b, c, d] in cases {
            let ours = analyze_linear(a, b, c, d).eigenvalues;
            let reference = DMatrix::from_row_slice(2, 2, &[a, b, c, d]).complex_eigenvalues();
            for lambda in ours {
                let nearest = reference
                    .iter()
                    .map(|r| (r - lambda).norm())
                    .fold(f64::INFINITY, f64::min);
                assert!(nearest < 1e-9, "{lambda} missing from {reference:?}");
            }
        }
    }

    #[test]
    fn linear_field_applies_matrix() {
        let coeffs = LinearCoefficients::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(coeffs.velocity(Point::new(1.0, -1.0)), Point::new(-1.0, -1.0));
    }
}
