pub mod direction_field;
pub mod equation_engine;
pub mod field;
pub mod history;
pub mod linear;
pub mod models;
pub mod solvers;
/// The `phase_core` crate is the numeric engine behind the phase portrait
/// visualizer. Everything here is two-dimensional and single-threaded.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type for the VM), `Point`, `VectorField`.
/// - **Equation Engine**: a small bytecode VM for user-entered expressions.
/// - **Field**: turns a pair of expressions into a `VectorField`, falling back to the zero field.
/// - **Solvers**: fixed-step RK4 integration with divergence cut-off.
/// - **Linear**: closed-form eigen-analysis of 2x2 matrices.
/// - **Models**: linear, Lotka-Volterra and custom systems, with their equilibria.
pub mod traits;

pub use field::{make_field, try_make_field, ExpressionField, FieldError};
pub use linear::{analyze_linear, EigenAnalysis};
pub use solvers::{integrate, Termination, Trajectory};
pub use traits::{Point, VectorField};
