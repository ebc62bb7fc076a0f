//! Builds vector fields from user-entered expressions.

use crate::equation_engine::{compile_expression, Bytecode, ExpressionError, VM};
use crate::traits::{Point, VectorField};
use std::cell::RefCell;
use std::collections::BTreeMap;
use thiserror::Error;

/// Names bound to the state coordinates.
pub const STATE_VARIABLES: [&str; 2] = ["x", "y"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("invalid dx/dt expression: {0}")]
    Dx(#[source] ExpressionError),
    #[error("invalid dy/dt expression: {0}")]
    Dy(#[source] ExpressionError),
}

/// A planar field whose components are compiled expressions in `x`, `y`
/// and a set of named constants.
#[derive(Debug)]
pub struct ExpressionField {
    dx: Bytecode,
    dy: Bytecode,
    param_names: Vec<String>,
    params: Vec<f64>,
    inert: bool,
    // Scratch stack reused across evaluations; makes the field !Sync.
    stack: RefCell<Vec<f64>>,
}

impl ExpressionField {
    /// The field that is (0, 0) everywhere.
    pub fn inert() -> Self {
        Self {
            dx: Bytecode::constant(0.0),
            dy: Bytecode::constant(0.0),
            param_names: Vec::new(),
            params: Vec::new(),
            inert: true,
            stack: RefCell::new(Vec::new()),
        }
    }

    /// True when this field is the zero fallback for invalid input.
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Updates a bound constant in place. Returns false for unknown names.
    pub fn set_constant(&mut self, name: &str, value: f64) -> bool {
        match self.param_names.iter().position(|n| n == name) {
            Some(idx) => {
                self.params[idx] = value;
                true
            }
            None => false,
        }
    }
}

impl VectorField for ExpressionField {
    fn velocity(&self, p: Point) -> Point {
        let mut stack = self.stack.borrow_mut();
        let vars = [p.x, p.y];
        Point::new(
            VM::execute(&self.dx, &vars, &self.params, &mut stack),
            VM::execute(&self.dy, &vars, &self.params, &mut stack),
        )
    }
}

/// Compiles both components, reporting which one failed.
pub fn try_make_field(
    dx_expression: &str,
    dy_expression: &str,
    constants: &BTreeMap<String, f64>,
) -> Result<ExpressionField, FieldError> {
    let var_names: Vec<String> = STATE_VARIABLES.iter().map(|s| s.to_string()).collect();
    let param_names: Vec<String> = constants.keys().cloned().collect();
    let params: Vec<f64> = constants.values().copied().collect();

    let dx = compile_expression(or_zero(dx_expression), &var_names, &param_names)
        .map_err(FieldError::Dx)?;
    let dy = compile_expression(or_zero(dy_expression), &var_names, &param_names)
        .map_err(FieldError::Dy)?;

    Ok(ExpressionField {
        dx,
        dy,
        param_names,
        params,
        inert: false,
        stack: RefCell::new(Vec::with_capacity(32)),
    })
}

/// Like `try_make_field`, but a malformed expression yields the inert field
/// instead of an error.
pub fn make_field(
    dx_expression: &str,
    dy_expression: &str,
    constants: &BTreeMap<String, f64>,
) -> ExpressionField {
    try_make_field(dx_expression, dy_expression, constants)
        .unwrap_or_else(|_| ExpressionField::inert())
}

fn or_zero(expression: &str) -> &str {
    if expression.trim().is_empty() {
        "0"
    } else {
        expression
    }
}
