use nalgebra::Vector2;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types the expression VM can evaluate over.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A position (or velocity) in the phase plane.
pub type Point = Vector2<f64>;

/// An autonomous planar vector field, dx/dt = f(x, y).
///
/// Implementations must be callable any number of times with no observable
/// side effects; integrators evaluate them four times per step.
pub trait VectorField {
    /// Returns (dx/dt, dy/dt) at `p`.
    fn velocity(&self, p: Point) -> Point;
}

impl<F> VectorField for F
where
    F: Fn(Point) -> Point,
{
    fn velocity(&self, p: Point) -> Point {
        self(p)
    }
}

/// The field with no motion anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroField;

impl VectorField for ZeroField {
    fn velocity(&self, _p: Point) -> Point {
        Point::zeros()
    }
}

/// Runs a field with time reversed, so integrating it walks a curve backwards.
pub struct Reversed<'a, V: ?Sized>(pub &'a V);

impl<V: VectorField + ?Sized> VectorField for Reversed<'_, V> {
    fn velocity(&self, p: Point) -> Point {
        -self.0.velocity(p)
    }
}
