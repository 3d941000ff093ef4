//! Exact orientation predicates.
//!
//! Thin shim over the adaptive-precision predicates of the `robust` crate.
//! All higher-level containment and intersection tests in this module tree
//! are expressed through [`orient2d`] so that exactness is established in
//! exactly one place.

use nalgebra::{Point2, Vector2};

/// Orientation of an ordered point or vector triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise / right turn.
    Negative,
    /// Collinear.
    Zero,
    /// Counter-clockwise / left turn.
    Positive,
}

impl Orientation {
    /// The opposite orientation. `Zero` is its own opposite.
    #[inline]
    pub fn opposite(self) -> Orientation {
        match self {
            Orientation::Negative => Orientation::Positive,
            Orientation::Zero => Orientation::Zero,
            Orientation::Positive => Orientation::Negative,
        }
    }

    /// Signed representation: -1, 0, or 1.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Orientation::Negative => -1,
            Orientation::Zero => 0,
            Orientation::Positive => 1,
        }
    }
}

#[inline]
fn coord(p: Point2<f64>) -> robust::Coord<f64> {
    robust::Coord { x: p.x, y: p.y }
}

/// Exact orientation of the triangle (a, b, c).
///
/// Positive when the points make a counter-clockwise turn.
#[inline]
pub fn orient2d(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Orientation {
    let det = robust::orient2d(coord(a), coord(b), coord(c));
    if det > 0.0 {
        Orientation::Positive
    } else if det < 0.0 {
        Orientation::Negative
    } else {
        Orientation::Zero
    }
}

/// Exact orientation of the vector pair (u, v): the sign of u × v.
#[inline]
pub fn orient2d_vec(u: Vector2<f64>, v: Vector2<f64>) -> Orientation {
    orient2d(Point2::origin(), Point2::from(u), Point2::from(v))
}

/// Exact collinearity test for three points.
#[inline]
pub fn is_collinear(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    orient2d(a, b, c) == Orientation::Zero
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_basic() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 0.0);
        assert_eq!(orient2d(a, b, Point2::new(0.0, 1.0)), Orientation::Positive);
        assert_eq!(orient2d(a, b, Point2::new(0.0, -1.0)), Orientation::Negative);
        assert_eq!(orient2d(a, b, Point2::new(2.0, 0.0)), Orientation::Zero);
    }

    #[test]
    fn test_orientation_near_degenerate() {
        // A sliver that naive double evaluation misclassifies for some inputs.
        let a = Point2::new(1e-40, 1e-40);
        let b = Point2::new(1.0, 1.0);
        let c = Point2::new(2.0, 2.0);
        assert_eq!(orient2d(a, b, c), orient2d(c, a, b));
    }

    #[test]
    fn test_vector_orientation() {
        let u = Vector2::new(1.0, 0.0);
        assert_eq!(orient2d_vec(u, Vector2::new(0.0, 1.0)), Orientation::Positive);
        assert_eq!(orient2d_vec(u, Vector2::new(0.0, -1.0)), Orientation::Negative);
        assert_eq!(orient2d_vec(u, Vector2::new(-3.0, 0.0)), Orientation::Zero);
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Orientation::Positive.opposite(), Orientation::Negative);
        assert_eq!(Orientation::Zero.opposite(), Orientation::Zero);
    }
}
