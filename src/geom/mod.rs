//! 2D geometry kernel for parameterization-space queries.
//!
//! The extractor walks straight lines through a piecewise-linear UV map and
//! decides containment, crossing and collinearity questions on coordinates
//! that the consistent truncator has already forced to be exactly
//! representable. Everything here reduces to a single exact orientation
//! predicate plus exact coordinate comparisons, so the answers are
//! combinatorially reliable even on nearly degenerate triangles.

mod predicates;
mod primitives;

pub use predicates::{is_collinear, orient2d, orient2d_vec, Orientation};
pub use primitives::{Bbox2, Boundedness, Segment2, Triangle2};
