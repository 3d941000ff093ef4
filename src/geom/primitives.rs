//! Segments, triangles and bounding boxes in UV space.

use nalgebra::Point2;

use super::predicates::{orient2d, Orientation};

/// Position of a point relative to a closed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundedness {
    /// Strictly outside.
    Unbounded,
    /// Exactly on the boundary.
    OnBoundary,
    /// Strictly inside.
    OnBoundedSide,
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox2 {
    min: Point2<f64>,
    max: Point2<f64>,
}

impl Bbox2 {
    /// The bounding box of a set of points. Panics on an empty slice.
    pub fn of(points: &[Point2<f64>]) -> Bbox2 {
        let mut min = points[0];
        let mut max = points[0];
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Bbox2 { min, max }
    }

    /// Smallest x coordinate.
    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    /// Largest x coordinate.
    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    /// Smallest y coordinate.
    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    /// Largest y coordinate.
    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Closed-interval containment.
    #[inline]
    pub fn contains(&self, p: Point2<f64>) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Closed-interval overlap with another box.
    #[inline]
    pub fn overlaps(&self, other: &Bbox2) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// A closed line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment2 {
    /// Start point.
    pub source: Point2<f64>,
    /// End point.
    pub target: Point2<f64>,
}

impl Segment2 {
    /// Create a segment from source to target.
    #[inline]
    pub fn new(source: Point2<f64>, target: Point2<f64>) -> Segment2 {
        Segment2 { source, target }
    }

    /// A segment is degenerate when both endpoints coincide exactly.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.source == self.target
    }

    /// The bounding box of the segment.
    #[inline]
    pub fn bbox(&self) -> Bbox2 {
        Bbox2::of(&[self.source, self.target])
    }

    /// Exact test whether `p` lies on the closed segment.
    pub fn has_on(&self, p: Point2<f64>) -> bool {
        if self.is_degenerate() {
            return p == self.source;
        }
        orient2d(self.source, self.target, p) == Orientation::Zero && self.bbox().contains(p)
    }

    /// Exact closed-segment intersection test, collinear overlap included.
    pub fn intersects(&self, other: &Segment2) -> bool {
        if self.is_degenerate() {
            return other.has_on(self.source);
        }
        if other.is_degenerate() {
            return self.has_on(other.source);
        }

        let s1 = orient2d(self.source, self.target, other.source);
        let s2 = orient2d(self.source, self.target, other.target);
        let s3 = orient2d(other.source, other.target, self.source);
        let s4 = orient2d(other.source, other.target, self.target);

        if s1 == Orientation::Zero && s2 == Orientation::Zero {
            // Collinear segments: they intersect iff their boxes touch.
            return self.bbox().overlaps(&other.bbox());
        }

        s1.sign() * s2.sign() <= 0 && s3.sign() * s4.sign() <= 0
    }
}

/// A triangle given by its three corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle2 {
    v: [Point2<f64>; 3],
}

impl Triangle2 {
    /// Create a triangle from three corners.
    #[inline]
    pub fn new(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Triangle2 {
        Triangle2 { v: [a, b, c] }
    }

    /// Corner `i` (0, 1 or 2).
    #[inline]
    pub fn vertex(&self, i: usize) -> Point2<f64> {
        self.v[i]
    }

    /// Exact orientation of the corner sequence.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        orient2d(self.v[0], self.v[1], self.v[2])
    }

    /// A triangle is degenerate when its corners are collinear.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.orientation() == Orientation::Zero
    }

    /// The bounding box of the triangle.
    #[inline]
    pub fn bbox(&self) -> Bbox2 {
        Bbox2::of(&self.v)
    }

    /// One of the three boundary segments; edge `i` runs from corner `i` to
    /// corner `i + 1`.
    #[inline]
    pub fn edge(&self, i: usize) -> Segment2 {
        Segment2::new(self.v[i], self.v[(i + 1) % 3])
    }

    /// Exact classification of `p` against the closed triangle.
    ///
    /// For a degenerate triangle the bounded side is empty: points on one of
    /// the three (possibly collapsed) edges report `OnBoundary`, everything
    /// else `Unbounded`.
    pub fn boundedness(&self, p: Point2<f64>) -> Boundedness {
        let ori = self.orientation();
        if ori == Orientation::Zero {
            for i in 0..3 {
                if self.edge(i).has_on(p) {
                    return Boundedness::OnBoundary;
                }
            }
            return Boundedness::Unbounded;
        }

        let opp = ori.opposite();
        let s0 = orient2d(self.v[0], self.v[1], p);
        let s1 = orient2d(self.v[1], self.v[2], p);
        let s2 = orient2d(self.v[2], self.v[0], p);
        if s0 == opp || s1 == opp || s2 == opp {
            Boundedness::Unbounded
        } else if s0 == Orientation::Zero || s1 == Orientation::Zero || s2 == Orientation::Zero {
            Boundedness::OnBoundary
        } else {
            Boundedness::OnBoundedSide
        }
    }

    /// Exact test whether `p` lies strictly inside the triangle.
    #[inline]
    pub fn has_on_bounded_side(&self, p: Point2<f64>) -> bool {
        self.boundedness(p) == Boundedness::OnBoundedSide
    }

    /// Exact test whether `p` lies on the triangle boundary.
    #[inline]
    pub fn has_on_boundary(&self, p: Point2<f64>) -> bool {
        self.boundedness(p) == Boundedness::OnBoundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_segment_has_on() {
        let s = Segment2::new(p(0.0, 0.0), p(2.0, 2.0));
        assert!(s.has_on(p(1.0, 1.0)));
        assert!(s.has_on(p(0.0, 0.0)));
        assert!(!s.has_on(p(3.0, 3.0)));
        assert!(!s.has_on(p(1.0, 0.0)));
    }

    #[test]
    fn test_degenerate_segment() {
        let s = Segment2::new(p(1.0, 1.0), p(1.0, 1.0));
        assert!(s.is_degenerate());
        assert!(s.has_on(p(1.0, 1.0)));
        assert!(!s.has_on(p(1.0, 2.0)));
    }

    #[test]
    fn test_segment_intersection() {
        let a = Segment2::new(p(0.0, 0.0), p(2.0, 2.0));
        let b = Segment2::new(p(0.0, 2.0), p(2.0, 0.0));
        assert!(a.intersects(&b));

        // Touching at an endpoint counts.
        let c = Segment2::new(p(1.0, 1.0), p(5.0, 0.0));
        assert!(a.intersects(&c));

        // Parallel, disjoint.
        let d = Segment2::new(p(0.0, 1.0), p(1.0, 2.0));
        assert!(!a.intersects(&d));

        // Collinear, overlapping vs. disjoint.
        let e = Segment2::new(p(1.0, 1.0), p(3.0, 3.0));
        assert!(a.intersects(&e));
        let f = Segment2::new(p(3.0, 3.0), p(4.0, 4.0));
        assert!(!a.intersects(&f));
    }

    #[test]
    fn test_triangle_boundedness() {
        let t = Triangle2::new(p(0.0, 0.0), p(4.0, 0.0), p(0.0, 4.0));
        assert_eq!(t.orientation(), Orientation::Positive);
        assert_eq!(t.boundedness(p(1.0, 1.0)), Boundedness::OnBoundedSide);
        assert_eq!(t.boundedness(p(2.0, 0.0)), Boundedness::OnBoundary);
        assert_eq!(t.boundedness(p(2.0, 2.0)), Boundedness::OnBoundary);
        assert_eq!(t.boundedness(p(0.0, 0.0)), Boundedness::OnBoundary);
        assert_eq!(t.boundedness(p(3.0, 3.0)), Boundedness::Unbounded);
        assert_eq!(t.boundedness(p(5.0, 0.0)), Boundedness::Unbounded);
    }

    #[test]
    fn test_clockwise_triangle_boundedness() {
        let t = Triangle2::new(p(0.0, 0.0), p(0.0, 4.0), p(4.0, 0.0));
        assert_eq!(t.orientation(), Orientation::Negative);
        assert_eq!(t.boundedness(p(1.0, 1.0)), Boundedness::OnBoundedSide);
        assert_eq!(t.boundedness(p(-1.0, 1.0)), Boundedness::Unbounded);
    }

    #[test]
    fn test_degenerate_triangle_boundedness() {
        let t = Triangle2::new(p(0.0, 0.0), p(2.0, 0.0), p(4.0, 0.0));
        assert!(t.is_degenerate());
        assert_eq!(t.boundedness(p(1.0, 0.0)), Boundedness::OnBoundary);
        assert_eq!(t.boundedness(p(5.0, 0.0)), Boundedness::Unbounded);
        assert_eq!(t.boundedness(p(1.0, 1.0)), Boundedness::Unbounded);
    }

    #[test]
    fn test_lattice_scan_of_triangle() {
        // Strictly interior lattice points of the (0,0),(2,0),(0,2) triangle:
        // there are none; all lattice points of the box lie on edges/corners.
        let t = Triangle2::new(p(0.0, 0.0), p(2.0, 0.0), p(0.0, 2.0));
        let mut interior = 0;
        for x in 0..=2 {
            for y in 0..=2 {
                if t.has_on_bounded_side(p(x as f64, y as f64)) {
                    interior += 1;
                }
            }
        }
        assert_eq!(interior, 0);
        assert!(t.has_on_boundary(p(1.0, 1.0)));
    }
}
