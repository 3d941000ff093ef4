//! Transition functions between parameterization charts.
//!
//! A seamless integer-grid parameterization assigns each triangle its own UV
//! chart; across a shared edge the two charts differ by an element of the
//! integer grid symmetry group: a rotation by a multiple of 90 degrees
//! followed by an integer translation. This module recovers those elements
//! per edge and composes them around vertices to classify singularities.

use std::f64::consts::PI;
use std::ops::Mul;

use nalgebra::{Complex, Point2, Vector2};

use crate::mesh::{EdgeId, HalfEdgeId, MeshIndex, TriMesh, VertexId};

/// An element of the integer grid symmetry group.
///
/// Acts on a UV point by rotating it `r * 90` degrees counter-clockwise
/// about the origin (multiplication by i^r in the complex plane) and then
/// translating by `(tu, tv)`. Composition via `*` applies the right operand
/// first; it is not commutative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionFunction {
    /// Rotation index in {0, 1, 2, 3}.
    pub r: u8,
    /// Translation along u.
    pub tu: i32,
    /// Translation along v.
    pub tv: i32,
}

/// Rotate integer coordinates by `r * 90` degrees.
#[inline]
fn rotate_i(r: u8, u: i32, v: i32) -> (i32, i32) {
    match r & 3 {
        0 => (u, v),
        1 => (-v, u),
        2 => (-u, -v),
        _ => (v, -u),
    }
}

/// Rotate floating-point coordinates by `r * 90` degrees. Exact: only sign
/// flips and coordinate swaps.
#[inline]
fn rotate_f(r: u8, u: f64, v: f64) -> (f64, f64) {
    match r & 3 {
        0 => (u, v),
        1 => (-v, u),
        2 => (-u, -v),
        _ => (v, -u),
    }
}

/// i^r as an exact complex constant.
#[inline]
fn ipow(r: u8) -> Complex<f64> {
    match r & 3 {
        0 => Complex::new(1.0, 0.0),
        1 => Complex::new(0.0, 1.0),
        2 => Complex::new(-1.0, 0.0),
        _ => Complex::new(0.0, -1.0),
    }
}

impl TransitionFunction {
    /// The identity transition.
    pub const IDENTITY: TransitionFunction = TransitionFunction { r: 0, tu: 0, tv: 0 };

    /// Create a transition function; `r` is reduced modulo 4.
    #[inline]
    pub fn new(r: i32, tu: i32, tv: i32) -> TransitionFunction {
        TransitionFunction {
            r: r.rem_euclid(4) as u8,
            tu,
            tv,
        }
    }

    /// Whether this is the identity element.
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == TransitionFunction::IDENTITY
    }

    /// The inverse transition; composition in either order yields identity.
    #[inline]
    pub fn inverse(&self) -> TransitionFunction {
        let r = (4 - self.r) & 3;
        let (tu, tv) = rotate_i(r, -self.tu, -self.tv);
        TransitionFunction { r, tu, tv }
    }

    /// Apply to a UV point.
    #[inline]
    pub fn transform_point(&self, p: Point2<f64>) -> Point2<f64> {
        let (u, v) = rotate_f(self.r, p.x, p.y);
        Point2::new(u + self.tu as f64, v + self.tv as f64)
    }

    /// Apply the rotational part to a UV vector.
    #[inline]
    pub fn transform_vector(&self, d: Vector2<f64>) -> Vector2<f64> {
        let (u, v) = rotate_f(self.r, d.x, d.y);
        Vector2::new(u, v)
    }
}

impl Mul for TransitionFunction {
    type Output = TransitionFunction;

    /// `(a * b)(p) = a(b(p))`.
    fn mul(self, rhs: TransitionFunction) -> TransitionFunction {
        let (tu, tv) = rotate_i(self.r, rhs.tu, rhs.tv);
        TransitionFunction {
            r: (self.r + rhs.r) & 3,
            tu: tu + self.tu,
            tv: tv + self.tv,
        }
    }
}

/// UV of a half-edge's head corner as a complex number.
#[inline]
fn uv_complex<I: MeshIndex>(he: HalfEdgeId<I>, uv: &[f64]) -> Complex<f64> {
    Complex::new(uv[2 * he.index()], uv[2 * he.index() + 1])
}

/// The per-edge transition table of a parameterized mesh.
///
/// The entry of an interior edge maps the chart of `edge.halfedge(0)`'s face
/// into the chart of `edge.halfedge(1)`'s face. Boundary edges hold identity.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    tfs: Vec<TransitionFunction>,
}

impl TransitionTable {
    /// An empty table.
    pub fn new() -> TransitionTable {
        TransitionTable::default()
    }

    /// Extract per-edge transition functions from the UV assignment.
    ///
    /// The rotation is recovered from the argument of the ratio of the edge
    /// vectors seen in the two charts; the translation then closes the
    /// constraint at one shared endpoint.
    pub fn extract<I: MeshIndex>(mesh: &TriMesh<I>, uv: &[f64]) -> TransitionTable {
        let mut tfs = vec![TransitionFunction::IDENTITY; mesh.num_edges()];

        for e in mesh.edge_ids() {
            if mesh.is_boundary_edge(e) {
                continue;
            }
            let heh0 = e.halfedge(0);
            let heh1 = e.halfedge(1);

            // Head and tail corners of the edge in both charts; corner k of
            // the left chart coincides with corner k of the right chart.
            let l0 = uv_complex(heh0, uv);
            let l1 = uv_complex(mesh.prev(heh0), uv);
            let r0 = uv_complex(mesh.prev(heh1), uv);
            let r1 = uv_complex(heh1, uv);

            let r = (2.0 * ((r0 - r1) / (l0 - l1)).ln().im / PI).round() as i32;
            let r = r.rem_euclid(4) as u8;
            let t = r0 - ipow(r) * l0;
            tfs[e.index()] = TransitionFunction {
                r,
                tu: t.re.round() as i32,
                tv: t.im.round() as i32,
            };
        }

        TransitionTable { tfs }
    }

    /// The transition across a half-edge: maps the chart of `he`'s face into
    /// the chart of its twin's face.
    #[inline]
    pub fn transition<I: MeshIndex>(&self, he: HalfEdgeId<I>) -> TransitionFunction {
        let tf = self.tfs[he.edge().index()];
        if he.side() == 0 {
            tf
        } else {
            tf.inverse()
        }
    }

    /// Direct access to an edge's stored transition.
    #[inline]
    pub fn edge_transition<I: MeshIndex>(&self, e: EdgeId<I>) -> TransitionFunction {
        self.tfs[e.index()]
    }

    /// The composition of transitions around a vertex, walking the incident
    /// charts once in clockwise order and returning to the chart of the
    /// vertex's first incoming half-edge.
    ///
    /// Identity classifies the vertex as regular; a nonzero rotation as
    /// singular. Boundary vertices report identity.
    pub fn vertex_transition<I: MeshIndex>(
        &self,
        mesh: &TriMesh<I>,
        v: VertexId<I>,
    ) -> TransitionFunction {
        if mesh.is_boundary_vertex(v) {
            return TransitionFunction::IDENTITY;
        }

        let mut ring = mesh.incoming_halfedges(v);
        let first = match ring.next() {
            Some(h) => h,
            None => return TransitionFunction::IDENTITY,
        };
        // The transition out of the first chart closes the cycle, so it is
        // applied last.
        let tf_first = self.transition(first.twin());

        let mut tf = TransitionFunction::IDENTITY;
        for h in ring {
            tf = self.transition(h.twin()) * tf;
        }
        tf_first * tf
    }
}
