//! # Quadrille
//!
//! Quad mesh extraction from seamless integer-grid parameterizations.
//!
//! Given a triangle mesh whose corners carry 2D parameterization
//! coordinates that agree across shared edges up to 90-degree rotations and
//! integer translations, quadrille extracts the polygonal mesh whose
//! vertices are the pre-images of the integer lattice and whose edges
//! follow the parameterization axes back into 3D.
//!
//! ## Features
//!
//! - **Half-edge data structures**: O(1) adjacency queries with type-safe
//!   indices on the input side, a polygon mesh grown edge by edge on the
//!   output side
//! - **Exact 2D predicates**: containment, crossing and collinearity tests
//!   backed by adaptive-precision arithmetic, reliable on near-degenerate
//!   parameter triangles
//! - **Robust extraction**: inconsistent or folded parameterizations
//!   degrade the output locally (holes, skipped faces) instead of aborting
//!
//! ## Quick Start
//!
//! ```no_run
//! use quadrille::prelude::*;
//! use nalgebra::Point3;
//!
//! # fn load_input() -> (Vec<Point3<f64>>, Vec<[usize; 3]>, Vec<f64>) { unimplemented!() }
//! // A triangle mesh plus one (u, v) pair per halfedge corner.
//! let (vertices, faces, uv_coords) = load_input();
//! let mesh: TriMesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // Extract the integer-grid mesh.
//! let mut extractor = MeshExtractor::new(&mesh);
//! let mut quads = PolyMesh::new();
//! let result = extractor.extract(&uv_coords, None, &mut quads).unwrap();
//!
//! println!("extracted {} faces", quads.num_faces());
//! println!("face valences: {:?}", result.stats.face_valence_histogram);
//! ```
//!
//! ## Singularities and valences
//!
//! Interior vertices whose chart transitions compose to a net rotation are
//! singular: they sit at half-integer grid positions and surface in the
//! output as faces or vertices of valence other than four. When the caller
//! knows the intended valence of each input vertex (for example from the
//! field the parameterization was computed from), passing it as
//! `external_valences` makes slot-count decisions independent of the
//! floating-point angle estimate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod extract;
pub mod geom;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use quadrille::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::extract::{Extraction, ExtractionStats, MeshExtractor, TransitionFunction};
    pub use crate::mesh::{
        build_from_triangles, EdgeId, FaceId, HalfEdgeId, MeshIndex, PolyMesh, PolyMeshOps,
        TriMesh, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point2, Point3};

    #[test]
    fn test_end_to_end_flat_strip() {
        // A 3x1 strip of two triangles parameterized at unit scale: the
        // extracted mesh reproduces the three unit quads.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        let mesh: TriMesh = build_from_triangles(&vertices, &faces).unwrap();

        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let mut uv = vec![0.0; 2 * mesh.num_halfedges()];
        for he in mesh.halfedge_ids() {
            let corner = if !mesh.is_boundary_halfedge(he) {
                corners[mesh.dest(he).index()]
            } else {
                corners[mesh.dest(mesh.prev(he.twin())).index()]
            };
            uv[2 * he.index()] = corner.x;
            uv[2 * he.index() + 1] = corner.y;
        }

        let mut extractor = MeshExtractor::new(&mesh);
        let mut quads = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut quads).unwrap();

        assert_eq!(result.stats.face_valence_histogram.get(&4), Some(&3));
        // Quad corners land on the input plane at lattice positions.
        for v in 0..quads.num_vertices() {
            let p = quads.position(v);
            assert_eq!(p.z, 0.0);
            assert_eq!(p.x, p.x.round());
            assert_eq!(p.y, p.y.round());
        }
    }
}
