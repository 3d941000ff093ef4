//! Core mesh data structures.
//!
//! This module provides the half-edge representations on both sides of the
//! extractor: the immutable input triangle mesh and the polygonal output
//! mesh.
//!
//! # Overview
//!
//! The input type is [`TriMesh`], a triangle mesh in half-edge
//! (doubly-connected edge list) form with O(1) adjacency queries. Half-edges
//! are stored in twin pairs, so every full edge has a stable [`EdgeId`] equal
//! to half the index of either of its half-edges; the extractor keys its
//! per-edge tables (transition functions, validity flags) by these ids.
//!
//! The output type is [`PolyMesh`], a polygon mesh with faces of arbitrary
//! valence that is grown half-edge by half-edge during face assembly. The
//! assembler only talks to it through the [`PolyMeshOps`] trait, so another
//! container can be substituted.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! ```
//! use quadrille::mesh::{TriMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: TriMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
mod halfedge;
mod index;
mod poly;

pub use builder::build_from_triangles;
pub use halfedge::{EdgeStatus, Face, HalfEdge, TriMesh, Vertex, VertexHalfEdgeIter};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use poly::{PolyMesh, PolyMeshOps};
