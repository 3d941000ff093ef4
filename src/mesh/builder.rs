//! Mesh construction utilities.
//!
//! This module provides functions for building half-edge meshes from
//! face-vertex lists as commonly found in mesh file formats.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{EdgeStatus, Face, HalfEdge, TriMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertices and triangle faces.
///
/// Half-edges are allocated in twin pairs so that every full edge has a
/// stable id equal to half the index of either of its half-edges.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Returns
/// A half-edge mesh, or an error if the input is invalid.
///
/// # Example
/// ```
/// use quadrille::mesh::{build_from_triangles, TriMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: TriMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<TriMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    // Validate vertex indices
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        // Check for degenerate faces
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = TriMesh::new();

    // Add vertices
    for &pos in vertices {
        mesh.vertices.push(super::halfedge::Vertex::new(pos));
    }

    // Map from undirected edge (min, max) to the half-edge running min -> max.
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::new();

    // First pass: create faces; allocate half-edge pairs on first sight of
    // an edge, claim the reserved twin on second sight.
    for face in faces {
        let face_id = FaceId::<I>::new(mesh.faces.len());
        let mut face_hes = [HalfEdgeId::<I>::invalid(); 3];

        for k in 0..3 {
            let v0 = face[k];
            let v1 = face[(k + 1) % 3];
            let key = (v0.min(v1), v0.max(v1));

            let he = match edge_map.get(&key).copied() {
                None => {
                    // New edge: allocate the pair, orient half 0 as v0 -> v1.
                    let base = HalfEdgeId::<I>::new(mesh.halfedges.len());
                    mesh.halfedges.push(HalfEdge::new());
                    mesh.halfedges.push(HalfEdge::new());
                    mesh.edge_status.push(EdgeStatus::default());
                    mesh.halfedges[base.index()].origin = VertexId::new(v0);
                    mesh.halfedges[base.twin().index()].origin = VertexId::new(v1);
                    edge_map.insert(key, base);
                    base
                }
                Some(base) => {
                    let he = if mesh.origin(base).index() == v0 {
                        base
                    } else {
                        base.twin()
                    };
                    if mesh.face_of(he).is_valid() {
                        // Third face on this edge, or two faces traversing it
                        // in the same direction.
                        return Err(MeshError::NonManifoldEdge { v0, v1 });
                    }
                    he
                }
            };

            mesh.halfedges[he.index()].face = face_id;
            face_hes[k] = he;
        }

        for k in 0..3 {
            let he = face_hes[k];
            let next = face_hes[(k + 1) % 3];
            mesh.halfedges[he.index()].next = next;
            mesh.halfedges[next.index()].prev = he;
        }

        mesh.faces.push(Face::new(face_hes[0]));

        // Set vertex half-edges (will be overwritten for shared vertices)
        for k in 0..3 {
            let v = VertexId::<I>::new(face[k]);
            mesh.vertices[v.index()].halfedge = face_hes[k];
        }
    }

    // Second pass: link boundary half-edges into loops.
    link_boundary_loops(&mut mesh)?;

    // Third pass: ensure boundary vertices point to boundary half-edges.
    fix_boundary_vertex_halfedges(&mut mesh);

    Ok(mesh)
}

/// Link boundary half-edges into proper loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut TriMesh<I>) -> Result<()> {
    // Find all boundary half-edges
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    // Group by origin vertex for quick lookup
    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::new();
    for he in &boundary_hes {
        let origin = mesh.origin(*he).index();
        outgoing.insert(origin, *he);
    }

    // Link next/prev for boundary half-edges
    for &he in &boundary_hes {
        // The next boundary half-edge starts where this one ends
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedges[he.index()].next = next_he;
            mesh.halfedges[next_he.index()].prev = he;
        }
    }

    Ok(())
}

/// Ensure boundary vertices point to a boundary half-edge.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut TriMesh<I>) {
    for vid in mesh.vertex_ids().collect::<Vec<_>>() {
        let start_he = mesh.vertex(vid).halfedge;
        if !start_he.is_valid() {
            continue;
        }

        // Walk around the vertex to find a boundary half-edge.
        // Uses the same iteration pattern as VertexHalfEdgeIter: twin -> next.
        let mut he = start_he;
        loop {
            if mesh.is_boundary_halfedge(he) {
                mesh.vertices[vid.index()].halfedge = he;
                break;
            }
            he = mesh.next(he.twin());
            if he == start_he || !he.is_valid() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2]];
        (vertices, faces)
    }

    fn two_triangles() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        // Two triangles sharing an edge
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [1, 0, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_single_triangle() {
        let (vertices, faces) = single_triangle();
        let mesh: TriMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_edges(), 3);
        assert_eq!(mesh.num_halfedges(), 6);
        assert!(mesh.is_valid());

        // All vertices should be on boundary
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
        }

        // Boundary half-edges form a single loop of length 3.
        let start = mesh
            .halfedge_ids()
            .find(|&he| mesh.is_boundary_halfedge(he))
            .unwrap();
        let mut he = start;
        let mut steps = 0;
        loop {
            he = mesh.next(he);
            steps += 1;
            assert!(mesh.is_boundary_halfedge(he));
            if he == start {
                break;
            }
        }
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_two_triangles() {
        let (vertices, faces) = two_triangles();
        let mesh: TriMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_halfedges(), 10);
        assert!(mesh.is_valid());

        // The shared edge is interior.
        let interior = mesh
            .edge_ids()
            .filter(|&e| !mesh.is_boundary_edge(e))
            .count();
        assert_eq!(interior, 1);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        let faces = vec![[0, 1, 2]]; // Indices 1 and 2 are invalid

        let result: Result<TriMesh<u32>> = build_from_triangles(&vertices, &faces);
        assert!(result.is_err());
    }

    #[test]
    fn test_degenerate_face() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 0, 2]]; // Degenerate: v0 == v1

        let result: Result<TriMesh<u32>> = build_from_triangles(&vertices, &faces);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_manifold_edge() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        // Three faces sharing the edge (0, 1).
        let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];

        let result: Result<TriMesh<u32>> = build_from_triangles(&vertices, &faces);
        assert!(matches!(result, Err(MeshError::NonManifoldEdge { .. })));
    }

    #[test]
    fn test_closed_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

        let mesh: TriMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();
        assert_eq!(mesh.num_halfedges(), 12);
        assert_eq!(mesh.num_edges(), 6);
        assert!(mesh.is_valid());
        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v));
        }
    }
}
