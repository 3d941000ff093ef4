//! Half-edge triangle mesh data structure.
//!
//! This module provides a half-edge (doubly-connected edge list) representation
//! for the input triangle mesh of the extractor. This structure enables O(1)
//! adjacency queries.
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** pointing in opposite directions,
//!   stored adjacently: the twin of half-edge `2k` is `2k + 1`, and both belong
//!   to edge `k`
//! - Each half-edge knows its **next** (next half-edge around the face),
//!   **prev**, **origin vertex**, and **incident face**
//! - Each vertex stores one outgoing half-edge
//! - Each face stores one half-edge on its boundary
//! - Each edge carries status flags (`selected`, `feature`) that mark
//!   parameterization feature curves
//!
//! # Boundary Handling
//!
//! Boundary half-edges (on mesh boundaries) have an invalid face ID. Their twins
//! are the interior half-edges. Boundary half-edges are linked into loops via
//! their `next` pointers, and a boundary vertex's stored half-edge is always a
//! boundary half-edge.

use nalgebra::Point3;

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge from this vertex.
    /// For boundary vertices, this is guaranteed to be a boundary half-edge.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
///
/// The twin relation is implicit in the index pairing, see [`HalfEdgeId::twin`].
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The next half-edge around the face (counter-clockwise), or along the
    /// boundary loop for boundary half-edges.
    pub next: HalfEdgeId<I>,

    /// The previous half-edge around the face (clockwise).
    pub prev: HalfEdgeId<I>,

    /// The face this half-edge belongs to.
    /// Invalid for boundary half-edges.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new uninitialized half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge on the boundary of this face.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self { halfedge }
    }
}

/// Status flags of a full edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeStatus {
    /// The edge is selected.
    pub selected: bool,
    /// The edge lies on a feature curve.
    pub feature: bool,
}

/// A half-edge mesh data structure for triangle meshes.
///
/// This structure stores vertices, half-edges, faces and per-edge status with
/// full connectivity information, enabling O(1) adjacency queries.
#[derive(Debug, Clone)]
pub struct TriMesh<I: MeshIndex = u32> {
    /// All vertices in the mesh.
    pub(crate) vertices: Vec<Vertex<I>>,

    /// All half-edges in the mesh, twin-paired.
    pub(crate) halfedges: Vec<HalfEdge<I>>,

    /// All faces in the mesh.
    pub(crate) faces: Vec<Face<I>>,

    /// Status flags, one per full edge.
    pub(crate) edge_status: Vec<EdgeStatus>,
}

impl<I: MeshIndex> Default for TriMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> TriMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
            edge_status: Vec::new(),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of full edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Get the status flags of an edge.
    #[inline]
    pub fn edge_status(&self, e: EdgeId<I>) -> EdgeStatus {
        self.edge_status[e.index()]
    }

    /// Get a mutable reference to the status flags of an edge.
    #[inline]
    pub fn edge_status_mut(&mut self, e: EdgeId<I>) -> &mut EdgeStatus {
        &mut self.edge_status[e.index()]
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        he.twin()
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination (head) vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(he.twin())
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// First half-edge of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId<I>) -> HalfEdgeId<I> {
        self.face(f).halfedge
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if an edge is on the boundary.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId<I>) -> bool {
        self.is_boundary_halfedge(e.halfedge(0)) || self.is_boundary_halfedge(e.halfedge(1))
    }

    /// Check if a vertex is on the boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let start = self.vertex(v).halfedge;
        if !start.is_valid() {
            return true; // Isolated vertex
        }

        let mut he = start;
        loop {
            if self.is_boundary_halfedge(he) {
                return true;
            }
            he = self.next(he.twin());
            if he == start {
                break;
            }
        }
        false
    }

    /// First incoming half-edge of a vertex: the twin of its stored outgoing
    /// half-edge. For a boundary vertex this is an interior half-edge.
    /// Invalid for isolated vertices.
    #[inline]
    pub fn first_incoming(&self, v: VertexId<I>) -> HalfEdgeId<I> {
        let out = self.vertex(v).halfedge;
        if out.is_valid() {
            out.twin()
        } else {
            HalfEdgeId::invalid()
        }
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(|i| VertexId::new(i))
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(|i| HalfEdgeId::new(i))
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.num_edges()).map(|i| EdgeId::new(i))
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(|i| FaceId::new(i))
    }

    /// Iterate over outgoing half-edges of a vertex, in clockwise order,
    /// starting at the vertex's stored half-edge.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over incoming half-edges of a vertex, in clockwise order.
    /// The first element equals [`TriMesh::first_incoming`].
    pub fn incoming_halfedges(&self, v: VertexId<I>) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| he.twin())
    }

    /// Incoming half-edges of a vertex in counter-clockwise order: the first
    /// incoming half-edge followed by the remaining ones reversed.
    pub fn incoming_halfedges_ccw(&self, v: VertexId<I>) -> Vec<HalfEdgeId<I>> {
        let mut ring: Vec<HalfEdgeId<I>> = self.incoming_halfedges(v).collect();
        if ring.len() > 1 {
            ring[1..].reverse();
        }
        ring
    }

    /// Get the three half-edges of a triangular face in order.
    pub fn face_halfedges(&self, f: FaceId<I>) -> [HalfEdgeId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [he0, he1, he2]
    }

    /// Get the three vertices of a triangular face.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let [he0, he1, he2] = self.face_halfedges(f);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Compute the valence (degree) of a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    // ==================== Validation ====================

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        // Check vertices
        for v in self.vertex_ids() {
            let he = self.vertex(v).halfedge;
            if he.is_valid() && self.origin(he) != v {
                return false;
            }
        }

        // Check half-edges
        for he in self.halfedge_ids() {
            let h = self.halfedge(he);

            if h.next.is_valid() && self.prev(h.next) != he {
                return false;
            }
            if h.prev.is_valid() && self.next(h.prev) != he {
                return false;
            }
            // Twins share an edge and oppose each other by construction;
            // check origin/dest consistency instead.
            if h.origin.is_valid() && self.halfedge(he.twin()).next.is_valid() {
                let twin_next_origin = self.origin(self.next(he.twin()));
                if twin_next_origin != h.origin {
                    return false;
                }
            }
        }

        // Check faces
        for f in self.face_ids() {
            if !self.face(f).halfedge.is_valid() {
                return false;
            }
        }

        self.edge_status.len() == self.num_edges()
    }
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a TriMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a TriMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // Move to the next outgoing half-edge: twin -> next.
        // If he goes v -> w, then twin(he) goes w -> v, and next(twin(he))
        // originates at v again, one face over in clockwise direction.
        self.current = self.mesh.next(self.current.twin());

        if self.current == self.start || !self.current.is_valid() {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn two_triangles() -> TriMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = TriMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_edge_pairing() {
        let mesh = two_triangles();
        // 5 edges: 4 boundary + 1 interior diagonal.
        assert_eq!(mesh.num_edges(), 5);
        assert_eq!(mesh.num_halfedges(), 10);
        for e in mesh.edge_ids() {
            let h0 = e.halfedge(0);
            let h1 = e.halfedge(1);
            assert_eq!(h0.twin(), h1);
            assert_eq!(mesh.origin(h0), mesh.dest(h1));
        }
    }

    #[test]
    fn test_boundary_vertex_halfedge() {
        let mesh = two_triangles();
        for v in mesh.vertex_ids() {
            assert!(mesh.is_boundary_vertex(v));
            // Stored half-edge of a boundary vertex is a boundary half-edge,
            // so the first incoming half-edge is interior.
            assert!(mesh.is_boundary_halfedge(mesh.vertex(v).halfedge));
            assert!(!mesh.is_boundary_halfedge(mesh.first_incoming(v)));
        }
    }

    #[test]
    fn test_vertex_circulation() {
        let mesh = two_triangles();
        // Vertex 0 has neighbors 1, 2, 3.
        let v = VertexId::new(0);
        assert_eq!(mesh.valence(v), 3);
        let incoming: Vec<_> = mesh.incoming_halfedges(v).collect();
        assert_eq!(incoming.len(), 3);
        for he in incoming {
            assert_eq!(mesh.dest(he), v);
        }
    }

    #[test]
    fn test_incoming_ccw_order() {
        let mesh = two_triangles();
        let v = VertexId::new(0);
        let cw: Vec<_> = mesh.incoming_halfedges(v).collect();
        let ccw = mesh.incoming_halfedges_ccw(v);
        assert_eq!(cw.len(), ccw.len());
        assert_eq!(cw[0], ccw[0]);
        // The remaining entries are each other's reversal.
        let mut tail = cw[1..].to_vec();
        tail.reverse();
        assert_eq!(&ccw[1..], &tail[..]);
    }

    #[test]
    fn test_edge_status_flags() {
        let mut mesh = two_triangles();
        let e = EdgeId::new(0);
        assert!(!mesh.edge_status(e).selected);
        mesh.edge_status_mut(e).selected = true;
        mesh.edge_status_mut(e).feature = true;
        assert!(mesh.edge_status(e).selected);
        assert!(mesh.edge_status(e).feature);
    }
}
