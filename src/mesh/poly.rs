//! Polygonal output mesh.
//!
//! The face assembler grows its result half-edge by half-edge: edges are
//! created between already-existing vertices, chained along open boundaries,
//! and only later claimed by faces. [`PolyMeshOps`] is the exact operation
//! set the assembler needs; [`PolyMesh`] is the default implementation.
//!
//! Handles are plain `usize` indices. Half-edges are twin-paired as in
//! [`TriMesh`](super::TriMesh): the twin of half-edge `2k` is `2k + 1`.

use nalgebra::Point3;

const INVALID: usize = usize::MAX;

/// Operations the face assembler requires of an output mesh container.
///
/// Implementations must keep `next`/`prev` pointers mutually consistent
/// (setting `next` fixes the target's `prev`) and tolerate half-edges that
/// are only partially linked while assembly is in flight.
pub trait PolyMeshOps {
    /// Remove all mesh content.
    fn clear(&mut self);

    /// Append a vertex, returning its index.
    fn add_vertex(&mut self, position: Point3<f64>) -> usize;

    /// Number of vertices, deleted ones included.
    fn num_vertices(&self) -> usize;

    /// Number of half-edges.
    fn num_halfedges(&self) -> usize;

    /// Number of faces.
    fn num_faces(&self) -> usize;

    /// Set the tag bit of a vertex.
    fn set_tagged(&mut self, v: usize, tagged: bool);

    /// Read the tag bit of a vertex.
    fn tagged(&self, v: usize) -> bool;

    /// Append an empty face, returning its index.
    fn new_face(&mut self) -> usize;

    /// Append a twin pair of half-edges between two vertices and return the
    /// half-edge running `from -> to`. Neither half-edge is linked or
    /// face-attached yet.
    fn new_edge(&mut self, from: usize, to: usize) -> usize;

    /// The twin of a half-edge.
    fn opposite_halfedge(&self, he: usize) -> usize;

    /// The successor of a half-edge, if already linked.
    fn next_halfedge(&self, he: usize) -> Option<usize>;

    /// Link `next` after `he`, maintaining the reverse `prev` pointer.
    fn set_next_halfedge(&mut self, he: usize, next: usize);

    /// The head vertex of a half-edge.
    fn to_vertex(&self, he: usize) -> usize;

    /// The outgoing half-edge stored at a vertex.
    fn halfedge_of_vertex(&self, v: usize) -> Option<usize>;

    /// Store an outgoing half-edge at a vertex.
    fn set_halfedge_of_vertex(&mut self, v: usize, he: usize);

    /// The face a half-edge belongs to, if any.
    fn face_of_halfedge(&self, he: usize) -> Option<usize>;

    /// Attach a half-edge to a face.
    fn set_face_of_halfedge(&mut self, he: usize, f: usize);

    /// Store a starting half-edge at a face.
    fn set_halfedge_of_face(&mut self, f: usize, he: usize);

    /// The starting half-edge of a face.
    fn halfedge_of_face(&self, f: usize) -> Option<usize>;

    /// Make the vertex's stored half-edge a boundary one when the vertex is
    /// on a boundary, so that boundary walks starting at the vertex work.
    fn adjust_outgoing_halfedge(&mut self, v: usize);

    /// Number of edges incident to a vertex.
    fn valence(&self, v: usize) -> usize;

    /// A vertex is on the boundary when its stored half-edge has no face.
    fn is_boundary_vertex(&self, v: usize) -> bool;

    /// Whether a vertex has been deleted.
    fn is_deleted(&self, v: usize) -> bool;

    /// Mark an isolated vertex as deleted.
    fn delete_vertex(&mut self, v: usize);

    /// Compact the vertex array, dropping deleted vertices and remapping all
    /// references. Invalidates vertex indices.
    fn garbage_collection(&mut self);
}

#[derive(Debug, Clone)]
struct PolyVertex {
    position: Point3<f64>,
    halfedge: usize,
    tagged: bool,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct PolyHalfEdge {
    /// Head vertex.
    vertex: usize,
    next: usize,
    prev: usize,
    face: usize,
}

#[derive(Debug, Clone)]
struct PolyFace {
    halfedge: usize,
}

/// A polygon mesh with faces of arbitrary valence.
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    vertices: Vec<PolyVertex>,
    halfedges: Vec<PolyHalfEdge>,
    faces: Vec<PolyFace>,
}

impl PolyMesh {
    /// Create an empty mesh.
    pub fn new() -> PolyMesh {
        PolyMesh::default()
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: usize) -> Point3<f64> {
        self.vertices[v].position
    }

    /// The origin vertex of a half-edge.
    #[inline]
    pub fn from_vertex(&self, he: usize) -> usize {
        self.to_vertex(he ^ 1)
    }

    /// The predecessor of a half-edge, if already linked.
    #[inline]
    pub fn prev_halfedge(&self, he: usize) -> Option<usize> {
        let prev = self.halfedges[he].prev;
        (prev != INVALID).then_some(prev)
    }

    /// Iterate over the half-edges of a face in order.
    pub fn face_halfedges(&self, f: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let Some(start) = self.halfedge_of_face(f) else {
            return result;
        };
        let mut he = start;
        loop {
            result.push(he);
            he = match self.next_halfedge(he) {
                Some(h) => h,
                None => break,
            };
            if he == start || result.len() > self.halfedges.len() {
                break;
            }
        }
        result
    }

    /// The vertices of a face, in order (origins of its half-edges).
    pub fn face_vertices(&self, f: usize) -> Vec<usize> {
        self.face_halfedges(f)
            .into_iter()
            .map(|he| self.from_vertex(he))
            .collect()
    }

    /// The number of half-edges of a face.
    pub fn face_valence(&self, f: usize) -> usize {
        self.face_halfedges(f).len()
    }

    /// Iterate over outgoing half-edges of a vertex. Requires the half-edges
    /// around the vertex to be fully next-linked.
    pub fn vertex_halfedges(&self, v: usize) -> Vec<usize> {
        let mut result = Vec::new();
        let Some(start) = self.halfedge_of_vertex(v) else {
            return result;
        };
        let mut he = start;
        loop {
            result.push(he);
            he = match self.next_halfedge(he ^ 1) {
                Some(h) => h,
                None => break,
            };
            if he == start || result.len() > self.halfedges.len() {
                break;
            }
        }
        result
    }
}

impl PolyMeshOps for PolyMesh {
    fn clear(&mut self) {
        self.vertices.clear();
        self.halfedges.clear();
        self.faces.clear();
    }

    fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        self.vertices.push(PolyVertex {
            position,
            halfedge: INVALID,
            tagged: false,
            deleted: false,
        });
        self.vertices.len() - 1
    }

    fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    fn num_faces(&self) -> usize {
        self.faces.len()
    }

    fn set_tagged(&mut self, v: usize, tagged: bool) {
        self.vertices[v].tagged = tagged;
    }

    fn tagged(&self, v: usize) -> bool {
        self.vertices[v].tagged
    }

    fn new_face(&mut self) -> usize {
        self.faces.push(PolyFace { halfedge: INVALID });
        self.faces.len() - 1
    }

    fn new_edge(&mut self, from: usize, to: usize) -> usize {
        let he = self.halfedges.len();
        self.halfedges.push(PolyHalfEdge {
            vertex: to,
            next: INVALID,
            prev: INVALID,
            face: INVALID,
        });
        self.halfedges.push(PolyHalfEdge {
            vertex: from,
            next: INVALID,
            prev: INVALID,
            face: INVALID,
        });
        he
    }

    fn opposite_halfedge(&self, he: usize) -> usize {
        he ^ 1
    }

    fn next_halfedge(&self, he: usize) -> Option<usize> {
        let next = self.halfedges[he].next;
        (next != INVALID).then_some(next)
    }

    fn set_next_halfedge(&mut self, he: usize, next: usize) {
        self.halfedges[he].next = next;
        self.halfedges[next].prev = he;
    }

    fn to_vertex(&self, he: usize) -> usize {
        self.halfedges[he].vertex
    }

    fn halfedge_of_vertex(&self, v: usize) -> Option<usize> {
        let he = self.vertices[v].halfedge;
        (he != INVALID).then_some(he)
    }

    fn set_halfedge_of_vertex(&mut self, v: usize, he: usize) {
        self.vertices[v].halfedge = he;
    }

    fn face_of_halfedge(&self, he: usize) -> Option<usize> {
        let f = self.halfedges[he].face;
        (f != INVALID).then_some(f)
    }

    fn set_face_of_halfedge(&mut self, he: usize, f: usize) {
        self.halfedges[he].face = f;
    }

    fn set_halfedge_of_face(&mut self, f: usize, he: usize) {
        self.faces[f].halfedge = he;
    }

    fn halfedge_of_face(&self, f: usize) -> Option<usize> {
        let he = self.faces[f].halfedge;
        (he != INVALID).then_some(he)
    }

    fn adjust_outgoing_halfedge(&mut self, v: usize) {
        for he in self.vertex_halfedges(v) {
            if self.face_of_halfedge(he).is_none() {
                self.set_halfedge_of_vertex(v, he);
                return;
            }
        }
    }

    fn valence(&self, v: usize) -> usize {
        self.vertex_halfedges(v).len()
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        match self.halfedge_of_vertex(v) {
            Some(he) => self.face_of_halfedge(he).is_none(),
            None => true,
        }
    }

    fn is_deleted(&self, v: usize) -> bool {
        self.vertices[v].deleted
    }

    fn delete_vertex(&mut self, v: usize) {
        self.vertices[v].deleted = true;
        self.vertices[v].halfedge = INVALID;
    }

    fn garbage_collection(&mut self) {
        let mut remap = vec![INVALID; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (i, v) in self.vertices.iter().enumerate() {
            if !v.deleted {
                remap[i] = kept.len();
                kept.push(v.clone());
            }
        }
        self.vertices = kept;
        for he in &mut self.halfedges {
            if he.vertex != INVALID {
                he.vertex = remap[he.vertex];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> PolyMesh {
        // One quad built the way the assembler builds faces: vertices,
        // edges, boundary links, face attachment.
        let mut m = PolyMesh::new();
        for i in 0..4 {
            m.add_vertex(Point3::new(i as f64, 0.0, 0.0));
        }
        let e01 = m.new_edge(0, 1);
        let e12 = m.new_edge(1, 2);
        let e23 = m.new_edge(2, 3);
        let e30 = m.new_edge(3, 0);
        // Interior chain.
        m.set_next_halfedge(e01, e12);
        m.set_next_halfedge(e12, e23);
        m.set_next_halfedge(e23, e30);
        m.set_next_halfedge(e30, e01);
        // Boundary chain (twins, reverse direction).
        m.set_next_halfedge(e01 ^ 1, e30 ^ 1);
        m.set_next_halfedge(e30 ^ 1, e23 ^ 1);
        m.set_next_halfedge(e23 ^ 1, e12 ^ 1);
        m.set_next_halfedge(e12 ^ 1, e01 ^ 1);
        for (v, he) in [(0, e01), (1, e12), (2, e23), (3, e30)] {
            m.set_halfedge_of_vertex(v, he);
        }
        let f = m.new_face();
        m.set_halfedge_of_face(f, e01);
        for he in [e01, e12, e23, e30] {
            m.set_face_of_halfedge(he, f);
        }
        for v in 0..4 {
            m.adjust_outgoing_halfedge(v);
        }
        m
    }

    #[test]
    fn test_quad_connectivity() {
        let m = quad_mesh();
        assert_eq!(m.num_vertices(), 4);
        assert_eq!(m.num_halfedges(), 8);
        assert_eq!(m.num_faces(), 1);
        assert_eq!(m.face_valence(0), 4);
        assert_eq!(m.face_vertices(0), vec![0, 1, 2, 3]);
        for v in 0..4 {
            assert_eq!(m.valence(v), 2);
            assert!(m.is_boundary_vertex(v));
        }
    }

    #[test]
    fn test_adjust_outgoing_picks_boundary() {
        let m = quad_mesh();
        for v in 0..4 {
            let he = m.halfedge_of_vertex(v).unwrap();
            assert!(m.face_of_halfedge(he).is_none());
        }
    }

    #[test]
    fn test_boundary_walk() {
        let m = quad_mesh();
        let start = m.halfedge_of_vertex(0).unwrap();
        let mut he = start;
        let mut seen = Vec::new();
        loop {
            seen.push(m.to_vertex(he));
            // next and prev stay mutually consistent.
            let next = m.next_halfedge(he).unwrap();
            assert_eq!(m.prev_halfedge(next), Some(he));
            he = next;
            if he == start {
                break;
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_delete_and_garbage_collection() {
        let mut m = quad_mesh();
        let isolated = m.add_vertex(Point3::new(9.0, 9.0, 9.0));
        assert_eq!(m.valence(isolated), 0);
        m.delete_vertex(isolated);
        m.garbage_collection();
        assert_eq!(m.num_vertices(), 4);
        // Face connectivity survives compaction.
        assert_eq!(m.face_vertices(0), vec![0, 1, 2, 3]);
    }
}
