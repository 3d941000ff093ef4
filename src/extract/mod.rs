//! Quad mesh extraction from a seamless integer-grid parameterization.
//!
//! Given a triangle mesh with per-corner UV coordinates that agree across
//! edges up to 90-degree rotations and integer translations, the extractor
//! produces the polygon mesh whose vertices are the pre-images of the
//! integer lattice and whose edges follow the parameterization axes:
//!
//! 1. recover per-edge transition functions,
//! 2. truncate the coordinates so exact comparisons are meaningful
//!    (degenerate UV edges are decimated before and after),
//! 3. enumerate grid vertices on faces, edges and vertices, each with up to
//!    four outgoing slots,
//! 4. connect the slots by tracing unit segments through the triangulation,
//! 5. repair fans whose expected valence was not met,
//! 6. assemble faces with a manifold-safe walk and stamp per-halfedge
//!    integer UVs.
//!
//! Failures never abort the extraction: inconsistent input, degenerate
//! regions and non-manifold face candidates downgrade the output (holes,
//! skipped faces) and are counted in [`ExtractionStats`].
//!
//! # Example
//!
//! ```no_run
//! use quadrille::extract::MeshExtractor;
//! use quadrille::mesh::{PolyMesh, TriMesh};
//!
//! # fn get_mesh_and_uv() -> (TriMesh, Vec<f64>) { unimplemented!() }
//! let (mesh, uv) = get_mesh_and_uv();
//! let mut extractor = MeshExtractor::new(&mesh);
//! let mut quads = PolyMesh::new();
//! let result = extractor.extract(&uv, None, &mut quads).unwrap();
//! println!("faces: {}", result.stats.face_valence_histogram.len());
//! ```

mod assemble;
mod decimate;
mod gvertex;
mod repair;
mod trace;
mod transition;
mod truncate;

pub use decimate::Decimator;
pub use gvertex::{GridVertex, GridVertexKind, LeiState, LocalEdgeInfo};
pub use transition::{TransitionFunction, TransitionTable};
pub use truncate::{consistent_truncation, singular_fixed_point, TruncationReport};

use std::collections::BTreeMap;

use nalgebra::{Point2, Point3, Vector2};

use crate::error::{MeshError, Result};
use crate::geom::Orientation;
use crate::mesh::{HalfEdgeId, MeshIndex, PolyMeshOps, TriMesh};

/// The four cartesian UV directions, in counter-clockwise order starting
/// at +u.
#[inline]
pub(crate) fn cartesian_directions() -> [Vector2<f64>; 4] {
    [
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(-1.0, 0.0),
        Vector2::new(0.0, -1.0),
    ]
}

/// Index of a unit axis direction within [`cartesian_directions`].
#[inline]
pub(crate) fn ori_to_idx(dir: Vector2<f64>) -> usize {
    if dir.x > 0.0 {
        0
    } else if dir.y > 0.0 {
        1
    } else if dir.x < 0.0 {
        2
    } else {
        3
    }
}

/// Slot index of a direction at a gvertex whose slot sequence was reversed
/// for a negatively oriented triangle.
#[inline]
pub(crate) fn ori_to_idx_inverse(dir: Vector2<f64>) -> usize {
    3 - ori_to_idx(dir)
}

/// The UV of a halfedge's head corner.
#[inline]
pub(crate) fn uv_point<I: MeshIndex>(uv: &[f64], he: HalfEdgeId<I>) -> Point2<f64> {
    Point2::new(uv[2 * he.index()], uv[2 * he.index() + 1])
}

/// Counters describing one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Grid vertices found strictly inside faces.
    pub face_gvertices: usize,
    /// Grid vertices found on edge interiors.
    pub edge_gvertices: usize,
    /// Grid vertices found on input vertices.
    pub vertex_gvertices: usize,
    /// Input faces with zero UV orientation.
    pub degenerate_input_faces: usize,
    /// Vertex transitions with rotation 0 but an inconsistent translation.
    pub inconsistent_transitions: usize,
    /// Input vertices adjacent to more than one boundary.
    pub multi_boundary_vertices: usize,
    /// Traces that hit a slot already connected elsewhere.
    pub connection_conflicts: usize,
    /// Slot pairs inserted by incomplete-fan repair.
    pub repaired_slot_pairs: usize,
    /// Face cycles skipped to preserve manifoldness.
    pub skipped_faces: usize,
    /// Boundary loops containing an input-boundary vertex.
    pub desired_holes: usize,
    /// Boundary loops that are pure extraction artifacts.
    pub undesired_holes: usize,
    /// Isolated output vertices removed by the post-pass.
    pub isolated_vertices_removed: usize,
    /// Output face count per face valence.
    pub face_valence_histogram: BTreeMap<usize, usize>,
}

/// Result of an extraction: per-halfedge UV annotations plus statistics.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Integer UV of each output halfedge's head, in its face's local
    /// chart. Indexed by output halfedge; halfedges without a face keep a
    /// zero entry.
    pub halfedge_uvs: Vec<Vector2<i32>>,
    /// Counters of the run.
    pub stats: ExtractionStats,
}

/// Classification of input faces by their UV geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamStats {
    /// Positively oriented faces.
    pub positive: usize,
    /// Negatively oriented (folded) faces.
    pub negative: usize,
    /// Degenerate faces with exactly two coincident corners.
    pub needles: usize,
    /// Degenerate faces with three distinct collinear corners.
    pub caps: usize,
    /// Faces collapsed to a single UV point.
    pub points: usize,
}

/// The extractor. Borrows the input mesh for its lifetime; one instance can
/// run [`MeshExtractor::extract`] repeatedly.
#[derive(Debug)]
pub struct MeshExtractor<'a, I: MeshIndex = u32> {
    pub(crate) mesh: &'a TriMesh<I>,
    pub(crate) tf: TransitionTable,
    pub(crate) vertex_to_halfedge: Vec<Option<HalfEdgeId<I>>>,
    pub(crate) edge_to_halfedge: Vec<Option<HalfEdgeId<I>>>,
    pub(crate) edge_valid: Vec<bool>,
    pub(crate) gvertices: Vec<GridVertex<I>>,
    pub(crate) face_gvertices: Vec<Vec<usize>>,
    pub(crate) edge_gvertices: Vec<Vec<usize>>,
    pub(crate) vertex_gvertices: Vec<Vec<usize>>,
    pub(crate) stats: ExtractionStats,
}

impl<'a, I: MeshIndex> MeshExtractor<'a, I> {
    /// Create an extractor over an input mesh.
    pub fn new(mesh: &'a TriMesh<I>) -> Self {
        MeshExtractor {
            mesh,
            tf: TransitionTable::new(),
            vertex_to_halfedge: Vec::new(),
            edge_to_halfedge: Vec::new(),
            edge_valid: Vec::new(),
            gvertices: Vec::new(),
            face_gvertices: Vec::new(),
            edge_gvertices: Vec::new(),
            vertex_gvertices: Vec::new(),
            stats: ExtractionStats::default(),
        }
    }

    /// The grid vertices of the last extraction.
    pub fn gvertices(&self) -> &[GridVertex<I>] {
        &self.gvertices
    }

    /// The transition table of the last extraction.
    pub fn transitions(&self) -> &TransitionTable {
        &self.tf
    }

    /// Extract the integer-grid mesh of `uv_coords` into `out`.
    ///
    /// `uv_coords` holds two scalars per halfedge (the UV of its head corner
    /// in its face's chart). `external_valences`, when available, gives the
    /// target valence per input vertex and should be preferred over the
    /// built-in angle-sum estimate, which is unreliable near degenerate
    /// parameter triangles.
    ///
    /// Local failures never abort the run; they are logged and counted in
    /// the returned stats.
    pub fn extract<M: PolyMeshOps>(
        &mut self,
        uv_coords: &[f64],
        external_valences: Option<&[u32]>,
        out: &mut M,
    ) -> Result<Extraction> {
        if uv_coords.len() != 2 * self.mesh.num_halfedges() {
            return Err(MeshError::UvLengthMismatch {
                expected: 2 * self.mesh.num_halfedges(),
                actual: uv_coords.len(),
            });
        }
        if let Some(valences) = external_valences {
            if valences.len() != self.mesh.num_vertices() {
                return Err(MeshError::ValenceLengthMismatch {
                    expected: self.mesh.num_vertices(),
                    actual: valences.len(),
                });
            }
        }

        self.stats = ExtractionStats::default();
        let mut uv = uv_coords.to_vec();

        // Corner positions before any decimation; used for embedding when a
        // decimation pass fired.
        let mesh = self.mesh;
        let he_points: Vec<Point3<f64>> = mesh
            .halfedge_ids()
            .map(|he| *mesh.position(mesh.dest(he)))
            .collect();

        // Collapse degenerate UV edges prior to truncation.
        let mut decimator = Decimator::new(mesh.num_edges());
        let mut decimated = decimator.decimate(mesh, &mut uv);

        // Extract transition functions.
        self.tf = TransitionTable::extract(mesh, &uv);

        // Canonicalize the coordinates so exact comparisons hold.
        let trunc = consistent_truncation(mesh, &self.tf, &mut uv);
        self.stats.inconsistent_transitions = trunc.inconsistent_transitions;
        self.stats.multi_boundary_vertices = trunc.multi_boundary_vertices;

        // Truncation may have newly collapsed edges.
        decimated |= decimator.decimate(mesh, &mut uv);

        // Generate grid vertices and their local edge slots.
        let embedding: Box<dyn Fn(HalfEdgeId<I>) -> Point3<f64> + '_> = if decimated {
            Box::new(move |he| he_points[he.index()])
        } else {
            Box::new(move |he| *mesh.position(mesh.dest(he)))
        };
        self.generate_vertices(&uv, external_valences, decimator.collapsed(), &*embedding);

        // Connect the slots by tracing, then close incomplete fans.
        self.generate_connections(&uv);
        self.try_connect_incomplete_gvertices();

        // Assemble faces and clean up.
        let halfedge_uvs = self.generate_faces(out);

        self.stats.face_valence_histogram = face_valence_histogram(out);
        if self
            .stats
            .face_valence_histogram
            .keys()
            .any(|&valence| valence != 4)
        {
            log::info!(
                "extraction produced non-quad faces: {:?}",
                self.stats.face_valence_histogram
            );
        }

        Ok(Extraction {
            halfedge_uvs,
            stats: self.stats.clone(),
        })
    }

    /// Classify the input faces by their UV geometry, after transition
    /// extraction and truncation of a scratch copy of the coordinates.
    pub fn parameterization_stats(&mut self, uv_coords: &[f64]) -> Result<ParamStats> {
        if uv_coords.len() != 2 * self.mesh.num_halfedges() {
            return Err(MeshError::UvLengthMismatch {
                expected: 2 * self.mesh.num_halfedges(),
                actual: uv_coords.len(),
            });
        }
        let mut uv = uv_coords.to_vec();
        self.tf = TransitionTable::extract(self.mesh, &uv);
        consistent_truncation(self.mesh, &self.tf, &mut uv);

        let mut stats = ParamStats::default();
        for fh in self.mesh.face_ids() {
            let tri = self.face_uv_triangle(fh, &uv);
            match tri.orientation() {
                Orientation::Positive => stats.positive += 1,
                Orientation::Negative => stats.negative += 1,
                Orientation::Zero => {
                    let (p0, p1, p2) = (tri.vertex(0), tri.vertex(1), tri.vertex(2));
                    if p0 == p1 && p1 == p2 {
                        stats.points += 1;
                    } else if p0 == p1 || p1 == p2 || p2 == p0 {
                        stats.needles += 1;
                    } else {
                        stats.caps += 1;
                    }
                }
            }
        }
        Ok(stats)
    }
}

/// Face count per valence of an output mesh.
pub fn face_valence_histogram<M: PolyMeshOps>(out: &M) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for f in 0..out.num_faces() {
        let mut valence = 0usize;
        if let Some(start) = out.halfedge_of_face(f) {
            let mut he = start;
            loop {
                valence += 1;
                he = match out.next_halfedge(he) {
                    Some(h) => h,
                    None => break,
                };
                if he == start || valence > out.num_halfedges() {
                    break;
                }
            }
        }
        *histogram.entry(valence).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, PolyMesh};
    use nalgebra::Point3;

    /// Build a mesh plus per-halfedge UVs from per-face charts. Boundary
    /// halfedges receive the corner value of the adjacent interior chart.
    fn mesh_with_charts(
        vertices: Vec<Point3<f64>>,
        faces: Vec<[usize; 3]>,
        chart_uv: impl Fn(usize, usize) -> Point2<f64>,
    ) -> (TriMesh, Vec<f64>) {
        let mesh: TriMesh = build_from_triangles(&vertices, &faces).unwrap();
        let mut uv = vec![0.0; 2 * mesh.num_halfedges()];
        for he in mesh.halfedge_ids() {
            let (face, vertex) = if !mesh.is_boundary_halfedge(he) {
                (mesh.face_of(he).index(), mesh.dest(he).index())
            } else {
                // Same geometric corner seen from the interior side.
                let interior = mesh.prev(he.twin());
                (mesh.face_of(interior).index(), mesh.dest(interior).index())
            };
            let p = chart_uv(face, vertex);
            uv[2 * he.index()] = p.x;
            uv[2 * he.index() + 1] = p.y;
        }
        (mesh, uv)
    }

    /// Flat 2x2 square: two triangles, identity transitions.
    fn square_2x2() -> (TriMesh, Vec<f64>) {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        mesh_with_charts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            move |_, v| corners[v],
        )
    }

    #[test]
    fn test_square_gvertex_census() {
        let (mesh, uv) = square_2x2();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        // Four corner vertices, four boundary-edge midpoints plus the
        // diagonal midpoint (1,1), nothing strictly inside a triangle.
        assert_eq!(result.stats.vertex_gvertices, 4);
        assert_eq!(result.stats.edge_gvertices, 5);
        assert_eq!(result.stats.face_gvertices, 0);
        assert_eq!(extractor.gvertices().len(), 9);

        // The diagonal midpoint is the only interior gvertex.
        let interior: Vec<_> = extractor
            .gvertices()
            .iter()
            .filter(|gv| !gv.is_boundary)
            .collect();
        assert_eq!(interior.len(), 1);
        assert_eq!(interior[0].position_uv, Point2::new(1.0, 1.0));
        assert_eq!(interior[0].num_local_edges(), 4);
    }

    #[test]
    fn test_square_faces_are_unit_quads() {
        let (mesh, uv) = square_2x2();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        // Four unit quads plus the rim cycle along the outer boundary.
        assert_eq!(result.stats.face_valence_histogram.get(&4), Some(&4));
        assert_eq!(out.num_faces(), 5);
        assert_eq!(result.stats.skipped_faces, 0);

        // Each quad spans one distinct unit cell of the grid.
        let mut cells = Vec::new();
        for f in 0..out.num_faces() {
            let hes = out.face_halfedges(f);
            if hes.len() != 4 {
                continue;
            }
            let uvs: Vec<Vector2<i32>> = hes.iter().map(|&he| result.halfedge_uvs[he]).collect();
            let min_u = uvs.iter().map(|p| p.x).min().unwrap();
            let max_u = uvs.iter().map(|p| p.x).max().unwrap();
            let min_v = uvs.iter().map(|p| p.y).min().unwrap();
            let max_v = uvs.iter().map(|p| p.y).max().unwrap();
            assert_eq!(max_u - min_u, 1);
            assert_eq!(max_v - min_v, 1);
            // Consecutive halfedge UVs differ by a unit axis step.
            for k in 0..4 {
                let d = uvs[(k + 1) % 4] - uvs[k];
                assert_eq!(d.x.abs() + d.y.abs(), 1, "non-unit step in quad {}", f);
            }
            cells.push((min_u, min_v));
        }
        cells.sort_unstable();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_square_connections_are_reciprocal() {
        let (mesh, uv) = square_2x2();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        extractor.extract(&uv, None, &mut out).unwrap();

        for (i, gv) in extractor.gvertices().iter().enumerate() {
            for (j, le) in gv.local_edges.iter().enumerate() {
                let Some((pg, pl)) = le.state.connected() else {
                    panic!("slot {} of gvertex {} is unconnected on a closed grid", j, i);
                };
                assert_eq!(
                    extractor.gvertices()[pg].local_edges[pl].state,
                    LeiState::Connected { gv: i, lei: j },
                    "reciprocity broken between ({}, {}) and ({}, {})",
                    i,
                    j,
                    pg,
                    pl
                );
            }
        }
    }

    /// Right triangle with legs of length two: one unit quad fits, the rest
    /// of the leftover region closes into a single higher-valence face.
    #[test]
    fn test_right_triangle() {
        let (mesh, uv) = mesh_with_charts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2]],
            |_, v| {
                [
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 0.0),
                    Point2::new(0.0, 2.0),
                ][v]
            },
        );
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        // Corners plus the three on-edge lattice points; no interior point.
        assert_eq!(result.stats.vertex_gvertices, 3);
        assert_eq!(result.stats.edge_gvertices, 3);
        assert_eq!(result.stats.face_gvertices, 0);

        // One quad; the leftover region closes into one hexagonal cycle
        // (with a repeated vertex along its slit).
        assert_eq!(result.stats.face_valence_histogram.get(&4), Some(&1));
        assert_eq!(result.stats.face_valence_histogram.get(&6), Some(&1));
        // The corner gvertex at (2,0) only took part in a two-slot cycle, so
        // it never received an edge and was dropped as isolated.
        assert_eq!(result.stats.isolated_vertices_removed, 1);
        assert_eq!(out.num_vertices(), 5);
    }

    /// Three triangles around an interior vertex whose charts rotate by 90
    /// degrees each: the center is singular with its canonical UV pinned at
    /// (1/2, 1/2), so it produces no grid vertex and the three outer
    /// lattice corners close into triangles.
    ///
    /// Chart k of triangle [center, p_k, p_{k+1}]:
    ///   center = (0.5, 0.5), p_k = (0, 0), p_{k+1} = (1, 0).
    fn singular_cone_mesh_uv() -> (TriMesh, Vec<f64>) {
        let faces = [[0usize, 1, 2], [0, 2, 3], [0, 3, 1]];
        mesh_with_charts(
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(-0.5, 0.87, 0.0),
                Point3::new(-0.5, -0.87, 0.0),
            ],
            faces.to_vec(),
            move |f, v| {
                if v == 0 {
                    Point2::new(0.5, 0.5)
                } else if v == faces[f][1] {
                    Point2::new(0.0, 0.0)
                } else {
                    Point2::new(1.0, 0.0)
                }
            },
        )
    }

    #[test]
    fn test_singular_vertex_classification() {
        let (mesh, uv) = singular_cone_mesh_uv();
        let table = TransitionTable::extract(&mesh, &uv);
        let center = crate::mesh::VertexId::new(0);
        let vtrans = table.vertex_transition(&mesh, center);
        assert!(!vtrans.is_identity());
        assert!(vtrans.r == 1 || vtrans.r == 3);
        assert_eq!(
            singular_fixed_point(vtrans),
            Some(Point2::new(0.5, 0.5))
        );
    }

    #[test]
    fn test_singular_vertex_pinned_by_truncation() {
        let (mesh, mut uv) = singular_cone_mesh_uv();
        // Perturb the center's corner coordinates chart by chart.
        for he in mesh.halfedge_ids() {
            if !mesh.is_boundary_halfedge(he) && mesh.dest(he).index() == 0 {
                uv[2 * he.index()] += 3e-4;
                uv[2 * he.index() + 1] -= 2e-4;
            }
        }
        let table = TransitionTable::extract(&mesh, &uv);
        consistent_truncation(&mesh, &table, &mut uv);
        for he in mesh.halfedge_ids() {
            if !mesh.is_boundary_halfedge(he) && mesh.dest(he).index() == 0 {
                assert_eq!(uv[2 * he.index()], 0.5);
                assert_eq!(uv[2 * he.index() + 1], 0.5);
            }
        }
    }

    #[test]
    fn test_singular_cone_extraction() {
        let (mesh, uv) = singular_cone_mesh_uv();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        // The singular center has half-integer UV: no gvertex there. The
        // three outer corners are the only lattice points.
        assert_eq!(result.stats.vertex_gvertices, 3);
        assert_eq!(result.stats.edge_gvertices, 0);
        assert_eq!(result.stats.face_gvertices, 0);
        assert_eq!(extractor.gvertices().len(), 3);

        // They close into two triangles (front and back of the lattice
        // triangle around the cone).
        assert_eq!(out.num_faces(), 2);
        assert_eq!(result.stats.face_valence_histogram.get(&3), Some(&2));
        assert_eq!(result.stats.isolated_vertices_removed, 0);
    }

    /// Five unit-square sectors around a valence-five singular center at
    /// integer UV: every sector contributes one outgoing slot, producing
    /// five quads around an extraordinary output vertex.
    fn five_sector_cone() -> (TriMesh, Vec<f64>) {
        // Vertices: 0 = center, a_k = 1..=5, m_k = 6..=10.
        // Square k = [center, a_k, m_k, a_{k+1}], split into two triangles.
        let mut vertices = vec![Point3::new(0.0, 0.0, 1.0)];
        for k in 0..5 {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / 5.0;
            vertices.push(Point3::new(angle.cos(), angle.sin(), 0.0));
        }
        for k in 0..5 {
            let angle = 2.0 * std::f64::consts::PI * (k as f64 + 0.5) / 5.0;
            vertices.push(Point3::new(1.4 * angle.cos(), 1.4 * angle.sin(), 0.0));
        }
        let mut faces = Vec::new();
        for k in 0..5 {
            let a = 1 + k;
            let m = 6 + k;
            let b = 1 + (k + 1) % 5;
            faces.push([0, a, m]);
            faces.push([0, m, b]);
        }

        let faces_for_uv = faces.clone();
        mesh_with_charts(vertices, faces, move |f, v| {
            let face = faces_for_uv[f];
            if v == 0 {
                Point2::new(0.0, 0.0)
            } else if v >= 6 {
                // The square's far corner.
                Point2::new(1.0, 1.0)
            } else if f % 2 == 0 {
                // [center, a_k, m_k]: a_k sits at (1, 0).
                debug_assert_eq!(v, face[1]);
                Point2::new(1.0, 0.0)
            } else {
                // [center, m_k, a_{k+1}]: a_{k+1} sits at (0, 1).
                debug_assert_eq!(v, face[2]);
                Point2::new(0.0, 1.0)
            }
        })
    }

    #[test]
    fn test_five_sector_cone_valence() {
        let (mesh, uv) = five_sector_cone();
        let table = TransitionTable::extract(&mesh, &uv);
        let center = crate::mesh::VertexId::new(0);
        let vtrans = table.vertex_transition(&mesh, center);
        assert!(!vtrans.is_identity());
        assert_eq!((vtrans.tu, vtrans.tv), (0, 0));

        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        // Center at integer UV: a gvertex with five slots, no repair needed.
        let center_gv = extractor
            .gvertices()
            .iter()
            .find(|gv| gv.kind == GridVertexKind::OnVertex && !gv.is_boundary)
            .expect("center gvertex");
        assert_eq!(center_gv.num_local_edges(), 5);
        assert_eq!(center_gv.missing_leis, 0);
        assert_eq!(result.stats.repaired_slot_pairs, 0);

        // Five quads around the extraordinary vertex (plus the outer rim
        // cycle closing the disk).
        assert_eq!(result.stats.face_valence_histogram.get(&4), Some(&5));
    }

    #[test]
    fn test_external_valences_respected() {
        let (mesh, uv) = five_sector_cone();
        let mut valences = vec![0u32; mesh.num_vertices()];
        // Ask for one more slot than geometry provides at the center; the
        // fan walk finds no gvertex coinciding with the pivot, so nothing
        // is invented.
        valences[0] = 6;
        for v in 1..mesh.num_vertices() {
            valences[v] = 4;
        }
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, Some(&valences), &mut out).unwrap();

        let center_gv = extractor
            .gvertices()
            .iter()
            .find(|gv| gv.kind == GridVertexKind::OnVertex && !gv.is_boundary)
            .expect("center gvertex");
        assert_eq!(center_gv.missing_leis, 1);
        assert_eq!(result.stats.repaired_slot_pairs, 0);
        assert_eq!(result.stats.face_valence_histogram.get(&4), Some(&5));
    }

    /// A folded parameterization (one negatively oriented triangle) must
    /// degrade gracefully, not crash.
    #[test]
    fn test_folded_triangle_terminates() {
        let (mesh, uv) = mesh_with_charts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            |f, v| {
                let fold = [
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 0.0),
                    Point2::new(2.0, 2.0),
                    // The second triangle folds back over the first.
                    Point2::new(2.0, 0.0),
                ];
                let _ = f;
                fold[v]
            },
        );

        let mut extractor = MeshExtractor::new(&mesh);
        let stats = extractor.parameterization_stats(&uv).unwrap();
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.negative, 1);

        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out);
        assert!(result.is_ok());
    }

    /// A face collapsed to a line in UV produces no in-face gvertices, but
    /// lattice points on its non-degenerate edges are still found.
    #[test]
    fn test_degenerate_face_yields_no_onface_gvertices() {
        let (mesh, uv) = mesh_with_charts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            |_, v| {
                [
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 0.0),
                    Point2::new(2.0, 2.0),
                    // Collapses the second triangle onto the diagonal.
                    Point2::new(1.0, 1.0),
                ][v]
            },
        );

        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv, None, &mut out).unwrap();

        assert_eq!(result.stats.degenerate_input_faces, 1);
        assert_eq!(result.stats.face_gvertices, 0);
        // Bottom (1,0), right (2,1) and the diagonal's (1,1); the collapsed
        // face's own edges carry no interior lattice points.
        assert_eq!(result.stats.edge_gvertices, 3);
        // All four input vertices sit at integer UVs, (1,1) included.
        assert_eq!(result.stats.vertex_gvertices, 4);
    }

    #[test]
    fn test_uv_length_validation() {
        let (mesh, uv) = square_2x2();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out = PolyMesh::new();
        let result = extractor.extract(&uv[..uv.len() - 2], None, &mut out);
        assert!(matches!(result, Err(MeshError::UvLengthMismatch { .. })));

        let bad_valences = vec![4u32; mesh.num_vertices() + 1];
        let result = extractor.extract(&uv, Some(&bad_valences), &mut out);
        assert!(matches!(result, Err(MeshError::ValenceLengthMismatch { .. })));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let (mesh, uv) = square_2x2();
        let mut extractor = MeshExtractor::new(&mesh);
        let mut out1 = PolyMesh::new();
        let first = extractor.extract(&uv, None, &mut out1).unwrap();
        let mut out2 = PolyMesh::new();
        let second = extractor.extract(&uv, None, &mut out2).unwrap();
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.halfedge_uvs, second.halfedge_uvs);
        assert_eq!(out1.num_faces(), out2.num_faces());
    }
}
