//! Grid vertices and their local outgoing edge slots.
//!
//! A grid vertex is a pre-image of an integer lattice point of the
//! parameterization: strictly inside a triangle, on an edge, or on an input
//! vertex. Each carries up to four outgoing slots ([`LocalEdgeInfo`]), one
//! per cartesian UV direction, ordered counter-clockwise around the vertex;
//! the connector later ties the slots of neighboring grid vertices together.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

use crate::geom::{orient2d_vec, Orientation, Segment2, Triangle2};
use crate::mesh::{FaceId, HalfEdgeId, MeshIndex};

use super::transition::TransitionFunction;
use super::{cartesian_directions, uv_point, MeshExtractor};

/// Where a grid vertex sits on the input mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridVertexKind {
    /// Strictly inside a triangle.
    OnFace,
    /// On the interior of an edge.
    OnEdge,
    /// Coincident with an input vertex.
    OnVertex,
}

/// Connection state of a local edge slot.
///
/// Cross-references between grid vertices are always (gvertex index, local
/// edge index) pairs; the gvertex vector is append-only, so indices stay
/// valid across the whole extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeiState {
    /// Not yet traced.
    Unconnected,
    /// Traced, but no partner was found or the connection was abandoned.
    NoConnection,
    /// The trace ran into the mesh boundary.
    TracedIntoBoundary,
    /// The trace ran into a collapsed or degenerate region.
    TracedIntoDegeneracy,
    /// Connected to local edge `lei` of gvertex `gv`.
    Connected {
        /// Peer gvertex index.
        gv: usize,
        /// Index of the reciprocal slot in the peer's local edges.
        lei: usize,
    },
}

impl LeiState {
    /// Whether this slot has a peer.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, LeiState::Connected { .. })
    }

    /// The peer reference, if connected.
    #[inline]
    pub fn connected(&self) -> Option<(usize, usize)> {
        match *self {
            LeiState::Connected { gv, lei } => Some((gv, lei)),
            _ => None,
        }
    }
}

/// One outgoing edge slot at a grid vertex.
#[derive(Debug, Clone)]
pub struct LocalEdgeInfo<I: MeshIndex = u32> {
    /// The triangle whose chart the slot leaves in.
    pub fh_from: FaceId<I>,
    /// Starting UV in that chart.
    pub uv_from: Point2<f64>,
    /// `uv_from` plus one unit step, before tracing.
    pub uv_intended_to: Point2<f64>,
    /// Endpoint of the traced connection, pulled back into this slot's chart.
    pub uv_to: Point2<f64>,
    /// Connection state.
    pub state: LeiState,
    /// Accumulated transition from this slot's chart to the peer's frame.
    pub accumulated_tf: TransitionFunction,
    /// Output mesh half-edge realizing this slot, assigned during assembly.
    pub halfedge_index: Option<usize>,
    /// Whether a face cycle through this slot has been walked.
    pub face_constructed: bool,
}

impl<I: MeshIndex> LocalEdgeInfo<I> {
    /// A fresh, untraced slot.
    pub fn new(fh_from: FaceId<I>, uv_from: Point2<f64>, uv_intended_to: Point2<f64>) -> Self {
        LocalEdgeInfo {
            fh_from,
            uv_from,
            uv_intended_to,
            uv_to: uv_intended_to,
            state: LeiState::Unconnected,
            accumulated_tf: TransitionFunction::IDENTITY,
            halfedge_index: None,
            face_constructed: false,
        }
    }

    /// Fill in a found connection.
    pub fn complete(
        &mut self,
        gv: usize,
        lei: usize,
        uv_to: Point2<f64>,
        tf: TransitionFunction,
    ) {
        self.state = LeiState::Connected { gv, lei };
        self.uv_to = uv_to;
        self.accumulated_tf = tf;
    }
}

/// A vertex of the output mesh in the making.
#[derive(Debug, Clone)]
pub struct GridVertex<I: MeshIndex = u32> {
    /// Which primitive of the input mesh carries this vertex.
    pub kind: GridVertexKind,
    /// Canonically selected half-edge: a face half-edge for `OnFace`, the
    /// representative edge half-edge for `OnEdge`, an incoming half-edge of
    /// the vertex for `OnVertex`.
    pub anchor_he: HalfEdgeId<I>,
    /// Integer-valued UV position in the anchor's chart.
    pub position_uv: Point2<f64>,
    /// Euclidean pre-image.
    pub position_3d: Point3<f64>,
    /// Whether this vertex lies on (or traced into) the mesh boundary.
    pub is_boundary: bool,
    /// Local edges still expected beyond the built ones.
    pub missing_leis: i32,
    /// Outgoing slots in counter-clockwise cyclic order.
    pub local_edges: Vec<LocalEdgeInfo<I>>,
}

impl<I: MeshIndex> GridVertex<I> {
    /// A grid vertex with no local edges yet.
    pub fn new(
        kind: GridVertexKind,
        anchor_he: HalfEdgeId<I>,
        position_uv: Point2<f64>,
        position_3d: Point3<f64>,
        is_boundary: bool,
    ) -> Self {
        GridVertex {
            kind,
            anchor_he,
            position_uv,
            position_3d,
            is_boundary,
            missing_leis: 0,
            local_edges: Vec::new(),
        }
    }

    /// Wrap a possibly negative or overflowing index into the cyclic local
    /// edge sequence.
    #[inline]
    pub fn local_edge_index(&self, i: isize) -> usize {
        let n = self.local_edges.len() as isize;
        debug_assert!(n > 0);
        i.rem_euclid(n) as usize
    }

    /// Number of local edges.
    #[inline]
    pub fn num_local_edges(&self) -> usize {
        self.local_edges.len()
    }
}

// ==================== Chart-to-3D embedding maps ====================

/// Affine map sending the UV triangle onto the 3D triangle, as a 3x3 matrix
/// acting on (u, v, 1).
pub(crate) fn mapping_for_triangle(
    tri: &Triangle2,
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
) -> Option<Matrix3<f64>> {
    let p = Matrix3::new(
        tri.vertex(0).x,
        tri.vertex(1).x,
        tri.vertex(2).x,
        tri.vertex(0).y,
        tri.vertex(1).y,
        tri.vertex(2).y,
        1.0,
        1.0,
        1.0,
    );
    let q = Matrix3::new(a.x, b.x, c.x, a.y, b.y, c.y, a.z, b.z, c.z);
    p.try_inverse().map(|inv| q * inv)
}

/// Least-squares map from UV onto the 3D segment: UV points project onto the
/// segment parameter, which interpolates the 3D endpoints.
pub(crate) fn mapping_for_segment(seg: &Segment2, a: Point3<f64>, b: Point3<f64>) -> Matrix3<f64> {
    let mut c = Vector2::new(seg.target.x - seg.source.x, seg.target.y - seg.source.y);
    c /= c.dot(&c);
    let d = (-c).dot(&Vector2::new(seg.source.x, seg.source.y));

    let ab = b - a;
    let mut m = Matrix3::zeros();
    m.set_column(0, &(ab * c.x));
    m.set_column(1, &(ab * c.y));
    m.set_column(2, &(a.coords + ab * d));
    m
}

/// Evaluate an embedding map at integer lattice coordinates.
#[inline]
pub(crate) fn apply_mapping(m: &Matrix3<f64>, x: f64, y: f64) -> Point3<f64> {
    Point3::from(m * Vector3::new(x, y, 1.0))
}

// ==================== Generation ====================

impl<'a, I: MeshIndex> MeshExtractor<'a, I> {
    /// UV orientation of a face.
    pub(crate) fn triangle_uv_orientation(&self, fh: FaceId<I>, uv: &[f64]) -> Orientation {
        self.face_uv_triangle(fh, uv).orientation()
    }

    /// The UV triangle of a face.
    pub(crate) fn face_uv_triangle(&self, fh: FaceId<I>, uv: &[f64]) -> Triangle2 {
        let [he0, he1, he2] = self.mesh.face_halfedges(fh);
        Triangle2::new(uv_point(uv, he0), uv_point(uv, he1), uv_point(uv, he2))
    }

    /// Enumerate grid vertices on faces, edges and vertices, building their
    /// local edge slots as they are created.
    pub(crate) fn generate_vertices(
        &mut self,
        uv: &[f64],
        external_valences: Option<&[u32]>,
        collapsed: &[bool],
        embedding: &dyn Fn(HalfEdgeId<I>) -> Point3<f64>,
    ) {
        let mesh = self.mesh;

        // Canonical assignment of primitives to half-edges.
        self.vertex_to_halfedge = mesh
            .vertex_ids()
            .map(|v| {
                let he = mesh.first_incoming(v);
                he.is_valid().then_some(he)
            })
            .collect();
        self.edge_to_halfedge = mesh
            .edge_ids()
            .map(|e| {
                let h0 = e.halfedge(0);
                let h = if !mesh.is_boundary_halfedge(h0) {
                    h0
                } else {
                    e.halfedge(1)
                };
                (!mesh.is_boundary_halfedge(h)).then_some(h)
            })
            .collect();

        self.gvertices.clear();
        self.gvertices.reserve(32768);

        // Grid vertices strictly inside faces.
        self.face_gvertices = vec![Vec::new(); mesh.num_faces()];
        for fh in mesh.face_ids() {
            let [he0, he1, he2] = mesh.face_halfedges(fh);
            let tri = self.face_uv_triangle(fh, uv);

            if tri.orientation() == Orientation::Zero {
                self.stats.degenerate_input_faces += 1;
                continue;
            }

            let m = match mapping_for_triangle(&tri, embedding(he0), embedding(he1), embedding(he2))
            {
                Some(m) => m,
                None => {
                    log::warn!("face {:?}: singular UV-to-3D mapping, skipped", fh);
                    continue;
                }
            };

            let bb = tri.bbox();
            let x_min = bb.xmin().ceil() as i64;
            let x_max = bb.xmax().floor() as i64;
            let y_min = bb.ymin().ceil() as i64;
            let y_max = bb.ymax().floor() as i64;

            for x in x_min..=x_max {
                for y in y_min..=y_max {
                    let p = Point2::new(x as f64, y as f64);
                    if tri.has_on_bounded_side(p) {
                        let p3d = apply_mapping(&m, p.x, p.y);
                        let mut gv =
                            GridVertex::new(GridVertexKind::OnFace, he0, p, p3d, false);
                        gv.local_edges = self.face_local_edges(he0, p, uv);
                        self.face_gvertices[fh.index()].push(self.gvertices.len());
                        self.gvertices.push(gv);
                        self.stats.face_gvertices += 1;
                    }
                }
            }
        }

        // Grid vertices on edge interiors.
        self.edge_valid = vec![false; mesh.num_edges()];
        self.edge_gvertices = vec![Vec::new(); mesh.num_edges()];
        for e in mesh.edge_ids() {
            let Some(heh0) = self.edge_to_halfedge[e.index()] else {
                log::warn!("edge {:?} has no interior halfedge, skipped", e);
                continue;
            };
            let heh1 = mesh.prev(heh0);
            let p0 = uv_point(uv, heh0);
            let p1 = uv_point(uv, heh1);
            let seg = Segment2::new(p0, p1);

            if seg.is_degenerate() || collapsed[e.index()] {
                continue;
            }
            self.edge_valid[e.index()] = true;

            let m = mapping_for_segment(&seg, embedding(heh0), embedding(heh1));
            let bb = seg.bbox();
            let mut x_min = bb.xmin().ceil() as i64;
            let mut x_max = bb.xmax().floor() as i64;
            let mut y_min = bb.ymin().ceil() as i64;
            let mut y_max = bb.ymax().floor() as i64;

            // Walk the longer bbox axis and collect the lattice points that
            // lie exactly on the segment, excluding its endpoints.
            let mut points: Vec<Point2<f64>> = Vec::new();
            if bb.xmax() - bb.xmin() >= bb.ymax() - bb.ymin() {
                if x_min as f64 == bb.xmin() {
                    x_min += 1;
                }
                if x_max as f64 == bb.xmax() {
                    x_max -= 1;
                }
                for x in x_min..=x_max {
                    let alpha = (x as f64 - p0.x) / (p1.x - p0.x);
                    let y = (p0.y + alpha * (p1.y - p0.y)).round() as i64;
                    if y >= y_min && y <= y_max {
                        let p = Point2::new(x as f64, y as f64);
                        if seg.has_on(p) {
                            points.push(p);
                        }
                    }
                }
            } else {
                if y_min as f64 == bb.ymin() {
                    y_min += 1;
                }
                if y_max as f64 == bb.ymax() {
                    y_max -= 1;
                }
                for y in y_min..=y_max {
                    let alpha = (y as f64 - p0.y) / (p1.y - p0.y);
                    let x = (p0.x + alpha * (p1.x - p0.x)).round() as i64;
                    if x >= x_min && x <= x_max {
                        let p = Point2::new(x as f64, y as f64);
                        if seg.has_on(p) {
                            points.push(p);
                        }
                    }
                }
            }

            for p in points {
                let p3d = apply_mapping(&m, p.x, p.y);
                let mut gv = GridVertex::new(GridVertexKind::OnEdge, heh0, p, p3d, false);
                let (les, is_boundary) = self.edge_local_edges(heh0, p, uv);
                gv.local_edges = les;
                gv.is_boundary = is_boundary;
                self.edge_gvertices[e.index()].push(self.gvertices.len());
                self.gvertices.push(gv);
                self.stats.edge_gvertices += 1;
            }
        }

        // Grid vertices on input vertices with integer canonical UV.
        self.vertex_gvertices = vec![Vec::new(); mesh.num_vertices()];
        for v in mesh.vertex_ids() {
            let Some(heh) = self.vertex_to_halfedge[v.index()] else {
                continue;
            };
            let p = uv_point(uv, heh);
            if p.x == p.x.round() && p.y == p.y.round() {
                let mut gv = GridVertex::new(
                    GridVertexKind::OnVertex,
                    heh,
                    p,
                    embedding(heh),
                    false,
                );
                let (les, is_boundary, missing) =
                    self.vertex_local_edges(heh, uv, external_valences);
                gv.local_edges = les;
                gv.is_boundary = is_boundary;
                gv.missing_leis = missing;
                self.vertex_gvertices[v.index()].push(self.gvertices.len());
                self.gvertices.push(gv);
                self.stats.vertex_gvertices += 1;
            }
        }
    }

    // ==================== Local edge construction ====================

    /// Slots of an in-face grid vertex: all four directions, ordered CCW.
    fn face_local_edges(
        &self,
        anchor: HalfEdgeId<I>,
        uv_pos: Point2<f64>,
        uv: &[f64],
    ) -> Vec<LocalEdgeInfo<I>> {
        let mut les = Vec::with_capacity(4);
        if !anchor.is_valid() || self.mesh.is_boundary_halfedge(anchor) {
            return les;
        }
        let fh = self.mesh.face_of(anchor);

        // Convention: start with +u, then rotate by 90-degree steps (CCW).
        for dir in cartesian_directions() {
            les.push(LocalEdgeInfo::new(fh, uv_pos, uv_pos + dir));
        }

        // Slot ordering follows the face orientation.
        if self.triangle_uv_orientation(fh, uv) == Orientation::Negative {
            les.reverse();
        }
        les
    }

    /// Slots of an on-edge grid vertex: directions evaluated in both incident
    /// charts, each group rotated so its valid run is contiguous and ordered
    /// with its face orientation.
    fn edge_local_edges(
        &self,
        anchor: HalfEdgeId<I>,
        uv_pos: Point2<f64>,
        uv: &[f64],
    ) -> (Vec<LocalEdgeInfo<I>>, bool) {
        let mesh = self.mesh;
        let mut les: Vec<LocalEdgeInfo<I>> = Vec::with_capacity(4);
        let mut is_boundary = false;

        if !anchor.is_valid() || mesh.is_boundary_halfedge(anchor) {
            return (les, is_boundary);
        }
        let heh = anchor;
        let heh_opp = heh.twin();

        if mesh.is_boundary_edge(heh.edge()) {
            is_boundary = true;
        }

        let fh = mesh.face_of(heh);
        let ori = self.triangle_uv_orientation(fh, uv);

        let mut fh_opp = FaceId::invalid();
        let mut ori_opp = Orientation::Zero;
        if !mesh.is_boundary_halfedge(heh_opp) {
            fh_opp = mesh.face_of(heh_opp);
            ori_opp = self.triangle_uv_orientation(fh_opp, uv);
        }

        let tf = self.tf.transition(heh);
        let uv_opp = tf.transform_point(uv_pos);

        // Directions in the first chart.
        {
            let heh_prev = mesh.prev(heh);
            let p1 = uv_point(uv, heh);
            let p0 = uv_point(uv, heh_prev);

            let mut middle = 0usize;
            for dir in cartesian_directions() {
                let to_uv = uv_pos + dir;
                let path_ori = Triangle2::new(p0, p1, to_uv).orientation();

                if path_ori == ori {
                    les.push(LocalEdgeInfo::new(fh, uv_pos, to_uv));
                } else if path_ori == Orientation::Zero {
                    // Collinear with the edge: keep the direction running
                    // with the halfedge, or both on a mesh boundary.
                    if dir.dot(&(p1 - p0)) > 0.0 || !fh_opp.is_valid() {
                        les.push(LocalEdgeInfo::new(fh, uv_pos, to_uv));
                    } else {
                        middle = les.len();
                    }
                } else {
                    middle = les.len();
                }
            }
            // A rejection inside the run splits it; rotate the valid tail to
            // the front so the cyclic order is contiguous.
            if middle > 0 && middle < les.len() {
                les.rotate_left(middle);
            }
            if ori == Orientation::Negative {
                les.reverse();
            }
        }

        // Directions in the opposite chart.
        if fh_opp.is_valid() {
            let heh_prev = mesh.prev(heh_opp);
            let p1 = uv_point(uv, heh_opp);
            let p0 = uv_point(uv, heh_prev);

            let le_ofs = les.len();
            let mut middle = 0usize;
            for dir in cartesian_directions() {
                let to_uv = tf.transform_point(uv_pos + dir);
                let trans_dir = to_uv - uv_opp;

                let path_ori = Triangle2::new(p0, p1, to_uv).orientation();
                if path_ori == ori_opp
                    || (path_ori == Orientation::Zero && trans_dir.dot(&(p1 - p0)) > 0.0)
                {
                    les.push(LocalEdgeInfo::new(fh_opp, uv_opp, to_uv));
                } else {
                    middle = les.len();
                }
            }
            if middle > le_ofs && middle < les.len() {
                les[le_ofs..].rotate_left(middle - le_ofs);
            }
            if ori_opp == Orientation::Negative {
                les[le_ofs..].reverse();
            }
        }

        (les, is_boundary)
    }

    /// Slots of an on-vertex grid vertex: walk the incoming half-edges in
    /// CCW order, test the directions against each sector with exact
    /// predicates, and estimate the expected slot count from the signed
    /// angle sum unless external valences override it.
    fn vertex_local_edges(
        &self,
        anchor: HalfEdgeId<I>,
        uv: &[f64],
        external_valences: Option<&[u32]>,
    ) -> (Vec<LocalEdgeInfo<I>>, bool, i32) {
        let mesh = self.mesh;
        let mut les: Vec<LocalEdgeInfo<I>> = Vec::with_capacity(4);
        let mut is_boundary = false;

        if !anchor.is_valid() || mesh.is_boundary_halfedge(anchor) {
            return (les, is_boundary, 0);
        }
        let vh = mesh.dest(anchor);
        if mesh.is_boundary_vertex(vh) {
            is_boundary = true;
        }

        let mut initial_neg_angle_sum = 0.0f64;
        let mut pos_angle_sum = 0.0f64;
        let mut neg_angle_sum = 0.0f64;

        for heh in mesh.incoming_halfedges_ccw(vh) {
            if mesh.is_boundary_halfedge(heh) {
                continue;
            }
            let heh1 = mesh.next(heh);
            let heh2 = mesh.next(heh1);
            let uv0 = uv_point(uv, heh);
            let uv1 = uv_point(uv, heh1);
            let uv2 = uv_point(uv, heh2);

            let sector_left = uv2 - uv0;
            let sector_right = uv1 - uv0;
            let orientation = Triangle2::new(uv0, uv1, uv2).orientation();

            let angle = || {
                (sector_left.dot(&sector_right) / (sector_left.norm() * sector_right.norm()))
                    .acos()
            };
            match orientation {
                Orientation::Positive => {
                    // A positive sector ends any run of reversed sectors,
                    // which contributes its complement.
                    if neg_angle_sum > 0.0 {
                        pos_angle_sum += 2.0 * PI - neg_angle_sum;
                        neg_angle_sum = 0.0;
                    }
                    pos_angle_sum += angle();
                }
                Orientation::Negative => {
                    if pos_angle_sum == 0.0 {
                        initial_neg_angle_sum += angle();
                    } else {
                        neg_angle_sum += angle();
                    }
                }
                Orientation::Zero => {}
            }

            let is_left_opp_boundary = mesh.is_boundary_halfedge(heh.twin());
            let fh = mesh.face_of(heh);

            let mut per_face: Vec<LocalEdgeInfo<I>> = Vec::with_capacity(4);
            let mut middle = 0usize;
            for dir in cartesian_directions() {
                let ori1 = orient2d_vec(sector_right, dir);
                let ori2 = orient2d_vec(dir, sector_left);

                if is_left_opp_boundary
                    && ori2 == Orientation::Zero
                    && dir.dot(&(uv2 - uv0)) > 0.0
                {
                    // On the left edge with no face beyond it.
                    per_face.push(LocalEdgeInfo::new(fh, uv0, uv0 + dir));
                } else if ori1 == Orientation::Zero && (uv1 - uv0).dot(&dir) > 0.0 {
                    // On the right edge.
                    per_face.push(LocalEdgeInfo::new(fh, uv0, uv0 + dir));
                } else if ori1 == orientation && ori2 == orientation {
                    // Strictly inside the sector.
                    per_face.push(LocalEdgeInfo::new(fh, uv0, uv0 + dir));
                } else {
                    middle = per_face.len();
                }
            }

            if middle > 0 && middle < per_face.len() {
                per_face.rotate_left(middle);
            }
            if orientation == Orientation::Negative {
                per_face.reverse();
            }
            les.extend(per_face);
        }

        if initial_neg_angle_sum > 0.0 || neg_angle_sum > 0.0 {
            neg_angle_sum += initial_neg_angle_sum;
            pos_angle_sum += 2.0 * PI - neg_angle_sum;
        }

        // The angle estimate is inexact; near-degenerate parameter triangles
        // can put it arbitrarily far off. External valences, when given,
        // override it.
        let expected = match external_valences {
            Some(valences) => valences[vh.index()] as i32,
            None => (pos_angle_sum / FRAC_PI_2).round() as i32,
        };
        let mut missing = expected - les.len() as i32;
        if is_boundary {
            missing = 0;
        }

        (les, is_boundary, missing)
    }
}
