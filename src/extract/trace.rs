//! Connector: straight-line tracing through the parameterization.
//!
//! Every unconnected local edge slot is one unit step in UV space. The
//! tracer marches that segment through the triangulation, crossing edges by
//! applying their transition functions, until the endpoint falls inside or
//! on the boundary of the current triangle; a matching slot of the grid
//! vertex found there is then connected reciprocally.

use nalgebra::Point2;

use crate::geom::{is_collinear, orient2d, Boundedness, Orientation, Segment2, Triangle2};
use crate::mesh::{FaceId, HalfEdgeId, MeshIndex};

use super::gvertex::{GridVertex, GridVertexKind, LeiState};
use super::transition::TransitionFunction;
use super::{ori_to_idx, ori_to_idx_inverse, uv_point, MeshExtractor};

/// Safety bound for one trace.
const MAX_WALK_ITERATIONS: usize = 100_000;

/// Result of tracing one local edge slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PathOutcome {
    /// Connection or signal.
    pub state: LeiState,
    /// Traced endpoint pulled back into the slot's own chart (only
    /// meaningful when connected).
    pub uv_to: Point2<f64>,
    /// Accumulated transition from the slot's chart to the peer's frame.
    pub tf: TransitionFunction,
}

impl PathOutcome {
    fn signal(state: LeiState) -> PathOutcome {
        PathOutcome {
            state,
            uv_to: Point2::origin(),
            tf: TransitionFunction::IDENTITY,
        }
    }

    fn error() -> PathOutcome {
        PathOutcome::signal(LeiState::NoConnection)
    }

    fn connected(gv: usize, lei: usize, uv_to: Point2<f64>, tf: TransitionFunction) -> PathOutcome {
        PathOutcome {
            state: LeiState::Connected { gv, lei },
            uv_to,
            tf,
        }
    }
}

impl<'a, I: MeshIndex> MeshExtractor<'a, I> {
    /// Trace every unconnected local edge slot and write the reciprocal
    /// connection into the peer it lands on.
    pub(crate) fn generate_connections(&mut self, uv: &[f64]) {
        for i in 0..self.gvertices.len() {
            for j in 0..self.gvertices[i].local_edges.len() {
                {
                    let lei = &self.gvertices[i].local_edges[j];
                    if lei.state != LeiState::Unconnected || !lei.fh_from.is_valid() {
                        continue;
                    }
                }

                let outcome = self.find_path(i, j, uv);

                {
                    let lei = &mut self.gvertices[i].local_edges[j];
                    lei.state = outcome.state;
                    if outcome.state.is_connected() {
                        lei.uv_to = outcome.uv_to;
                        lei.accumulated_tf = outcome.tf;
                    }
                }

                if outcome.state == LeiState::TracedIntoBoundary {
                    self.gvertices[i].is_boundary = true;
                }

                let Some((pg, pl)) = outcome.state.connected() else {
                    continue;
                };

                if self.gvertices[pg].local_edges[pl].state.is_connected() {
                    let peer = &self.gvertices[pg].local_edges[pl];
                    log::warn!(
                        "tracing from gvertex {} slot {} hit gvertex {} slot {}, \
                         which is already connected to {:?}; dropping the connection",
                        i,
                        j,
                        pg,
                        pl,
                        peer.state
                    );
                    self.gvertices[i].local_edges[j].state = LeiState::NoConnection;
                    self.stats.connection_conflicts += 1;
                    continue;
                }

                // The peer stores a transition that, composed with the
                // intra-gvertex transitions on both ends, returns into this
                // slot's frame.
                let peer_fh = self.gvertices[pg].local_edges[pl].fh_from;
                let peer_anchor_fh = self.mesh.face_of(self.gvertices[pg].anchor_he);
                let self_fh = self.gvertices[i].local_edges[j].fh_from;
                let self_anchor_fh = self.mesh.face_of(self.gvertices[i].anchor_he);

                let reverse_tf = self
                    .intra_gv_transition(peer_fh, peer_anchor_fh, &self.gvertices[pg], true)
                    .inverse()
                    * self.gvertices[i].local_edges[j].accumulated_tf
                    * self
                        .intra_gv_transition(self_fh, self_anchor_fh, &self.gvertices[i], true)
                        .inverse();
                let opposite_to = reverse_tf.transform_point(self.gvertices[i].position_uv);
                let reverse_tf = reverse_tf.inverse();
                self.gvertices[pg].local_edges[pl].complete(i, j, opposite_to, reverse_tf);
            }
        }
    }

    /// March one slot's unit segment through the triangulation.
    fn find_path(&self, gv_idx: usize, lei_idx: usize, uv: &[f64]) -> PathOutcome {
        let mesh = self.mesh;
        let gv = &self.gvertices[gv_idx];
        let lei = &gv.local_edges[lei_idx];

        let cur_fh = lei.fh_from;
        let mut uv_from = lei.uv_from;
        let mut uv_to = lei.uv_intended_to;

        let [heh0, heh1, heh2] = mesh.face_halfedges(cur_fh);
        let uv0 = uv_point(uv, heh0);
        let uv1 = uv_point(uv, heh1);
        let uv2 = uv_point(uv, heh2);
        let tri = Triangle2::new(uv0, uv1, uv2);
        let mut inverted = tri.orientation() == Orientation::Negative;
        let mut accumulated_tf = TransitionFunction::IDENTITY;

        // Start and endpoint in the same face: resolve locally.
        let bs = tri.boundedness(uv_to);
        if bs != Boundedness::Unbounded {
            return self.find_local_connection(
                uv_from, uv_to, &tri, heh0, heh1, heh2, bs, accumulated_tf, uv,
            );
        }

        // First step: choose the halfedge the path leaves through.
        let path = Segment2::new(uv_from, uv_to);
        let mut cur_heh: HalfEdgeId<I> = HalfEdgeId::invalid();
        match gv.kind {
            GridVertexKind::OnFace => {
                if path.intersects(&Segment2::new(uv2, uv0)) {
                    cur_heh = heh0;
                } else if path.intersects(&Segment2::new(uv0, uv1)) {
                    cur_heh = heh1;
                } else if path.intersects(&Segment2::new(uv1, uv2)) {
                    cur_heh = heh2;
                } else {
                    log::warn!(
                        "find_path: OnFace slot with endpoint outside its triangle \
                         intersects no edge (gvertex {}, slot {})",
                        gv_idx,
                        lei_idx
                    );
                    return PathOutcome::error();
                }
            }
            GridVertexKind::OnEdge => {
                cur_heh = gv.anchor_he;
                if mesh.is_boundary_halfedge(cur_heh) || mesh.face_of(cur_heh) != cur_fh {
                    cur_heh = cur_heh.twin();
                }
                debug_assert_eq!(mesh.face_of(cur_heh), cur_fh);

                let prev_heh = mesh.prev(cur_heh);
                let next_heh = mesh.next(cur_heh);
                let uv1l = uv_point(uv, cur_heh);
                let uv2l = uv_point(uv, next_heh);

                // The path leaves through one of the two non-incident edges.
                if path.intersects(&Segment2::new(uv1l, uv2l)) {
                    cur_heh = next_heh;
                } else {
                    cur_heh = prev_heh;
                }
            }
            GridVertexKind::OnVertex => {
                let vh = mesh.dest(gv.anchor_he);
                if mesh.dest(heh0) == vh {
                    cur_heh = heh2;
                } else if mesh.dest(heh1) == vh {
                    cur_heh = heh0;
                } else if mesh.dest(heh2) == vh {
                    cur_heh = heh1;
                } else {
                    log::error!(
                        "find_path: triangle {:?} does not contain the pivot vertex {:?}",
                        cur_fh,
                        vh
                    );
                    return PathOutcome::error();
                }
            }
        }

        if !cur_heh.is_valid() {
            log::warn!("find_path: invalid halfedge after initialization");
            return PathOutcome::error();
        }

        // Cross into the next face.
        if !self.edge_valid[cur_heh.edge().index()] {
            return PathOutcome::signal(LeiState::TracedIntoDegeneracy);
        }
        let tf = self.tf.transition(cur_heh);
        uv_from = tf.transform_point(uv_from);
        uv_to = tf.transform_point(uv_to);
        accumulated_tf = tf * accumulated_tf;
        let mut cur_heh = cur_heh.twin();

        for walk_iterations in 0..MAX_WALK_ITERATIONS {
            if mesh.is_boundary_halfedge(cur_heh) {
                return PathOutcome::signal(LeiState::TracedIntoBoundary);
            }

            let heh0 = cur_heh;
            let heh1 = mesh.next(heh0);
            let heh2 = mesh.next(heh1);
            let uv0 = uv_point(uv, heh0);
            let uv1 = uv_point(uv, heh1);
            let uv2 = uv_point(uv, heh2);
            let tri = Triangle2::new(uv0, uv1, uv2);
            let tri_ori = tri.orientation();

            if tri_ori == Orientation::Zero {
                if uv0 != uv1 && uv1 != uv2 && uv2 != uv0 {
                    log::error!("find_path: traced into a cap triangle");
                } else {
                    log::error!(
                        "find_path: traced across a point-degenerate edge that \
                         decimation should have removed"
                    );
                    return PathOutcome::signal(LeiState::TracedIntoDegeneracy);
                }
            }

            // Inside a fold the chart is mirrored; swapping the endpoints
            // keeps the exit-edge predicates meaningful.
            let currently_inverted = tri_ori == Orientation::Negative;
            if currently_inverted != inverted {
                inverted = currently_inverted;
                std::mem::swap(&mut uv_from, &mut uv_to);
            }

            let bs = tri.boundedness(uv_to);
            if bs != Boundedness::Unbounded {
                return self.find_local_connection(
                    uv_from, uv_to, &tri, heh0, heh1, heh2, bs, accumulated_tf, uv,
                );
            }

            let path = Segment2::new(uv_from, uv_to);
            let s1 = Segment2::new(uv0, uv1);
            let s2 = Segment2::new(uv2, uv1);
            let is1 = path.intersects(&s1);
            let is2 = path.intersects(&s2);

            let heh_upd: HalfEdgeId<I>;
            if is1 && !is2 {
                heh_upd = heh1;
            } else if !is1 && is2 {
                heh_upd = heh2;
            } else if is1 && is2 {
                // The path passes through a vertex of the triangle.
                let vis0 = path.has_on(uv0);
                let vis1 = path.has_on(uv1);
                let vis2 = path.has_on(uv2);

                if !vis0 && !vis1 && vis2 {
                    heh_upd = heh1;
                } else if vis0 && vis2 {
                    // Entered along cur_heh; the far vertex decides whether
                    // the continuation slides left or right of uv1.
                    if orient2d(path.source, path.target, uv1) == tri_ori {
                        heh_upd = heh1;
                    } else {
                        heh_upd = heh2;
                    }
                } else {
                    heh_upd = heh2;
                }
            } else {
                log::error!(
                    "find_path: path leaves triangle {:?} through no edge in step {} \
                     (path {:?} -> {:?}, triangle {:?} / {:?} / {:?}, orientation {:?})",
                    mesh.face_of(cur_heh),
                    walk_iterations,
                    path.source,
                    path.target,
                    uv0,
                    uv1,
                    uv2,
                    tri_ori
                );
                return PathOutcome::error();
            }

            if !self.edge_valid[heh_upd.edge().index()] {
                return PathOutcome::signal(LeiState::TracedIntoDegeneracy);
            }
            let tf = self.tf.transition(heh_upd);
            uv_from = tf.transform_point(uv_from);
            uv_to = tf.transform_point(uv_to);
            accumulated_tf = tf * accumulated_tf;
            cur_heh = heh_upd.twin();
        }

        log::error!(
            "find_path: iteration limit exceeded tracing from gvertex {} slot {} \
             ({:?}, uv {:?})",
            gv_idx,
            lei_idx,
            gv.kind,
            gv.position_uv
        );
        PathOutcome::error()
    }

    /// Resolve a trace whose endpoint lies inside or on the boundary of the
    /// current triangle.
    #[allow(clippy::too_many_arguments)]
    fn find_local_connection(
        &self,
        uv_from: Point2<f64>,
        uv_to: Point2<f64>,
        tri: &Triangle2,
        heh0: HalfEdgeId<I>,
        heh1: HalfEdgeId<I>,
        heh2: HalfEdgeId<I>,
        bs: Boundedness,
        accumulated_tf: TransitionFunction,
        uv: &[f64],
    ) -> PathOutcome {
        if tri.is_degenerate() {
            return PathOutcome::signal(LeiState::TracedIntoDegeneracy);
        }

        if bs == Boundedness::OnBoundedSide {
            // Strictly inside: the peer is an OnFace gvertex whose slot in
            // the back-direction matches the path endpoints swapped.
            let fh = self.mesh.face_of(heh0);
            let face_ori = self.triangle_uv_orientation(fh, uv);
            let dir = uv_from - uv_to;
            let ori_idx = if face_ori == Orientation::Negative {
                ori_to_idx_inverse(dir)
            } else {
                ori_to_idx(dir)
            };

            for &gvidx in &self.face_gvertices[fh.index()] {
                let le = &self.gvertices[gvidx].local_edges[ori_idx];
                if le.uv_intended_to == uv_from && le.uv_from == uv_to {
                    let to = accumulated_tf.inverse().transform_point(uv_to);
                    return PathOutcome::connected(gvidx, ori_idx, to, accumulated_tf);
                }
            }
        } else {
            // On the boundary: a vertex of the triangle, or the interior of
            // one of its edges.
            if uv_to == tri.vertex(0) {
                return self.find_local_connection_at_vertex(
                    uv_from, uv_to, heh0, tri, accumulated_tf,
                );
            } else if uv_to == tri.vertex(1) {
                let rot = Triangle2::new(tri.vertex(1), tri.vertex(2), tri.vertex(0));
                return self.find_local_connection_at_vertex(
                    uv_from, uv_to, heh1, &rot, accumulated_tf,
                );
            } else if uv_to == tri.vertex(2) {
                let rot = Triangle2::new(tri.vertex(2), tri.vertex(0), tri.vertex(1));
                return self.find_local_connection_at_vertex(
                    uv_from, uv_to, heh2, &rot, accumulated_tf,
                );
            } else if Segment2::new(tri.vertex(2), tri.vertex(0)).has_on(uv_to) {
                return self.find_local_connection_at_edge(
                    uv_from, uv_to, heh0, accumulated_tf,
                );
            } else if Segment2::new(tri.vertex(0), tri.vertex(1)).has_on(uv_to) {
                return self.find_local_connection_at_edge(
                    uv_from, uv_to, heh1, accumulated_tf,
                );
            } else if Segment2::new(tri.vertex(1), tri.vertex(2)).has_on(uv_to) {
                return self.find_local_connection_at_edge(
                    uv_from, uv_to, heh2, accumulated_tf,
                );
            }
        }

        log::warn!("find_local_connection did not find a matching slot");
        PathOutcome::error()
    }

    /// The endpoint lies in the interior of the edge of `heh`: search that
    /// edge's gvertices, matching in either incident chart.
    fn find_local_connection_at_edge(
        &self,
        uv_from: Point2<f64>,
        uv_to: Point2<f64>,
        heh: HalfEdgeId<I>,
        accumulated_tf: TransitionFunction,
    ) -> PathOutcome {
        let mesh = self.mesh;
        let eh = heh.edge();
        let fh = mesh.face_of(heh);

        let heh_opp = heh.twin();
        let mut fh_opp = FaceId::invalid();
        if !mesh.is_boundary_halfedge(heh_opp) {
            fh_opp = mesh.face_of(heh_opp);
        }

        let cross_edge_tf = self.tf.transition(heh);
        let uv_from_opp = cross_edge_tf.transform_point(uv_from);
        let uv_to_opp = cross_edge_tf.transform_point(uv_to);

        for &vidx in &self.edge_gvertices[eh.index()] {
            for (j, le) in self.gvertices[vidx].local_edges.iter().enumerate() {
                let matches_here =
                    le.fh_from == fh && le.uv_from == uv_to && le.uv_intended_to == uv_from;
                let matches_opp = le.fh_from == fh_opp
                    && le.uv_from == uv_to_opp
                    && le.uv_intended_to == uv_from_opp;
                if matches_here || matches_opp {
                    // Report endpoints in the chart the gvertex is anchored
                    // in, folding the edge crossing into the transition when
                    // the anchor sits on the opposite side.
                    if mesh.face_of(self.gvertices[vidx].anchor_he) == fh {
                        let to = accumulated_tf.inverse().transform_point(uv_to);
                        return PathOutcome::connected(vidx, j, to, accumulated_tf);
                    } else {
                        let acc = cross_edge_tf * accumulated_tf;
                        let to = acc.inverse().transform_point(uv_to_opp);
                        return PathOutcome::connected(vidx, j, to, acc);
                    }
                }
            }
        }

        PathOutcome::error()
    }

    /// The endpoint coincides with the vertex at the head of `heh`: search
    /// that vertex's gvertices. When the path runs along one of the vertex's
    /// rays, the matching slot may live in a fan-neighboring chart.
    fn find_local_connection_at_vertex(
        &self,
        uv_from: Point2<f64>,
        uv_to: Point2<f64>,
        heh: HalfEdgeId<I>,
        tri: &Triangle2,
        accumulated_tf: TransitionFunction,
    ) -> PathOutcome {
        // Conventions: heh points at the vertex carrying uv_to, and
        // tri.vertex(0) is that vertex's UV in the current chart.
        let mesh = self.mesh;
        let vh = mesh.dest(heh);

        let mut cand_fh = Vec::with_capacity(3);
        let mut cand_tf = Vec::with_capacity(3);
        let mut cand_from = Vec::with_capacity(3);
        let mut cand_to = Vec::with_capacity(3);

        cand_fh.push(mesh.face_of(heh));
        cand_tf.push(TransitionFunction::IDENTITY);
        cand_from.push(uv_from);
        cand_to.push(uv_to);

        // CCW neighbor across heh itself.
        if is_collinear(uv_from, uv_to, tri.vertex(2)) {
            let opp_heh = heh.twin();
            if !mesh.is_boundary_halfedge(opp_heh) {
                let tf = self.tf.transition(heh);
                cand_fh.push(mesh.face_of(opp_heh));
                cand_tf.push(tf);
                cand_from.push(tf.transform_point(uv_from));
                cand_to.push(tf.transform_point(uv_to));
            }
        }

        // CW neighbor across the next halfedge.
        if is_collinear(uv_from, uv_to, tri.vertex(1)) {
            let nheh = mesh.next(heh);
            let opp_nheh = nheh.twin();
            if !mesh.is_boundary_halfedge(opp_nheh) {
                let tf = self.tf.transition(nheh);
                cand_fh.push(mesh.face_of(opp_nheh));
                cand_tf.push(tf);
                cand_from.push(tf.transform_point(uv_from));
                cand_to.push(tf.transform_point(uv_to));
            }
        }

        for &vidx in &self.vertex_gvertices[vh.index()] {
            let gv = &self.gvertices[vidx];
            for (j, le) in gv.local_edges.iter().enumerate() {
                for k in 0..cand_fh.len() {
                    if cand_fh[k] == le.fh_from
                        && cand_from[k] == le.uv_intended_to
                        && cand_to[k] == le.uv_from
                    {
                        let anchor_fh = mesh.face_of(gv.anchor_he);
                        let intra = self.intra_gv_transition(cand_fh[k], anchor_fh, gv, true);
                        let acc = intra * cand_tf[k] * accumulated_tf;
                        let to = acc
                            .inverse()
                            .transform_point(intra.transform_point(cand_to[k]));
                        return PathOutcome::connected(vidx, j, to, acc);
                    }
                }
            }
        }

        PathOutcome::error()
    }

    /// Transition between two charts a grid vertex is seen from.
    ///
    /// One gvertex can be referenced from several incident triangles; this
    /// composes the edge transitions between them. With `identity_if_same`
    /// unset and `from_fh == to_fh`, the full loop around the gvertex is
    /// returned instead of identity.
    pub(crate) fn intra_gv_transition(
        &self,
        from_fh: FaceId<I>,
        to_fh: FaceId<I>,
        gv: &GridVertex<I>,
        identity_if_same: bool,
    ) -> TransitionFunction {
        if identity_if_same && from_fh == to_fh {
            return TransitionFunction::IDENTITY;
        }

        let mesh = self.mesh;
        match gv.kind {
            GridVertexKind::OnFace => TransitionFunction::IDENTITY,
            GridVertexKind::OnEdge => {
                let heh = gv.anchor_he;
                if mesh.face_of(heh) == from_fh {
                    let base = self.tf.transition(heh);
                    if from_fh == to_fh {
                        self.tf.transition(heh.twin()) * base
                    } else {
                        base
                    }
                } else if !mesh.is_boundary_halfedge(heh.twin())
                    && mesh.face_of(heh.twin()) == from_fh
                {
                    let base = self.tf.transition(heh.twin());
                    if from_fh == to_fh {
                        self.tf.transition(heh) * base
                    } else {
                        base
                    }
                } else {
                    log::error!(
                        "intra_gv_transition: edge gvertex anchor is not between \
                         faces {:?} and {:?}",
                        from_fh,
                        to_fh
                    );
                    TransitionFunction::IDENTITY
                }
            }
            GridVertexKind::OnVertex => {
                let pivot = mesh.dest(gv.anchor_he);
                let ring: Vec<HalfEdgeId<I>> = mesh.incoming_halfedges(pivot).collect();
                let Some(start) = ring.iter().position(|&h| mesh.face_of(h) == from_fh) else {
                    log::error!(
                        "intra_gv_transition: face {:?} not incident to pivot {:?}",
                        from_fh,
                        pivot
                    );
                    return TransitionFunction::IDENTITY;
                };

                let n = ring.len();
                let mut result = TransitionFunction::IDENTITY;
                for step in 0..n {
                    let h = ring[(start + step) % n];
                    result = self.tf.transition(mesh.next(h)) * result;
                    let h_next = ring[(start + step + 1) % n];
                    if mesh.face_of(h_next) == to_fh {
                        return result;
                    }
                }
                log::error!(
                    "intra_gv_transition: walk around {:?} never reached face {:?}",
                    pivot,
                    to_fh
                );
                result
            }
        }
    }
}
