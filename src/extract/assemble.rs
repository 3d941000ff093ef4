//! Face assembly into the output polygon mesh.
//!
//! Grid vertices become output vertices one to one. Faces are found by
//! walking cycles through the connection graph: follow a slot to its peer,
//! then continue with the peer's cyclically previous slot. Cycles of length
//! three or more are realized through a manifold-safe `add_face` that
//! refuses any configuration which would attach a half-edge to a second
//! face, and per-halfedge integer UVs are stamped in the face's starting
//! chart. A post-pass classifies boundary loops and drops isolated
//! vertices.

use nalgebra::Vector2;

use crate::mesh::{MeshIndex, PolyMeshOps};

use super::gvertex::LeiState;
use super::transition::TransitionFunction;
use super::MeshExtractor;

/// Safety bound on the valence of an assembled face.
const MAX_FACE_VALENCE: usize = 100;

/// Safety bound when walking output boundary loops.
const MAX_BOUNDARY_LENGTH: usize = 100_000;

impl<'a, I: MeshIndex> MeshExtractor<'a, I> {
    /// Walk all face cycles, realize them in `out`, stamp per-halfedge UVs,
    /// then classify holes and drop isolated vertices. Returns the UV
    /// annotations indexed by output halfedge.
    pub(crate) fn generate_faces<M: PolyMeshOps>(&mut self, out: &mut M) -> Vec<Vector2<i32>> {
        out.clear();
        let mut halfedge_uvs: Vec<Vector2<i32>> = Vec::new();

        // One output vertex per gvertex, tagged when on the boundary.
        for gv in &self.gvertices {
            let v = out.add_vertex(gv.position_3d);
            out.set_tagged(v, gv.is_boundary);
        }

        for i in 0..self.gvertices.len() {
            for j in 0..self.gvertices[i].local_edges.len() {
                if self.gvertices[i].local_edges[j].face_constructed {
                    continue;
                }
                self.assemble_cycle_from(i, j, out, &mut halfedge_uvs);
            }
        }

        self.classify_boundaries_and_cleanup(out);
        halfedge_uvs
    }

    /// Walk one turn-right cycle starting at slot `j` of gvertex `i` and
    /// realize it if it closes.
    fn assemble_cycle_from<M: PolyMeshOps>(
        &mut self,
        i: usize,
        j: usize,
        out: &mut M,
        halfedge_uvs: &mut Vec<Vector2<i32>>,
    ) {
        let mut face_vertices: Vec<usize> = Vec::new();
        let mut cycle: Vec<(usize, usize)> = Vec::new();

        let mut cur_gv = i;
        let mut cur_ori = j as isize;
        for _ in 0..MAX_FACE_VALENCE {
            if cur_gv == i && !face_vertices.is_empty() {
                // Cycle closed.
                if face_vertices.len() > 2 {
                    match self.add_face(out, &cycle) {
                        Some(fh) => {
                            self.transfer_halfedge_uvs(out, fh, &face_vertices, &cycle, halfedge_uvs);
                        }
                        None => {
                            log::warn!(
                                "skipping face at gvertex {}: would create a non-manifold \
                                 configuration (may leave a hole)",
                                i
                            );
                            self.stats.skipped_faces += 1;
                        }
                    }
                }
                return;
            }

            let li = self.gvertices[cur_gv].local_edge_index(cur_ori);
            if self.gvertices[cur_gv].local_edges[li].face_constructed {
                // Entered a halfedge of an already constructed face; happens
                // on incomplete boundaries and degeneracies.
                return;
            }

            face_vertices.push(cur_gv);
            self.gvertices[cur_gv].local_edges[li].face_constructed = true;
            cycle.push((cur_gv, li));

            match self.gvertices[cur_gv].local_edges[li].state {
                LeiState::Connected { gv, lei } => {
                    cur_gv = gv;
                    // Turn right: continue with the peer's previous slot.
                    cur_ori = lei as isize - 1;
                }
                _ => return,
            }
        }
    }

    /// Starting from `start + dir`, step around the gvertex until a
    /// connected slot with an assigned output halfedge is found; a full lap
    /// lands back on `start` itself.
    fn next_connected_lei_with_he(
        &self,
        gv: usize,
        start: usize,
        dir: isize,
    ) -> (usize, usize) {
        let n = self.gvertices[gv].local_edges.len();
        let mut idx = start as isize;
        for _ in 0..n {
            idx += dir;
            let li = self.gvertices[gv].local_edge_index(idx);
            if li == start {
                break;
            }
            let le = &self.gvertices[gv].local_edges[li];
            if le.state.is_connected() && le.halfedge_index.is_some() {
                return (gv, li);
            }
        }
        (gv, start)
    }

    /// The reciprocal slot of a connected slot.
    fn reciprocal(&self, gv: usize, lei: usize) -> Option<(usize, usize)> {
        self.gvertices[gv].local_edges[lei].state.connected()
    }

    /// Manifold-safe face creation from a closed slot cycle. Returns the new
    /// face, or None when attaching it would make the mesh non-manifold.
    fn add_face<M: PolyMeshOps>(&mut self, out: &mut M, cycle: &[(usize, usize)]) -> Option<usize> {
        debug_assert!(!cycle.is_empty());

        // Check that the operation yields a manifold result: none of the
        // halfedges we are about to claim, nor the boundary halfedges we
        // would link new edges into, may already carry a face.
        for &(g, l) in cycle {
            let hei = self.gvertices[g].local_edges[l].halfedge_index;
            if let Some(he) = hei {
                if out.face_of_halfedge(he).is_some() {
                    return None;
                }
            }
            if hei.is_none() {
                let (next_g, next_l) = self.next_connected_lei_with_he(g, l, -1);
                if let Some(he) = self.gvertices[next_g].local_edges[next_l].halfedge_index {
                    if out.face_of_halfedge(he).is_some() {
                        return None;
                    }
                }
                let (pg, pl) = self.reciprocal(g, l)?;
                let (prev_og, prev_ol) = self.next_connected_lei_with_he(pg, pl, 1);
                if let Some((rg, rl)) = self.reciprocal(prev_og, prev_ol) {
                    if let Some(he) = self.gvertices[rg].local_edges[rl].halfedge_index {
                        if out.face_of_halfedge(he).is_some() {
                            return None;
                        }
                    }
                }
            }
        }

        let new_fh = out.new_face();

        for (k, &(g, l)) in cycle.iter().enumerate() {
            let heh0 = match self.gvertices[g].local_edges[l].halfedge_index {
                Some(he) => he,
                None => {
                    let (pg, pl) = self
                        .reciprocal(g, l)
                        .expect("cycle slots are connected");
                    // The new edge runs from this gvertex to its peer.
                    let heh0 = out.new_edge(g, pg);
                    let heh1 = out.opposite_halfedge(heh0);

                    if out.halfedge_of_vertex(g).is_none() {
                        out.set_halfedge_of_vertex(g, heh0);
                    }
                    if out.halfedge_of_vertex(pg).is_none() {
                        out.set_halfedge_of_vertex(pg, heh1);
                    }

                    self.gvertices[g].local_edges[l].halfedge_index = Some(heh0);
                    self.gvertices[pg].local_edges[pl].halfedge_index = Some(heh1);

                    // Chain the opposite halfedge into the open boundary on
                    // both ends so the boundary stays a closed loop.
                    let (ng, nl) = self.next_connected_lei_with_he(g, l, -1);
                    if let Some(next_he) = self.gvertices[ng].local_edges[nl].halfedge_index {
                        out.set_next_halfedge(heh1, next_he);
                    }
                    let (pog, pol) = self.next_connected_lei_with_he(pg, pl, 1);
                    if let Some((rg, rl)) = self.reciprocal(pog, pol) {
                        if let Some(prev_he) = self.gvertices[rg].local_edges[rl].halfedge_index {
                            out.set_next_halfedge(prev_he, heh1);
                        }
                    }

                    heh0
                }
            };

            if k == 0 {
                out.set_halfedge_of_face(new_fh, heh0);
            }
            out.set_face_of_halfedge(heh0, new_fh);
        }

        // Close the interior next-chain of the face.
        let first_he = self.gvertices[cycle[0].0].local_edges[cycle[0].1]
            .halfedge_index
            .expect("assigned above");
        let last_he = self.gvertices[cycle[cycle.len() - 1].0].local_edges
            [cycle[cycle.len() - 1].1]
            .halfedge_index
            .expect("assigned above");
        out.set_next_halfedge(last_he, first_he);
        out.set_face_of_halfedge(first_he, new_fh);
        for w in cycle.windows(2) {
            let he_a = self.gvertices[w[0].0].local_edges[w[0].1]
                .halfedge_index
                .expect("assigned above");
            let he_b = self.gvertices[w[1].0].local_edges[w[1].1]
                .halfedge_index
                .expect("assigned above");
            out.set_next_halfedge(he_a, he_b);
            out.set_face_of_halfedge(he_b, new_fh);
        }

        for &(g, l) in cycle {
            if let Some((pg, _)) = self.reciprocal(g, l) {
                out.adjust_outgoing_halfedge(pg);
            }
        }

        Some(new_fh)
    }

    /// Stamp the integer UV of every halfedge of a freshly created face, in
    /// the chart the face walk started in.
    fn transfer_halfedge_uvs<M: PolyMeshOps>(
        &self,
        out: &M,
        fh: usize,
        face_vertices: &[usize],
        cycle: &[(usize, usize)],
        halfedge_uvs: &mut Vec<Vector2<i32>>,
    ) {
        // Find the face halfedge that starts at the first cycle vertex.
        let Some(start_he) = out.halfedge_of_face(fh) else {
            return;
        };
        let mut fhi = start_he;
        let mut found = false;
        for _ in 0..MAX_FACE_VALENCE {
            let from = out.to_vertex(out.opposite_halfedge(fhi));
            if from == face_vertices[0] {
                found = true;
                break;
            }
            fhi = match out.next_halfedge(fhi) {
                Some(h) => h,
                None => break,
            };
        }
        if !found {
            log::error!("uv transfer: face misses its expected starting vertex");
            return;
        }

        let mut accumulated_face_tf = TransitionFunction::IDENTITY;
        let mut last: Option<(usize, usize)> = None;

        for &(g, l) in cycle {
            // Intra-vertex transition at the pivot between the previous
            // slot's landing chart and this slot's source chart.
            let mut intra_vertex_tf = TransitionFunction::IDENTITY;
            if let Some((lg, ll)) = last {
                let (pg, pl) = self.gvertices[lg].local_edges[ll]
                    .state
                    .connected()
                    .expect("cycle slots are connected");
                debug_assert_eq!(pg, g);
                let last_opp_fh = self.gvertices[pg].local_edges[pl].fh_from;
                let cur_fh = self.gvertices[g].local_edges[l].fh_from;
                let anchor_fh = self.mesh.face_of(self.gvertices[pg].anchor_he);
                intra_vertex_tf = self.intra_gv_transition(
                    last_opp_fh,
                    cur_fh,
                    &self.gvertices[pg],
                    (pg, pl) != (g, l),
                ) * self
                    .intra_gv_transition(last_opp_fh, anchor_fh, &self.gvertices[pg], true)
                    .inverse();
            }
            accumulated_face_tf = intra_vertex_tf * accumulated_face_tf;

            // uv_to lives in this slot's chart; pull it back into the face's
            // starting chart before stamping.
            let le = &self.gvertices[g].local_edges[l];
            let uv = accumulated_face_tf.inverse().transform_point(le.uv_to);
            if halfedge_uvs.len() <= fhi {
                halfedge_uvs.resize(out.num_halfedges(), Vector2::zeros());
            }
            halfedge_uvs[fhi] = Vector2::new(uv.x.round() as i32, uv.y.round() as i32);

            accumulated_face_tf = le.accumulated_tf * accumulated_face_tf;
            last = Some((g, l));
            fhi = match out.next_halfedge(fhi) {
                Some(h) => h,
                None => return,
            };
        }
    }

    /// Classify boundary loops of the output (desired holes contain a
    /// tagged vertex), then delete isolated vertices and compact.
    fn classify_boundaries_and_cleanup<M: PolyMeshOps>(&mut self, out: &mut M) {
        let mut visited = vec![false; out.num_vertices()];
        let mut isolated_removed = 0usize;

        for v in 0..out.num_vertices() {
            if !out.is_deleted(v) && out.is_boundary_vertex(v) && !out.tagged(v) && !visited[v] {
                if let Some(start) = out.halfedge_of_vertex(v) {
                    let mut boundary: Vec<usize> = Vec::new();
                    let mut found_tagged = false;

                    let mut heh = start;
                    for _ in 0..MAX_BOUNDARY_LENGTH {
                        let cur_vh = out.to_vertex(heh);
                        visited[cur_vh] = true;
                        boundary.push(cur_vh);
                        if out.tagged(cur_vh) {
                            found_tagged = true;
                        }
                        heh = match out.next_halfedge(heh) {
                            Some(h) => h,
                            None => break,
                        };
                        if heh == start {
                            break;
                        }
                    }

                    if found_tagged {
                        // A hole the input boundary asked for: tag the whole
                        // loop so it is not counted again.
                        self.stats.desired_holes += 1;
                        for b in boundary {
                            out.set_tagged(b, true);
                        }
                    } else {
                        self.stats.undesired_holes += 1;
                    }
                }
            }

            if !out.is_deleted(v) && out.valence(v) == 0 {
                out.delete_vertex(v);
                isolated_removed += 1;
            }
        }

        self.stats.isolated_vertices_removed = isolated_removed;
        if isolated_removed > 0 {
            out.garbage_collection();
        }
    }
}
