//! Incomplete-fan repair.
//!
//! Straight tracing can miss expected slots at a grid vertex when the
//! parameter triangles are nearly degenerate or the fan is inconsistent.
//! The face-cycle walk recovers them: whenever a cycle through the
//! constructed graph comes back to the pivot's UV at a different,
//! unconnected grid vertex, a matched slot pair must exist there, and it is
//! inserted into both cyclic sequences.
//!
//! Insertions shift the positions of every following slot, so the
//! reciprocal indices stored by their peers are bumped first; all
//! references here are (gvertex, slot) index pairs, re-fetched after every
//! mutation.

use crate::mesh::MeshIndex;

use super::gvertex::{LeiState, LocalEdgeInfo};
use super::transition::TransitionFunction;
use super::MeshExtractor;

impl<'a, I: MeshIndex> MeshExtractor<'a, I> {
    /// Whether no slot of `gv1` connects to `gv2`.
    fn not_connected(&self, gv1: usize, gv2: usize) -> bool {
        !self.gvertices[gv1]
            .local_edges
            .iter()
            .any(|le| matches!(le.state, LeiState::Connected { gv, .. } if gv == gv2))
    }

    /// Bump the reciprocal index stored by the peer of every connected slot
    /// of `gv` at positions `from..`, ahead of an insertion at `from`.
    fn increment_reciprocal_indices(&mut self, gv: usize, from: usize) {
        for k in from..self.gvertices[gv].local_edges.len() {
            if let LeiState::Connected { gv: pg, lei: pl } = self.gvertices[gv].local_edges[k].state
            {
                if let LeiState::Connected { lei, .. } =
                    &mut self.gvertices[pg].local_edges[pl].state
                {
                    *lei += 1;
                }
            }
        }
    }

    /// Walk the face cycle of every slot of every gvertex with unmet
    /// expected valence, inserting matched slot pairs where a cycle closes
    /// at the pivot UV.
    pub(crate) fn try_connect_incomplete_gvertices(&mut self) {
        for start_gv in 0..self.gvertices.len() {
            if self.gvertices[start_gv].missing_leis == 0 {
                continue;
            }

            // The slot list grows while we iterate; the length is
            // re-evaluated on purpose.
            let mut j = 0;
            while j < self.gvertices[start_gv].local_edges.len() {
                self.repair_cycle_from(start_gv, j);
                j += 1;
            }
        }
    }

    /// One face-cycle walk starting at slot `j` of `start_gv`.
    fn repair_cycle_from(&mut self, start_gv: usize, j: usize) {
        let insert_pos = j + 1;
        // The slot that will cyclically follow the inserted one; captured
        // before any insertion.
        let final_idx = self.gvertices[start_gv].local_edge_index(j as isize + 1);
        let final_fh = self.gvertices[start_gv].local_edges[final_idx].fh_from;
        let final_is_start = final_idx == j;

        let mut cur_gv = start_gv;
        let mut cur_lei = j;
        let mut accumulated_tf = TransitionFunction::IDENTITY;
        let pivot_uv = self.gvertices[start_gv].local_edges[j].uv_from;
        let mut edge_created = false;

        loop {
            let Some((next_gv, next_in_idx)) =
                self.gvertices[cur_gv].local_edges[cur_lei].state.connected()
            else {
                break;
            };
            let mut next_out_idx =
                self.gvertices[next_gv].local_edge_index(next_in_idx as isize - 1);

            // The slot's own portion of the transition applies now; the
            // intra-gvertex portion at the pivot applies after the test.
            accumulated_tf =
                self.gvertices[cur_gv].local_edges[cur_lei].accumulated_tf * accumulated_tf;

            let next_in_fh = self.gvertices[next_gv].local_edges[next_in_idx].fh_from;
            let next_out_fh = self.gvertices[next_gv].local_edges[next_out_idx].fh_from;
            let next_anchor_fh = self.mesh.face_of(self.gvertices[next_gv].anchor_he);
            let intra_face_tf = self.intra_gv_transition(
                next_in_fh,
                next_out_fh,
                &self.gvertices[next_gv],
                next_in_idx != next_out_idx,
            ) * self
                .intra_gv_transition(next_in_fh, next_anchor_fh, &self.gvertices[next_gv], true)
                .inverse();

            // The reached gvertex's UV, transformed back into the pivot's
            // chart.
            let next_uv = (intra_face_tf * accumulated_tf)
                .inverse()
                .transform_point(self.gvertices[next_gv].local_edges[next_out_idx].uv_from);

            if !edge_created
                && next_uv == pivot_uv
                && next_gv != start_gv
                && self.not_connected(next_gv, start_gv)
            {
                let start_fh = self.gvertices[start_gv].local_edges[j].fh_from;
                let start_uv_from = self.gvertices[start_gv].local_edges[j].uv_from;
                let start_anchor_fh = self.mesh.face_of(self.gvertices[start_gv].anchor_he);
                let next_in_uv_from = self.gvertices[next_gv].local_edges[next_in_idx].uv_from;

                let new_incoming_tf = (self.intra_gv_transition(
                    final_fh,
                    start_fh,
                    &self.gvertices[start_gv],
                    true,
                ) * self
                    .intra_gv_transition(
                        final_fh,
                        start_fh,
                        &self.gvertices[start_gv],
                        !final_is_start,
                    )
                    .inverse()
                    * accumulated_tf.inverse())
                .inverse();
                let new_outgoing_tf = (self
                    .intra_gv_transition(
                        next_in_fh,
                        next_anchor_fh,
                        &self.gvertices[next_gv],
                        true,
                    )
                    .inverse()
                    * accumulated_tf
                    * self
                        .intra_gv_transition(
                            start_fh,
                            start_anchor_fh,
                            &self.gvertices[start_gv],
                            true,
                        )
                        .inverse())
                .inverse();

                // Fix reciprocal indices of everything that shifts, then
                // insert the new pair.
                self.increment_reciprocal_indices(start_gv, insert_pos);
                self.increment_reciprocal_indices(next_gv, next_in_idx);

                self.gvertices[start_gv].local_edges.insert(
                    insert_pos,
                    LocalEdgeInfo::new(start_fh, start_uv_from, start_uv_from),
                );
                self.gvertices[next_gv].local_edges.insert(
                    next_in_idx,
                    LocalEdgeInfo::new(next_in_fh, next_in_uv_from, next_in_uv_from),
                );

                // The inserted slot in next_gv sits at the old incoming
                // position; the old incoming slot moved up by one.
                let new_outgoing_idx = next_in_idx;

                self.gvertices[start_gv].local_edges[insert_pos].complete(
                    next_gv,
                    new_outgoing_idx,
                    start_uv_from,
                    new_incoming_tf,
                );
                self.gvertices[next_gv].local_edges[new_outgoing_idx].complete(
                    start_gv,
                    insert_pos,
                    next_in_uv_from,
                    new_outgoing_tf,
                );

                log::debug!(
                    "fan repair: inserted slot pair between gvertices {} and {}",
                    start_gv,
                    next_gv
                );
                self.stats.repaired_slot_pairs += 1;

                // Continue the walk along the newly created connection.
                next_out_idx = new_outgoing_idx;
                edge_created = true;
            }

            accumulated_tf = intra_face_tf * accumulated_tf;

            cur_gv = next_gv;
            cur_lei = next_out_idx;
            if cur_gv == start_gv {
                break;
            }
        }
    }
}
