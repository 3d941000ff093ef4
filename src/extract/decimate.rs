//! Degenerate-edge decimation in UV space.
//!
//! Edges whose two end corners coincide in the parameterization have zero
//! extent on the integer grid; tracing across them is meaningless. The
//! decimator marks such edges as collapsed so the tracer can signal a
//! degeneracy instead of walking through, and aligns the opposite chart's
//! corners so both sides agree the edge has zero extent. It runs twice per
//! extraction: once on the raw coordinates and once after truncation, which
//! can newly collapse edges by snapping nearly equal corners together.

use crate::mesh::{MeshIndex, TriMesh};

/// Marks UV-degenerate edges across repeated decimation passes.
#[derive(Debug, Clone)]
pub struct Decimator {
    collapsed: Vec<bool>,
}

impl Decimator {
    /// A decimator for a mesh with `num_edges` edges, nothing collapsed yet.
    pub fn new(num_edges: usize) -> Decimator {
        Decimator {
            collapsed: vec![false; num_edges],
        }
    }

    /// Collapse marks per edge.
    pub fn collapsed(&self) -> &[bool] {
        &self.collapsed
    }

    /// Scan for UV-degenerate edges; returns true if any edge was newly
    /// marked. `uv` is adjusted so the opposite chart of a collapsed edge is
    /// degenerate as well.
    pub fn decimate<I: MeshIndex>(&mut self, mesh: &TriMesh<I>, uv: &mut [f64]) -> bool {
        let mut any = false;

        for e in mesh.edge_ids() {
            if self.collapsed[e.index()] {
                continue;
            }
            // Representative half-edge: the non-boundary side when possible.
            let mut he = e.halfedge(0);
            if mesh.is_boundary_halfedge(he) {
                he = e.halfedge(1);
            }
            if mesh.is_boundary_halfedge(he) {
                continue;
            }

            let head = he.index();
            let tail = mesh.prev(he).index();
            if uv[2 * head] == uv[2 * tail] && uv[2 * head + 1] == uv[2 * tail + 1] {
                self.collapsed[e.index()] = true;
                any = true;

                let opp = he.twin();
                if !mesh.is_boundary_halfedge(opp) {
                    let o_head = opp.index();
                    let o_tail = mesh.prev(opp).index();
                    uv[2 * o_head] = uv[2 * o_tail];
                    uv[2 * o_head + 1] = uv[2 * o_tail + 1];
                }
            }
        }

        if any {
            log::debug!(
                "decimator: {} collapsed edges",
                self.collapsed.iter().filter(|&&c| c).count()
            );
        }
        any
    }
}
