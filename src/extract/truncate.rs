//! Consistent truncation of UV coordinates.
//!
//! Downstream stages compare UV coordinates with exact equality and exact
//! predicates, which is only meaningful once sub-ULP noise has been removed
//! and the per-chart copies of each vertex corner agree exactly up to the
//! edge transitions. This pass snaps near-integer feature boundaries, clears
//! the low-order bits of one anchor corner per vertex, pins singular
//! vertices to the unique fixed point of their vertex transition, and then
//! propagates the anchor value around the one-ring through the transitions.
//!
//! The pass is idempotent: applying it twice yields the same coordinates as
//! applying it once.

use crate::mesh::{MeshIndex, TriMesh};

use super::transition::{TransitionFunction, TransitionTable};

/// Boundary snap tolerance for selected/feature edges.
const SNAP_TOLERANCE: f64 = 1e-4;

/// Issues observed while canonicalizing, for the extraction stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncationReport {
    /// Interior vertices whose vertex transition has no rotation but a
    /// translation too large to be consistent.
    pub inconsistent_transitions: usize,
    /// Vertices adjacent to more than one boundary.
    pub multi_boundary_vertices: usize,
}

/// Canonicalize `uv` in place. See the module docs for the four stages.
pub fn consistent_truncation<I: MeshIndex>(
    mesh: &TriMesh<I>,
    table: &TransitionTable,
    uv: &mut [f64],
) -> TruncationReport {
    let mut report = TruncationReport::default();

    // Snap near-integer coordinates on selected/feature boundary edges.
    for e in mesh.edge_ids() {
        if !mesh.is_boundary_edge(e) {
            continue;
        }
        let status = mesh.edge_status(e);
        if !(status.selected || status.feature) {
            continue;
        }
        let h0 = e.halfedge(0).index();
        let h1 = e.halfedge(1).index();
        for axis in 0..2 {
            let a = uv[2 * h0 + axis];
            let b = uv[2 * h1 + axis];
            if (a - a.round()).abs() < SNAP_TOLERANCE && (b - b.round()).abs() < SNAP_TOLERANCE {
                uv[2 * h0 + axis] = a.round();
                uv[2 * h1 + axis] = b.round();
            }
        }
    }

    for v in mesh.vertex_ids() {
        // Magnitude bound over the one-ring: coordinates and transition
        // translations both contribute to the scale at which noise bits live.
        let mut max_u_abs: f64 = 0.0;
        let mut max_trans_abs: f64 = 0.0;
        for heh in mesh.incoming_halfedges(v) {
            if mesh.is_boundary_halfedge(heh) {
                continue;
            }
            max_u_abs = max_u_abs.max(uv[2 * heh.index()].abs());
            max_u_abs = max_u_abs.max(uv[2 * heh.index() + 1].abs());

            if !mesh.is_boundary_halfedge(heh.twin()) {
                let tf = table.edge_transition(heh.edge());
                max_trans_abs = max_trans_abs.max(tf.tu.abs() as f64);
                max_trans_abs = max_trans_abs.max(tf.tv.abs() as f64);
            }
        }

        let max_v = max_u_abs + max_trans_abs + 1.0;
        let shift = 2f64.powi(max_v.log2().ceil() as i32 + 1);

        let anchor = mesh.first_incoming(v);
        if !anchor.is_valid() {
            continue;
        }
        let a = anchor.index();

        // Adding and subtracting a power of two larger than the value forces
        // the bits below integer resolution to zero.
        uv[2 * a] += shift;
        uv[2 * a] -= shift;
        uv[2 * a + 1] += shift;
        uv[2 * a + 1] -= shift;

        // Singular interior vertices are pinned to the unique fixed point of
        // their vertex transition.
        let vtrans = table.vertex_transition(mesh, v);
        if !mesh.is_boundary_vertex(v) && !vtrans.is_identity() {
            let (tu, tv) = (vtrans.tu as f64, vtrans.tv as f64);
            match vtrans.r {
                1 => {
                    uv[2 * a] = (tu - tv) / 2.0;
                    uv[2 * a + 1] = (tu + tv) / 2.0;
                }
                2 => {
                    uv[2 * a] = tu / 2.0;
                    uv[2 * a + 1] = tv / 2.0;
                }
                3 => {
                    uv[2 * a] = (tu + tv) / 2.0;
                    uv[2 * a + 1] = (tv - tu) / 2.0;
                }
                _ => {
                    if vtrans.tu.abs() + vtrans.tv.abs() > 1 {
                        log::error!(
                            "inconsistent parameterization: vertex {:?} has a \
                             translation-only vertex transition ({}, {}, {})",
                            v,
                            vtrans.r,
                            vtrans.tu,
                            vtrans.tv
                        );
                        report.inconsistent_transitions += 1;
                    }
                }
            }
        }

        // Propagate the anchor value through the one-ring via the edge
        // transitions so all charts agree exactly.
        let mut u_cur = uv[2 * a];
        let mut v_cur = uv[2 * a + 1];
        let mut n_boundaries = 0usize;
        for heh_cur in mesh.incoming_halfedges(v).skip(1) {
            if mesh.is_boundary_halfedge(heh_cur) {
                n_boundaries += 1;
                continue;
            }
            let tf = table.transition(heh_cur.twin());
            let p = tf.transform_point(nalgebra::Point2::new(u_cur, v_cur));
            u_cur = p.x;
            v_cur = p.y;
            uv[2 * heh_cur.index()] = u_cur;
            uv[2 * heh_cur.index() + 1] = v_cur;
        }

        if n_boundaries > 1 {
            log::error!(
                "input triangle mesh has non-manifold vertex {:?} adjacent to \
                 more than one boundary",
                v
            );
            report.multi_boundary_vertices += 1;
        }
    }

    report
}

/// Recover the vertex transition's fixed point, for callers that need the
/// canonical UV of a singular vertex without mutating coordinates.
pub fn singular_fixed_point(vtrans: TransitionFunction) -> Option<nalgebra::Point2<f64>> {
    let (tu, tv) = (vtrans.tu as f64, vtrans.tv as f64);
    match vtrans.r {
        1 => Some(nalgebra::Point2::new((tu - tv) / 2.0, (tu + tv) / 2.0)),
        2 => Some(nalgebra::Point2::new(tu / 2.0, tv / 2.0)),
        3 => Some(nalgebra::Point2::new((tu + tv) / 2.0, (tv - tu) / 2.0)),
        _ => None,
    }
}
