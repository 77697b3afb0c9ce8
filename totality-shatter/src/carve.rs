use crate::{
    flags::{TetFlag, VtxFlag},
    lattice::Lattice,
};
use model::{
    geom::{tet, Geom},
    AffineTransform,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CarveReport {
    pub tets_visited: usize,
    pub vertices_removed: usize,
    pub tets_weakened: usize,
    pub tets_removed: usize,
}

/// Bit `k` set when vertex `k` of a tetrahedron is still present.
fn alive_mask(lattice: &Lattice, vertices: &[u32; 4], gone: &[VtxFlag]) -> u8 {
    (0..4)
        .filter(|&k| !lattice.verts[vertices[k] as usize].flags.any(gone))
        .fold(0, |m, k| m | 1 << k)
}

impl Lattice {
    /// Carves `geom` out of the lattice.
    ///
    /// Vertices inside the geometry are removed. Every face loses strength in proportion to the
    /// vertices it lost, and tetrahedra left without vertices are removed. Tetrahedra in the core
    /// of the cut additionally lose mass and strength in proportion to the volume taken out.
    pub fn subtract(
        &mut self,
        geom: &dyn Geom,
        own_pose: &AffineTransform,
        geom_pose: &AffineTransform,
    ) -> CarveReport {
        let bbox = geom.bbox().transformed(geom_pose, own_pose);
        let to_geom = own_pose.relative_to(geom_pose);
        let center = geom_pose.relative_to(own_pose).apply(&geom.center());
        let rel_scale = geom_pose.scale / own_pose.scale;
        let cut_volume = geom.volume() * rel_scale.powi(3);

        let candidates: Vec<u32> = {
            let grid = self.ensure_grid();
            grid.tets_in(grid.range_of_box(&bbox)).collect()
        };
        let mut report = CarveReport::default();
        let mut vtx_head: Option<u32> = None;
        let mut tet_head: Option<u32> = None;

        for t in candidates {
            let ti = t as usize;
            if self.tets[ti].flags.any(&[TetFlag::Removed, TetFlag::Processed]) {
                continue;
            }
            self.tets[ti].flags.insert(TetFlag::Processed);
            self.tets[ti].next = tet_head;
            tet_head = Some(t);
            report.tets_visited += 1;

            let vs = self.tets[ti].vertices;
            let before = alive_mask(self, &vs, &[VtxFlag::Removed]);
            for v in vs {
                let vert = &mut self.verts[v as usize];
                if vert.flags.any(&[VtxFlag::Removed, VtxFlag::Processed]) {
                    continue;
                }
                if bbox.contains(&vert.pos) && geom.point_inside(&to_geom.apply(&vert.pos)) {
                    vert.flags.insert(VtxFlag::RemovedNew);
                    report.vertices_removed += 1;
                }
                vert.flags.insert(VtxFlag::Processed);
                vert.next = vtx_head;
                vtx_head = Some(v);
            }
            let after = alive_mask(self, &vs, &[VtxFlag::Removed, VtxFlag::RemovedNew]);

            let pts = self.tet_points(t);
            let core = tet::contains(&pts, &center) || geom.point_inside(&to_geom.apply(&tet::centroid(&pts)));
            if core {
                let tet = &mut self.tets[ti];
                let frac = 1. - (cut_volume * 0.7 * tet.inv_volume).clamp(0.1, 0.9);
                tet.mass *= frac;
                tet.inv_mass /= frac;
                tet.inv_volume /= frac;
                tet.inv_inertia /= frac;
                for j in 0..4 {
                    self.scale_face(t, j, frac);
                }
                report.tets_weakened += 1;
            }

            if before != after {
                let tet = &mut self.tets[ti];
                for j in 0..4 {
                    let others = !(1u8 << j);
                    let had = (before & others).count_ones();
                    let has = (after & others).count_ones();
                    tet.strength[j] *= if had == 0 { 0. } else { has as f32 / had as f32 };
                }
            }
            if after == 0 {
                self.remove_tet(t);
                report.tets_removed += 1;
            }
        }

        while let Some(v) = vtx_head {
            let vert = &mut self.verts[v as usize];
            if vert.flags.contains(VtxFlag::RemovedNew) {
                vert.flags.remove(VtxFlag::RemovedNew);
                vert.flags.insert(VtxFlag::Removed);
            }
            vert.flags.remove(VtxFlag::Processed);
            vtx_head = vert.next.take();
        }
        while let Some(t) = tet_head {
            let tet = &mut self.tets[t as usize];
            tet.flags.remove(TetFlag::Processed);
            tet_head = tet.next.take();
        }

        debug!("Carved lattice: {:?}", report);
        report
    }
}
