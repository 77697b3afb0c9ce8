use crate::lattice::Lattice;
use model::geom::tet;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Vector3;

impl Lattice {
    /// Accumulates an external impulse hitting the lattice at `pt`.
    ///
    /// Loads belong to one world time step: the first call with a new `world_time` clears what
    /// earlier steps left behind. The impulse goes to the tetrahedron containing `pt`, or to every
    /// live tetrahedron of the grid cell when none does. Returns whether any touched tetrahedron
    /// now moves faster than gravity alone would make it, i.e. whether a structure check is due.
    pub fn add_impulse(
        &mut self,
        pt: &Vector3<f32>,
        impulse: &Vector3<f32>,
        momentum: &Vector3<f32>,
        gravity: &Vector3<f32>,
        world_time: f32,
    ) -> bool {
        if self.last_impulse_time != Some(world_time) {
            self.reset_impulses();
            self.last_impulse_time = Some(world_time);
        }
        let cell: Vec<u32> = {
            let grid = self.ensure_grid();
            grid.cell(grid.cell_of(pt)).to_vec()
        };
        let live: Vec<u32> = cell
            .into_iter()
            .filter(|&t| !self.tets[t as usize].is_removed())
            .collect();
        let hit = live.iter().copied().find(|&t| tet::contains(&self.tet_points(t), pt));
        let targets = match hit {
            Some(t) => vec![t],
            None => live,
        };
        if targets.is_empty() {
            trace!("Impulse at {:?} missed the lattice.", pt);
            return false;
        }

        let g2 = gravity.norm_squared();
        let mut due = false;
        for t in targets {
            let arm = pt - self.center(t);
            let tet = &mut self.tets[t as usize];
            tet.p_ext += impulse;
            tet.l_ext += momentum + arm.cross(impulse);
            let v2 = (tet.p_ext * tet.inv_mass).norm_squared();
            let w2 = (tet.inv_inertia * tet.l_ext).norm_squared() * tet.area;
            due |= g2 < v2.max(w2);
        }
        due
    }

    pub fn reset_impulses(&mut self) {
        for t in self.tets.iter_mut() {
            t.p_ext = Vector3::zeros();
            t.l_ext = Vector3::zeros();
        }
    }
}
