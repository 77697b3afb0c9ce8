use crate::{lattice::Lattice, remap::IndexRemap};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

impl Lattice {
    /// Compacts the tetrahedron array once the removed share passes the configured threshold.
    /// Returns whether it did.
    pub fn defragment(&mut self) -> bool {
        let limit = self.tets.len() as f32 * self.config.defragment_threshold;
        if self.n_removed as f32 <= limit {
            return false;
        }
        self.compact();
        true
    }

    /// Drops every removed tetrahedron and renumbers the survivors in their original order.
    /// Vertices keep their indices. Returns the old-to-new tetrahedron table.
    pub fn compact(&mut self) -> IndexRemap {
        let remap = IndexRemap::compacting(self.tets.iter().map(|t| !t.is_removed()));
        let before = self.tets.len();
        self.tets.retain(|t| !t.is_removed());
        for t in self.tets.iter_mut() {
            remap.apply(&mut t.buddies);
        }
        if let Some(grid) = self.grid.as_mut() {
            grid.remap(&remap);
        }
        self.n_removed = 0;
        info!("Compacted lattice from {} to {} tetrahedra.", before, self.tets.len());
        remap
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use model::{
        geom::{prim::BoxGeom, Obb},
        AffineTransform,
    };
    use na::Vector3;

    #[test]
    fn few_removals_leave_the_array_alone() {
        let mut lat = testing::cube([2, 2, 2]);
        let n = lat.tetrahedra().len();
        let corner = BoxGeom::new(Vector3::zeros(), Vector3::repeat(1.1));
        lat.subtract(&corner, &AffineTransform::identity(), &AffineTransform::identity());
        assert!(lat.removed_count() > 0);
        assert!(!lat.defragment());
        assert_eq!(lat.tetrahedra().len(), n);
    }

    #[test]
    fn compaction_preserves_adjacency_up_to_relabeling() {
        let mut lat = testing::cube([3, 2, 2]);
        let cut = BoxGeom::new(Vector3::new(0., 1., 1.), Vector3::new(1.6, 3., 3.));
        lat.subtract(&cut, &AffineTransform::identity(), &AffineTransform::identity());
        let removed = lat.removed_count();
        assert!(removed > 0);

        let links: Vec<(u32, [Option<u32>; 4], [f32; 4])> =
            lat.live_tets().map(|(i, t)| (i, t.buddies, t.strength)).collect();
        let live = lat.live_tet_count();
        let remap = lat.compact();

        assert_eq!(lat.tetrahedra().len(), live);
        assert_eq!(lat.removed_count(), 0);
        assert!(lat.links_consistent());
        for (old, buddies, strength) in links {
            let new = remap.get(old).unwrap();
            let t = lat.tet(new);
            assert_eq!(t.strength, strength);
            let expect = buddies.map(|b| b.map(|b| remap.get(b).unwrap()));
            assert_eq!(t.buddies, expect);
        }
    }

    #[test]
    fn grid_follows_compaction() {
        let mut lat = testing::cube([4, 2, 2]);
        let cut = BoxGeom::new(Vector3::new(0., 1., 1.), Vector3::new(3.6, 3., 3.));
        lat.subtract(&cut, &AffineTransform::identity(), &AffineTransform::identity());
        assert!(lat.defragment());
        let n = lat.tetrahedra().len() as u32;
        assert_eq!(n, 24);
        let centers: Vec<_> = (0..n).map(|t| lat.center(t)).collect();
        let grid = lat.grid().unwrap();
        for (t, c) in centers.iter().enumerate() {
            assert!(grid.cell(grid.cell_of(c)).contains(&(t as u32)));
        }
        let everything = Obb::from_aabb(Vector3::repeat(-1.), Vector3::repeat(5.));
        assert!(grid.tets_in(grid.range_of_box(&everything)).all(|t| t < n));
    }
}
