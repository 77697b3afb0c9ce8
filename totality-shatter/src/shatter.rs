use crate::{solver::Loads, ShatterModel, StructureReport};
use model::geom::{CrackGenerator, SkinMesh};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

pub fn fracture<M: SkinMesh, G: CrackGenerator>(
    shm: &mut ShatterModel<M>,
    gen: &mut G,
    loads: &Loads,
) -> StructureReport {
    let report = shm.lattice.check_structure(loads, &mut shm.mesh, gen);
    if let Some(crack) = report.crack {
        info!(
            "Structure failed: {} faces cracked, {} reinforced.",
            crack.cracked, crack.reinforced
        );
    }
    report
}

pub fn shatter<M: SkinMesh>(shm: &mut ShatterModel<M>, chunks: Vec<M>) -> Vec<Option<ShatterModel<M>>> {
    let lattices = shm.lattice.split(&chunks);
    chunks
        .into_iter()
        .zip(lattices)
        .map(|(mesh, lattice)| lattice.map(|l| ShatterModel::new(l, mesh)))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{flags::VtxFlag, testing, Loads, ShatterModel};
    use model::{
        geom::{prim::BoxGeom, Obb},
        AffineTransform,
    };
    use na::Vector3;

    fn block() -> ShatterModel<testing::ScriptedMesh> {
        ShatterModel::new(testing::cube([2, 1, 1]), testing::ScriptedMesh::new(true))
    }

    #[test]
    fn weak_hits_skip_the_check() {
        let mut shm = block();
        let g = Vector3::new(0., 0., -9.8);
        let c = shm.lattice.center(0);
        assert!(!shm.add_impulse(&c, &Vector3::new(1e-3, 0., 0.), &Vector3::zeros(), &g, 0.));
        let mut gen = testing::SlabCracks::new(true);
        assert!(shm.advance(&mut gen, &Loads::new(0.01, g)).is_none());
    }

    #[test]
    fn strong_hit_cracks_once() {
        let mut shm = block();
        let c = shm.lattice.center(0);
        assert!(shm.add_impulse(&c, &Vector3::new(-5., 0., 0.), &Vector3::zeros(), &Vector3::zeros(), 0.));
        assert!(shm.needs_check());
        let mut gen = testing::SlabCracks::new(true);
        let loads = Loads::new(0.01, Vector3::zeros());
        let report = shm.advance(&mut gen, &loads).unwrap();
        assert!(report.failed());
        assert!(shm.mesh.cuts >= 1);
        assert!(!shm.needs_check());
        assert!(shm.advance(&mut gen, &loads).is_none());
    }

    #[test]
    fn rejected_carve_leaves_lattice_alone() {
        let mut shm = block();
        shm.mesh.accept = false;
        let cut = BoxGeom::new(Vector3::zeros(), Vector3::repeat(0.5));
        let id = AffineTransform::identity();
        assert!(shm.carve(&cut, &id, &id).is_none());
        assert_eq!(shm.lattice.removed_count(), 0);
        assert!(!shm.lattice.vertices()[0].flags.contains(VtxFlag::Removed));
        shm.mesh.accept = true;
        let report = shm.carve(&cut, &id, &id).unwrap();
        assert_eq!(report.vertices_removed, 1);
    }

    #[test]
    fn shatter_wraps_chunks_with_their_meshes() {
        let mut shm = block();
        assert!(shm.can_shatter());
        let mut left = testing::ScriptedMesh::new(true);
        left.bounds = Obb::from_aabb(Vector3::new(0., -0.1, -0.1), Vector3::new(1., 1.1, 1.1));
        let mut right = testing::ScriptedMesh::new(true);
        right.bounds = Obb::from_aabb(Vector3::new(1., -0.1, -0.1), Vector3::new(2., 1.1, 1.1));
        let parts = shm.shatter(vec![left, right]);
        assert_eq!(parts.len(), 2);
        for part in parts {
            let part = part.unwrap();
            assert_eq!(part.lattice.tetrahedra().len(), 6);
            assert!(part.lattice.links_consistent());
        }
        // everything left; the remains were compacted away
        assert_eq!(shm.lattice.live_tet_count(), 0);
        assert_eq!(shm.lattice.tetrahedra().len(), 0);
        assert!(!shm.can_shatter());
    }
}
