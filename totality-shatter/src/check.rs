use crate::{
    crack::{self, CrackReport},
    lattice::Lattice,
    solver::{self, Loads, SolveStats, SolverArena},
    tension::{self, FaceTension},
};
use model::geom::{CrackGenerator, SkinMesh};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Outcome of one structure check.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct StructureReport {
    pub solve: SolveStats,
    /// Most loaded face, whether or not it failed.
    pub worst: Option<FaceTension>,
    /// Present when a face failed and cracks were propagated.
    pub crack: Option<CrackReport>,
}

impl StructureReport {
    pub fn failed(&self) -> bool {
        self.crack.is_some()
    }
}

impl Lattice {
    /// Solves the current loads, and cracks the lattice if some face cannot bear them.
    ///
    /// Uses this thread's pooled solver arena; see [`Lattice::check_structure_with`] to supply one.
    pub fn check_structure(
        &mut self,
        loads: &Loads,
        mesh: &mut dyn SkinMesh,
        gen: &mut dyn CrackGenerator,
    ) -> StructureReport {
        solver::with_arena(|arena| self.check_structure_with(arena, loads, mesh, gen))
    }

    pub fn check_structure_with(
        &mut self,
        arena: &mut SolverArena,
        loads: &Loads,
        mesh: &mut dyn SkinMesh,
        gen: &mut dyn CrackGenerator,
    ) -> StructureReport {
        let solve = arena.solve(self, loads);
        let worst = tension::analyze(self, arena, loads.time_step);
        let crack = match worst {
            Some(w) if w.is_failure() => {
                Some(crack::propagate(self, arena, &w, mesh, gen, loads.time_step))
            }
            _ => None,
        };
        StructureReport { solve, worst, crack }
    }
}

#[cfg(test)]
mod tests {
    use crate::{solver::Loads, tension::FailureMode, testing};
    use na::Vector3;

    #[test]
    fn lone_tet_never_fails() {
        let pts = [Vector3::zeros(), Vector3::x(), Vector3::y(), Vector3::z()];
        let mut lat = crate::Lattice::new(&pts, &[[0, 1, 2, 3]]).unwrap();
        lat.add_impulse(&lat.center(0), &Vector3::repeat(100.), &Vector3::zeros(), &Vector3::zeros(), 0.);
        let mut mesh = testing::ScriptedMesh::new(true);
        let mut gen = testing::SlabCracks::new(true);
        let report = lat.check_structure(&Loads::new(0.01, Vector3::new(0., 0., -9.8)), &mut mesh, &mut gen);
        assert_eq!(report.solve.faces, 0);
        assert!(report.worst.is_none());
        assert!(!report.failed());
        assert_eq!(gen.requests, 0);
    }

    #[test]
    fn unloaded_check_changes_nothing() {
        let mut lat = testing::cube([2, 2, 1]);
        let before: Vec<_> = lat.tetrahedra().iter().map(|t| (t.strength, t.margin, t.buddies)).collect();
        let mut mesh = testing::ScriptedMesh::new(true);
        let mut gen = testing::SlabCracks::new(true);
        for _ in 0..2 {
            let report = lat.check_structure(&Loads::new(0.01, Vector3::zeros()), &mut mesh, &mut gen);
            assert!(!report.failed());
            assert_eq!(report.worst.map(|w| w.ratio), Some(0.));
        }
        let after: Vec<_> = lat.tetrahedra().iter().map(|t| (t.strength, t.margin, t.buddies)).collect();
        assert_eq!(before, after);
        assert_eq!(mesh.cuts, 0);
    }

    #[test]
    fn pulled_pair_cracks_its_shared_face() {
        let mut lat = testing::two_tets();
        lat.add_impulse(&lat.center(1), &Vector3::repeat(0.001), &Vector3::zeros(), &Vector3::zeros(), 0.);
        let mut mesh = testing::ScriptedMesh::new(true);
        let mut gen = testing::SlabCracks::new(true);
        let report = lat.check_structure(&Loads::new(0.01, Vector3::zeros()), &mut mesh, &mut gen);

        assert!(report.failed());
        assert_eq!(report.worst.unwrap().mode, FailureMode::Pull);
        let crack = report.crack.unwrap();
        assert_eq!(crack.processed, 1);
        assert_eq!(crack.cracked, 1);
        let f0 = lat.tet(0).face_of(1).unwrap();
        let f1 = lat.tet(1).face_of(0).unwrap();
        assert_eq!(lat.tet(0).strength[f0], 0.);
        assert_eq!(lat.tet(1).strength[f1], 0.);
        assert_eq!(lat.last_tension().mode, FailureMode::Pull);
        assert_eq!(mesh.cuts, 1);
    }

    #[test]
    fn cracked_face_stops_carrying_load() {
        let mut lat = testing::two_tets();
        let mut mesh = testing::ScriptedMesh::new(true);
        let mut gen = testing::SlabCracks::new(true);
        let loads = Loads::new(0.01, Vector3::zeros());
        lat.add_impulse(&lat.center(1), &Vector3::repeat(0.001), &Vector3::zeros(), &Vector3::zeros(), 0.);
        assert!(lat.check_structure(&loads, &mut mesh, &mut gen).failed());
        let again = lat.check_structure(&loads, &mut mesh, &mut gen);
        assert_eq!(again.solve.faces, 0);
        assert!(!again.failed());
    }
}
