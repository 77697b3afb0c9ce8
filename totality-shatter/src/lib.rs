extern crate nalgebra as na;
extern crate totality_model as model;

mod carve;
mod check;
pub mod config;
mod crack;
mod defrag;
pub mod error;
pub mod flags;
pub mod grid;
mod impulse;
pub mod lattice;
pub mod remap;
mod shatter;
pub mod solver;
mod split;
pub mod tension;

#[cfg(test)]
mod testing;

pub use carve::CarveReport;
pub use check::StructureReport;
pub use config::{LatticeConfig, LatticeParams, ParamsPatch};
pub use crack::{CrackQueue, CrackReport};
pub use error::{ConfigError, LatticeError};
pub use lattice::{Lattice, PointHit, Tetrahedron, Vertex};
pub use solver::{Explosion, Loads, SolveStats, SolverArena};
pub use tension::{FailureMode, FaceTension, LastTension};

use model::{
    geom::{CrackGenerator, Geom, SkinMesh},
    AffineTransform,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Vector3;

/// A breakable body: its skin mesh together with the lattice modelling its interior.
pub struct ShatterModel<M: SkinMesh> {
    pub lattice: Lattice,
    pub mesh: M,
    pending: bool,
}

impl<M: SkinMesh> ShatterModel<M> {
    /// Pairs a lattice with its mesh, aligning the lattice grid with the mesh's bounding box.
    pub fn new(mut lattice: Lattice, mesh: M) -> Self {
        lattice.set_grid_basis(mesh.bbox().basis);
        Self {
            lattice,
            mesh,
            pending: false,
        }
    }

    /// Records a hit. Returns whether it was strong enough to warrant a structure check.
    pub fn add_impulse(
        &mut self,
        pt: &Vector3<f32>,
        impulse: &Vector3<f32>,
        momentum: &Vector3<f32>,
        gravity: &Vector3<f32>,
        world_time: f32,
    ) -> bool {
        let due = self.lattice.add_impulse(pt, impulse, momentum, gravity, world_time);
        self.pending |= due;
        due
    }

    pub fn needs_check(&self) -> bool {
        self.pending
    }

    /// Runs the structure check owed by earlier hits, if any.
    pub fn advance<G: CrackGenerator>(&mut self, gen: &mut G, loads: &Loads) -> Option<StructureReport> {
        if !std::mem::take(&mut self.pending) {
            return None;
        }
        Some(shatter::fracture(self, gen, loads))
    }

    /// Cuts `geom` out of the mesh and, if the mesh accepted the cut, out of the lattice.
    pub fn carve(
        &mut self,
        geom: &dyn Geom,
        own_pose: &AffineTransform,
        geom_pose: &AffineTransform,
    ) -> Option<CarveReport> {
        if !self.mesh.subtract(geom, own_pose, geom_pose) {
            return None;
        }
        Some(self.lattice.subtract(geom, own_pose, geom_pose))
    }

    pub fn can_shatter(&self) -> bool {
        self.lattice.live_tet_count() >= self.lattice.config().min_chunk_tets.max(1) * 2
    }

    /// Breaks the body into the given chunk meshes. See [`Lattice::split`].
    pub fn shatter(&mut self, chunks: Vec<M>) -> Vec<Option<ShatterModel<M>>> {
        shatter::shatter(self, chunks)
    }
}
