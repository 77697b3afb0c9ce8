//! Fixtures shared by the unit tests.

use crate::lattice::Lattice;
use model::{
    cube_lattice,
    geom::{prim::BoxGeom, Crack, CrackGenerator, Geom, Obb, SkinMesh},
    AffineTransform,
};

use na::Vector3;

/// Two unit corner tetrahedra glued along the slanted face `x + y + z = 1`.
pub fn two_tets() -> Lattice {
    let pts = [
        Vector3::zeros(),
        Vector3::x(),
        Vector3::y(),
        Vector3::z(),
        Vector3::new(1., 1., 1.),
    ];
    Lattice::new(&pts, &[[0, 1, 2, 3], [1, 2, 3, 4]]).unwrap()
}

/// Block of unit cubes with its low corner at the origin.
pub fn cube(dims: [usize; 3]) -> Lattice {
    let (pts, tets) = cube_lattice(dims, 1.);
    Lattice::new(&pts, &tets).unwrap()
}

/// Skin mesh whose boolean operations succeed or fail on demand.
pub struct ScriptedMesh {
    pub bounds: Obb,
    pub accept: bool,
    pub cuts: usize,
}

impl ScriptedMesh {
    pub fn new(accept: bool) -> Self {
        Self {
            bounds: Obb::from_aabb(Vector3::repeat(-10.), Vector3::repeat(10.)),
            accept,
            cuts: 0,
        }
    }
}

impl Geom for ScriptedMesh {
    fn bbox(&self) -> Obb {
        self.bounds
    }
    fn volume(&self) -> f32 {
        self.bounds.half.product() * 8.
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        self.bounds.contains(pt)
    }
}

impl SkinMesh for ScriptedMesh {
    fn subtract(&mut self, _cut: &dyn Geom, _own: &AffineTransform, _cut_pose: &AffineTransform) -> bool {
        self.cuts += 1;
        self.accept
    }
}

/// Produces a thin slab around every requested triangle, or nothing at all.
pub struct SlabCracks {
    pub produce: bool,
    pub requests: usize,
}

impl SlabCracks {
    pub fn new(produce: bool) -> Self {
        Self { produce, requests: 0 }
    }
}

impl CrackGenerator for SlabCracks {
    fn crack_geom(&mut self, tri: &[Vector3<f32>; 3], _id_mat: i32) -> Option<Crack> {
        self.requests += 1;
        if !self.produce {
            return None;
        }
        let bounds = Obb::from_points(tri.iter())?;
        Some(Crack {
            geom: Box::new(BoxGeom::new(bounds.center, bounds.half.map(|h| h.max(0.01)))),
            pose: AffineTransform::identity(),
        })
    }
}
