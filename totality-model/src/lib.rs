pub mod geom;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, UnitQuaternion, Vector3};

/// Placement of a geometry in its parent frame: `world = pos + ori * (local * scale)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTransform {
    pub pos: Vector3<f32>,
    pub ori: UnitQuaternion<f32>,
    pub scale: f32,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            pos: Vector3::zeros(),
            ori: UnitQuaternion::identity(),
            scale: 1.,
        }
    }

    pub fn new(pos: Vector3<f32>, ori: UnitQuaternion<f32>, scale: f32) -> Self {
        Self { pos, ori, scale }
    }

    pub fn from_translation(pos: Vector3<f32>) -> Self {
        Self {
            pos,
            ..Self::identity()
        }
    }

    pub fn rot(&self) -> Matrix3<f32> {
        self.ori.to_rotation_matrix().into_inner()
    }

    pub fn apply(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.pos + self.ori * (p * self.scale)
    }

    pub fn inverse_apply(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.ori.inverse_transform_vector(&(p - self.pos)) / self.scale
    }

    /// Maps points expressed in `self`'s local frame into `other`'s local frame.
    pub fn relative_to(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            pos: other.inverse_apply(&self.pos),
            ori: other.ori.inverse() * self.ori,
            scale: self.scale / other.scale,
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tetrahedralizes a block of `dims` cubes with edge length `cell`, anchored at the origin.
///
/// Every cube is split into six tetrahedra around its main diagonal, so neighbouring cubes
/// agree on the shared face triangulation and the result is a conforming volumetric mesh.
pub fn cube_lattice(dims: [usize; 3], cell: f32) -> (Vec<Vector3<f32>>, Vec<[u32; 4]>) {
    let [nx, ny, nz] = dims;
    let idx = |x: usize, y: usize, z: usize| (x * (ny + 1) * (nz + 1) + y * (nz + 1) + z) as u32;

    let mut verts = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for x in 0..=nx {
        for y in 0..=ny {
            for z in 0..=nz {
                verts.push(Vector3::new(x as f32, y as f32, z as f32) * cell);
            }
        }
    }

    // axis orderings walked from the low corner to the high corner of each cube
    const PATHS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let mut tets = Vec::with_capacity(nx * ny * nz * 6);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                for path in PATHS.iter() {
                    let mut c = [x, y, z];
                    let mut tet = [idx(x, y, z); 4];
                    for (k, &axis) in path.iter().enumerate() {
                        c[axis] += 1;
                        tet[k + 1] = idx(c[0], c[1], c[2]);
                    }
                    tets.push(tet);
                }
            }
        }
    }
    debug!(
        "Tetrahedralized {:?} cubes into {} vertices and {} tetrahedra.",
        dims,
        verts.len(),
        tets.len()
    );
    (verts, tets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::Vector3;

    #[test]
    fn transform_round_trips_points() {
        let t = AffineTransform::new(
            Vector3::new(1., -2., 0.5),
            UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1),
            2.,
        );
        let p = Vector3::new(0.25, 4., -1.);
        let back = t.inverse_apply(&t.apply(&p));
        assert!((back - p).norm() < 1e-5, "{:?} != {:?}", back, p);
    }

    #[test]
    fn relative_transform_matches_composition() {
        let a = AffineTransform::new(
            Vector3::new(3., 0., 1.),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            1.5,
        );
        let b = AffineTransform::new(
            Vector3::new(-1., 2., 0.),
            UnitQuaternion::from_euler_angles(-0.4, 0.0, 0.9),
            0.5,
        );
        let p = Vector3::new(0.3, -0.6, 2.);
        let direct = b.inverse_apply(&a.apply(&p));
        let composed = a.relative_to(&b).apply(&p);
        assert!((direct - composed).norm() < 1e-4);
    }

    #[test]
    fn cube_lattice_counts() {
        let (verts, tets) = cube_lattice([2, 3, 1], 1.);
        assert_eq!(verts.len(), 3 * 4 * 2);
        assert_eq!(tets.len(), 2 * 3 * 6);
        assert!(tets.iter().flatten().all(|&i| (i as usize) < verts.len()));
    }
}
