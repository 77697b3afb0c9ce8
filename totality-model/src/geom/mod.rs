pub mod prim;
pub mod tet;
pub mod tri;

use crate::AffineTransform;

use na::{Matrix3, Vector3};

/// Outward-ordered vertex indices of one boundary triangle, laid out for direct upload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SkinFace {
    pub indices: [u32; 3],
}

/// Oriented box. Rows of `basis` are the box axes; `half` holds the half extents along them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Obb {
    pub center: Vector3<f32>,
    pub basis: Matrix3<f32>,
    pub half: Vector3<f32>,
}

impl Obb {
    pub fn from_aabb(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self {
            center: (min + max) * 0.5,
            basis: Matrix3::identity(),
            half: (max - min) * 0.5,
        }
    }

    pub fn from_points<'a, I: IntoIterator<Item = &'a Vector3<f32>>>(pts: I) -> Option<Self> {
        let mut it = pts.into_iter();
        let first = it.next()?;
        let (min, max) = it.fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(Self::from_aabb(min, max))
    }

    /// Coordinates of `p` along the box axes, relative to the center.
    pub fn local(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.basis * (p - self.center)
    }

    pub fn contains(&self, p: &Vector3<f32>) -> bool {
        let l = self.local(p);
        (0..3).all(|i| l[i].abs() < self.half[i])
    }

    /// Re-expresses a box given in `from`'s local frame in `to`'s local frame.
    pub fn transformed(&self, from: &AffineTransform, to: &AffineTransform) -> Obb {
        let rel = from.relative_to(to);
        Obb {
            center: rel.apply(&self.center),
            basis: self.basis * rel.rot().transpose(),
            half: self.half * rel.scale,
        }
    }
}

/// Half-space boundary; points with a negative signed distance lie behind the plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub origin: Vector3<f32>,
    pub n: Vector3<f32>,
}

impl Plane {
    pub fn new(origin: Vector3<f32>, n: Vector3<f32>) -> Self {
        Self {
            origin,
            n: n.normalize(),
        }
    }

    pub fn distance(&self, p: &Vector3<f32>) -> f32 {
        self.n.dot(&(p - self.origin))
    }
}

/// Closed volume that can classify points. Everything is expressed in the geometry's local frame.
pub trait Geom {
    fn bbox(&self) -> Obb;
    fn center(&self) -> Vector3<f32> {
        self.bbox().center
    }
    fn volume(&self) -> f32;
    fn point_inside(&self, pt: &Vector3<f32>) -> bool;
}

impl<T: Geom + ?Sized> Geom for &T {
    fn bbox(&self) -> Obb {
        (**self).bbox()
    }
    fn center(&self) -> Vector3<f32> {
        (**self).center()
    }
    fn volume(&self) -> f32 {
        (**self).volume()
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        (**self).point_inside(pt)
    }
}

impl<T: Geom + ?Sized> Geom for Box<T> {
    fn bbox(&self) -> Obb {
        (**self).bbox()
    }
    fn center(&self) -> Vector3<f32> {
        (**self).center()
    }
    fn volume(&self) -> f32 {
        (**self).volume()
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        (**self).point_inside(pt)
    }
}

/// Visual/collision skin of a breakable body.
pub trait SkinMesh: Geom {
    /// Boolean-subtracts `cut` from the mesh. Returns false if the operation did not apply.
    fn subtract(&mut self, cut: &dyn Geom, own_pose: &AffineTransform, cut_pose: &AffineTransform) -> bool;
}

/// Cutting shape produced for one cracked face, together with its placement in the body's frame.
pub struct Crack {
    pub geom: Box<dyn Geom>,
    pub pose: AffineTransform,
}

pub trait CrackGenerator {
    fn crack_geom(&mut self, tri: &[Vector3<f32>; 3], id_mat: i32) -> Option<Crack>;
}
