use super::{Geom, Obb};

use na::{Matrix3, Vector3};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoxGeom {
    pub obb: Obb,
}

impl BoxGeom {
    pub fn new(center: Vector3<f32>, half: Vector3<f32>) -> Self {
        Self {
            obb: Obb {
                center,
                basis: Matrix3::identity(),
                half,
            },
        }
    }
}

impl Geom for BoxGeom {
    fn bbox(&self) -> Obb {
        self.obb
    }
    fn volume(&self) -> f32 {
        self.obb.half.product() * 8.
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        self.obb.contains(pt)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphereGeom {
    pub center: Vector3<f32>,
    pub r: f32,
}

impl Geom for SphereGeom {
    fn bbox(&self) -> Obb {
        Obb {
            center: self.center,
            basis: Matrix3::identity(),
            // a hair larger so points on the sphere still pass the box prefilter
            half: Vector3::repeat(self.r * 1.001),
        }
    }
    fn center(&self) -> Vector3<f32> {
        self.center
    }
    fn volume(&self) -> f32 {
        std::f32::consts::PI * 4. / 3. * self.r.powi(3)
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        (pt - self.center).norm_squared() < self.r * self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_and_sphere_classify_points() {
        let b = BoxGeom::new(Vector3::new(1., 1., 1.), Vector3::new(1., 0.5, 0.5));
        assert!((b.volume() - 2.).abs() < 1e-6);
        assert!(b.point_inside(&Vector3::new(1.9, 1., 1.)));
        assert!(!b.point_inside(&Vector3::new(1., 1.6, 1.)));

        let s = SphereGeom { center: Vector3::zeros(), r: 2. };
        assert!(s.point_inside(&Vector3::new(1., 1., 1.)));
        assert!(!s.point_inside(&Vector3::new(2., 0.5, 0.)));
        assert!(s.bbox().contains(&Vector3::new(1.99, 0., 0.)));
    }
}
