#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::Vector3;

/// Unnormalized normal of the triangle `abc`, wound counter-clockwise. Its length is twice the area.
pub fn normal(a: &Vector3<f32>, b: &Vector3<f32>, c: &Vector3<f32>) -> Vector3<f32> {
    (b - a).cross(&(c - a))
}

pub fn area(a: &Vector3<f32>, b: &Vector3<f32>, c: &Vector3<f32>) -> f32 {
    normal(a, b, c).norm() * 0.5
}

pub fn centroid(a: &Vector3<f32>, b: &Vector3<f32>, c: &Vector3<f32>) -> Vector3<f32> {
    (a + b + c) * (1. / 3.)
}

/// Whether two triangle normals lie within the cone given by `cos_limit`, ignoring their sign.
pub fn aligned(n0: &Vector3<f32>, n1: &Vector3<f32>, cos_limit: f32) -> bool {
    let d = n0.dot(n1);
    d * d > cos_limit * cos_limit * n0.norm_squared() * n1.norm_squared()
}
