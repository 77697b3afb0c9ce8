//! Tetrahedron helpers.
//!
//! Tetrahedra are expected to be positively oriented, i.e. `signed_volume > 0`. Face `j` is the
//! triangle opposite vertex `j`, and `FACES[j]` lists its corners wound so that the normal from
//! [`face_normal`] points out of the tetrahedron.

use super::tri;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Vector3};

pub const FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];
pub const EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

pub fn signed_volume(v: &[Vector3<f32>; 4]) -> f32 {
    (v[1] - v[0]).cross(&(v[2] - v[0])).dot(&(v[3] - v[0])) * (1. / 6.)
}

pub fn centroid(v: &[Vector3<f32>; 4]) -> Vector3<f32> {
    (v[0] + v[1] + v[2] + v[3]) * 0.25
}

pub fn face_points(v: &[Vector3<f32>; 4], face: usize) -> [Vector3<f32>; 3] {
    let [a, b, c] = FACES[face];
    [v[a], v[b], v[c]]
}

/// Outward normal of `face`, scaled to twice the face area.
pub fn face_normal(v: &[Vector3<f32>; 4], face: usize) -> Vector3<f32> {
    let [a, b, c] = face_points(v, face);
    tri::normal(&a, &b, &c)
}

pub fn face_area(v: &[Vector3<f32>; 4], face: usize) -> f32 {
    face_normal(v, face).norm() * 0.5
}

/// Inertia tensor of a solid tetrahedron of the given mass about its centroid.
pub fn inertia(v: &[Vector3<f32>; 4], mass: f32) -> Matrix3<f32> {
    let c = centroid(v);
    let s = v
        .iter()
        .map(|p| {
            let d = p - c;
            d * d.transpose()
        })
        .fold(Matrix3::zeros(), |acc, m| acc + m);
    (Matrix3::identity() * s.trace() - s) * (mass / 20.)
}

/// Barycentric weights of `p`; all four are positive exactly when `p` is strictly inside.
pub fn barycentric(v: &[Vector3<f32>; 4], p: &Vector3<f32>) -> [f32; 4] {
    let six_vol = signed_volume(v) * 6.;
    let mut w = [0.; 4];
    for (j, wj) in w.iter_mut().enumerate() {
        let a = v[FACES[j][0]];
        *wj = -face_normal(v, j).dot(&(p - a)) / six_vol;
    }
    w
}

/// Whether `p` lies inside or on the boundary of the tetrahedron.
pub fn contains(v: &[Vector3<f32>; 4], p: &Vector3<f32>) -> bool {
    (0..4).all(|j| face_normal(v, j).dot(&(p - v[FACES[j][0]])) <= 0.)
}

/// Exact separating-axis test between a tetrahedron and the axis-aligned box `center ± half`.
///
/// Box face axes are not tested here; callers only ask about boxes already known to overlap
/// the tetrahedron's bounding box.
pub fn overlaps_box(v: &[Vector3<f32>; 4], center: &Vector3<f32>, half: &Vector3<f32>) -> bool {
    let radius = |n: &Vector3<f32>| half.dot(&n.abs());
    for j in 0..4 {
        let n = face_normal(v, j);
        let s = v[FACES[j][0]].dot(&n);
        let e = v[j].dot(&n);
        if (s + e - center.dot(&n) * 2.).abs() > (s - e).abs() + radius(&n) * 2. {
            return false;
        }
    }
    for [i0, i1] in EDGES.iter() {
        let edge = v[*i0] - v[*i1];
        for k in 0..3 {
            let n = edge.cross(&Vector3::ith(k, 1.));
            let (lo, hi) = v
                .iter()
                .map(|p| p.dot(&n))
                .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));
            if (lo + hi - center.dot(&n) * 2.).abs() > hi - lo + radius(&n) * 2. {
                return false;
            }
        }
    }
    true
}
