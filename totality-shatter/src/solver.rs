//! Quasi-static load solver.
//!
//! Every live tetrahedron is a rigid body seeded with the velocity its loads would give it over
//! one time step. Every shared face carries a linear and an angular impulse that keeps its two
//! bodies moving together. Those impulses are found with a preconditioned conjugate gradient
//! over the face unknowns, using the per-face effective mass as preconditioner.

use crate::lattice::Lattice;
use model::geom::{tri, Plane};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Vector3};
use std::cell::RefCell;

/// Blast centred at `epicenter`. Pressure falls off with the squared distance, saturating
/// inside `rmin`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Explosion {
    pub epicenter: Vector3<f32>,
    pub r: f32,
    pub rmin: f32,
    pub impulsive_pressure_at_r: f32,
}

impl Explosion {
    /// Impulse received by a body of cross-section `area` centred at `pt`.
    pub fn impulse_at(&self, pt: &Vector3<f32>, area: f32) -> Vector3<f32> {
        let dir = pt - self.epicenter;
        let d = dir.norm();
        if d <= f32::EPSILON {
            return Vector3::zeros();
        }
        let rd = d.max(self.rmin);
        dir * (self.impulsive_pressure_at_r * self.r * self.r / (rd * rd * d) * area * 0.3)
    }
}

/// Everything acting on the lattice during one structure check.
#[derive(Debug, Copy, Clone)]
pub struct Loads<'a> {
    pub time_step: f32,
    pub gravity: Vector3<f32>,
    /// Tetrahedra with a vertex behind any of these planes are held in place.
    pub ground: &'a [Plane],
    pub explosion: Option<&'a Explosion>,
}

impl<'a> Loads<'a> {
    pub fn new(time_step: f32, gravity: Vector3<f32>) -> Self {
        Self {
            time_step,
            gravity,
            ground: &[],
            explosion: None,
        }
    }

    pub fn with_ground(self, ground: &'a [Plane]) -> Self {
        Self { ground, ..self }
    }

    pub fn with_explosion(self, explosion: &'a Explosion) -> Self {
        Self {
            explosion: Some(explosion),
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub(crate) inv_mass: f32,
    pub(crate) inv_inertia: Matrix3<f32>,
    /// Linear and angular velocity while seeding, impulse accumulators inside the operator.
    pub(crate) dp: Vector3<f32>,
    pub(crate) dl: Vector3<f32>,
}

/// One face shared by two live tetrahedra, with its share of the solve.
#[derive(Debug, Clone)]
pub struct FaceLink {
    /// Lower-indexed owner and its face index; the normal is taken on this side.
    pub itet: u32,
    pub iface: usize,
    pub(crate) bodies: [usize; 2],
    pub(crate) r0: Vector3<f32>,
    pub(crate) r1: Vector3<f32>,
    pub(crate) vkinv: Matrix3<f32>,
    pub(crate) wkinv: Matrix3<f32>,
    pub(crate) rv: Vector3<f32>,
    pub(crate) rw: Vector3<f32>,
    pub(crate) dv: Vector3<f32>,
    pub(crate) dw: Vector3<f32>,
    pub(crate) dp: Vector3<f32>,
    pub(crate) dl: Vector3<f32>,
    /// Linear impulse, positive along the normal when the face is pulled apart.
    pub p: Vector3<f32>,
    pub l: Vector3<f32>,
    pub(crate) processed: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SolveStats {
    pub faces: usize,
    pub iterations: usize,
    /// Largest squared relative velocity left between any two linked bodies.
    pub residual: f32,
    pub tolerance: f32,
    pub converged: bool,
}

/// Scratch state of one solve. Reusable; every solve starts by clearing it.
#[derive(Debug, Default)]
pub struct SolverArena {
    pub(crate) bodies: Vec<Body>,
    pub(crate) body_of: Vec<Option<usize>>,
    pub(crate) faces: Vec<FaceLink>,
    pub(crate) face_of: Vec<[Option<usize>; 4]>,
}

thread_local! {
    static ARENA: RefCell<SolverArena> = RefCell::new(SolverArena::default());
}

/// Runs `f` on this thread's pooled arena, or on a fresh one if the pooled arena is in use.
pub fn with_arena<R>(f: impl FnOnce(&mut SolverArena) -> R) -> R {
    ARENA.with(|cell| match cell.try_borrow_mut() {
        Ok(mut arena) => f(&mut arena),
        Err(_) => {
            debug!("Pooled solver arena busy, using a fresh one.");
            f(&mut SolverArena::default())
        }
    })
}

impl SolverArena {
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.body_of.clear();
        self.faces.clear();
        self.face_of.clear();
    }

    pub fn faces(&self) -> &[FaceLink] {
        &self.faces
    }

    pub(crate) fn face_index(&self, t: u32, face: usize) -> Option<usize> {
        self.face_of.get(t as usize)?[face]
    }

    /// Face record shared by `t` through `face`, from whichever side.
    pub fn face_at(&self, t: u32, face: usize) -> Option<&FaceLink> {
        self.face_index(t, face).map(|k| &self.faces[k])
    }

    /// Whether tetrahedron `t` was held by a ground plane in the last solve.
    pub fn is_anchored(&self, t: u32) -> bool {
        self.body_of
            .get(t as usize)
            .copied()
            .flatten()
            .map_or(false, |b| self.bodies[b].inv_mass == 0.)
    }

    pub fn solve(&mut self, lattice: &Lattice, loads: &Loads) -> SolveStats {
        let cfg = &lattice.config;
        let tolerance = (loads.gravity.norm() * loads.time_step * cfg.residual_fraction).max(cfg.min_residual);
        self.seed_bodies(lattice, loads);
        let (mut r2, mut vmax) = self.link_faces(lattice);

        let n = self.faces.len();
        let budget = (cfg.max_iters / n.max(1)).min(n * 6);
        let e2 = tolerance * tolerance;
        let mut iterations = 0;
        while iterations < budget && vmax > e2 && r2 > f64::MIN_POSITIVE {
            let pap = self.apply_operator();
            let a = (r2 / pap.max(1e-10)).min(cfg.max_cg_step) as f32;
            let mut r2_new = 0f64;
            vmax = 0.;
            for f in self.faces.iter_mut() {
                f.rv -= f.dv * a;
                f.rw -= f.dw * a;
                f.p += f.dp * a;
                f.l += f.dl * a;
                let zv = f.vkinv * f.rv;
                let zw = f.wkinv * f.rw;
                r2_new += (zv.dot(&f.rv) + zw.dot(&f.rw)) as f64;
                vmax = vmax.max(f.rv.norm_squared().max(f.rw.norm_squared() * f.r0.norm_squared()));
                // stash the preconditioned residual for the direction update
                f.dv = zv;
                f.dw = zw;
            }
            let b = (r2_new / r2) as f32;
            for f in self.faces.iter_mut() {
                f.dp = f.dv + f.dp * b;
                f.dl = f.dw + f.dl * b;
            }
            r2 = r2_new;
            iterations += 1;
        }

        let stats = SolveStats {
            faces: n,
            iterations,
            residual: vmax,
            tolerance,
            converged: vmax <= e2 || r2 <= f64::MIN_POSITIVE,
        };
        trace!("Solved lattice loads: {:?}", stats);
        stats
    }

    fn seed_bodies(&mut self, lattice: &Lattice, loads: &Loads) {
        self.clear();
        let dt = loads.time_step;
        self.body_of.resize(lattice.tets.len(), None);
        self.face_of.resize(lattice.tets.len(), [None; 4]);
        for (i, t) in lattice.live_tets() {
            let pts = lattice.tet_points(i);
            let anchored = pts
                .iter()
                .any(|p| loads.ground.iter().any(|g| g.distance(p) < 0.));
            let body = if anchored {
                Body {
                    inv_mass: 0.,
                    inv_inertia: Matrix3::zeros(),
                    dp: Vector3::zeros(),
                    dl: Vector3::zeros(),
                }
            } else {
                let mut p = t.p_ext;
                if let Some(x) = loads.explosion {
                    p += x.impulse_at(&lattice.center(i), t.area);
                }
                Body {
                    inv_mass: t.inv_mass,
                    inv_inertia: t.inv_inertia,
                    dp: loads.gravity * dt + p * t.inv_mass,
                    dl: t.inv_inertia * t.l_ext,
                }
            };
            self.body_of[i as usize] = Some(self.bodies.len());
            self.bodies.push(body);
        }
    }

    /// Creates a record for every loadable face and returns the initial preconditioned residual
    /// and the largest relative velocity.
    fn link_faces(&mut self, lattice: &Lattice) -> (f64, f32) {
        let mut r2 = 0f64;
        let mut vmax = 0f32;
        for (i, t) in lattice.live_tets() {
            let Some(bi) = self.body_of[i as usize] else { continue };
            for j in 0..4 {
                let Some(nb) = t.buddies[j] else { continue };
                if nb <= i || t.strength[j] <= 0. {
                    continue;
                }
                let Some(bj) = self.body_of[nb as usize] else { continue };
                let (b0, b1) = (&self.bodies[bi], &self.bodies[bj]);
                if b0.inv_mass.max(b1.inv_mass) <= 0. {
                    continue;
                }

                let [a, b, c] = lattice.face_points(i, j);
                let pt = tri::centroid(&a, &b, &c);
                let r0 = pt - lattice.center(i);
                let r1 = pt - lattice.center(nb);
                let (x0, x1) = (r0.cross_matrix(), r1.cross_matrix());
                let vk = Matrix3::identity() * (b0.inv_mass + b1.inv_mass)
                    - x0 * b0.inv_inertia * x0
                    - x1 * b1.inv_inertia * x1;
                let vkinv = vk.try_inverse().unwrap_or_else(Matrix3::zeros);
                let wkinv = (b0.inv_inertia + b1.inv_inertia)
                    .try_inverse()
                    .unwrap_or_else(Matrix3::zeros);

                let rv = b1.dp + b1.dl.cross(&r1) - b0.dp - b0.dl.cross(&r0);
                let rw = b1.dl - b0.dl;
                let dp = vkinv * rv;
                let dl = wkinv * rw;
                r2 += (dp.dot(&rv) + dl.dot(&rw)) as f64;
                vmax = vmax.max(rv.norm_squared().max(rw.norm_squared() * r0.norm_squared()));

                let k = self.faces.len();
                self.face_of[i as usize][j] = Some(k);
                if let Some(bf) = lattice.tets[nb as usize].face_of(i) {
                    self.face_of[nb as usize][bf] = Some(k);
                }
                self.faces.push(FaceLink {
                    itet: i,
                    iface: j,
                    bodies: [bi, bj],
                    r0,
                    r1,
                    vkinv,
                    wkinv,
                    rv,
                    rw,
                    dv: Vector3::zeros(),
                    dw: Vector3::zeros(),
                    dp,
                    dl,
                    p: Vector3::zeros(),
                    l: Vector3::zeros(),
                    processed: false,
                });
            }
        }
        (r2, vmax)
    }

    /// Applies the constraint operator to the search directions `dp, dl`, leaving the resulting
    /// relative velocity changes in `dv, dw`. Returns `<d, A d>`.
    pub(crate) fn apply_operator(&mut self) -> f64 {
        let Self { bodies, faces, .. } = self;
        for b in bodies.iter_mut() {
            b.dp = Vector3::zeros();
            b.dl = Vector3::zeros();
        }
        for f in faces.iter() {
            let [i0, i1] = f.bodies;
            bodies[i0].dp += f.dp;
            bodies[i0].dl += f.r0.cross(&f.dp) + f.dl;
            bodies[i1].dp -= f.dp;
            bodies[i1].dl -= f.r1.cross(&f.dp) + f.dl;
        }
        let mut pap = 0f64;
        for f in faces.iter_mut() {
            let (b0, b1) = (&bodies[f.bodies[0]], &bodies[f.bodies[1]]);
            let w0 = b0.inv_inertia * b0.dl;
            let w1 = b1.inv_inertia * b1.dl;
            f.dw = w0 - w1;
            f.dv = b0.dp * b0.inv_mass + w0.cross(&f.r0) - b1.dp * b1.inv_mass - w1.cross(&f.r1);
            pap += (f.dw.dot(&f.dl) + f.dv.dot(&f.dp)) as f64;
        }
        pap
    }
}
