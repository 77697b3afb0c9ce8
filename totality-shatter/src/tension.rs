use crate::{
    lattice::Lattice,
    solver::{FaceLink, SolverArena},
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureMode {
    Pull,
    Push,
    Shift,
    Twist,
    Bend,
}

/// Diagnostic left behind by the most recent analysis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LastTension {
    pub magnitude: f32,
    pub mode: FailureMode,
}

impl Default for LastTension {
    fn default() -> Self {
        Self {
            magnitude: 0.,
            mode: FailureMode::Push,
        }
    }
}

/// Load of one face relative to what it can bear. `ratio >= 1` means the face fails.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FaceTension {
    /// Index of the face record in the solver arena.
    pub face: usize,
    pub itet: u32,
    pub iface: usize,
    pub ratio: f32,
    pub mode: FailureMode,
    /// Stress in the failing mode, per unit of face area and time.
    pub magnitude: f32,
}

impl FaceTension {
    pub fn is_failure(&self) -> bool {
        self.ratio >= 1.
    }
}

/// Rates one solved face against the lattice thresholds.
pub(crate) fn face_tension(lattice: &Lattice, face: usize, link: &FaceLink, dt: f32) -> Option<FaceTension> {
    let (t, j) = (link.itet, link.iface);
    let n = lattice.face_normal(t, j);
    let len = n.norm();
    let tet = &lattice.tets[t as usize];
    let denom = tet.strength[j] * tet.margin[j] * dt;
    if !(len > 0.) || !(denom > 0.) {
        return None;
    }
    let n = n / len;
    let pn = link.p.dot(&n);
    let ln = link.l.dot(&n);
    let params = &lattice.params;
    let stresses = [
        (FailureMode::Pull, pn.max(0.), params.max_force_pull),
        (FailureMode::Push, (-pn).max(0.), params.max_force_push),
        (FailureMode::Shift, (link.p - n * pn).norm(), params.max_force_shift),
        (FailureMode::Twist, ln.abs(), params.max_torque_twist),
        (FailureMode::Bend, (link.l - n * ln).norm(), params.max_torque_bend),
    ];
    let mut worst: Option<FaceTension> = None;
    for (mode, load, limit) in stresses {
        let stress = load / denom;
        let ratio = (stress / limit.max(f32::MIN_POSITIVE)).powi(2);
        if worst.map_or(true, |w| ratio > w.ratio) {
            worst = Some(FaceTension {
                face,
                itet: t,
                iface: j,
                ratio,
                mode,
                magnitude: stress,
            });
        }
    }
    worst
}

/// Finds the most overloaded face of the last solve and records it as the lattice's last tension.
pub fn analyze(lattice: &mut Lattice, arena: &SolverArena, dt: f32) -> Option<FaceTension> {
    let mut worst: Option<FaceTension> = None;
    for (k, link) in arena.faces().iter().enumerate() {
        if let Some(ft) = face_tension(lattice, k, link, dt) {
            if worst.map_or(true, |w| ft.ratio > w.ratio) {
                worst = Some(ft);
            }
        }
    }
    if let Some(w) = worst {
        lattice.last_tension = LastTension {
            magnitude: w.magnitude,
            mode: w.mode,
        };
        if w.is_failure() {
            debug!(
                "Face {} of tetrahedron {} fails in {:?} at {:.3}x its limit.",
                w.iface,
                w.itet,
                w.mode,
                w.ratio.sqrt()
            );
        }
    }
    worst
}
