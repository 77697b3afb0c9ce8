//! Crack propagation from an overloaded face.
//!
//! A failing face is handed to the crack generator for a cutting shape and the skin mesh is cut.
//! When the cut succeeds the face breaks and the crack spreads around each of its edges: the
//! faces fanning out from an edge are visited one neighbour at a time, and those roughly coplanar
//! with the broken face are weakened. Weakened faces that now fail are queued for cracking in turn.

use crate::{
    lattice::Lattice,
    solver::SolverArena,
    tension::{face_tension, FaceTension},
};
use model::{
    geom::{tri, CrackGenerator, SkinMesh},
    AffineTransform,
};

use arrayvec::ArrayVec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::collections::VecDeque;

/// Bounded FIFO of faces waiting to crack. Faces pushed while it is full are counted and dropped.
#[derive(Debug, Clone)]
pub struct CrackQueue {
    items: VecDeque<(u32, usize)>,
    capacity: usize,
    dropped: usize,
}

impl CrackQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, tet: u32, face: usize) -> bool {
        if self.items.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.items.push_back((tet, face));
        true
    }

    pub fn pop(&mut self) -> Option<(u32, usize)> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CrackReport {
    /// Faces taken off the queue, cracked or not.
    pub processed: usize,
    pub cracked: usize,
    /// Faces whose crack could not be cut into the mesh and got a higher margin instead.
    pub reinforced: usize,
    pub weakened: usize,
    pub dropped: usize,
}

/// Cracks `seed` and whatever fails along with it, up to the lattice's crack budget.
pub fn propagate(
    lattice: &mut Lattice,
    arena: &mut SolverArena,
    seed: &FaceTension,
    mesh: &mut dyn SkinMesh,
    gen: &mut dyn CrackGenerator,
    dt: f32,
) -> CrackReport {
    let cfg = lattice.config;
    let max_cracks = lattice.params.max_cracks;
    let weaken = lattice.params.crack_weaken;
    let own_pose = AffineTransform::identity();
    let mut report = CrackReport::default();
    let mut queue = CrackQueue::new(cfg.crack_queue_capacity);

    arena.faces[seed.face].processed = true;
    queue.push(seed.itet, seed.iface);

    while report.processed < max_cracks {
        let Some((t0, f0)) = queue.pop() else { break };
        report.processed += 1;

        let tri_pts = lattice.face_points(t0, f0);
        let cut = match gen.crack_geom(&tri_pts, cfg.id_mat) {
            Some(crack) => mesh.subtract(crack.geom.as_ref(), &own_pose, &crack.pose),
            None => false,
        };
        if !cut {
            lattice.scale_margin(t0, f0, cfg.reinforce_factor);
            report.reinforced += 1;
            debug!("Crack at face {} of tetrahedron {} could not be cut; reinforced.", f0, t0);
            continue;
        }
        lattice.set_face_strength(t0, f0, 0.);
        report.cracked += 1;

        let n0 = lattice.face_normal(t0, f0);
        let face = lattice.face_vertices(t0, f0);
        for apex in face {
            let edge: ArrayVec<u32, 2> = face.iter().copied().filter(|&v| v != apex).collect();
            let Some(mut f) = lattice.tet(t0).vertices.iter().position(|&v| v == apex) else { continue };
            let mut t = t0;
            loop {
                let Some((nb, nf)) = lattice.face_across(t, f) else { break };
                let Some(k) = arena.face_index(nb, nf) else { break };
                if arena.faces[k].processed {
                    break;
                }
                arena.faces[k].processed = true;

                if tri::aligned(&lattice.face_normal(nb, nf), &n0, cfg.fin_alignment) {
                    lattice.scale_face(nb, nf, weaken);
                    report.weakened += 1;
                    let fails = face_tension(lattice, k, &arena.faces[k], dt).map_or(false, |ft| ft.is_failure());
                    if fails {
                        let rec = &arena.faces[k];
                        if !queue.push(rec.itet, rec.iface) {
                            warn!("Crack queue full, dropping face {} of tetrahedron {}.", rec.iface, rec.itet);
                        }
                        break;
                    }
                }

                // turn around the edge to the other face of `nb` that holds it
                let vs = lattice.tet(nb).vertices;
                let Some(next) = (0..4).find(|&m| m != nf && !edge.contains(&vs[m])) else { break };
                t = nb;
                f = next;
            }
        }
    }

    report.dropped = queue.dropped();
    debug!("Crack propagation finished: {:?}", report);
    report
}
