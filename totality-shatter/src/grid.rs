//! Uniform spatial grid over the tetrahedra of a lattice.
//!
//! The grid lives in its own frame: rows of `basis` are the grid axes and cell `(0, 0, 0)` starts
//! at `origin`. A tetrahedron is listed in every cell its volume actually overlaps, so a cell
//! list can be trusted to hold every tetrahedron that may contain a point of that cell.

use crate::{
    flags::VtxFlag,
    lattice::{Tetrahedron, Vertex},
    remap::IndexRemap,
};
use model::geom::{tet, Obb};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Vector3};

const MAX_DIM: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub lo: [usize; 3],
    pub hi: [usize; 3],
}

impl CellRange {
    pub fn is_empty(&self) -> bool {
        (0..3).any(|k| self.lo[k] >= self.hi[k])
    }

    pub fn len(&self) -> usize {
        (0..3).map(|k| self.hi[k].saturating_sub(self.lo[k])).product()
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    basis: Matrix3<f32>,
    origin: Vector3<f32>,
    step: Vector3<f32>,
    rstep: Vector3<f32>,
    dims: [usize; 3],
    stride: [usize; 3],
    offsets: Vec<u32>,
    items: Vec<u32>,
}

impl Grid {
    /// Sizes the grid to the live vertices and registers every live tetrahedron.
    pub fn build(basis: Matrix3<f32>, verts: &[Vertex], tets: &[Tetrahedron], cell_factor: f32) -> Grid {
        let mut pts: Vec<Vector3<f32>> = verts
            .iter()
            .filter(|v| !v.flags.contains(VtxFlag::Removed))
            .map(|v| basis * v.pos)
            .collect();
        if pts.is_empty() {
            pts = verts.iter().map(|v| basis * v.pos).collect();
        }
        let (lo, hi) = match pts.split_first() {
            Some((first, rest)) => rest
                .iter()
                .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p))),
            None => (Vector3::zeros(), Vector3::zeros()),
        };
        let size = (hi - lo).map(|x| x.max(1e-6));
        let n_live = tets.iter().filter(|t| !t.is_removed()).count().max(1);
        let rate = (n_live as f32 * cell_factor / size.product()).cbrt();
        let mut dims = [1usize; 3];
        for k in 0..3 {
            dims[k] = ((size[k] * rate).round() as usize).clamp(1, MAX_DIM);
        }
        let step = Vector3::from_fn(|k, _| size[k] / dims[k] as f32);
        let mut grid = Grid {
            basis,
            origin: basis.transpose() * lo,
            step,
            rstep: step.map(|s| 1. / s),
            dims,
            stride: [dims[1] * dims[2], dims[2], 1],
            offsets: Vec::new(),
            items: Vec::new(),
        };

        let half = step * 0.5;
        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for (i, t) in tets.iter().enumerate().filter(|(_, t)| !t.is_removed()) {
            let pts = t.vertices.map(|v| grid.local(&verts[v as usize].pos));
            let (tlo, thi) = pts[1..]
                .iter()
                .fold((pts[0], pts[0]), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
            let range = grid.span(&tlo, &thi);
            for ic in grid.cells(range) {
                let cc = grid.coords(ic);
                let center = Vector3::from_fn(|k, _| (cc[k] as f32 + 0.5) * step[k]);
                if tet::overlaps_box(&pts, &center, &half) {
                    pairs.push((ic as u32, i as u32));
                }
            }
        }

        let n_cells = dims.iter().product::<usize>();
        let mut offsets = vec![0u32; n_cells + 1];
        for (c, _) in pairs.iter() {
            offsets[*c as usize + 1] += 1;
        }
        for c in 0..n_cells {
            offsets[c + 1] += offsets[c];
        }
        let mut cursor = offsets.clone();
        let mut items = vec![0u32; pairs.len()];
        for (c, t) in pairs {
            items[cursor[c as usize] as usize] = t;
            cursor[c as usize] += 1;
        }
        grid.offsets = offsets;
        grid.items = items;
        debug!(
            "Built {:?} grid with {} registrations for {} tetrahedra.",
            dims,
            grid.items.len(),
            n_live
        );
        grid
    }

    /// Position of `p` in grid coordinates.
    #[inline]
    pub fn local(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.basis * (p - self.origin)
    }

    pub fn basis(&self) -> &Matrix3<f32> {
        &self.basis
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn step(&self) -> Vector3<f32> {
        self.step
    }

    pub fn cell_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn registrations(&self) -> usize {
        self.items.len()
    }

    pub fn index(&self, c: [usize; 3]) -> usize {
        c[0] * self.stride[0] + c[1] * self.stride[1] + c[2] * self.stride[2]
    }

    fn coords(&self, i: usize) -> [usize; 3] {
        [
            i / self.stride[0],
            i % self.stride[0] / self.stride[1],
            i % self.stride[1],
        ]
    }

    /// Cell containing `p`; points outside the grid snap to the nearest border cell.
    pub fn cell_of(&self, p: &Vector3<f32>) -> usize {
        let l = self.local(p);
        let mut c = [0; 3];
        for k in 0..3 {
            let x = (l[k] * self.rstep[k]).floor();
            c[k] = if x > 0. { (x as usize).min(self.dims[k] - 1) } else { 0 };
        }
        self.index(c)
    }

    pub fn cell(&self, i: usize) -> &[u32] {
        &self.items[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    /// Cells touched by the grid-space box `lo..hi`, clamped to the grid.
    fn span(&self, lo: &Vector3<f32>, hi: &Vector3<f32>) -> CellRange {
        let mut r = CellRange { lo: [0; 3], hi: [0; 3] };
        for k in 0..3 {
            let clamp = |x: f32| if x > 0. { (x as usize).min(self.dims[k]) } else { 0 };
            r.lo[k] = clamp((lo[k] * self.rstep[k] - 0.5).round());
            r.hi[k] = clamp((hi[k] * self.rstep[k] + 0.5).round());
        }
        r
    }

    /// Cells overlapped by an oriented box given in the lattice frame.
    pub fn range_of_box(&self, obb: &Obb) -> CellRange {
        let rel = self.basis * obb.basis.transpose();
        let extent = rel.abs() * obb.half;
        let c = self.local(&obb.center);
        self.span(&(c - extent), &(c + extent))
    }

    pub fn cells(&self, r: CellRange) -> impl Iterator<Item = usize> + '_ {
        let [x0, y0, z0] = r.lo;
        let [x1, y1, z1] = r.hi;
        (x0..x1).flat_map(move |x| {
            (y0..y1).flat_map(move |y| (z0..z1).map(move |z| self.index([x, y, z])))
        })
    }

    /// Tetrahedra registered in the range; a tetrahedron spanning several cells repeats.
    pub fn tets_in(&self, r: CellRange) -> impl Iterator<Item = u32> + '_ {
        self.cells(r).flat_map(move |c| self.cell(c).iter().copied())
    }

    /// Renumbers the cell lists after the tetrahedron array was compacted.
    pub(crate) fn remap(&mut self, remap: &IndexRemap) {
        let mut offsets = Vec::with_capacity(self.offsets.len());
        let mut items = Vec::with_capacity(self.items.len());
        offsets.push(0);
        for c in 0..self.cell_count() {
            items.extend(self.cell(c).iter().filter_map(|&t| remap.get(t)));
            offsets.push(items.len() as u32);
        }
        self.offsets = offsets;
        self.items = items;
    }
}
