use crate::{
    config::{LatticeConfig, LatticeParams, ParamsPatch},
    error::LatticeError,
    flags::{FlagSet, TetFlag, VtxFlag},
    grid::Grid,
    tension::LastTension,
};
use model::geom::{tet, tri, SkinFace};

use arrayvec::ArrayVec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use na::{Matrix3, Vector3};

#[derive(Debug, Clone)]
pub struct Vertex {
    pub pos: Vector3<f32>,
    pub flags: FlagSet<VtxFlag>,
    /// Link in the transient list of vertices touched by the running operation.
    pub next: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Tetrahedron {
    pub vertices: [u32; 4],
    /// Neighbour across each face; `None` marks a face on the outer skin.
    pub buddies: [Option<u32>; 4],
    pub mass: f32,
    pub inv_mass: f32,
    pub inv_volume: f32,
    pub inv_inertia: Matrix3<f32>,
    /// Mean face area, the cross-section used for blast loading and impulse admission.
    pub area: f32,
    /// Remaining load-bearing area of each face. Zero means the face has failed.
    pub strength: [f32; 4],
    /// Extra margin earned by faces whose crack could not be realized.
    pub margin: [f32; 4],
    pub p_ext: Vector3<f32>,
    pub l_ext: Vector3<f32>,
    pub flags: FlagSet<TetFlag>,
    pub next: Option<u32>,
}

impl Tetrahedron {
    #[inline]
    pub fn is_removed(&self) -> bool {
        self.flags.contains(TetFlag::Removed)
    }

    /// Face through which this tetrahedron touches `buddy`.
    pub fn face_of(&self, buddy: u32) -> Option<usize> {
        self.buddies.iter().position(|b| *b == Some(buddy))
    }
}

/// Hit returned by [`Lattice::check_point`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointHit {
    pub tet: u32,
    pub vertices: [u32; 4],
    pub weights: [f32; 4],
}

/// Tetrahedral model of a breakable body's interior.
#[derive(Debug, Clone)]
pub struct Lattice {
    pub(crate) verts: Vec<Vertex>,
    pub(crate) tets: Vec<Tetrahedron>,
    pub(crate) params: LatticeParams,
    pub(crate) config: LatticeConfig,
    pub(crate) n_removed: usize,
    pub(crate) last_tension: LastTension,
    pub(crate) last_impulse_time: Option<f32>,
    pub(crate) grid: Option<Grid>,
    pub(crate) grid_basis: Matrix3<f32>,
}

impl Lattice {
    pub fn new(positions: &[Vector3<f32>], tets: &[[u32; 4]]) -> Result<Self, LatticeError> {
        Self::with_config(positions, tets, LatticeParams::default(), LatticeConfig::default())
    }

    pub fn with_config(
        positions: &[Vector3<f32>],
        tets: &[[u32; 4]],
        params: LatticeParams,
        config: LatticeConfig,
    ) -> Result<Self, LatticeError> {
        if tets.is_empty() {
            return Err(LatticeError::Empty);
        }
        let mut verts: Vec<Vertex> = positions
            .iter()
            .map(|p| Vertex {
                pos: *p,
                flags: FlagSet::empty(),
                next: None,
            })
            .collect();

        let mut out = Vec::with_capacity(tets.len());
        for (i, ids) in tets.iter().enumerate() {
            if let Some(&bad) = ids.iter().find(|&&v| v as usize >= positions.len()) {
                return Err(LatticeError::VertexOutOfRange { tet: i, vertex: bad });
            }
            let mut ids = *ids;
            let mut pts = ids.map(|v| positions[v as usize]);
            if tet::signed_volume(&pts) < 0. {
                ids.swap(0, 1);
                pts.swap(0, 1);
            }
            out.push(Self::make_tet(i, ids, &pts, params.density)?);
        }

        link_faces(&mut out, &mut verts)?;
        debug!(
            "Built lattice of {} tetrahedra over {} vertices.",
            out.len(),
            verts.len()
        );
        Ok(Self::from_parts(verts, out, params, config, Matrix3::identity()))
    }

    pub(crate) fn from_parts(
        verts: Vec<Vertex>,
        tets: Vec<Tetrahedron>,
        params: LatticeParams,
        config: LatticeConfig,
        grid_basis: Matrix3<f32>,
    ) -> Self {
        Self {
            verts,
            tets,
            params,
            config,
            n_removed: 0,
            last_tension: LastTension::default(),
            last_impulse_time: None,
            grid: None,
            grid_basis,
        }
    }

    fn make_tet(i: usize, vertices: [u32; 4], pts: &[Vector3<f32>; 4], density: f32) -> Result<Tetrahedron, LatticeError> {
        let volume = tet::signed_volume(pts);
        let span = pts[1..]
            .iter()
            .map(|p| (p - pts[0]).norm())
            .fold(0f32, f32::max);
        if !(volume > span.powi(3) * 1e-7) {
            return Err(LatticeError::Degenerate { tet: i });
        }
        let mass = volume * density;
        let inv_inertia = tet::inertia(pts, mass)
            .try_inverse()
            .ok_or(LatticeError::Degenerate { tet: i })?;
        let strength = [0, 1, 2, 3].map(|j| tet::face_area(pts, j));
        Ok(Tetrahedron {
            vertices,
            buddies: [None; 4],
            mass,
            inv_mass: 1. / mass,
            inv_volume: 1. / volume,
            inv_inertia,
            area: strength.iter().sum::<f32>() * 0.25,
            strength,
            margin: [1.; 4],
            p_ext: Vector3::zeros(),
            l_ext: Vector3::zeros(),
            flags: FlagSet::empty(),
            next: None,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.verts
    }

    pub fn tetrahedra(&self) -> &[Tetrahedron] {
        &self.tets
    }

    pub fn tet(&self, t: u32) -> &Tetrahedron {
        &self.tets[t as usize]
    }

    pub fn live_tets(&self) -> impl Iterator<Item = (u32, &Tetrahedron)> + '_ {
        self.tets
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_removed())
            .map(|(i, t)| (i as u32, t))
    }

    pub fn live_tet_count(&self) -> usize {
        self.tets.iter().filter(|t| !t.is_removed()).count()
    }

    pub fn removed_count(&self) -> usize {
        self.n_removed
    }

    pub fn params(&self) -> &LatticeParams {
        &self.params
    }

    pub fn set_params(&mut self, patch: &ParamsPatch) {
        if let Some(density) = patch.density {
            if density > 0. && density != self.params.density {
                let diff = density / self.params.density;
                for t in self.tets.iter_mut() {
                    t.mass *= diff;
                    t.inv_mass /= diff;
                    t.inv_inertia /= diff;
                }
                let p = &mut self.params;
                p.max_force_push *= diff;
                p.max_force_pull *= diff;
                p.max_force_shift *= diff;
                p.max_torque_twist *= diff;
                p.max_torque_bend *= diff;
                p.density = density;
            }
        }
        let p = &mut self.params;
        if let Some(v) = patch.max_cracks {
            p.max_cracks = v;
        }
        if let Some(v) = patch.max_force_push {
            p.max_force_push = v;
        }
        if let Some(v) = patch.max_force_pull {
            p.max_force_pull = v;
        }
        if let Some(v) = patch.max_force_shift {
            p.max_force_shift = v;
        }
        if let Some(v) = patch.max_torque_twist {
            p.max_torque_twist = v;
        }
        if let Some(v) = patch.max_torque_bend {
            p.max_torque_bend = v;
        }
        if let Some(v) = patch.crack_weaken {
            p.crack_weaken = v;
        }
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LatticeConfig) {
        let regrid = config.grid_cell_factor != self.config.grid_cell_factor;
        self.config = config;
        if regrid {
            self.grid = None;
        }
    }

    pub fn last_tension(&self) -> LastTension {
        self.last_tension
    }

    pub fn tet_points(&self, t: u32) -> [Vector3<f32>; 4] {
        self.tets[t as usize].vertices.map(|v| self.verts[v as usize].pos)
    }

    pub fn center(&self, t: u32) -> Vector3<f32> {
        tet::centroid(&self.tet_points(t))
    }

    pub fn face_vertices(&self, t: u32, face: usize) -> [u32; 3] {
        let v = &self.tets[t as usize].vertices;
        tet::FACES[face].map(|k| v[k])
    }

    pub fn face_points(&self, t: u32, face: usize) -> [Vector3<f32>; 3] {
        self.face_vertices(t, face).map(|v| self.verts[v as usize].pos)
    }

    /// Outward normal of a face, scaled to twice its area.
    pub fn face_normal(&self, t: u32, face: usize) -> Vector3<f32> {
        let [a, b, c] = self.face_points(t, face);
        tri::normal(&a, &b, &c)
    }

    /// Neighbour across `face` and the index of the same face on the neighbour's side.
    pub fn face_across(&self, t: u32, face: usize) -> Option<(u32, usize)> {
        let b = self.tets[t as usize].buddies[face]?;
        let bf = self.tets[b as usize].face_of(t)?;
        Some((b, bf))
    }

    pub(crate) fn scale_face(&mut self, t: u32, face: usize, k: f32) {
        self.tets[t as usize].strength[face] *= k;
        if let Some((b, bf)) = self.face_across(t, face) {
            self.tets[b as usize].strength[bf] *= k;
        }
    }

    pub(crate) fn set_face_strength(&mut self, t: u32, face: usize, s: f32) {
        self.tets[t as usize].strength[face] = s;
        if let Some((b, bf)) = self.face_across(t, face) {
            self.tets[b as usize].strength[bf] = s;
        }
    }

    pub(crate) fn scale_margin(&mut self, t: u32, face: usize, k: f32) {
        self.tets[t as usize].margin[face] *= k;
        if let Some((b, bf)) = self.face_across(t, face) {
            self.tets[b as usize].margin[bf] *= k;
        }
    }

    /// Detaches `t` from all of its neighbours, on both sides of every shared face.
    pub(crate) fn unlink(&mut self, t: u32) {
        for face in 0..4 {
            if let Some((b, bf)) = self.face_across(t, face) {
                self.tets[b as usize].buddies[bf] = None;
            }
            self.tets[t as usize].buddies[face] = None;
        }
    }

    pub(crate) fn remove_tet(&mut self, t: u32) {
        if self.tets[t as usize].is_removed() {
            return;
        }
        self.unlink(t);
        self.tets[t as usize].flags.insert(TetFlag::Removed);
        self.n_removed += 1;
    }

    /// Whether every live neighbour link is mirrored and points at a live tetrahedron.
    pub fn links_consistent(&self) -> bool {
        self.live_tets().all(|(i, t)| {
            t.buddies.iter().all(|b| match b {
                None => true,
                Some(b) => self
                    .tets
                    .get(*b as usize)
                    .map_or(false, |bt| !bt.is_removed() && bt.face_of(i).is_some()),
            })
        })
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Orients the spatial grid along the rows of `basis` and rebuilds it.
    pub fn set_grid_basis(&mut self, basis: Matrix3<f32>) {
        self.grid_basis = basis;
        self.rebuild_grid();
    }

    pub fn rebuild_grid(&mut self) {
        self.grid = Some(Grid::build(
            self.grid_basis,
            &self.verts,
            &self.tets,
            self.config.grid_cell_factor,
        ));
    }

    pub fn ensure_grid(&mut self) -> &Grid {
        let (basis, factor) = (self.grid_basis, self.config.grid_cell_factor);
        let (verts, tets) = (&self.verts, &self.tets);
        self.grid
            .get_or_insert_with(|| Grid::build(basis, verts, tets, factor))
    }

    /// Finds the live tetrahedron containing `pt` and its barycentric weights.
    pub fn check_point(&mut self, pt: &Vector3<f32>) -> Option<PointHit> {
        let cell: Vec<u32> = {
            let grid = self.ensure_grid();
            grid.cell(grid.cell_of(pt)).to_vec()
        };
        cell.into_iter()
            .filter(|&t| !self.tets[t as usize].is_removed())
            .find_map(|t| {
                let weights = tet::barycentric(&self.tet_points(t), pt);
                weights.iter().all(|w| *w > 0.).then(|| PointHit {
                    tet: t,
                    vertices: self.tets[t as usize].vertices,
                    weights,
                })
            })
    }

    /// Boundary triangles of the live tetrahedra, wound outward.
    pub fn skin_faces(&self) -> Vec<SkinFace> {
        self.live_tets()
            .flat_map(|(i, t)| {
                (0..4)
                    .filter(move |&j| t.buddies[j].is_none())
                    .map(move |j| SkinFace {
                        indices: self.face_vertices(i, j),
                    })
            })
            .collect()
    }

    pub fn skin_indices(&self) -> Vec<u32> {
        bytemuck::cast_slice(&self.skin_faces()).to_vec()
    }
}

/// Derives face adjacency by intersecting, for every face, the tetrahedron lists of its three
/// vertices. Faces with a single owner are boundary faces and mark their vertices as surface.
fn link_faces(tets: &mut [Tetrahedron], verts: &mut [Vertex]) -> Result<(), LatticeError> {
    let mut start = vec![0usize; verts.len() + 1];
    for t in tets.iter() {
        for v in t.vertices.iter() {
            start[*v as usize + 1] += 1;
        }
    }
    for i in 0..verts.len() {
        start[i + 1] += start[i];
    }
    let mut cursor = start.clone();
    let mut owners_of = vec![0u32; tets.len() * 4];
    for (i, t) in tets.iter().enumerate() {
        for v in t.vertices.iter() {
            owners_of[cursor[*v as usize]] = i as u32;
            cursor[*v as usize] += 1;
        }
    }
    let list = |v: u32| &owners_of[start[v as usize]..start[v as usize + 1]];

    for i in 0..tets.len() {
        for j in 0..4 {
            let [a, b, c] = tet::FACES[j].map(|k| tets[i].vertices[k]);
            let mut owners = ArrayVec::<u32, 8>::new();
            for &t in list(a) {
                if list(b).binary_search(&t).is_ok() && list(c).binary_search(&t).is_ok() {
                    owners.try_push(t).map_err(|_| LatticeError::Topology {
                        tet: i,
                        face: j,
                        owners: owners.len() + 1,
                    })?;
                }
            }
            match owners.len() {
                1 => {
                    tets[i].buddies[j] = None;
                    for v in [a, b, c] {
                        verts[v as usize].flags.insert(VtxFlag::Surface);
                    }
                }
                2 => tets[i].buddies[j] = owners.iter().copied().find(|&t| t as usize != i),
                n => {
                    return Err(LatticeError::Topology {
                        tet: i,
                        face: j,
                        owners: n,
                    })
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn two_tets_share_one_face() {
        let lat = testing::two_tets();
        let (a, b) = (lat.tet(0), lat.tet(1));
        assert_eq!(a.buddies.iter().filter(|x| x.is_some()).count(), 1);
        let fa = a.face_of(1).unwrap();
        let fb = b.face_of(0).unwrap();
        assert_eq!(a.strength[fa], b.strength[fb]);
        assert!((a.strength[fa] - 3f32.sqrt() * 0.5).abs() < 1e-5);
        assert!(lat.links_consistent());
        // every vertex lies on some boundary face
        assert!(lat.vertices().iter().all(|v| v.flags.contains(VtxFlag::Surface)));
        assert_eq!(lat.skin_faces().len(), 6);
    }

    #[test]
    fn cube_lattice_is_symmetric_and_closed() {
        let lat = testing::cube([3, 3, 3]);
        assert!(lat.links_consistent());
        // two triangles per unit square on the boundary
        assert_eq!(lat.skin_faces().len(), 6 * 9 * 2);
        let center = lat.vertices()[(1 * 16 + 1 * 4 + 1) as usize].clone();
        assert!(!center.flags.contains(VtxFlag::Surface));
        let mass: f32 = lat.tetrahedra().iter().map(|t| t.mass).sum();
        assert!((mass - 27.).abs() < 1e-3);
    }

    #[test]
    fn inverted_input_is_reoriented() {
        let pts = [Vector3::zeros(), Vector3::x(), Vector3::y(), Vector3::z()];
        let lat = Lattice::new(&pts, &[[1, 0, 2, 3]]).unwrap();
        assert!(tet::signed_volume(&lat.tet_points(0)) > 0.);
        assert!((lat.tet(0).mass - 1. / 6.).abs() < 1e-6);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let pts = [
            Vector3::zeros(),
            Vector3::x(),
            Vector3::y(),
            Vector3::z(),
            Vector3::new(1., 1., 1.),
            Vector3::new(-1., -1., -1.),
        ];
        let err = Lattice::new(&pts, &[[0, 1, 2, 3], [1, 2, 3, 4], [1, 2, 3, 5]]).unwrap_err();
        assert!(matches!(err, LatticeError::Topology { owners: 3, .. }), "{:?}", err);

        assert_eq!(
            Lattice::new(&pts, &[[0, 1, 2, 9]]).unwrap_err(),
            LatticeError::VertexOutOfRange { tet: 0, vertex: 9 }
        );
        let flat = [Vector3::zeros(), Vector3::x(), Vector3::y(), Vector3::new(1., 1., 0.)];
        assert_eq!(
            Lattice::new(&flat, &[[0, 1, 2, 3]]).unwrap_err(),
            LatticeError::Degenerate { tet: 0 }
        );
        assert_eq!(Lattice::new(&pts, &[]).unwrap_err(), LatticeError::Empty);
    }

    #[test]
    fn density_change_rescales_mass_and_thresholds() {
        let mut lat = testing::two_tets();
        let m0 = lat.tet(0).mass;
        lat.set_params(&ParamsPatch {
            density: Some(2.),
            max_force_push: Some(5.),
            ..Default::default()
        });
        assert!((lat.tet(0).mass - 2. * m0).abs() < 1e-6);
        assert!((lat.tet(0).inv_mass - 0.5 / m0).abs() < 1e-3);
        assert!((lat.params().max_force_pull - 0.02).abs() < 1e-7);
        assert_eq!(lat.params().max_force_push, 5.);
        assert_eq!(lat.params().density, 2.);
    }

    #[test]
    fn point_query_finds_containing_tet() {
        let mut lat = testing::cube([2, 2, 2]);
        let pt = Vector3::new(0.3, 1.2, 1.7);
        let hit = lat.check_point(&pt).expect("point lies inside the block");
        assert!(tet::contains(&lat.tet_points(hit.tet), &pt));
        assert!((hit.weights.iter().sum::<f32>() - 1.).abs() < 1e-4);
        let back: Vector3<f32> = (0..4)
            .map(|k| lat.vertices()[hit.vertices[k] as usize].pos * hit.weights[k])
            .sum();
        assert!((back - pt).norm() < 1e-4);
        assert!(lat.check_point(&Vector3::new(5., 0.5, 0.5)).is_none());
    }

    #[test]
    fn skin_indices_flatten_faces() {
        let lat = testing::two_tets();
        let idx = lat.skin_indices();
        assert_eq!(idx.len(), lat.skin_faces().len() * 3);
        assert_eq!(&idx[..3], &lat.skin_faces()[0].indices);
    }
}
