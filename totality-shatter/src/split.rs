use crate::{
    flags::{FlagSet, TetFlag, VtxFlag},
    lattice::{Lattice, Tetrahedron, Vertex},
    remap::IndexRemap,
};
use model::geom::Geom;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

impl Lattice {
    /// Moves the tetrahedra whose centroids fall inside each chunk into a lattice of their own.
    ///
    /// Chunks are given in the lattice frame and claimed in order; a tetrahedron taken by one chunk
    /// is not available to the next. Chunks that would get fewer tetrahedra than the configured
    /// minimum yield `None` and leave their tetrahedra in place.
    pub fn split<G: Geom>(&mut self, chunks: &[G]) -> Vec<Option<Lattice>> {
        let mut out = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let lattice = self.split_one(chunk);
            match &lattice {
                Some(l) => info!("Chunk {} took {} tetrahedra.", i, l.tets.len()),
                None => debug!("Chunk {} too small, discarded.", i),
            }
            out.push(lattice);
        }
        self.defragment();
        out
    }

    fn split_one<G: Geom>(&mut self, chunk: &G) -> Option<Lattice> {
        let bbox = chunk.bbox();
        let candidates: Vec<u32> = {
            let grid = self.ensure_grid();
            grid.tets_in(grid.range_of_box(&bbox)).collect()
        };
        let mut tmap = IndexRemap::new(self.tets.len());
        let mut tet_head: Option<u32> = None;
        for t in candidates {
            let tet = &self.tets[t as usize];
            if tet.flags.any(&[TetFlag::Removed, TetFlag::Processed]) {
                continue;
            }
            let c = self.center(t);
            let tet = &mut self.tets[t as usize];
            tet.flags.insert(TetFlag::Processed);
            tet.next = tet_head;
            tet_head = Some(t);
            if bbox.contains(&c) && chunk.point_inside(&c) {
                tmap.assign(t);
            }
        }

        let taken = tmap.len() >= self.config.min_chunk_tets.max(1);
        let lattice = taken.then(|| self.extract(&tmap));
        while let Some(t) = tet_head {
            let tet = &mut self.tets[t as usize];
            tet.flags.remove(TetFlag::Processed);
            tet_head = tet.next.take();
            if taken && tmap.get(t).is_some() {
                self.remove_tet(t);
            }
        }
        lattice
    }

    /// Copies the tetrahedra mapped by `tmap` into a new lattice. Links that leave the set are cut
    /// on both sides and their faces become skin.
    fn extract(&mut self, tmap: &IndexRemap) -> Lattice {
        let mut vmap = IndexRemap::new(self.verts.len());
        let mut tets = Vec::with_capacity(tmap.len());
        let mut skin: Vec<(usize, usize)> = Vec::new();
        for old in tmap.inverse() {
            let src = &self.tets[old as usize];
            let mut tet = Tetrahedron {
                vertices: src.vertices.map(|v| vmap.assign(v)),
                flags: FlagSet::empty(),
                next: None,
                ..src.clone()
            };
            for j in 0..4 {
                let Some(b) = src.buddies[j] else { continue };
                tet.buddies[j] = tmap.get(b);
                if tet.buddies[j].is_none() {
                    skin.push((tets.len(), j));
                }
            }
            tets.push(tet);
            for j in 0..4 {
                if let Some(b) = self.tets[old as usize].buddies[j] {
                    if tmap.get(b).is_none() {
                        if let Some(bf) = self.tets[b as usize].face_of(old) {
                            self.tets[b as usize].buddies[bf] = None;
                            for v in self.face_vertices(b, bf) {
                                self.verts[v as usize].flags.insert(VtxFlag::Surface);
                            }
                        }
                        self.tets[old as usize].buddies[j] = None;
                    }
                }
            }
        }

        let mut verts: Vec<Vertex> = vmap
            .inverse()
            .into_iter()
            .map(|old| {
                let src = &self.verts[old as usize];
                let mut flags = FlagSet::empty();
                for flag in [VtxFlag::Removed, VtxFlag::Surface] {
                    flags.set(flag, src.flags.contains(flag));
                }
                Vertex {
                    pos: src.pos,
                    flags,
                    next: None,
                }
            })
            .collect();
        for (t, j) in skin {
            let tet: &Tetrahedron = &tets[t];
            for k in model::geom::tet::FACES[j] {
                verts[tet.vertices[k] as usize].flags.insert(VtxFlag::Surface);
            }
        }

        let mut lattice = Lattice::from_parts(verts, tets, self.params, self.config, self.grid_basis);
        lattice.rebuild_grid();
        lattice
    }
}
