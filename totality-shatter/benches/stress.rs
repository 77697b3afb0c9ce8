use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;
use totality_model::{
    cube_lattice,
    geom::{Crack, CrackGenerator, Geom, Obb, Plane, SkinMesh},
    AffineTransform,
};
use totality_shatter::{Lattice, Loads, SolverArena};

struct Slab(Obb);

impl Geom for Slab {
    fn bbox(&self) -> Obb {
        self.0
    }
    fn volume(&self) -> f32 {
        self.0.half.product() * 8.
    }
    fn point_inside(&self, pt: &Vector3<f32>) -> bool {
        self.0.contains(pt)
    }
}

impl SkinMesh for Slab {
    fn subtract(&mut self, _: &dyn Geom, _: &AffineTransform, _: &AffineTransform) -> bool {
        true
    }
}

struct NoCracks;

impl CrackGenerator for NoCracks {
    fn crack_geom(&mut self, _: &[Vector3<f32>; 3], _: i32) -> Option<Crack> {
        None
    }
}

fn block(n: usize) -> Lattice {
    let (pts, tets) = cube_lattice([n, n, n], 1.);
    let mut lattice = Lattice::new(&pts, &tets).unwrap();
    lattice.rebuild_grid();
    lattice
}

pub fn benchmark(c: &mut Criterion) {
    let ground = [Plane::new(Vector3::new(0., 0., 0.5), Vector3::z())];
    let loads = Loads::new(1. / 60., Vector3::new(0., 0., -9.8)).with_ground(&ground);
    let mut mesh = Slab(Obb::from_aabb(Vector3::repeat(-1.), Vector3::repeat(64.)));

    let mut group = c.benchmark_group("structure");
    for n in [4, 8] {
        let lattice = block(n);
        group.bench_function(format!("solve {}^3", n), |b| {
            let mut arena = SolverArena::default();
            b.iter(|| black_box(arena.solve(&lattice, &loads)));
        });
        group.bench_function(format!("check {}^3", n), |b| {
            b.iter_batched(
                || lattice.clone(),
                |mut l| black_box(l.check_structure(&loads, &mut mesh, &mut NoCracks)),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();

    c.bench_function("grid 8^3", |b| {
        let mut lattice = block(8);
        b.iter(|| lattice.rebuild_grid());
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
