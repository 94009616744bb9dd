// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tinview_composite::{NeverCancel, RowSampler, SurfaceSampler, ValueGrid, ViewTransform};
use tinview_tin::{Tin, Vertex};

fn terrain(cells: usize) -> Arc<Tin> {
    let mut vs = Vec::with_capacity((cells + 1) * (cells + 1));
    for i in 0..=cells {
        for j in 0..=cells {
            let x = i as f64 + 0.013 * ((j * 7 + i * 3) % 5) as f64;
            let y = j as f64 + 0.011 * ((i * 5 + j * 2) % 7) as f64;
            let z = (x * 0.3).sin() * 5.0 + (y * 0.2).cos() * 3.0;
            vs.push(Vertex::new(x, y, z, vs.len() as i32));
        }
    }
    Arc::new(Tin::from_vertices(vs).expect("terrain"))
}

fn bench_grid_build(c: &mut Criterion) {
    let tin = terrain(64);
    let size = 128;
    let transform = ViewTransform::fit(tin.bounds(), size, size, 0.0).expect("transform");

    let mut group = c.benchmark_group("grid_build");
    group.sample_size(10);

    for (name, derivatives) in [("natural_neighbor", false), ("regression", true)] {
        let sampler = SurfaceSampler::for_mode(Arc::clone(&tin), derivatives);
        let rows = RowSampler::new(&transform, *tin.bounds(), size as usize, &sampler);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut grid = ValueGrid::new(size as usize, size as usize);
                rows.sample_grid(&mut grid, 16, &NeverCancel);
                black_box(grid)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grid_build);
criterion_main!(benches);
