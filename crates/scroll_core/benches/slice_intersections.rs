use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;
use scroll_core::slice::find_intersections;

/// Wavy sheet with ~2 * n * n triangles crossing the bench plane many times.
fn make_sheet(n: usize) -> (Vec<Vec3>, Vec<[u32; 3]>) {
  let mut points = Vec::with_capacity(n * n);
  for j in 0..n {
    for i in 0..n {
      let x = i as f32;
      let y = j as f32;
      points.push(Vec3::new(x, y, 20.0 + 8.0 * (0.3 * x).sin() * (0.2 * y).cos()));
    }
  }
  let mut trgls = Vec::new();
  for j in 0..n - 1 {
    for i in 0..n - 1 {
      let a = (j * n + i) as u32;
      trgls.push([a, a + 1, a + n as u32]);
      trgls.push([a + 1, a + 1 + n as u32, a + n as u32]);
    }
  }
  (points, trgls)
}

fn bench_find_intersections(c: &mut Criterion) {
  let (points, trgls) = make_sheet(256);
  c.bench_function("slice_intersections_256", |b| {
    b.iter(|| {
      let out = find_intersections(black_box(&points), black_box(&trgls), 2, 20.0);
      black_box(out.len())
    })
  });
}

criterion_group!(benches, bench_find_intersections);
criterion_main!(benches);
