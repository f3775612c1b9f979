use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::UVec3;
use scroll_core::volume::{ChunkBuf, InMemoryVolume};
use scroll_render::{Atlas, BlockKey};

fn bench_add_blocks(c: &mut Criterion) {
  let mut level0 = ChunkBuf::zeroed(UVec3::splat(128));
  for (i, v) in level0.data.iter_mut().enumerate() {
    *v = (i % 65536) as u16;
  }
  let volume = InMemoryVolume::new(level0, 2);
  let mut atlas = Atlas::new(&volume, UVec3::new(256, 256, 128), 30);

  let keys: Vec<BlockKey> = (0..4)
    .flat_map(|z| (0..4).flat_map(move |y| (0..4).map(move |x| BlockKey::new(0, x, y, z))))
    .collect();

  c.bench_function("atlas_add_blocks_cycle", |b| {
    let mut offset = 0usize;
    b.iter(|| {
      // Rotate through the key pool so every call mixes hits and loads.
      let window: Vec<BlockKey> = (0..8).map(|i| keys[(offset + i) % keys.len()]).collect();
      offset += 3;
      black_box(atlas.add_blocks(&volume, &window))
    })
  });
}

criterion_group!(benches, bench_add_blocks);
criterion_main!(benches);
