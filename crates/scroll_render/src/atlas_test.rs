use glam::{UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scroll_core::volume::{ChunkBuf, GridBox, InMemoryVolume, VolumeStore};

use super::*;

fn test_volume(value: u16) -> InMemoryVolume {
  let mut level0 = ChunkBuf::zeroed(UVec3::splat(64));
  level0.data.fill(value);
  InMemoryVolume::new(level0, 2)
}

/// Atlas with exactly 4 slots (chunk 30, slot 32, texture 128 x 32 x 32).
fn small_atlas(volume: &InMemoryVolume) -> Atlas {
  let atlas = Atlas::new(volume, UVec3::new(128, 32, 32), 30);
  assert_eq!(atlas.capacity(), 4);
  assert_eq!(atlas.upload_cap(), 10);
  atlas
}

#[test]
fn test_eviction_follows_lru_front() {
  let volume = test_volume(1000);
  let mut atlas = small_atlas(&volume);

  let k1 = BlockKey::new(0, 0, 0, 0);
  let k2 = BlockKey::new(0, 1, 0, 0);
  let k3 = BlockKey::new(0, 0, 1, 0);
  let k4 = BlockKey::new(0, 1, 1, 0);
  let k5 = BlockKey::new(0, 0, 0, 1);
  let k6 = BlockKey::new(0, 1, 0, 1);
  let k7 = BlockKey::new(0, 1, 1, 1);

  assert!(!atlas.add_blocks(&volume, &[k1, k2, k3, k4]));
  let mut first: Vec<BlockKey> = atlas.lru_keys();
  assert_eq!(first.len(), 4);

  atlas.add_blocks(&volume, &[k2, k5, k6, k7]);
  first = atlas.lru_keys();
  assert_eq!(first, vec![k2, k5, k6, k7]);
}

#[test]
fn test_resident_key_moves_to_mru() {
  let volume = test_volume(1);
  let mut atlas = small_atlas(&volume);
  let keys = [
    BlockKey::new(0, 0, 0, 0),
    BlockKey::new(0, 1, 0, 0),
    BlockKey::new(0, 0, 1, 0),
  ];
  atlas.add_blocks(&volume, &keys);
  // Re-demand the oldest; it must survive the next eviction round.
  atlas.add_blocks(&volume, &[keys[0]]);
  atlas.add_blocks(&volume, &[
    BlockKey::new(0, 1, 1, 0),
    BlockKey::new(0, 0, 0, 1),
    BlockKey::new(0, 1, 0, 1),
  ]);
  let residents = atlas.lru_keys();
  assert!(residents.contains(&keys[0]));
  assert!(!residents.contains(&keys[1]));
  assert!(!residents.contains(&keys[2]));
}

#[test]
fn test_lru_law_random_sequences() {
  let volume = test_volume(7);
  let mut atlas = small_atlas(&volume);
  let mut rng = StdRng::seed_from_u64(11);
  // Reference model: ordered list, MRU at the back.
  let mut model: Vec<BlockKey> = Vec::new();

  let pool: Vec<BlockKey> = (0..2)
    .flat_map(|z| (0..2).flat_map(move |y| (0..2).map(move |x| BlockKey::new(0, x, y, z))))
    .collect();

  for _ in 0..200 {
    let n = rng.random_range(1..=3);
    let demand: Vec<BlockKey> = (0..n)
      .map(|_| pool[rng.random_range(0..pool.len())])
      .collect();
    atlas.add_blocks(&volume, &demand);
    for key in demand {
      if let Some(pos) = model.iter().position(|k| *k == key) {
        model.remove(pos);
      } else if model.len() == 4 {
        model.remove(0);
      }
      model.push(key);
    }
    assert_eq!(atlas.lru_keys(), model);
  }
}

#[test]
fn test_upload_cap_limits_new_slots() {
  let mut level0 = ChunkBuf::zeroed(UVec3::splat(256));
  level0.data.fill(9);
  let volume = InMemoryVolume::new(level0, 1);
  // chunk 126 -> upload cap 3; texture 1024^2 x 128 -> 8 x 8 x 1 slots
  let mut atlas = Atlas::new(&volume, UVec3::new(1024, 1024, 128), 126);
  assert_eq!(atlas.upload_cap(), 3);
  let demand = [
    BlockKey::new(0, 0, 0, 0),
    BlockKey::new(0, 1, 0, 0),
    BlockKey::new(0, 2, 0, 0),
    BlockKey::new(0, 0, 1, 0),
    BlockKey::new(0, 1, 1, 0),
  ];
  let maxed = atlas.add_blocks(&volume, &demand);
  assert!(maxed);
  assert_eq!(atlas.lru_keys().len(), 3);
}

#[test]
fn test_provisional_slot_hidden_then_retried() {
  let mut volume = test_volume(500);
  volume.set_cold_region(GridBox::new(
    glam::IVec3::ZERO,
    glam::IVec3::splat(16),
  ));
  let mut atlas = small_atlas(&volume);
  let key = BlockKey::new(0, 0, 0, 0);

  atlas.add_blocks(&volume, &[key]);
  let s = atlas.map[&key];
  assert!(atlas.slots[s].misses > 0);
  assert_eq!(atlas.slots[s].tmax, Vec3::splat(-1.0));

  // The store warms up; re-demanding the same key reloads it in place.
  volume.warm();
  atlas.add_blocks(&volume, &[key]);
  let s = atlas.map[&key];
  assert_eq!(atlas.slots[s].misses, 0);
  assert!(atlas.slots[s].tmax.x > 0.0);
}

#[test]
fn test_slot_aabb_maps_into_slot_texels() {
  let volume = test_volume(1234);
  let mut atlas = small_atlas(&volume);
  let key = BlockKey::new(0, 1, 0, 1);
  atlas.add_blocks(&volume, &[key]);
  let s = atlas.map[&key];
  let slot = atlas.slots[s].clone();
  assert_eq!(slot.misses, 0);

  let asz = atlas.texture.size().as_vec3();
  let lo = slot.ak.as_vec3() / asz;
  let hi = (slot.ak.as_vec3() + Vec3::splat(atlas.slot_side as f32)) / asz;
  let mut rng = StdRng::seed_from_u64(3);
  for _ in 0..50 {
    let p = Vec3::new(
      rng.random_range(slot.tmin.x..=slot.tmax.x),
      rng.random_range(slot.tmin.y..=slot.tmax.y),
      rng.random_range(slot.tmin.z..=slot.tmax.z),
    );
    let tc = slot.xform.transform_point3(p);
    for c in 0..3 {
      assert!(tc[c] >= lo[c] - 1e-5 && tc[c] <= hi[c] + 1e-5, "{tc:?}");
    }
  }
}

#[test]
fn test_loaded_slot_samples_volume_value() {
  let volume = test_volume(40000);
  let mut atlas = small_atlas(&volume);
  let key = BlockKey::new(0, 0, 0, 0);
  atlas.add_blocks(&volume, &[key]);
  let s = atlas.map[&key];
  let slot = &atlas.slots[s];
  // Sample the middle of the chunk through the slot transform.
  let mid = (slot.tmin + slot.tmax) * 0.5;
  let tc = slot.xform.transform_point3(mid);
  let v = atlas.texture.sample(tc);
  assert!((v - 40000.0 / 65535.0).abs() < 1e-3, "{v}");
}

#[test]
fn test_reset_empties_all_slots() {
  let volume = test_volume(5);
  let mut atlas = small_atlas(&volume);
  atlas.add_blocks(&volume, &[BlockKey::new(0, 0, 0, 0)]);
  assert_eq!(atlas.lru_keys().len(), 1);
  atlas.reset();
  assert!(atlas.lru_keys().is_empty());
  assert_eq!(atlas.capacity(), 4);
}

#[test]
fn test_uniform_bytes_std140_sizes() {
  let volume = test_volume(5);
  let atlas = small_atlas(&volume);
  let m = atlas.capacity();
  let bufs = atlas.uniform_bytes();
  assert_eq!(bufs[0].0, "ChartIds");
  assert_eq!(bufs[1].0, "TMaxs");
  assert_eq!(bufs[2].0, "TMins");
  assert_eq!(bufs[3].0, "XForms");
  assert_eq!(bufs[0].1.len(), m * 16);
  assert_eq!(bufs[1].1.len(), m * 16);
  assert_eq!(bufs[2].1.len(), m * 16);
  assert_eq!(bufs[3].1.len(), m * 64);
}
