use glam::{IVec3, UVec3};

use super::*;

fn ramp_volume(size: UVec3) -> ChunkBuf {
  let mut buf = ChunkBuf::zeroed(size);
  for z in 0..size.z {
    for y in 0..size.y {
      for x in 0..size.x {
        buf.set(x, y, z, (x + 10 * y + 100 * z) as u16);
      }
    }
  }
  buf
}

#[test]
fn test_gridbox_from_key() {
  let b = GridBox::from_key(IVec3::new(2, 0, 1), 30);
  assert_eq!(b.min, IVec3::new(60, 0, 30));
  assert_eq!(b.max, IVec3::new(90, 30, 60));
  assert_eq!(b.size(), UVec3::splat(30));
}

#[test]
fn test_gridbox_pad_and_intersection() {
  let b = GridBox::from_key(IVec3::ZERO, 30).padded(1);
  assert_eq!(b.min, IVec3::splat(-1));
  let level = GridBox::from_size(UVec3::new(40, 40, 40));
  let i = b.intersection(level).unwrap();
  assert_eq!(i.min, IVec3::ZERO);
  assert_eq!(i.max, IVec3::splat(31));

  let far = GridBox::from_key(IVec3::splat(10), 30);
  assert!(far.intersection(level).is_none());
}

#[test]
fn test_chunk_count() {
  assert_eq!(chunk_count(1, 126), 1);
  assert_eq!(chunk_count(126, 126), 1);
  assert_eq!(chunk_count(127, 126), 2);
  assert_eq!(chunk_count(252, 126), 2);
}

#[test]
fn test_pyramid_sizes_halve() {
  let vol = InMemoryVolume::new(ramp_volume(UVec3::new(40, 30, 20)), 3);
  assert_eq!(vol.levels(), 3);
  assert_eq!(vol.level_size(0), UVec3::new(40, 30, 20));
  assert_eq!(vol.level_size(1), UVec3::new(20, 15, 10));
  assert_eq!(vol.level_size(2), UVec3::new(10, 8, 5));
}

#[test]
fn test_read_chunk_addressing() {
  let vol = InMemoryVolume::new(ramp_volume(UVec3::new(16, 16, 16)), 1);
  let (buf, misses) =
    vol.read_chunk(0, GridBox::new(IVec3::new(2, 3, 4), IVec3::new(6, 8, 10)));
  assert_eq!(misses, 0);
  assert_eq!(buf.size, UVec3::new(4, 5, 6));
  // buf[z][y][x] addressing: voxel (2,3,4) lands at local (0,0,0)
  assert_eq!(buf.at(0, 0, 0), 2 + 30 + 400);
  assert_eq!(buf.at(3, 4, 5), 5 + 70 + 900);
}

#[test]
fn test_downsample_is_mean() {
  let mut level0 = ChunkBuf::zeroed(UVec3::splat(4));
  for z in 0..2 {
    for y in 0..2 {
      for x in 0..2 {
        level0.set(x, y, z, 8);
      }
    }
  }
  let vol = InMemoryVolume::new(level0, 2);
  let (buf, _) = vol.read_chunk(1, GridBox::from_size(UVec3::splat(2)));
  assert_eq!(buf.at(0, 0, 0), 8);
  assert_eq!(buf.at(1, 1, 1), 0);
}

#[test]
fn test_cold_region_reports_misses_then_warms() {
  let mut vol = InMemoryVolume::new(ramp_volume(UVec3::splat(16)), 1);
  let cold = GridBox::new(IVec3::ZERO, IVec3::splat(4));
  vol.set_cold_region(cold);

  let read = GridBox::new(IVec3::ZERO, IVec3::splat(8));
  let (buf, misses) = vol.read_chunk(0, read);
  assert_eq!(misses, 64);
  assert_eq!(buf.at(0, 0, 0), 0);
  assert_ne!(buf.at(7, 7, 7), 0);

  vol.warm();
  let (buf, misses) = vol.read_chunk(0, read);
  assert_eq!(misses, 0);
  assert_eq!(buf.at(1, 1, 1), 1 + 10 + 100);
}
