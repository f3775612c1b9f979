//! The atlas backing store: a single-channel unorm 16-bit 3D texture with
//! linear filtering and clamp-to-border wrap (border = 0).

use glam::{UVec3, Vec3};
use scroll_core::volume::ChunkBuf;

/// R16-unorm 3D texture. Texel (x, y, z) lives at
/// `data[(z * h + y) * w + x]`; sampling is trilinear over normalized
/// coordinates with a zero border outside [0, 1].
pub struct Texture3d {
  size: UVec3,
  data: Vec<u16>,
}

impl Texture3d {
  pub fn new(size: UVec3) -> Self {
    let len = size.x as usize * size.y as usize * size.z as usize;
    Self {
      size,
      data: vec![0; len],
    }
  }

  pub fn size(&self) -> UVec3 {
    self.size
  }

  #[inline]
  fn index(&self, x: u32, y: u32, z: u32) -> usize {
    ((z as usize * self.size.y as usize) + y as usize) * self.size.x as usize + x as usize
  }

  /// Upload a sub-cube with its min corner at `corner`.
  pub fn write_subcube(&mut self, corner: UVec3, buf: &ChunkBuf) {
    assert!(corner.x + buf.size.x <= self.size.x);
    assert!(corner.y + buf.size.y <= self.size.y);
    assert!(corner.z + buf.size.z <= self.size.z);
    for z in 0..buf.size.z {
      for y in 0..buf.size.y {
        let di = self.index(corner.x, corner.y + y, corner.z + z);
        let row = &buf.data[((z * buf.size.y + y) * buf.size.x) as usize..]
          [..buf.size.x as usize];
        self.data[di..di + buf.size.x as usize].copy_from_slice(row);
      }
    }
  }

  /// Raw texel read, zero outside the texture (clamp-to-border).
  #[inline]
  fn texel(&self, x: i32, y: i32, z: i32) -> f32 {
    if x < 0
      || y < 0
      || z < 0
      || x as u32 >= self.size.x
      || y as u32 >= self.size.y
      || z as u32 >= self.size.z
    {
      return 0.0;
    }
    self.data[self.index(x as u32, y as u32, z as u32)] as f32 / 65535.0
  }

  /// Trilinear sample at normalized texture coordinates, result in [0, 1].
  pub fn sample(&self, tc: Vec3) -> f32 {
    let p = tc * self.size.as_vec3() - 0.5;
    let f = p.floor();
    let (x0, y0, z0) = (f.x as i32, f.y as i32, f.z as i32);
    let d = p - f;
    let mut acc = 0.0;
    for dz in 0..2 {
      for dy in 0..2 {
        for dx in 0..2 {
          let w = (if dx == 0 { 1.0 - d.x } else { d.x })
            * (if dy == 0 { 1.0 - d.y } else { d.y })
            * (if dz == 0 { 1.0 - d.z } else { d.z });
          acc += w * self.texel(x0 + dx, y0 + dy, z0 + dz);
        }
      }
    }
    acc
  }
}

#[cfg(test)]
#[path = "texture3d_test.rs"]
mod texture3d_test;
