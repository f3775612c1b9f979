//! Volume proxy: typed chunk access over a multi-resolution pyramid.
//!
//! The on-disk store (format, decompression, caching) lives elsewhere; this
//! module only fixes the contract the engine consumes. A volume is a pyramid
//! of `L >= 1` levels of unsigned 16-bit intensities, each successive level
//! roughly halving every dimension. Chunk reads are deterministic and may
//! report *misses*: voxels not yet resident in the cold store, returned as
//! zero without failing the read.
//!
//! Naming follows the chunk/key vocabulary used throughout the engine:
//! a *block key* `(level, kx, ky, kz)` addresses the cubic region
//! `[k*A, (k+1)*A)` of side `A` on its level.

use glam::{IVec3, UVec3};

/// Owned `u16` voxel buffer addressed `buf[z][y][x]`.
#[derive(Clone, Debug)]
pub struct ChunkBuf {
  /// Extents as (nx, ny, nz).
  pub size: UVec3,
  /// Row-major with x fastest: `data[(z * ny + y) * nx + x]`.
  pub data: Vec<u16>,
}

impl ChunkBuf {
  pub fn zeroed(size: UVec3) -> Self {
    let len = (size.x as usize) * (size.y as usize) * (size.z as usize);
    Self {
      size,
      data: vec![0; len],
    }
  }

  #[inline]
  fn index(&self, x: u32, y: u32, z: u32) -> usize {
    ((z as usize * self.size.y as usize) + y as usize) * self.size.x as usize + x as usize
  }

  #[inline]
  pub fn at(&self, x: u32, y: u32, z: u32) -> u16 {
    self.data[self.index(x, y, z)]
  }

  #[inline]
  pub fn set(&mut self, x: u32, y: u32, z: u32, v: u16) {
    let i = self.index(x, y, z);
    self.data[i] = v;
  }

  /// Copy `src` into this buffer with its min corner at `dst0`.
  /// The copy must fit; callers clamp first.
  pub fn blit(&mut self, dst0: UVec3, src: &ChunkBuf) {
    for z in 0..src.size.z {
      for y in 0..src.size.y {
        let di = self.index(dst0.x, dst0.y + y, dst0.z + z);
        let si = src.index(0, y, z);
        self.data[di..di + src.size.x as usize]
          .copy_from_slice(&src.data[si..si + src.size.x as usize]);
      }
    }
  }
}

/// Half-open integer box `[min, max)` in voxel coordinates of one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBox {
  pub min: IVec3,
  pub max: IVec3,
}

impl GridBox {
  pub fn new(min: IVec3, max: IVec3) -> Self {
    Self { min, max }
  }

  /// The box covered by block key `k` for cubic chunks of side `chunk`.
  pub fn from_key(k: IVec3, chunk: i32) -> Self {
    let min = k * chunk;
    Self {
      min,
      max: min + IVec3::splat(chunk),
    }
  }

  /// The full extent of a level of size `size`.
  pub fn from_size(size: UVec3) -> Self {
    Self {
      min: IVec3::ZERO,
      max: size.as_ivec3(),
    }
  }

  pub fn padded(self, pad: i32) -> Self {
    Self {
      min: self.min - IVec3::splat(pad),
      max: self.max + IVec3::splat(pad),
    }
  }

  pub fn intersection(self, other: Self) -> Option<Self> {
    let min = self.min.max(other.min);
    let max = self.max.min(other.max);
    if min.x < max.x && min.y < max.y && min.z < max.z {
      Some(Self { min, max })
    } else {
      None
    }
  }

  pub fn size(self) -> UVec3 {
    (self.max - self.min).as_uvec3()
  }
}

/// Number of chunks of side `chunk` needed to cover `extent` voxels.
/// The last chunk may stretch beyond the end of the data.
#[inline]
pub fn chunk_count(extent: u32, chunk: u32) -> u32 {
  1 + (extent.saturating_sub(1)) / chunk
}

/// Read access to a resolution pyramid of u16 intensities.
///
/// `read_chunk` must behave deterministically for equal arguments. A nonzero
/// miss count means some voxels were not yet resident; the buffer is still
/// fully defined (zero where missing) and the same read may succeed later.
pub trait VolumeStore {
  fn levels(&self) -> usize;

  /// Extents (w, h, d) of `level`.
  fn level_size(&self, level: usize) -> UVec3;

  /// Read `bounds` (which must lie inside the level extents) at `level`.
  /// Returns the buffer and the number of missed voxels.
  fn read_chunk(&self, level: usize, bounds: GridBox) -> (ChunkBuf, u64);
}

/// A fully materialized pyramid, used by tests and the demo.
///
/// Built from a level-0 buffer by repeated 2x mean downsampling. An optional
/// *cold region* on level 0 simulates a store that has not pulled those
/// voxels yet: reads overlapping it return zeros there and count misses
/// until [`InMemoryVolume::warm`] is called.
pub struct InMemoryVolume {
  levels: Vec<ChunkBuf>,
  cold: Option<GridBox>,
}

impl InMemoryVolume {
  pub fn new(level0: ChunkBuf, levels: usize) -> Self {
    assert!(levels >= 1);
    let mut pyramid = Vec::with_capacity(levels);
    pyramid.push(level0);
    for l in 1..levels {
      let next = downsample2(&pyramid[l - 1]);
      pyramid.push(next);
    }
    Self {
      levels: pyramid,
      cold: None,
    }
  }

  /// Mark a level-0 region as not yet resident.
  pub fn set_cold_region(&mut self, region: GridBox) {
    self.cold = Some(region);
  }

  /// Make everything resident.
  pub fn warm(&mut self) {
    self.cold = None;
  }
}

impl VolumeStore for InMemoryVolume {
  fn levels(&self) -> usize {
    self.levels.len()
  }

  fn level_size(&self, level: usize) -> UVec3 {
    self.levels[level].size
  }

  fn read_chunk(&self, level: usize, bounds: GridBox) -> (ChunkBuf, u64) {
    let src = &self.levels[level];
    let mut out = ChunkBuf::zeroed(bounds.size());
    let mut misses = 0u64;
    let cold = if level == 0 { self.cold } else { None };
    for z in bounds.min.z..bounds.max.z {
      for y in bounds.min.y..bounds.max.y {
        for x in bounds.min.x..bounds.max.x {
          let p = IVec3::new(x, y, z);
          let in_cold = cold.is_some_and(|c| {
            p.cmpge(c.min).all() && p.cmplt(c.max).all()
          });
          let v = if in_cold {
            misses += 1;
            0
          } else {
            src.at(x as u32, y as u32, z as u32)
          };
          out.set(
            (x - bounds.min.x) as u32,
            (y - bounds.min.y) as u32,
            (z - bounds.min.z) as u32,
            v,
          );
        }
      }
    }
    (out, misses)
  }
}

/// Mean 2x downsample, rounding extents up so odd sizes keep their tail.
fn downsample2(src: &ChunkBuf) -> ChunkBuf {
  let dsize = (src.size + UVec3::ONE) / 2;
  let mut dst = ChunkBuf::zeroed(dsize);
  for z in 0..dsize.z {
    for y in 0..dsize.y {
      for x in 0..dsize.x {
        let mut sum = 0u32;
        let mut n = 0u32;
        for dz in 0..2 {
          for dy in 0..2 {
            for dx in 0..2 {
              let sx = 2 * x + dx;
              let sy = 2 * y + dy;
              let sz = 2 * z + dz;
              if sx < src.size.x && sy < src.size.y && sz < src.size.z {
                sum += src.at(sx, sy, sz) as u32;
                n += 1;
              }
            }
          }
        }
        dst.set(x, y, z, (sum / n.max(1)) as u16);
      }
    }
  }
  dst
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
