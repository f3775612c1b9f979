//! 3D texture atlas with LRU chunk residency.
//!
//! The atlas texture is divided into fixed cubic slots of side `A + 2`,
//! where `A` is the data-chunk side and the single-voxel border keeps
//! trilinear sampling from bleeding between neighboring slots. Each slot
//! holds one volume chunk addressed by its block key `(level, kx, ky, kz)`.
//!
//! Residency is an ordered map: least-recently-used slot at the front,
//! most-recently-used at the back, realized as a doubly-linked list over the
//! slot slab plus a key -> slot hash. `add_blocks` walks a frame's demand
//! list, refreshing resident keys and loading missing ones into evicted
//! front slots, bounded by a per-frame upload cap. `display_blocks` then
//! draws the fragment sampling the atlas through per-slot AABB and
//! transform uniform tables.
//!
//! Shader contract: the uniform blocks are bound in alphabetical order
//! `ChartIds`, `TMaxs`, `TMins`, `XForms` (binding points 3, 0, 1, 2), the
//! sampler uniform is `atlas`, and rows follow std140 (vec3 and int rows
//! padded to 16 bytes).

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Mat4, UVec3, Vec2, Vec3};
use scroll_core::error::ScrollError;
use scroll_core::volume::{ChunkBuf, GridBox, VolumeStore};
use tracing::{debug, trace};

use crate::fb::Rgba16Fbo;
use crate::raster::{clip_to_pixel, fill_triangle};
use crate::texture3d::Texture3d;

/// Default data-chunk side.
pub const DEFAULT_CHUNK: u32 = 126;
/// One-voxel slot border against trilinear bleed.
pub const PAD: u32 = 1;

/// Address of one chunk in the resolution pyramid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockKey {
  pub level: u32,
  pub k: IVec3,
}

impl BlockKey {
  pub fn new(level: u32, kx: i32, ky: i32, kz: i32) -> Self {
    Self {
      level,
      k: IVec3::new(kx, ky, kz),
    }
  }
}

/// std140 vec3 row (padded to 16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vec4Row(pub [f32; 4]);

/// std140 mat4 row.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Mat4Row(pub [[f32; 4]; 4]);

/// std140 int row (ints align to 16 bytes in uniform arrays).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct IntRow(pub [i32; 4]);

/// The uniform tables consumed by the data-pass shader.
#[derive(Clone, Debug)]
pub struct UniformTables {
  pub tmins: Vec<Vec4Row>,
  pub tmaxs: Vec<Vec4Row>,
  pub xforms: Vec<Mat4Row>,
  pub chart_ids: Vec<IntRow>,
  pub ncharts: usize,
}

impl UniformTables {
  fn new(capacity: usize) -> Self {
    Self {
      tmins: vec![Vec4Row::default(); capacity],
      tmaxs: vec![Vec4Row::default(); capacity],
      xforms: vec![Mat4Row::default(); capacity],
      chart_ids: vec![IntRow::default(); capacity],
      ncharts: 0,
    }
  }
}

/// One atlas slot: a fixed sub-cube of the texture plus the residency and
/// sampling state of the chunk it currently holds.
#[derive(Clone, Debug)]
struct Slot {
  /// Texel corner of this slot inside the atlas texture.
  ak: UVec3,
  key: Option<BlockKey>,
  /// AABB of valid data in normalized volume coordinates of the chunk's
  /// level; `tmax = (-1,-1,-1)` hides a provisional slot from the shader.
  tmin: Vec3,
  tmax: Vec3,
  /// Normalized volume coordinates -> atlas texture coordinates.
  xform: Mat4,
  misses: u64,
  in_use: bool,
}

#[derive(Clone, Copy, Debug)]
struct Node {
  prev: i32,
  next: i32,
}

/// The atlas: texture, slot slab, LRU order and uniform tables.
pub struct Atlas {
  texture: Texture3d,
  chunk: u32,
  slot_side: u32,
  level_sizes: Vec<UVec3>,
  upload_cap: usize,
  slots: Vec<Slot>,
  nodes: Vec<Node>,
  head: i32,
  tail: i32,
  map: HashMap<BlockKey, usize>,
  /// Mutated during loads; copied to `tables` on flush.
  staging: UniformTables,
  /// The consistent snapshot the data pass samples from.
  tables: UniformTables,
}

impl Atlas {
  /// Carve `tex_size` into slots of side `chunk_size + 2`. The per-frame
  /// upload cap is 3, or 10 for small chunks.
  pub fn new(volume: &dyn VolumeStore, tex_size: UVec3, chunk_size: u32) -> Self {
    let slot_side = chunk_size + 2 * PAD;
    let grid = tex_size / slot_side;
    assert!(grid.x > 0 && grid.y > 0 && grid.z > 0, "atlas texture too small");
    let capacity = (grid.x * grid.y * grid.z) as usize;
    let level_sizes = (0..volume.levels()).map(|l| volume.level_size(l)).collect();

    let mut slots = Vec::with_capacity(capacity);
    for kz in 0..grid.z {
      for ky in 0..grid.y {
        for kx in 0..grid.x {
          slots.push(Slot {
            ak: UVec3::new(kx, ky, kz) * slot_side,
            key: None,
            tmin: Vec3::ZERO,
            tmax: Vec3::ZERO,
            xform: Mat4::IDENTITY,
            misses: 0,
            in_use: false,
          });
        }
      }
    }
    let nodes = (0..capacity as i32)
      .map(|i| Node {
        prev: i - 1,
        next: if i + 1 < capacity as i32 { i + 1 } else { -1 },
      })
      .collect();

    debug!(capacity, slot_side, "atlas created");
    Self {
      texture: Texture3d::new(grid * slot_side),
      chunk: chunk_size,
      slot_side,
      level_sizes,
      upload_cap: if chunk_size < 65 { 10 } else { 3 },
      slots,
      nodes,
      head: 0,
      tail: capacity as i32 - 1,
      map: HashMap::with_capacity(capacity),
      staging: UniformTables::new(capacity),
      tables: UniformTables::new(capacity),
    }
  }

  /// Total slot count `M`.
  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  /// Longest demand list the atlas accepts per frame.
  pub fn max_demand(&self) -> usize {
    self.capacity() - 1
  }

  pub fn upload_cap(&self) -> usize {
    self.upload_cap
  }

  /// Data-chunk side `A`.
  pub fn chunk_size(&self) -> u32 {
    self.chunk
  }

  /// Drop all residency; every slot becomes empty again.
  pub fn reset(&mut self) {
    self.map.clear();
    for slot in &mut self.slots {
      slot.key = None;
      slot.tmin = Vec3::ZERO;
      slot.tmax = Vec3::ZERO;
      slot.misses = 0;
      slot.in_use = false;
    }
    let n = self.slots.len() as i32;
    for (i, node) in self.nodes.iter_mut().enumerate() {
      node.prev = i as i32 - 1;
      node.next = if (i as i32) + 1 < n { i as i32 + 1 } else { -1 };
    }
    self.head = 0;
    self.tail = n - 1;
    self.staging = UniformTables::new(self.slots.len());
    self.tables = UniformTables::new(self.slots.len());
  }

  /// Resident keys from least- to most-recently used.
  pub fn lru_keys(&self) -> Vec<BlockKey> {
    let mut out = Vec::new();
    let mut i = self.head;
    while i >= 0 {
      if let Some(key) = self.slots[i as usize].key {
        out.push(key);
      }
      i = self.nodes[i as usize].next;
    }
    out
  }

  /// The four uniform buffers in their alphabetical binding order.
  pub fn uniform_bytes(&self) -> [(&'static str, &[u8]); 4] {
    [
      ("ChartIds", bytemuck::cast_slice(&self.tables.chart_ids)),
      ("TMaxs", bytemuck::cast_slice(&self.tables.tmaxs)),
      ("TMins", bytemuck::cast_slice(&self.tables.tmins)),
      ("XForms", bytemuck::cast_slice(&self.tables.xforms)),
    ]
  }

  fn unlink(&mut self, i: usize) {
    let Node { prev, next } = self.nodes[i];
    if prev >= 0 {
      self.nodes[prev as usize].next = next;
    } else {
      self.head = next;
    }
    if next >= 0 {
      self.nodes[next as usize].prev = prev;
    } else {
      self.tail = prev;
    }
    self.nodes[i] = Node { prev: -1, next: -1 };
  }

  fn push_back(&mut self, i: usize) {
    self.nodes[i] = Node {
      prev: self.tail,
      next: -1,
    };
    if self.tail >= 0 {
      self.nodes[self.tail as usize].next = i as i32;
    } else {
      self.head = i as i32;
    }
    self.tail = i as i32;
  }

  /// Fill slot `i` with the chunk under `key`: read the padded box clipped
  /// to the level extents (margins stay zero), upload the subtexture and
  /// refresh the slot's AABB and transform. A read with misses leaves the
  /// texture untouched and hides the slot behind the sentinel AABB so the
  /// planner retries later. Returns whether the texture was written.
  fn load_slot(&mut self, i: usize, key: BlockKey, volume: &dyn VolumeStore) -> bool {
    let dsz = self.level_sizes[key.level as usize];
    let dr = GridBox::from_key(key.k, self.chunk as i32);
    let pdr = dr.padded(PAD as i32);
    let mut buf = ChunkBuf::zeroed(UVec3::splat(self.slot_side));
    let Some(clipped) = pdr.intersection(GridBox::from_size(dsz)) else {
      // A key entirely outside the level: nothing to upload, keep the slot
      // hidden behind the sentinel AABB.
      let slot = &mut self.slots[i];
      slot.misses = 0;
      slot.tmin = Vec3::ZERO;
      slot.tmax = Vec3::splat(-1.0);
      self.staging.tmins[i] = Vec4Row::default();
      self.staging.tmaxs[i] = Vec4Row([-1.0, -1.0, -1.0, 0.0]);
      return false;
    };
    let (data, misses) = volume.read_chunk(key.level as usize, clipped);
    buf.blit((clipped.min - pdr.min).as_uvec3(), &data);

    let dszv = dsz.as_vec3();
    let slot = &mut self.slots[i];
    slot.misses = misses;
    if misses == 0 {
      self.texture.write_subcube(slot.ak, &buf);
      slot.tmin = dr.min.as_vec3() / dszv;
      slot.tmax = dr.max.as_vec3() / dszv;
    } else {
      trace!(?key, "{}", ScrollError::ChunkProvisional { misses });
      slot.tmin = Vec3::ZERO;
      slot.tmax = Vec3::splat(-1.0);
    }
    let asz = self.texture.size().as_vec3();
    slot.xform = Mat4::from_scale(asz.recip())
      * Mat4::from_translation(
        (slot.ak.as_ivec3() + IVec3::splat(PAD as i32) - dr.min).as_vec3(),
      )
      * Mat4::from_scale(dszv);

    self.staging.tmins[i] = Vec4Row([slot.tmin.x, slot.tmin.y, slot.tmin.z, 0.0]);
    self.staging.tmaxs[i] = Vec4Row([slot.tmax.x, slot.tmax.y, slot.tmax.z, 0.0]);
    self.staging.xforms[i] = Mat4Row(slot.xform.to_cols_array_2d());
    misses == 0
  }

  /// Work through one frame's demand list.
  ///
  /// The in-use suffix from the previous frame is released first. Resident
  /// keys move to the MRU end (reloading if their last read missed and the
  /// cap allows); absent keys evict the LRU front. The geometry uniform
  /// tables flush once if anything uploaded. Returns whether the upload cap
  /// was reached, a hint for the planner to run again next frame.
  pub fn add_blocks(&mut self, volume: &dyn VolumeStore, demand: &[BlockKey]) -> bool {
    let mut i = self.tail;
    while i >= 0 {
      let s = i as usize;
      if !self.slots[s].in_use {
        break;
      }
      self.slots[s].in_use = false;
      i = self.nodes[s].prev;
    }

    let mut uploaded = 0usize;
    for &key in demand {
      if let Some(&s) = self.map.get(&key) {
        if self.slots[s].misses > 0 && uploaded < self.upload_cap {
          if self.load_slot(s, key, volume) {
            uploaded += 1;
          }
        }
        self.unlink(s);
        self.push_back(s);
        self.slots[s].in_use = true;
      } else {
        if uploaded >= self.upload_cap {
          continue;
        }
        let s = self.head as usize;
        self.unlink(s);
        if let Some(old) = self.slots[s].key.take() {
          self.map.remove(&old);
        }
        if self.load_slot(s, key, volume) {
          uploaded += 1;
        }
        self.slots[s].key = Some(key);
        self.map.insert(key, s);
        self.push_back(s);
        self.slots[s].in_use = true;
      }
    }

    if uploaded > 0 {
      self.tables.tmins.copy_from_slice(&self.staging.tmins);
      self.tables.tmaxs.copy_from_slice(&self.staging.tmaxs);
      self.tables.xforms.copy_from_slice(&self.staging.xforms);
    }
    debug!(
      demanded = demand.len(),
      uploaded,
      residents = self.map.len(),
      "add_blocks"
    );
    uploaded >= self.upload_cap
  }

  /// Draw the fragment triangles into `fbo`, sampling the atlas.
  ///
  /// The in-use slots are listed coarsest level first so finer levels
  /// overwrite coarser ones per pixel. Pixels covered by no slot keep the
  /// mid-grey base; pixels outside every triangle stay transparent.
  pub fn display_blocks(
    &mut self,
    fbo: &mut Rgba16Fbo,
    xyz: &[Vec3],
    st: &[Vec2],
    trgls: &[[u32; 3]],
    st_xform: Mat4,
  ) {
    fbo.clear([0, 0, 0, 0]);

    let mut charts: Vec<usize> = Vec::new();
    let mut i = self.tail;
    while i >= 0 {
      let s = i as usize;
      if !self.slots[s].in_use {
        break;
      }
      charts.push(s);
      i = self.nodes[s].prev;
    }
    charts.sort_by_key(|&s| {
      std::cmp::Reverse(self.slots[s].key.map(|k| k.level).unwrap_or(0))
    });
    for (j, &s) in charts.iter().enumerate() {
      self.staging.chart_ids[j] = IntRow([s as i32, 0, 0, 0]);
    }
    self.staging.ncharts = charts.len();
    self.tables.chart_ids.copy_from_slice(&self.staging.chart_ids);
    self.tables.ncharts = self.staging.ncharts;

    let inv0 = self.level_sizes[0].as_vec3().recip();
    let (w, h) = (fbo.width, fbo.height);
    for t in trgls {
      let sv = [
        st[t[0] as usize],
        st[t[1] as usize],
        st[t[2] as usize],
      ];
      let xv = [
        xyz[t[0] as usize],
        xyz[t[1] as usize],
        xyz[t[2] as usize],
      ];
      let px = sv.map(|p| {
        let c = st_xform * p.extend(0.0).extend(1.0);
        clip_to_pixel(Vec2::new(c.x, c.y), w, h)
      });
      fill_triangle(w, h, px[0], px[1], px[2], |x, y, bary| {
        let fxyz = (xv[0] * bary[0] + xv[1] * bary[1] + xv[2] * bary[2]) * inv0;
        // Mid-grey where no resident slot covers this position.
        let mut color = [32768u16, 32768, 32768, 65535];
        for ci in 0..self.tables.ncharts {
          let id = self.tables.chart_ids[ci].0[0] as usize;
          let tmin = self.tables.tmins[id].0;
          let tmax = self.tables.tmaxs[id].0;
          if fxyz.x >= tmin[0]
            && fxyz.x <= tmax[0]
            && fxyz.y >= tmin[1]
            && fxyz.y <= tmax[1]
            && fxyz.z >= tmin[2]
            && fxyz.z <= tmax[2]
          {
            let xform = Mat4::from_cols_array_2d(&self.tables.xforms[id].0);
            let tc = xform.transform_point3(fxyz);
            let g = (self.texture.sample(tc) * 65535.0).round() as u16;
            color = [g, g, g, 65535];
          }
        }
        fbo.put(x, y, color);
      });
    }
  }
}

#[cfg(test)]
#[path = "atlas_test.rs"]
mod atlas_test;
