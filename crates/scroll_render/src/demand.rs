//! View-driven chunk demand: from the xyz readback to a block-key list.
//!
//! The surface renderer draws fragment geometry into an RGBA16 buffer whose
//! color channels carry volume-space xyz (one voxel per unit) and whose
//! alpha marks covered pixels. Downsampling that buffer and bucketing the
//! covered positions into chunks of the zoom-appropriate pyramid level
//! yields exactly the blocks the data pass needs. Coarser ancestors are
//! prepended so the shader always has something to paint while fine chunks
//! stream in.

use std::collections::BTreeSet;

use glam::IVec3;
use tracing::debug;

use crate::atlas::BlockKey;
use crate::fb::Rgba16Fbo;

/// Downsampling step over the xyz readback.
const DECIMATION: usize = 4;
/// Zoom slack: smaller values switch to coarse levels earlier.
const FUZZ: f32 = 0.75;

/// One frame's chunk demand, coarsest level first.
#[derive(Clone, Debug, Default)]
pub struct DemandPlan {
  pub keys: Vec<BlockKey>,
  /// The finest level requested.
  pub level: u32,
  /// Key count before the cap was applied.
  pub requested: usize,
  /// True when the list was cut to the cap; the caller should redraw.
  pub truncated: bool,
}

/// Choose the pyramid level for a zoom factor: the first level whose scale
/// `1 / 2^l` drops below `2 * zoom * fuzz`, clamped to the pyramid.
pub fn level_for_zoom(zoom: f32, levels: usize) -> (u32, u32) {
  let mut scale = 1u32;
  let mut level = 0u32;
  for l in 0..levels as u32 {
    level = l;
    if 1.0 / (scale as f32) < 2.0 * zoom * FUZZ || l == levels as u32 - 1 {
      break;
    }
    scale *= 2;
  }
  (level, scale)
}

/// Compute the demand list for the current xyz readback.
///
/// `max_keys` is the atlas cap (`M - 1`); beyond it the list is truncated
/// coarse-end first kept, and `truncated` asks for a follow-up frame.
pub fn plan_demand(
  xyz_arr: &Rgba16Fbo,
  zoom: f32,
  levels: usize,
  chunk: u32,
  max_keys: usize,
) -> DemandPlan {
  let (level, scale) = level_for_zoom(zoom, levels);
  let dv = (chunk * scale) as i32;

  let mut fine: BTreeSet<(i32, i32, i32)> = BTreeSet::new();
  for y in (0..xyz_arr.height).step_by(DECIMATION) {
    for x in (0..xyz_arr.width).step_by(DECIMATION) {
      let px = xyz_arr.get(x, y);
      if px[3] == 0 {
        continue;
      }
      fine.insert((
        px[0] as i32 / dv,
        px[1] as i32 / dv,
        px[2] as i32 / dv,
      ));
    }
  }
  if fine.is_empty() {
    return DemandPlan {
      keys: Vec::new(),
      level,
      requested: 0,
      truncated: false,
    };
  }

  // Derive each coarser level by halving, then emit coarsest first so finer
  // chunks overwrite coarser ones in the shader.
  let mut per_level: Vec<(u32, BTreeSet<(i32, i32, i32)>)> = vec![(level, fine)];
  for l in level + 1..levels as u32 {
    let next: BTreeSet<(i32, i32, i32)> = per_level[per_level.len() - 1]
      .1
      .iter()
      .map(|k| (k.0 / 2, k.1 / 2, k.2 / 2))
      .collect();
    per_level.push((l, next));
  }

  let mut keys = Vec::new();
  for (l, set) in per_level.iter().rev() {
    for &(x, y, z) in set {
      keys.push(BlockKey {
        level: *l,
        k: IVec3::new(x, y, z),
      });
    }
  }

  let requested = keys.len();
  let truncated = requested > max_keys;
  if truncated {
    keys.truncate(max_keys);
  }
  debug!(level, n = keys.len(), requested, truncated, "demand planned");
  DemandPlan {
    keys,
    level,
    requested,
    truncated,
  }
}

#[cfg(test)]
#[path = "demand_test.rs"]
mod demand_test;
