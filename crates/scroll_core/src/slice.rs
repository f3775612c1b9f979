//! Plane/triangle intersection kernel for the slice view.
//!
//! Given an axis-aligned plane through the volume, every triangle crossing
//! it contributes one segment. The plane position is first nudged off any
//! vertex so per-vertex signs are strictly -1 or +1, which removes all
//! vertex-on-plane special cases; each surviving triangle then has exactly
//! one edge with equal signs and two crossing edges.

use glam::Vec3;
use rayon::prelude::*;

/// One segment per intersected triangle, `[x0,y0,z0, x1,y1,z1]`, plus the
/// index of the triangle that produced it.
#[derive(Clone, Debug, Default)]
pub struct SliceIntersections {
  pub segments: Vec<[f32; 6]>,
  pub trgl_indices: Vec<u32>,
}

impl SliceIntersections {
  pub fn len(&self) -> usize {
    self.segments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }
}

/// Edges in cyclic order: (1,2), (2,0), (0,1).
const EDGES: [(usize, usize); 3] = [(1, 2), (2, 0), (0, 1)];

/// Intersect all triangles with the plane `p[axis] == position`.
///
/// The two endpoints of each segment come out in a stable order: the two
/// crossing edges are emitted consecutively around the triangle, starting
/// just after the non-crossing edge.
pub fn find_intersections(
  points: &[Vec3],
  trgls: &[[u32; 3]],
  axis: usize,
  position: f32,
) -> SliceIntersections {
  let mut position = position;
  // Nudge until no vertex lies exactly on the plane.
  while points.iter().any(|p| p[axis] == position) {
    position += 0.01;
  }

  let rows: Vec<(u32, [f32; 6])> = trgls
    .par_iter()
    .enumerate()
    .filter_map(|(ti, t)| {
      let p = [
        points[t[0] as usize],
        points[t[1] as usize],
        points[t[2] as usize],
      ];
      let d = [
        p[0][axis] - position,
        p[1][axis] - position,
        p[2][axis] - position,
      ];
      let s = [d[0].signum(), d[1].signum(), d[2].signum()];
      if s[0] == s[1] && s[1] == s[2] {
        return None;
      }
      // Exactly one edge joins two vertices on the same side.
      let flat = EDGES.iter().position(|&(a, b)| s[a] == s[b])?;
      let mut seg = [0.0f32; 6];
      for k in 0..2 {
        let (a, b) = EDGES[(flat + 1 + k) % 3];
        let (fa, fb) = (d[a].abs(), d[b].abs());
        let i = (p[a] * fb + p[b] * fa) / (fa + fb);
        seg[3 * k] = i.x;
        seg[3 * k + 1] = i.y;
        seg[3 * k + 2] = i.z;
      }
      Some((ti as u32, seg))
    })
    .collect();

  let mut out = SliceIntersections::default();
  out.segments.reserve(rows.len());
  out.trgl_indices.reserve(rows.len());
  for (ti, seg) in rows {
    out.trgl_indices.push(ti);
    out.segments.push(seg);
  }
  out
}

#[cfg(test)]
#[path = "slice_test.rs"]
mod slice_test;
