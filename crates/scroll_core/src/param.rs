//! Flattened parameterization: the affine map from uv into "st" space.
//!
//! Fragment uv coordinates arrive stretched to [0, 1] with an arbitrary
//! rotation. The solver finds one affine transform (rotation + scale, then a
//! shift) taking uv into *scaled texture* coordinates such that:
//!
//! 1. the st y axis follows, as much as possible, the world vertical
//!    (volume +y), and
//! 2. each triangle locally keeps the area and angles it has in 3D.
//!
//! The fit works per triangle: flatten the triangle into an in-plane frame
//! whose first axis is perpendicular to the vertical, center both the
//! flattened xy and the uv samples on the triangle, and solve one global
//! least-squares system `A*(u,v) ~ (x,y)` over all triangle corners.
//! Triangles whose normal runs near the vertical carry no orientation
//! information and are down-weighted by `|n x j|`.

use glam::{Vec2, Vec3};

use crate::error::{Result, ScrollError};

/// The fitted affine map `st = [[a, b], [c, d]] * uv + shift`.
#[derive(Clone, Copy, Debug)]
pub struct StMap {
  pub a: f32,
  pub b: f32,
  pub c: f32,
  pub d: f32,
  pub shift: Vec2,
}

impl StMap {
  #[inline]
  pub fn apply(&self, uv: Vec2) -> Vec2 {
    Vec2::new(
      self.a * uv.x + self.b * uv.y,
      self.c * uv.x + self.d * uv.y,
    ) + self.shift
  }

  /// Inverse map from st back to uv.
  #[inline]
  pub fn stxy_to_uv(&self, st: Vec2) -> Vec2 {
    let det = self.a * self.d - self.b * self.c;
    let p = st - self.shift;
    Vec2::new(
      (self.d * p.x - self.b * p.y) / det,
      (-self.c * p.x + self.a * p.y) / det,
    )
  }
}

/// Solver output: the map, the mapped points, and footprint statistics.
#[derive(Clone, Debug)]
pub struct StSolution {
  pub map: StMap,
  pub stpoints: Vec<Vec2>,
  pub st_min: Vec2,
  pub st_max: Vec2,
  pub xyz_min: Vec3,
  pub xyz_max: Vec3,
  /// Characteristic spacing `h = sqrt(|size|^2 / N)`, the cell size of the
  /// outside ring and the scale of the edit window.
  pub avg_spacing: f32,
}

/// World vertical in volume coordinates.
const VERTICAL: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Fit the affine uv -> st map for one fragment.
///
/// Fails with [`ScrollError::DegenerateUv`] when the normal-equation
/// denominator vanishes (all uvs collinear, or every triangle degenerate);
/// the caller leaves the fragment un-flattened.
pub fn solve_st_map(points: &[Vec3], uvs: &[Vec2], trgls: &[[u32; 3]]) -> Result<StSolution> {
  if uvs.len() != points.len() || points.is_empty() {
    return Err(ScrollError::DegenerateUv);
  }

  // Normal-equation sums, f64 so millions of corners stay exact enough.
  let (mut s_uu, mut s_uv, mut s_vv) = (0f64, 0f64, 0f64);
  let (mut s_ux, mut s_uy, mut s_vx, mut s_vy) = (0f64, 0f64, 0f64, 0f64);

  for t in trgls {
    let p = [
      points[t[0] as usize],
      points[t[1] as usize],
      points[t[2] as usize],
    ];
    let centroid = (p[0] + p[1] + p[2]) / 3.0;
    let tnorm = (p[1] - p[0]).cross(p[2] - p[0]);
    // In-plane axis perpendicular to the vertical; its length doubles as
    // the reliability weight of this triangle.
    let fxy_axis = tnorm.cross(VERTICAL);
    let weight = fxy_axis.length();
    let fz_axis = tnorm.cross(fxy_axis);
    let fxy_axis = fxy_axis.normalize_or_zero();
    let fz_axis = fz_axis.normalize_or_zero();

    let q = [
      uvs[t[0] as usize],
      uvs[t[1] as usize],
      uvs[t[2] as usize],
    ];
    let uv_centroid = (q[0] + q[1] + q[2]) / 3.0;

    for i in 0..3 {
      let local = p[i] - centroid;
      let x = (weight * local.dot(fxy_axis)) as f64;
      let y = (weight * local.dot(fz_axis)) as f64;
      let cuv = (q[i] - uv_centroid) * weight;
      let (u, v) = (cuv.x as f64, cuv.y as f64);
      s_uu += u * u;
      s_uv += u * v;
      s_vv += v * v;
      s_ux += u * x;
      s_uy += u * y;
      s_vx += v * x;
      s_vy += v * y;
    }
  }

  let den = s_uu * s_vv - s_uv * s_uv;
  if den == 0.0 {
    return Err(ScrollError::DegenerateUv);
  }
  let a = ((s_vv * s_ux - s_uv * s_vx) / den) as f32;
  let b = ((-s_uv * s_ux + s_uu * s_vx) / den) as f32;
  let c = ((s_vv * s_uy - s_uv * s_vy) / den) as f32;
  let d = ((-s_uv * s_uy + s_uu * s_vy) / den) as f32;

  let mut stpoints: Vec<Vec2> = uvs
    .iter()
    .map(|t| Vec2::new(a * t.x + b * t.y, c * t.x + d * t.y))
    .collect();

  let (st_min, st_max) = bounds2(&stpoints);
  let (xyz_min, xyz_max) = bounds3(points);

  // Minimum to the origin, then recenter vertically: the mid-range of st.y
  // must match the mid-range of the mesh's vertical extent.
  let styc = 0.5 * (st_min.y + st_max.y);
  let zc = 0.5 * (xyz_min.y + xyz_max.y);
  let mut shift = -st_min;
  shift.y = zc - styc;
  for st in &mut stpoints {
    *st += shift;
  }
  let (st_min, st_max) = bounds2(&stpoints);

  let size = st_max - st_min;
  let avg_spacing = (size.length_squared() / stpoints.len() as f32).sqrt();

  Ok(StSolution {
    map: StMap { a, b, c, d, shift },
    stpoints,
    st_min,
    st_max,
    xyz_min,
    xyz_max,
    avg_spacing,
  })
}

fn bounds2(pts: &[Vec2]) -> (Vec2, Vec2) {
  let mut min = Vec2::splat(f32::INFINITY);
  let mut max = Vec2::splat(f32::NEG_INFINITY);
  for p in pts {
    min = min.min(*p);
    max = max.max(*p);
  }
  (min, max)
}

fn bounds3(pts: &[Vec3]) -> (Vec3, Vec3) {
  let mut min = Vec3::splat(f32::INFINITY);
  let mut max = Vec3::splat(f32::NEG_INFINITY);
  for p in pts {
    min = min.min(*p);
    max = max.max(*p);
  }
  (min, max)
}

/// Compute the outside ring: a one-cell-thick band of grid points two cells
/// away from the fragment's st footprint, enclosing it completely.
///
/// The footprint is rasterized into a boolean grid of cell size `spacing`
/// with a 5-cell margin. The connected empty region touching the grid border
/// is "outside"; everything else (points and enclosed holes) is "inside".
/// The ring is the difference between dilating the inside twice and once, so
/// later Delaunay passes over `st + ring` form large stable sky triangles
/// that are cheap to discard.
pub fn outside_points(stpoints: &[Vec2], st_min: Vec2, st_max: Vec2, spacing: f32) -> Vec<Vec2> {
  let id0x = (st_min.x / spacing - 5.0).floor() as i32;
  let id0y = (st_min.y / spacing - 5.0).floor() as i32;
  let id1x = (st_max.x / spacing + 5.0).ceil() as i32;
  let id1y = (st_max.y / spacing + 5.0).ceil() as i32;
  let nx = (id1x - id0x) as usize;
  let ny = (id1y - id0y) as usize;

  let at = |g: &[bool], x: i32, y: i32| -> bool {
    x >= 0 && y >= 0 && (x as usize) < nx && (y as usize) < ny && g[y as usize * nx + x as usize]
  };

  let mut occupied = vec![false; nx * ny];
  for p in stpoints {
    let cx = (p.x / spacing).floor() as i32 - id0x;
    let cy = (p.y / spacing).floor() as i32 - id0y;
    if cx >= 0 && cy >= 0 && (cx as usize) < nx && (cy as usize) < ny {
      occupied[cy as usize * nx + cx as usize] = true;
    }
  }

  // Flood the border-connected empty region (4-connectivity). The 5-cell
  // margin guarantees (0, 0) is empty.
  let mut outside = vec![false; nx * ny];
  let mut stack = vec![(0i32, 0i32)];
  outside[0] = true;
  while let Some((x, y)) = stack.pop() {
    for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
      let (px, py) = (x + dx, y + dy);
      if px >= 0
        && py >= 0
        && (px as usize) < nx
        && (py as usize) < ny
        && !occupied[py as usize * nx + px as usize]
        && !outside[py as usize * nx + px as usize]
      {
        outside[py as usize * nx + px as usize] = true;
        stack.push((px, py));
      }
    }
  }

  let inside: Vec<bool> = outside.iter().map(|o| !o).collect();
  let dilate = |src: &[bool]| -> Vec<bool> {
    let mut dst = vec![false; nx * ny];
    for y in 0..ny as i32 {
      for x in 0..nx as i32 {
        let mut any = false;
        'probe: for dy in -1..=1 {
          for dx in -1..=1 {
            if at(src, x + dx, y + dy) {
              any = true;
              break 'probe;
            }
          }
        }
        dst[y as usize * nx + x as usize] = any;
      }
    }
    dst
  };
  let d1 = dilate(&inside);
  let d2 = dilate(&d1);

  let mut ring = Vec::new();
  for x in 0..nx {
    for y in 0..ny {
      let i = y * nx + x;
      if d2[i] && !d1[i] {
        ring.push(Vec2::new(
          (x as i32 + id0x) as f32 * spacing,
          (y as i32 + id0y) as f32 * spacing,
        ));
      }
    }
  }
  ring
}

#[cfg(test)]
#[path = "param_test.rs"]
mod param_test;
