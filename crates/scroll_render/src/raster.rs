//! Triangle rasterization and the geometry-stage strip emitters.
//!
//! Coordinates come in as GL-style clip space (`[-1, 1]`, y up); pixels go
//! out with row 0 at the top. Rasterization is plain barycentric coverage
//! sampled at pixel centers; the renderers overwrite or alpha-blend per
//! pixel, so no depth buffer is involved.

use glam::Vec2;
use smallvec::SmallVec;

/// Clip-space to pixel coordinates (y flipped).
#[inline]
pub fn clip_to_pixel(clip: Vec2, width: usize, height: usize) -> Vec2 {
  Vec2::new(
    (clip.x + 1.0) * 0.5 * width as f32,
    (1.0 - clip.y) * 0.5 * height as f32,
  )
}

/// Rasterize one triangle given in pixel coordinates. `plot` receives the
/// pixel and its barycentric weights with respect to (p0, p1, p2).
pub fn fill_triangle(
  width: usize,
  height: usize,
  p0: Vec2,
  p1: Vec2,
  p2: Vec2,
  mut plot: impl FnMut(usize, usize, [f32; 3]),
) {
  let area = (p1 - p0).perp_dot(p2 - p0);
  if area == 0.0 {
    return;
  }
  let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.0) as usize;
  let max_x = (p0.x.max(p1.x).max(p2.x).ceil() as i64).clamp(0, width as i64) as usize;
  let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.0) as usize;
  let max_y = (p0.y.max(p1.y).max(p2.y).ceil() as i64).clamp(0, height as i64) as usize;

  for y in min_y..max_y {
    for x in min_x..max_x {
      let q = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
      let w0 = (p1 - q).perp_dot(p2 - q) / area;
      let w1 = (p2 - q).perp_dot(p0 - q) / area;
      let w2 = (p0 - q).perp_dot(p1 - q) / area;
      if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
        plot(x, y, [w0, w1, w2]);
      }
    }
  }
}

/// Rasterize a triangle strip given in clip space; `plot` gets pixels only.
pub fn fill_strip(
  strip: &[Vec2],
  width: usize,
  height: usize,
  mut plot: impl FnMut(usize, usize),
) {
  for k in 0..strip.len().saturating_sub(2) {
    let a = clip_to_pixel(strip[k], width, height);
    let b = clip_to_pixel(strip[k + 1], width, height);
    let c = clip_to_pixel(strip[k + 2], width, height);
    fill_triangle(width, height, a, b, c, |x, y, _| plot(x, y));
  }
}

/// Cosine/sine pairs at 45-degree steps, plus a zero entry. Offsets into
/// this table pick the corner roundings of a thick line.
const TRIG_TABLE: [(f32, f32); 9] = [
  (1.0, 0.0),
  (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
  (0.0, 1.0),
  (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
  (-1.0, 0.0),
  (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
  (0.0, -1.0),
  (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
  (0.0, 0.0),
];

/// (endpoint index, trig-table index) per emitted strip vertex.
const V4: [(usize, usize); 4] = [(0, 2), (0, 6), (1, 2), (1, 6)];
const V10: [(usize, usize); 10] = [
  (0, 0),
  (0, 1),
  (0, 7),
  (0, 2),
  (0, 6),
  (1, 2),
  (1, 6),
  (1, 3),
  (1, 5),
  (1, 4),
];

/// Geometry-stage emission of one thick segment: a 4-vertex strip for thin
/// lines, 10 vertices with rounded caps once thickness reaches 5 pixels.
/// Inputs and outputs are clip-space; thickness is in pixels.
pub fn thick_line_strip(
  p0: Vec2,
  p1: Vec2,
  thickness: f32,
  width: usize,
  height: usize,
) -> SmallVec<[Vec2; 10]> {
  let mut tan = p1 - p0;
  if tan == Vec2::ZERO {
    tan = Vec2::new(1.0, 0.0);
  }
  let tan = tan.normalize();
  let norm = Vec2::new(-tan.y, tan.x);
  let factor = Vec2::new(1.0 / width as f32, 1.0 / height as f32);

  let mut offsets = [Vec2::ZERO; 9];
  for (o, (c, s)) in offsets.iter_mut().zip(TRIG_TABLE) {
    *o = factor * (-c * tan + s * norm);
  }

  let pcs = [p0, p1];
  let verts: &[(usize, usize)] = if thickness < 5.0 { &V4 } else { &V10 };
  verts
    .iter()
    .map(|&(pi, oi)| pcs[pi] + thickness * offsets[oi])
    .collect()
}

/// Emit the three thickened sides of a triangle, skipping triangles
/// entirely outside the slightly widened clip rectangle.
pub fn wireframe_strips(
  corners: [Vec2; 3],
  thickness: f32,
  width: usize,
  height: usize,
) -> SmallVec<[SmallVec<[Vec2; 10]>; 3]> {
  const LIMIT: f32 = 1.1;
  let (mut xs_lo, mut xs_hi, mut ys_lo, mut ys_hi) = (true, true, true, true);
  for c in corners {
    if c.x > -LIMIT {
      xs_lo = false;
    }
    if c.x < LIMIT {
      xs_hi = false;
    }
    if c.y > -LIMIT {
      ys_lo = false;
    }
    if c.y < LIMIT {
      ys_hi = false;
    }
  }
  if xs_lo || xs_hi || ys_lo || ys_hi {
    return SmallVec::new();
  }
  (0..3)
    .map(|i| thick_line_strip(corners[i], corners[(i + 1) % 3], thickness, width, height))
    .collect()
}

/// Filled disc of the given diameter (pixels) around a pixel-space center.
pub fn point_sprite(
  center: Vec2,
  diameter: f32,
  width: usize,
  height: usize,
  mut plot: impl FnMut(usize, usize),
) {
  let r = diameter * 0.5;
  let min_x = (center.x - r).floor().max(0.0) as usize;
  let max_x = ((center.x + r).ceil() as i64).clamp(0, width as i64) as usize;
  let min_y = (center.y - r).floor().max(0.0) as usize;
  let max_y = ((center.y + r).ceil() as i64).clamp(0, height as i64) as usize;
  for y in min_y..max_y {
    for x in min_x..max_x {
      let q = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
      if (q - center).length_squared() <= r * r {
        plot(x, y);
      }
    }
  }
}

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;
