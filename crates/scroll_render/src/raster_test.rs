use glam::Vec2;

use super::*;

#[test]
fn test_clip_to_pixel_corners() {
  // Clip (-1, 1) is the top-left pixel corner, (1, -1) bottom-right.
  assert_eq!(clip_to_pixel(Vec2::new(-1.0, 1.0), 100, 50), Vec2::ZERO);
  assert_eq!(
    clip_to_pixel(Vec2::new(1.0, -1.0), 100, 50),
    Vec2::new(100.0, 50.0)
  );
}

#[test]
fn test_fill_triangle_covers_half_square() {
  let mut count = 0;
  fill_triangle(
    16,
    16,
    Vec2::new(0.0, 0.0),
    Vec2::new(16.0, 0.0),
    Vec2::new(0.0, 16.0),
    |_, _, w| {
      count += 1;
      assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-4);
    },
  );
  // Half of 256 pixels, within edge-sampling slack.
  assert!((112..=144).contains(&count), "covered {count}");
}

#[test]
fn test_fill_triangle_winding_independent() {
  let mut a = 0;
  let mut b = 0;
  let (p0, p1, p2) = (
    Vec2::new(2.0, 2.0),
    Vec2::new(14.0, 3.0),
    Vec2::new(6.0, 13.0),
  );
  fill_triangle(16, 16, p0, p1, p2, |_, _, _| a += 1);
  fill_triangle(16, 16, p0, p2, p1, |_, _, _| b += 1);
  assert_eq!(a, b);
  assert!(a > 0);
}

#[test]
fn test_thick_line_strip_vertex_counts() {
  let p0 = Vec2::new(-0.5, 0.0);
  let p1 = Vec2::new(0.5, 0.0);
  assert_eq!(thick_line_strip(p0, p1, 2.0, 100, 100).len(), 4);
  assert_eq!(thick_line_strip(p0, p1, 6.0, 100, 100).len(), 10);
}

#[test]
fn test_thick_line_strip_width_in_pixels() {
  // Horizontal segment: the normal offsets displace vertices vertically by
  // thickness pixels (thickness * 2/h in clip units is thickness pixels).
  let p0 = Vec2::new(-0.5, 0.0);
  let p1 = Vec2::new(0.5, 0.0);
  let strip = thick_line_strip(p0, p1, 3.0, 200, 100);
  let ys: Vec<f32> = strip.iter().map(|v| v.y).collect();
  let span = ys.iter().cloned().fold(f32::MIN, f32::max)
    - ys.iter().cloned().fold(f32::MAX, f32::min);
  // 3 px up + 3 px down, each 1/100 of the half-height clip range.
  assert!((span - 0.06).abs() < 1e-5, "span {span}");
}

#[test]
fn test_wireframe_clips_offscreen_triangles() {
  let off = wireframe_strips(
    [
      Vec2::new(2.0, 0.0),
      Vec2::new(3.0, 0.5),
      Vec2::new(2.5, 1.0),
    ],
    2.0,
    64,
    64,
  );
  assert!(off.is_empty());

  let on = wireframe_strips(
    [
      Vec2::new(-0.5, -0.5),
      Vec2::new(0.5, -0.5),
      Vec2::new(0.0, 0.5),
    ],
    2.0,
    64,
    64,
  );
  assert_eq!(on.len(), 3);
}

#[test]
fn test_point_sprite_stays_in_bounds() {
  let mut pixels = Vec::new();
  point_sprite(Vec2::new(1.0, 1.0), 6.0, 8, 8, |x, y| pixels.push((x, y)));
  assert!(!pixels.is_empty());
  for (x, y) in pixels {
    assert!(x < 8 && y < 8);
  }
}
