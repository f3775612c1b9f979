//! Slice view: an axis-aligned cut through the volume with fragment
//! intersections drawn over it.
//!
//! Three layers are produced and composited back-to-front with straight-over
//! alpha, matching the slice shader: a grayscale base sampled from the
//! volume around the view center, a fragments layer with the intersection
//! polylines (honoring a separate opacity), and an overlay with the window
//! border, the axis cross-hairs and the slice position label.

use glam::{IVec3, Vec2, Vec3};
use rayon::prelude::*;
use scroll_core::view::FragmentView;
use scroll_core::volume::{GridBox, VolumeStore};
use tracing::warn;

use crate::demand::level_for_zoom;
use crate::fb::{composite, Rgba16Fbo};
use crate::raster::{fill_strip, point_sprite, thick_line_strip};

/// Axis cross-hair / border colors, indexed by volume axis.
const AXIS_COLORS: [[u16; 4]; 3] = [
  [65535, 21845, 21845, 65535],
  [21845, 65535, 21845, 65535],
  [21845, 21845, 65535, 65535],
];

const NODE_COLOR: [u16; 4] = [0, 65535, 65535, 65535];

/// Per-frame inputs of the slice view.
#[derive(Clone, Copy, Debug)]
pub struct SliceViewState {
  /// The sliced axis (0, 1 or 2); the plane is `p[axis] == center[axis]`.
  pub axis: usize,
  /// View center in level-0 volume coordinates.
  pub center: Vec3,
  /// Window pixels per voxel.
  pub zoom: f32,
  /// Fragment line thickness in pixels; 0 hides the lines.
  pub line_thickness: f32,
  /// Opacity applied to the fragments layer at composite time.
  pub frag_opacity: f32,
  pub border_width: usize,
  pub axis_width: usize,
  pub show_label: bool,
}

impl Default for SliceViewState {
  fn default() -> Self {
    Self {
      axis: 2,
      center: Vec3::ZERO,
      zoom: 1.0,
      line_thickness: 3.0,
      frag_opacity: 1.0,
      border_width: 2,
      axis_width: 1,
      show_label: true,
    }
  }
}

/// The two in-plane axes (horizontal, vertical) for a sliced axis.
#[inline]
pub fn plane_axes(axis: usize) -> (usize, usize) {
  match axis {
    0 => (1, 2),
    1 => (0, 2),
    _ => (0, 1),
  }
}

/// The slice renderer and its layer framebuffers.
pub struct SliceRenderer {
  width: usize,
  height: usize,
  base: Rgba16Fbo,
  fragments: Rgba16Fbo,
  overlay: Rgba16Fbo,
  out: Rgba16Fbo,
}

impl SliceRenderer {
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      base: Rgba16Fbo::new(width, height),
      fragments: Rgba16Fbo::new(width, height),
      overlay: Rgba16Fbo::new(width, height),
      out: Rgba16Fbo::new(width, height),
    }
  }

  pub fn resize(&mut self, width: usize, height: usize) {
    *self = Self::new(width, height);
  }

  /// Render one slice frame and return the composited output.
  pub fn render(
    &mut self,
    volume: &dyn VolumeStore,
    fragments: &[&FragmentView],
    state: &SliceViewState,
  ) -> &Rgba16Fbo {
    self.paint_base(volume, state);
    self.paint_fragments(fragments, state);
    self.paint_overlay(state);
    composite(
      &mut self.out,
      &[
        (&self.base, 1.0),
        (&self.fragments, state.frag_opacity),
        (&self.overlay, 1.0),
      ],
    );
    &self.out
  }

  pub fn output(&self) -> &Rgba16Fbo {
    &self.out
  }

  /// Window pixel of a volume point, given the view center and zoom.
  pub fn project(&self, p: Vec3, state: &SliceViewState) -> Vec2 {
    let (i, j) = plane_axes(state.axis);
    Vec2::new(
      self.width as f32 * 0.5 + state.zoom * (p[i] - state.center[i]),
      self.height as f32 * 0.5 + state.zoom * (p[j] - state.center[j]),
    )
  }

  /// Same point in clip space (for the strip emitters).
  fn project_clip(&self, p: Vec3, state: &SliceViewState) -> Vec2 {
    let (i, j) = plane_axes(state.axis);
    let wf = state.zoom / (0.5 * self.width as f32);
    let hf = state.zoom / (0.5 * self.height as f32);
    Vec2::new(
      wf * (p[i] - state.center[i]),
      -hf * (p[j] - state.center[j]),
    )
  }

  /// Nearest-sample the chosen pyramid level into the grayscale base.
  fn paint_base(&mut self, volume: &dyn VolumeStore, state: &SliceViewState) {
    let (level, scale) = level_for_zoom(state.zoom, volume.levels());
    let lsize = volume.level_size(level as usize);
    let (i, j) = plane_axes(state.axis);
    let (w, h) = (self.width, self.height);
    let inv_zoom = 1.0 / state.zoom;
    let scale_f = scale as f32;

    // The visible box at the chosen level, clamped to the level extents.
    let half = Vec2::new(w as f32, h as f32) * 0.5 * inv_zoom;
    let mut min = IVec3::ZERO;
    let mut max = IVec3::ZERO;
    min[i] = ((state.center[i] - half.x) / scale_f).floor() as i32;
    max[i] = ((state.center[i] + half.x) / scale_f).ceil() as i32 + 1;
    min[j] = ((state.center[j] - half.y) / scale_f).floor() as i32;
    max[j] = ((state.center[j] + half.y) / scale_f).ceil() as i32 + 1;
    let k = (state.center[state.axis] / scale_f).round() as i32;
    min[state.axis] = k;
    max[state.axis] = k + 1;
    let Some(bounds) = GridBox::new(min, max).intersection(GridBox::from_size(lsize)) else {
      self.base.clear([0, 0, 0, 65535]);
      return;
    };
    let (buf, misses) = volume.read_chunk(level as usize, bounds);
    if misses > 0 {
      warn!(misses, "slice base painted from provisional data");
    }

    let center = state.center;
    let rows: Vec<Vec<[u16; 4]>> = (0..h)
      .into_par_iter()
      .map(|y| {
        let mut row = Vec::with_capacity(w);
        for x in 0..w {
          let vi = center[i] + (x as f32 - w as f32 * 0.5) * inv_zoom;
          let vj = center[j] + (y as f32 - h as f32 * 0.5) * inv_zoom;
          let mut p = [0i32; 3];
          p[i] = (vi / scale_f).floor() as i32;
          p[j] = (vj / scale_f).floor() as i32;
          p[state.axis] = k;
          let inside = (0..3).all(|c| p[c] >= bounds.min[c] && p[c] < bounds.max[c]);
          let g = if inside {
            buf.at(
              (p[0] - bounds.min.x) as u32,
              (p[1] - bounds.min.y) as u32,
              (p[2] - bounds.min.z) as u32,
            )
          } else {
            0
          };
          row.push([g, g, g, 65535]);
        }
        row
      })
      .collect();
    for (y, row) in rows.into_iter().enumerate() {
      for (x, px) in row.into_iter().enumerate() {
        self.base.put(x, y, px);
      }
    }
  }

  /// Intersection polylines and on-plane vertices of every fragment.
  fn paint_fragments(&mut self, fragments: &[&FragmentView], state: &SliceViewState) {
    self.fragments.clear([0, 0, 0, 0]);
    if state.line_thickness <= 0.0 {
      return;
    }
    let (w, h) = (self.width, self.height);
    for view in fragments {
      let [r, g, b] = view.fragment.meta.color;
      let color = [
        (r * 65535.0) as u16,
        (g * 65535.0) as u16,
        (b * 65535.0) as u16,
        65535,
      ];
      let hits = view.lines_on_slice(state.axis, state.center[state.axis]);
      for seg in &hits.segments {
        let a = self.project_clip(Vec3::new(seg[0], seg[1], seg[2]), state);
        let bpt = self.project_clip(Vec3::new(seg[3], seg[4], seg[5]), state);
        let strip = thick_line_strip(a, bpt, state.line_thickness, w, h);
        fill_strip(&strip, w, h, |x, y| self.fragments.put(x, y, color));
      }
      for (_, p) in view.points_on_slice(state.axis, state.center[state.axis]) {
        let c = self.project(p, state);
        point_sprite(c, state.line_thickness * 2.0, w, h, |x, y| {
          self.fragments.put(x, y, NODE_COLOR)
        });
      }
    }
  }

  /// Border, axis cross-hairs and the position label.
  fn paint_overlay(&mut self, state: &SliceViewState) {
    self.overlay.clear([0, 0, 0, 0]);
    let (w, h) = (self.width, self.height);
    let border_color = AXIS_COLORS[state.axis];

    let bw = state.border_width;
    if bw > 0 {
      for t in 0..bw.min(h / 2) {
        for x in 0..w {
          self.overlay.put(x, t, border_color);
          self.overlay.put(x, h - 1 - t, border_color);
        }
        for y in 0..h {
          self.overlay.put(t, y, border_color);
          self.overlay.put(w - 1 - t, y, border_color);
        }
      }
    }

    let aw = state.axis_width;
    if aw > 0 {
      let (i, j) = plane_axes(state.axis);
      let c = self.project(state.center, state);
      let (cx, cy) = (c.x.round() as i64, c.y.round() as i64);
      for t in 0..aw as i64 {
        let x = cx + t - (aw as i64) / 2;
        if (0..w as i64).contains(&x) {
          for y in 0..h {
            self.overlay.put(x as usize, y, AXIS_COLORS[i]);
          }
        }
        let y = cy + t - (aw as i64) / 2;
        if (0..h as i64).contains(&y) {
          for x in 0..w {
            self.overlay.put(x, y as usize, AXIS_COLORS[j]);
          }
        }
      }
    }

    if state.show_label {
      let label = format!(
        "{}: {}",
        ["X", "Y", "Z"][state.axis],
        state.center[state.axis].round() as i64
      );
      draw_text(&mut self.overlay, 10, 10, &label, [65535, 65535, 65535, 65535]);
    }
  }
}

/// 5x7 bitmap glyphs for the slice label (digits, separators, axis names).
fn glyph(c: char) -> [u8; 7] {
  match c {
    '0' => [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
    '1' => [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
    '2' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
    '3' => [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
    '4' => [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
    '5' => [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
    '6' => [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
    '7' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    '8' => [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
    '9' => [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
    ':' => [0x00, 0x04, 0x00, 0x00, 0x00, 0x04, 0x00],
    '-' => [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00],
    'X' => [0x11, 0x11, 0x0a, 0x04, 0x0a, 0x11, 0x11],
    'Y' => [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04],
    'Z' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1f],
    _ => [0; 7],
  }
}

/// Draw `text` with the builtin font at pixel scale 2.
fn draw_text(fbo: &mut Rgba16Fbo, x0: usize, y0: usize, text: &str, color: [u16; 4]) {
  const SCALE: usize = 2;
  let mut cx = x0;
  for c in text.chars() {
    let rows = glyph(c);
    for (ry, bits) in rows.iter().enumerate() {
      for rx in 0..5 {
        if bits & (0x10 >> rx) != 0 {
          for sy in 0..SCALE {
            for sx in 0..SCALE {
              let px = cx + rx * SCALE + sx;
              let py = y0 + ry * SCALE + sy;
              if px < fbo.width && py < fbo.height {
                fbo.put(px, py, color);
              }
            }
          }
        }
      }
    }
    cx += 6 * SCALE;
  }
}

#[cfg(test)]
#[path = "slice_view_test.rs"]
mod slice_view_test;
