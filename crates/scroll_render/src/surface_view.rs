//! Flattened surface view: the per-frame pipeline that couples fragment
//! geometry, the demand planner and the atlas.
//!
//! Each frame runs a fixed sequence on one thread:
//!
//! 1. draw fragment triangles into the xyz buffer (position from st, color
//!    from the 3D coordinate),
//! 2. read it back (the copy is retained for picking),
//! 3. derive the chunk demand and hand it to the atlas,
//! 4. draw the same triangles again sampling the atlas (data pass),
//! 5. draw the wireframe and vertex sprites,
//! 6. composite.
//!
//! The xyz pass must complete before the readback, the readback before
//! `add_blocks`, and `add_blocks` before `display_blocks`; nothing here
//! suspends or overlaps.
//!
//! Shader contract mirrored by the CPU stages: vertex attributes are
//! `location=3 xyz (vec3)` and `location=4 st (vec2)`; the composite reads
//! `base_sampler`, `underlay_sampler`, `trgls_sampler` and `overlay_sampler`
//! back to front with straight-over alpha.

use glam::{Mat4, Vec2, Vec3, Vec4};
use scroll_core::view::FragmentView;
use scroll_core::volume::VolumeStore;
use tracing::{debug, warn};

use crate::atlas::Atlas;
use crate::demand::plan_demand;
use crate::fb::{composite, Rgba16Fbo};
use crate::raster::{clip_to_pixel, fill_triangle, point_sprite, wireframe_strips, fill_strip};

/// Per-frame view state. Passed explicitly to every call; the renderer
/// keeps no notion of a current fragment.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
  /// Window pixels per st unit.
  pub zoom: f32,
  /// st coordinate at the window center.
  pub center_st: Vec2,
  /// Wireframe thickness in pixels; 0 hides the mesh.
  pub line_thickness: f32,
  /// Vertex sprite diameter in pixels; 0 hides the vertices.
  pub node_diameter: f32,
  /// Opacity of the wireframe/vertex layer at composite time.
  pub mesh_opacity: f32,
  /// Vertex drawn in the highlight color.
  pub nearby_node: Option<u32>,
}

impl Default for ViewState {
  fn default() -> Self {
    Self {
      zoom: 1.0,
      center_st: Vec2::ZERO,
      line_thickness: 3.0,
      node_diameter: 6.0,
      mesh_opacity: 1.0,
      nearby_node: None,
    }
  }
}

const NODE_COLOR: [u16; 4] = [0, 65535, 65535, 65535];
const HIGHLIGHT_COLOR: [u16; 4] = [65535, 65535, 0, 65535];

/// What one frame did, for logs and retry decisions.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
  pub demanded: usize,
  pub demand_level: u32,
  pub truncated: bool,
  pub maxed_out: bool,
  /// A follow-up frame is expected to finish streaming.
  pub needs_redraw: bool,
}

/// The surface renderer and its framebuffers.
pub struct SurfaceRenderer {
  width: usize,
  height: usize,
  xyz_fbo: Rgba16Fbo,
  data_fbo: Rgba16Fbo,
  trgls_fbo: Rgba16Fbo,
  out: Rgba16Fbo,
  /// Readback of the last frame's xyz pass, kept for picking.
  xyz_arr: Option<Rgba16Fbo>,
  /// Last picked volume position; returned when picking misses.
  camera_target: Vec3,
}

impl SurfaceRenderer {
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      xyz_fbo: Rgba16Fbo::new(width, height),
      data_fbo: Rgba16Fbo::new(width, height),
      trgls_fbo: Rgba16Fbo::new(width, height),
      out: Rgba16Fbo::new(width, height),
      xyz_arr: None,
      camera_target: Vec3::ZERO,
    }
  }

  pub fn resize(&mut self, width: usize, height: usize) {
    let target = self.camera_target;
    *self = Self::new(width, height);
    self.camera_target = target;
  }

  /// The st -> clip transform for the current view.
  pub fn st_xform(&self, state: &ViewState) -> Mat4 {
    let wf = state.zoom / (0.5 * self.width as f32);
    let hf = state.zoom / (0.5 * self.height as f32);
    Mat4::from_cols(
      Vec4::new(wf, 0.0, 0.0, 0.0),
      Vec4::new(0.0, -hf, 0.0, 0.0),
      Vec4::ZERO,
      Vec4::new(
        -wf * state.center_st.x,
        hf * state.center_st.y,
        0.0,
        1.0,
      ),
    )
  }

  pub fn output(&self) -> &Rgba16Fbo {
    &self.out
  }

  pub fn xyz_array(&self) -> Option<&Rgba16Fbo> {
    self.xyz_arr.as_ref()
  }

  /// Run one frame of the flattened view.
  pub fn render_frame(
    &mut self,
    volume: &dyn VolumeStore,
    atlas: &mut Atlas,
    view: &FragmentView,
    state: &ViewState,
  ) -> FrameStats {
    if !view.has_st() {
      warn!(
        "fragment {:?} has no flattened parameterization; surface view skipped",
        view.fragment.meta.name
      );
      self.xyz_fbo.clear([0; 4]);
      self.data_fbo.clear([0; 4]);
      self.trgls_fbo.clear([0; 4]);
      self.out.clear([0; 4]);
      self.xyz_arr = None;
      return FrameStats::default();
    }

    let xform = self.st_xform(state);
    let mesh = &view.fragment.mesh;

    self.draw_xyz_pass(mesh.trgls.as_slice(), &mesh.points, &view.stpoints, xform);
    // Synchronous readback; the planner consumes the buffer just written.
    self.xyz_arr = Some(self.xyz_fbo.clone());

    let plan = plan_demand(
      &self.xyz_fbo,
      state.zoom,
      volume.levels(),
      atlas.chunk_size(),
      atlas.max_demand(),
    );
    if plan.truncated {
      warn!(
        "{}",
        scroll_core::error::ScrollError::AtlasCapExceeded {
          requested: plan.requested,
          cap: atlas.max_demand(),
        }
      );
    }
    let maxed_out = atlas.add_blocks(volume, &plan.keys);

    atlas.display_blocks(
      &mut self.data_fbo,
      &mesh.points,
      &view.stpoints,
      &mesh.trgls,
      xform,
    );

    self.draw_mesh_pass(view, state, xform);

    composite(
      &mut self.out,
      &[
        (&self.data_fbo, 1.0),
        (&self.trgls_fbo, state.mesh_opacity),
      ],
    );

    let stats = FrameStats {
      demanded: plan.keys.len(),
      demand_level: plan.level,
      truncated: plan.truncated,
      maxed_out,
      needs_redraw: plan.truncated || maxed_out,
    };
    debug!(?stats, "surface frame");
    stats
  }

  /// Position from st, color from xyz: the buffer the planner reads.
  fn draw_xyz_pass(
    &mut self,
    trgls: &[[u32; 3]],
    points: &[Vec3],
    stpoints: &[Vec2],
    xform: Mat4,
  ) {
    self.xyz_fbo.clear([0, 0, 0, 0]);
    let (w, h) = (self.width, self.height);
    for t in trgls {
      let sv = t.map(|v| {
        let c = xform * stpoints[v as usize].extend(0.0).extend(1.0);
        clip_to_pixel(Vec2::new(c.x, c.y), w, h)
      });
      let xv = t.map(|v| points[v as usize]);
      fill_triangle(w, h, sv[0], sv[1], sv[2], |x, y, bary| {
        let p = xv[0] * bary[0] + xv[1] * bary[1] + xv[2] * bary[2];
        self.xyz_fbo.put(
          x,
          y,
          [
            p.x.round().clamp(0.0, 65535.0) as u16,
            p.y.round().clamp(0.0, 65535.0) as u16,
            p.z.round().clamp(0.0, 65535.0) as u16,
            65535,
          ],
        );
      });
    }
  }

  /// Wireframe strips plus vertex sprites into the mesh layer.
  fn draw_mesh_pass(&mut self, view: &FragmentView, state: &ViewState, xform: Mat4) {
    self.trgls_fbo.clear([0, 0, 0, 0]);
    let (w, h) = (self.width, self.height);
    let mesh = &view.fragment.mesh;

    if state.line_thickness > 0.0 {
      let [r, g, b] = view.fragment.meta.color;
      let color = [
        (r * 65535.0) as u16,
        (g * 65535.0) as u16,
        (b * 65535.0) as u16,
        65535,
      ];
      for t in &mesh.trgls {
        let corners = t.map(|v| {
          let c = xform * view.stpoints[v as usize].extend(0.0).extend(1.0);
          Vec2::new(c.x, c.y)
        });
        for strip in wireframe_strips(corners, state.line_thickness, w, h) {
          fill_strip(&strip, w, h, |x, y| self.trgls_fbo.put(x, y, color));
        }
      }
    }

    if state.node_diameter > 0.0 {
      for (i, st) in view.stpoints.iter().enumerate() {
        let c = xform * st.extend(0.0).extend(1.0);
        if c.x.abs() > 1.1 || c.y.abs() > 1.1 {
          continue;
        }
        let px = clip_to_pixel(Vec2::new(c.x, c.y), w, h);
        let color = if state.nearby_node == Some(i as u32) {
          HIGHLIGHT_COLOR
        } else {
          NODE_COLOR
        };
        point_sprite(px, state.node_diameter, w, h, |x, y| {
          self.trgls_fbo.put(x, y, color)
        });
      }
    }
  }

  /// Decode the volume position under a window pixel. Misses (no fragment
  /// drawn there, or no frame yet) return the previous target unchanged.
  pub fn pick(&mut self, x: usize, y: usize) -> Vec3 {
    if let Some(arr) = &self.xyz_arr {
      if x < arr.width && y < arr.height {
        let px = arr.get(x, y);
        if px[3] > 0 {
          let p = Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32);
          self.camera_target = p;
          return p;
        }
      }
    }
    self.camera_target
  }

  /// Find the st position whose drawn pixel lies closest to a 3D target:
  /// how the flattened view recenters itself on a point picked in the
  /// slice view.
  pub fn stxy_for_ijk(&self, target: Vec3, state: &ViewState) -> Option<Vec2> {
    let arr = self.xyz_arr.as_ref()?;
    let mut best: Option<(f32, usize, usize)> = None;
    for y in 0..arr.height {
      for x in 0..arr.width {
        let px = arr.get(x, y);
        if px[3] == 0 {
          continue;
        }
        let p = Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32);
        let d = (p - target).length_squared();
        if best.map_or(true, |(bd, _, _)| d < bd) {
          best = Some((d, x, y));
        }
      }
    }
    let (_, x, y) = best?;
    Some(
      state.center_st
        + Vec2::new(
          (x as f32 - self.width as f32 * 0.5) / state.zoom,
          (y as f32 - self.height as f32 * 0.5) / state.zoom,
        ),
    )
  }
}

#[cfg(test)]
#[path = "surface_view_test.rs"]
mod surface_view_test;
