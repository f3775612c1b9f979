//! Headless demo: build a synthetic scroll volume and a wavy sheet
//! fragment, stream the flattened view until the atlas settles, then render
//! a slice. Run with `RUST_LOG=debug` for the per-frame internals.

use glam::{UVec3, Vec2, Vec3};
use scroll_core::mesh::TriMesh;
use scroll_core::obj::{Fragment, FragmentMeta};
use scroll_core::view::FragmentView;
use scroll_core::volume::{ChunkBuf, InMemoryVolume};
use scroll_render::{Atlas, SliceRenderer, SliceViewState, SurfaceRenderer, ViewState};
use tracing::info;
use tracing_subscriber::EnvFilter;

const VOLUME_SIDE: u32 = 192;
const LEVELS: usize = 3;
const CHUNK: u32 = 62;

/// Banded intensity with a soft radial falloff, so both views show
/// structure at every pyramid level.
fn synthetic_volume() -> InMemoryVolume {
  let size = UVec3::splat(VOLUME_SIDE);
  let mut buf = ChunkBuf::zeroed(size);
  let c = VOLUME_SIDE as f32 / 2.0;
  for z in 0..size.z {
    for y in 0..size.y {
      for x in 0..size.x {
        let dx = x as f32 - c;
        let dz = z as f32 - c;
        let r = (dx * dx + dz * dz).sqrt();
        let band = (0.35 * r).sin() * 0.5 + 0.5;
        let falloff = (1.0 - r / (1.5 * c)).clamp(0.0, 1.0);
        buf.set(x, y, z, (band * falloff * 60000.0) as u16);
      }
    }
  }
  InMemoryVolume::new(buf, LEVELS)
}

/// A gently waving vertical sheet through the middle of the volume, with a
/// flat (x, y) uv chart.
fn sheet_fragment() -> Fragment {
  let (nx, ny) = (33, 25);
  let mut points = Vec::new();
  let mut uvs = Vec::new();
  for j in 0..ny {
    for i in 0..nx {
      let x = 16.0 + 5.0 * i as f32;
      let y = 24.0 + 6.0 * j as f32;
      let z = VOLUME_SIDE as f32 / 2.0 + 9.0 * (0.08 * x).sin();
      points.push(Vec3::new(x, y, z));
      uvs.push(Vec2::new(x / 200.0, y / 200.0));
    }
  }
  let mut trgls = Vec::new();
  for j in 0..ny - 1 {
    for i in 0..nx - 1 {
      let a = (j * nx + i) as u32;
      trgls.push([a, a + 1, a + nx as u32]);
      trgls.push([a + 1, a + 1 + nx as u32, a + nx as u32]);
    }
  }
  Fragment {
    mesh: TriMesh::new(points, uvs, trgls),
    meta: FragmentMeta {
      name: "demo_sheet".into(),
      created: "2024-01-01T00:00:00".into(),
      color: [0.9, 0.6, 0.2],
    },
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  info!("building synthetic volume ({VOLUME_SIDE}^3, {LEVELS} levels)");
  let volume = synthetic_volume();
  let view = FragmentView::new(sheet_fragment());
  info!(
    vertices = view.fragment.mesh.vertex_count(),
    triangles = view.fragment.mesh.triangle_count(),
    flattened = view.has_st(),
    "fragment ready"
  );

  let mut atlas = Atlas::new(&volume, UVec3::new(512, 512, 128), CHUNK);
  info!(slots = atlas.capacity(), cap = atlas.upload_cap(), "atlas ready");

  let mut surface = SurfaceRenderer::new(480, 360);
  let state = ViewState {
    zoom: 2.0,
    center_st: (view.st_min + view.st_max) * 0.5,
    ..Default::default()
  };

  for frame in 0..32 {
    let stats = surface.render_frame(&volume, &mut atlas, &view, &state);
    info!(
      frame,
      demanded = stats.demanded,
      level = stats.demand_level,
      maxed_out = stats.maxed_out,
      "surface frame"
    );
    if !stats.needs_redraw {
      break;
    }
  }

  let center = surface.pick(240, 180);
  info!(?center, "picked window center");
  if let Some(stxy) = surface.stxy_for_ijk(center, &state) {
    let nearby = view.nearest_vertex(stxy, 3.0 * view.avg_st_len);
    info!(?stxy, ?nearby, "nearest node under the pick");
  }

  let mut slice = SliceRenderer::new(480, 360);
  let slice_state = SliceViewState {
    axis: 2,
    center,
    zoom: 1.5,
    ..Default::default()
  };
  slice.render(&volume, &[&view], &slice_state);

  let covered = surface
    .output()
    .data
    .iter()
    .filter(|p| p[3] > 0)
    .count();
  info!(
    covered_pixels = covered,
    total = 480 * 360,
    "flattened view painted"
  );
}
