//! scroll_render - frame orchestration for the scroll segmentation viewer.
//!
//! Two coupled views are produced each frame from the state held in
//! `scroll_core`:
//!
//! - the **slice view**: an axis-aligned cut through the volume with every
//!   fragment's plane intersections drawn over it, and
//! - the **flattened surface view**: volume data resampled onto the
//!   fragment's unfolded st parameterization.
//!
//! The flattened view streams volume chunks through a 3D texture atlas with
//! LRU residency ([`atlas`]), fed by a view-driven demand pass ([`demand`])
//! that reads back the frame's xyz geometry buffer. GPU stage semantics
//! (vertex/geometry/fragment, the 16-bit framebuffers, the unorm 3D
//! texture) are realized CPU-side in [`fb`], [`texture3d`] and [`raster`];
//! driver and windowing glue stay outside this crate.
//!
//! Frame ordering is strict and single-threaded: the xyz pass completes
//! before the demand readback, demand is handed to the atlas before the
//! data pass samples it, and edits never interleave with a frame.

pub mod atlas;
pub mod demand;
pub mod fb;
pub mod raster;
pub mod slice_view;
pub mod surface_view;
pub mod texture3d;

pub use atlas::{Atlas, BlockKey};
pub use demand::{plan_demand, DemandPlan};
pub use fb::Rgba16Fbo;
pub use slice_view::{SliceRenderer, SliceViewState};
pub use surface_view::{SurfaceRenderer, ViewState};
pub use texture3d::Texture3d;
