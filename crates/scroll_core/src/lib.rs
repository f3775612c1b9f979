//! scroll_core - renderer-independent engine of a scroll segmentation viewer.
//!
//! A "scroll" is a large out-of-core 3D scalar volume; a "fragment" is a
//! triangulated surface patch segmented out of it, carrying both 3D positions
//! and a 2D uv parameterization. This crate owns everything that does not
//! touch a framebuffer:
//!
//! - **Volume proxy**: typed chunk access over a resolution pyramid
//!   ([`VolumeStore`], [`GridBox`]).
//! - **Mesh model**: triangles, neighbors, normals ([`TriMesh`]).
//! - **Parameterization**: the least-squares affine map from uv into "st"
//!   space, whose second axis follows the world vertical ([`param`]).
//! - **Local retriangulation**: windowed Delaunay edits used when vertices
//!   move, appear, or disappear ([`TriPointSet`], [`FragmentView`]).
//! - **Slice intersection**: plane/triangle crossings feeding the slice view
//!   ([`slice`]).
//! - **Fragment io**: the OBJ/MTL/JSON on-disk format ([`obj`]).
//!
//! The companion crate `scroll_render` drives these pieces per frame.

pub mod error;
pub mod mesh;
pub mod obj;
pub mod param;
pub mod slice;
pub mod tri_point_set;
pub mod view;
pub mod volume;

pub use error::{Result, ScrollError};
pub use mesh::TriMesh;
pub use obj::{Fragment, FragmentMeta, UvOrder};
pub use param::{StMap, StSolution};
pub use slice::SliceIntersections;
pub use tri_point_set::TriPointSet;
pub use view::{FragmentView, WorkingRegion};
pub use volume::{ChunkBuf, GridBox, InMemoryVolume, VolumeStore};
