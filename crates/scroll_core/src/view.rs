//! Fragment view: a fragment's derived flattened state plus the edit
//! operations that keep mesh and parameterization in step.
//!
//! The view owns `stpoints` (one per vertex), the outside ring appended to
//! them as `all_stpoints`, and the fitted [`StMap`]. Vertex edits follow the
//! windowed protocol: build a [`TriPointSet`] before the mutation, mutate,
//! build another, and splice the canonical triangle diff into the global
//! list. When a Delaunay pass fails the edit keeps the previous triangles
//! and only refreshes derived state.

use glam::{Vec2, Vec3};
use tracing::{debug, warn};

use crate::error::{Result, ScrollError};
use crate::mesh::{self, rotate_to_min};
use crate::obj::Fragment;
use crate::param::{self, StMap};
use crate::slice::{self, SliceIntersections};
use crate::tri_point_set::{self, TriPointSet};

/// Half-width of the edit window in units of the characteristic spacing.
const WINDOW_SPACINGS: f32 = 3.0;

/// A connected patch of triangles selected by normal agreement, the region
/// tools operate on instead of the whole fragment.
#[derive(Clone, Debug)]
pub struct WorkingRegion {
  /// Per-triangle membership flag.
  pub trgls: Vec<bool>,
  /// Per-vertex membership flag (vertices of member triangles).
  pub vertices: Vec<bool>,
}

impl WorkingRegion {
  /// (any member, any non-member) over the vertices.
  pub fn has_working_non_working(&self) -> (bool, bool) {
    let working = self.vertices.iter().filter(|v| **v).count();
    (working > 0, working < self.vertices.len())
  }
}

/// A fragment plus its flattened-view state.
pub struct FragmentView {
  pub fragment: Fragment,
  /// One st per vertex; empty when the fragment could not be flattened.
  pub stpoints: Vec<Vec2>,
  /// `stpoints` followed by the outside ring.
  pub all_stpoints: Vec<Vec2>,
  pub st_map: Option<StMap>,
  pub st_min: Vec2,
  pub st_max: Vec2,
  pub avg_st_len: f32,
  /// Area-weighted vertex normals, refreshed after edits.
  pub normals: Vec<Vec3>,
  working: Option<WorkingRegion>,
}

impl FragmentView {
  /// Build the view, fitting the parameterization. A degenerate uv chart is
  /// not an error at construction: the fragment simply stays un-flattened
  /// and [`FragmentView::has_st`] reports false.
  pub fn new(fragment: Fragment) -> Self {
    let mut view = Self {
      fragment,
      stpoints: Vec::new(),
      all_stpoints: Vec::new(),
      st_map: None,
      st_min: Vec2::ZERO,
      st_max: Vec2::ZERO,
      avg_st_len: 0.0,
      normals: Vec::new(),
      working: None,
    };
    view.refresh_parameterization();
    view.refresh_normals();
    view
  }

  pub fn has_st(&self) -> bool {
    self.st_map.is_some()
  }

  fn mesh(&self) -> &crate::mesh::TriMesh {
    &self.fragment.mesh
  }

  fn n_real(&self) -> usize {
    self.stpoints.len()
  }

  fn window_half_width(&self) -> f32 {
    WINDOW_SPACINGS * self.avg_st_len
  }

  /// Re-fit st from scratch: solver, outside ring, full retriangulation.
  pub fn refresh_parameterization(&mut self) {
    let mesh = &self.fragment.mesh;
    match param::solve_st_map(&mesh.points, &mesh.uvs, &mesh.trgls) {
      Ok(sol) => {
        self.st_min = sol.st_min;
        self.st_max = sol.st_max;
        self.avg_st_len = sol.avg_spacing;
        let ring = param::outside_points(&sol.stpoints, sol.st_min, sol.st_max, sol.avg_spacing);
        self.all_stpoints = sol.stpoints.iter().chain(ring.iter()).copied().collect();
        self.stpoints = sol.stpoints;
        self.st_map = Some(sol.map);
        self.retriangulate_all();
      }
      Err(e) => {
        warn!("fragment {:?} stays un-flattened: {e}", self.fragment.meta.name);
        self.stpoints.clear();
        self.all_stpoints.clear();
        self.st_map = None;
      }
    }
  }

  fn refresh_normals(&mut self) {
    let mesh = &self.fragment.mesh;
    self.normals = mesh::point_normals(&mesh.points, &mesh.trgls);
  }

  /// Replace the whole triangle list from a Delaunay over `all_stpoints`,
  /// dropping ring triangles. On failure the previous triangles stay.
  pub fn retriangulate_all(&mut self) {
    if self.stpoints.is_empty() {
      return;
    }
    match tri_point_set::delaunay(&self.all_stpoints) {
      Ok(trgls) => {
        let n = self.n_real() as u32;
        self.fragment.mesh.trgls = trgls
          .into_iter()
          .filter(|t| t.iter().all(|&v| v < n))
          .map(rotate_to_min)
          .collect();
        self.fragment.mesh.rebuild_neighbors();
        self.fragment.mesh.touch();
      }
      Err(e) => warn!("full retriangulation failed, keeping triangles: {e}"),
    }
  }

  /// True when a vertex already sits exactly at `st`.
  pub fn point_exists(&self, st: Vec2) -> bool {
    self.stpoints.iter().any(|p| *p == st)
  }

  fn check_index(&self, index: usize) -> Result<()> {
    let len = self.fragment.mesh.points.len();
    if index >= len || index >= self.stpoints.len() {
      return Err(ScrollError::IndexOutOfRange { index, len });
    }
    Ok(())
  }

  /// Move vertex `index`. `new_xyz` updates the 3D position; `new_st` moves
  /// the vertex in the flattened view (updating uv through the inverse map)
  /// and retriangulates the surrounding window.
  pub fn move_point(
    &mut self,
    index: usize,
    new_xyz: Option<Vec3>,
    new_st: Option<Vec2>,
  ) -> Result<()> {
    self.check_index(index)?;

    if let Some(st) = new_st {
      let map = self.st_map.ok_or(ScrollError::DegenerateUv)?;
      if st != self.stpoints[index] && self.point_exists(st) {
        return Err(ScrollError::DuplicateVertex(st.x, st.y));
      }
      let hw = self.window_half_width();
      let old_set = TriPointSet::new(&self.all_stpoints, self.n_real(), st, hw);
      self.stpoints[index] = st;
      self.all_stpoints[index] = st;
      self.fragment.mesh.uvs[index] = map.stxy_to_uv(st);
      let new_set = TriPointSet::new(&self.all_stpoints, self.n_real(), st, hw);
      self.apply_window_diff(&old_set, &new_set);
    }

    if let Some(p) = new_xyz {
      self.fragment.mesh.points[index] = p;
    }

    self.working = None;
    self.refresh_normals();
    self.fragment.mesh.touch();
    Ok(())
  }

  /// Insert a new vertex at `xyz` / `st`. Strictly inside an existing
  /// triangle this adds exactly two triangles.
  pub fn add_point(&mut self, xyz: Vec3, st: Vec2) -> Result<()> {
    let map = self.st_map.ok_or(ScrollError::DegenerateUv)?;
    if self.point_exists(st) {
      return Err(ScrollError::DuplicateVertex(st.x, st.y));
    }
    let new_index = self.n_real();
    self.fragment.mesh.points.push(xyz);
    self.fragment.mesh.uvs.push(map.stxy_to_uv(st));
    self.stpoints.push(st);
    // Keep ring indices contiguous: the new real point slides in front of
    // the ring block, shifting every ring index up by one.
    self.all_stpoints.insert(new_index, st);

    let hw = self.window_half_width();
    let mut old_set = TriPointSet::new(&self.all_stpoints, self.n_real(), st, hw);
    let new_set = old_set.clone();
    old_set.delete_point(new_index);
    self.apply_window_diff(&old_set, &new_set);

    self.working = None;
    self.refresh_normals();
    self.fragment.mesh.touch();
    Ok(())
  }

  /// Delete vertex `index`, retriangulating its window and shifting the
  /// indices above it down by one.
  pub fn delete_point(&mut self, index: usize) -> Result<()> {
    self.check_index(index)?;
    let st = self.stpoints[index];
    let hw = self.window_half_width();
    let old_set = TriPointSet::new(&self.all_stpoints, self.n_real(), st, hw);
    let mut new_set = old_set.clone();
    new_set.delete_point(index);
    self.apply_window_diff(&old_set, &new_set);

    let trgls = &mut self.fragment.mesh.trgls;
    // The window diff removed the triangles around the vertex; anything
    // still pointing at it (window undersized, failed Delaunay) goes too.
    trgls.retain(|t| !t.contains(&(index as u32)));
    for t in trgls.iter_mut() {
      for v in t.iter_mut() {
        if *v > index as u32 {
          *v -= 1;
        }
      }
    }

    self.fragment.mesh.points.remove(index);
    self.fragment.mesh.uvs.remove(index);
    self.stpoints.remove(index);
    self.all_stpoints.remove(index);
    self.fragment.mesh.rebuild_neighbors();
    self.working = None;
    self.refresh_normals();
    self.fragment.mesh.touch();
    Ok(())
  }

  /// Splice the triangle diff of two windows into the mesh. A failed
  /// triangulation skips the splice; the mesh keeps its triangles.
  fn apply_window_diff(&mut self, old_set: &TriPointSet, new_set: &TriPointSet) {
    match tri_point_set::trgl_diff(old_set, new_set) {
      Ok((removed, added)) => {
        if !removed.is_empty() || !added.is_empty() {
          debug!(
            removed = removed.len(),
            added = added.len(),
            "window retriangulation"
          );
          tri_point_set::replace_trgls(&mut self.fragment.mesh.trgls, &removed, &added);
          self.fragment.mesh.rebuild_neighbors();
        }
      }
      Err(e) => warn!("window retriangulation failed, keeping triangles: {e}"),
    }
  }

  /// Grow a working region from the triangles around `seed`: neighbors are
  /// kept while their normal stays within `max_angle_deg` of `axis` (the
  /// depth axis of the selecting view). Cleared again by
  /// [`FragmentView::clear_working_region`] and on any edit.
  pub fn set_working_region(&mut self, seed: u32, max_angle_deg: f32, axis: usize) -> Result<()> {
    if seed as usize >= self.fragment.mesh.points.len() {
      return Err(ScrollError::IndexOutOfRange {
        index: seed as usize,
        len: self.fragment.mesh.points.len(),
      });
    }
    let members = mesh::region_by_normals(&self.fragment.mesh, seed, max_angle_deg, axis);
    let mut trgls = vec![false; self.fragment.mesh.trgls.len()];
    let mut vertices = vec![false; self.fragment.mesh.points.len()];
    for &t in &members {
      trgls[t as usize] = true;
      for &v in &self.fragment.mesh.trgls[t as usize] {
        vertices[v as usize] = true;
      }
    }
    debug!(
      seed,
      trgls = members.len(),
      "working region selected"
    );
    self.working = Some(WorkingRegion { trgls, vertices });
    Ok(())
  }

  pub fn clear_working_region(&mut self) {
    self.working = None;
  }

  pub fn working_region(&self) -> Option<&WorkingRegion> {
    self.working.as_ref()
  }

  /// Vertices whose st falls inside the window `[min, max]`, with indices.
  pub fn points_in_st_window(&self, min: Vec2, max: Vec2) -> Vec<(u32, Vec2)> {
    self
      .stpoints
      .iter()
      .enumerate()
      .filter(|(_, p)| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y)
      .map(|(i, p)| (i as u32, *p))
      .collect()
  }

  /// The vertex nearest `st` within `max_dist`, the node the pointer is
  /// hovering over.
  pub fn nearest_vertex(&self, st: Vec2, max_dist: f32) -> Option<u32> {
    let mut best: Option<(f32, u32)> = None;
    for (i, p) in self.stpoints.iter().enumerate() {
      let d = p.distance_squared(st);
      if d <= max_dist * max_dist && best.map_or(true, |(bd, _)| d < bd) {
        best = Some((d, i as u32));
      }
    }
    best.map(|(_, i)| i)
  }

  /// Plane intersections of this fragment's mesh (slice view polylines).
  pub fn lines_on_slice(&self, axis: usize, position: f32) -> SliceIntersections {
    let mesh = self.mesh();
    slice::find_intersections(&mesh.points, &mesh.trgls, axis, position)
  }

  /// Vertices within half a voxel of the slice plane, with their indices.
  pub fn points_on_slice(&self, axis: usize, position: f32) -> Vec<(u32, Vec3)> {
    self
      .mesh()
      .points
      .iter()
      .enumerate()
      .filter(|(_, p)| {
        let d = p[axis] - position;
        (-0.5001..0.5001).contains(&d)
      })
      .map(|(i, p)| (i as u32, *p))
      .collect()
  }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;
