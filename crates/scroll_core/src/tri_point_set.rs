//! Windowed Delaunay retriangulation for local mesh edits.
//!
//! A [`TriPointSet`] captures the subset of a fragment's st points (real
//! vertices followed by the outside ring) that fall inside a square window
//! around an edit. Triangulating the window before and after a mutation and
//! diffing the two canonicalized triangle sets yields the minimal patch to
//! splice into the global triangle list, leaving everything outside the
//! window untouched.

use std::collections::HashSet;

use glam::Vec2;

use crate::error::{Result, ScrollError};
use crate::mesh::rotate_to_min;

/// Run a 2D Delaunay over `points`. Fails when the triangulation is empty
/// (fewer than three points, or all collinear).
pub fn delaunay(points: &[Vec2]) -> Result<Vec<[u32; 3]>> {
  let pts: Vec<delaunator::Point> = points
    .iter()
    .map(|p| delaunator::Point {
      x: p.x as f64,
      y: p.y as f64,
    })
    .collect();
  let tri = delaunator::triangulate(&pts);
  if tri.triangles.is_empty() {
    return Err(ScrollError::TriangulationFailed(format!(
      "no triangles from {} points",
      points.len()
    )));
  }
  Ok(
    tri
      .triangles
      .chunks_exact(3)
      .map(|c| [c[0] as u32, c[1] as u32, c[2] as u32])
      .collect(),
  )
}

/// The points of `all_stpoints` inside a square window, with their original
/// indices preserved.
#[derive(Clone, Debug)]
pub struct TriPointSet {
  /// Indices into the fragment's `all_stpoints`.
  indexes: Vec<u32>,
  pts: Vec<Vec2>,
  /// Count of real (non-ring) points in `all_stpoints`; indices at or above
  /// it belong to the outside ring.
  n_real: u32,
}

impl TriPointSet {
  /// Collect the points of `all_stpoints` within `center +- half_width` on
  /// both axes.
  pub fn new(all_stpoints: &[Vec2], n_real: usize, center: Vec2, half_width: f32) -> Self {
    let mut indexes = Vec::new();
    let mut pts = Vec::new();
    for (i, p) in all_stpoints.iter().enumerate() {
      if (p.x - center.x).abs() <= half_width && (p.y - center.y).abs() <= half_width {
        indexes.push(i as u32);
        pts.push(*p);
      }
    }
    Self {
      indexes,
      pts,
      n_real: n_real as u32,
    }
  }

  pub fn len(&self) -> usize {
    self.indexes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.indexes.is_empty()
  }

  /// Drop the point with global index `index`, if present in the window.
  pub fn delete_point(&mut self, index: usize) {
    if let Some(row) = self.indexes.iter().position(|&i| i as usize == index) {
      self.indexes.remove(row);
      self.pts.remove(row);
    }
  }

  /// Append a new real point; it takes the next real index and grows the
  /// real block by one.
  pub fn add_point_at_end(&mut self, st: Vec2) {
    self.indexes.push(self.n_real);
    self.pts.push(st);
    self.n_real += 1;
  }

  /// Delaunay over the window, mapped back to global indices. Triangles
  /// touching the outside ring are discarded; the rest come back in
  /// canonical rotation (smallest index first).
  pub fn triangulate(&self) -> Result<Vec<[u32; 3]>> {
    let local = delaunay(&self.pts)?;
    Ok(
      local
        .into_iter()
        .map(|t| {
          rotate_to_min([
            self.indexes[t[0] as usize],
            self.indexes[t[1] as usize],
            self.indexes[t[2] as usize],
          ])
        })
        .filter(|t| t.iter().all(|&v| v < self.n_real))
        .collect(),
    )
  }
}

/// Triangulate both sets and return `(to_remove, to_add)`: the canonical
/// triangles only in `old`, and only in `new`.
pub fn trgl_diff(
  old: &TriPointSet,
  new: &TriPointSet,
) -> Result<(Vec<[u32; 3]>, Vec<[u32; 3]>)> {
  let old_trgls = old.triangulate()?;
  let new_trgls = new.triangulate()?;
  let old_set: HashSet<[u32; 3]> = old_trgls.iter().copied().collect();
  let new_set: HashSet<[u32; 3]> = new_trgls.iter().copied().collect();
  let removed = old_trgls
    .iter()
    .filter(|t| !new_set.contains(*t))
    .copied()
    .collect();
  let added = new_trgls
    .iter()
    .filter(|t| !old_set.contains(*t))
    .copied()
    .collect();
  Ok((removed, added))
}

/// Splice a window diff into the global triangle list: remove every triangle
/// whose canonical form is in `remove`, then append the triangles of `add`
/// not already present. The window triangulation can disagree with the
/// global one right at the window boundary; deduplicating keeps the
/// no-duplicate-triangles invariant regardless.
pub fn replace_trgls(trgls: &mut Vec<[u32; 3]>, remove: &[[u32; 3]], add: &[[u32; 3]]) {
  if !remove.is_empty() {
    let gone: HashSet<[u32; 3]> = remove.iter().copied().collect();
    trgls.retain(|t| !gone.contains(&rotate_to_min(*t)));
  }
  if !add.is_empty() {
    let present: HashSet<[u32; 3]> = trgls.iter().map(|t| rotate_to_min(*t)).collect();
    trgls.extend(add.iter().filter(|t| !present.contains(*t)).copied());
  }
}

#[cfg(test)]
#[path = "tri_point_set_test.rs"]
mod tri_point_set_test;
