//! Triangle mesh model for surface fragments.
//!
//! A fragment mesh carries a 3D position per vertex (volume coordinates, the
//! world vertical along +y) and optionally one uv texture coordinate per
//! vertex. Triangles are index triples; `neighbors[t][e]` is the triangle
//! across edge `e = (v[e], v[e+1])` of triangle `t`, or -1.

use std::collections::HashMap;
use std::f32::consts::PI;

use glam::Vec3;
use smallvec::SmallVec;

use crate::error::{Result, ScrollError};

/// Triangulated surface patch.
#[derive(Clone, Debug, Default)]
pub struct TriMesh {
  pub points: Vec<Vec3>,
  /// Either empty or one uv per vertex.
  pub uvs: Vec<glam::Vec2>,
  pub trgls: Vec<[u32; 3]>,
  /// Adjacent triangle per edge, -1 on the boundary.
  pub neighbors: Vec<[i32; 3]>,
  /// Bumped on every mutation; renderers use it to refresh vertex streams.
  pub modified_tick: u64,
}

impl TriMesh {
  pub fn new(points: Vec<Vec3>, uvs: Vec<glam::Vec2>, trgls: Vec<[u32; 3]>) -> Self {
    let neighbors = find_neighbors(&trgls);
    Self {
      points,
      uvs,
      trgls,
      neighbors,
      modified_tick: 1,
    }
  }

  pub fn touch(&mut self) {
    self.modified_tick += 1;
  }

  pub fn vertex_count(&self) -> usize {
    self.points.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.trgls.len()
  }

  /// Recompute the neighbor table after the triangle list changed.
  pub fn rebuild_neighbors(&mut self) {
    self.neighbors = find_neighbors(&self.trgls);
  }

  /// Check the structural invariants. Cheap enough for debug assertions and
  /// the randomized edit tests.
  pub fn validate(&self) -> Result<()> {
    let n = self.points.len();
    if !self.uvs.is_empty() && self.uvs.len() != n {
      return Err(ScrollError::IndexOutOfRange {
        index: self.uvs.len(),
        len: n,
      });
    }
    for t in &self.trgls {
      for &v in t {
        if v as usize >= n {
          return Err(ScrollError::IndexOutOfRange {
            index: v as usize,
            len: n,
          });
        }
      }
      if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
        return Err(ScrollError::TriangulationFailed(format!(
          "degenerate triangle {t:?}"
        )));
      }
    }
    Ok(())
  }
}

/// Unnormalized face normal (cross product of two edges) per triangle.
/// Its length is twice the triangle area.
pub fn face_normals(points: &[Vec3], trgls: &[[u32; 3]]) -> Vec<Vec3> {
  trgls
    .iter()
    .map(|t| {
      let p0 = points[t[0] as usize];
      let e1 = points[t[1] as usize] - p0;
      let e2 = points[t[2] as usize] - p0;
      e1.cross(e2)
    })
    .collect()
}

/// Area-weighted vertex normals, normalized.
pub fn point_normals(points: &[Vec3], trgls: &[[u32; 3]]) -> Vec<Vec3> {
  let fnorms = face_normals(points, trgls);
  let mut out = vec![Vec3::ZERO; points.len()];
  for (t, n) in trgls.iter().zip(&fnorms) {
    for &v in t {
      out[v as usize] += *n;
    }
  }
  for n in &mut out {
    *n = n.normalize_or_zero();
  }
  out
}

/// All triangles incident to vertex `v`.
pub fn trgls_around_point(v: u32, trgls: &[[u32; 3]]) -> SmallVec<[u32; 8]> {
  trgls
    .iter()
    .enumerate()
    .filter(|(_, t)| t.contains(&v))
    .map(|(i, _)| i as u32)
    .collect()
}

/// Build the per-edge adjacency table. Edge `e` of triangle `t` joins
/// vertices `t[e]` and `t[(e+1)%3]`.
pub fn find_neighbors(trgls: &[[u32; 3]]) -> Vec<[i32; 3]> {
  let mut by_edge: HashMap<(u32, u32), (u32, u32)> = HashMap::with_capacity(trgls.len() * 3);
  let mut out = vec![[-1i32; 3]; trgls.len()];
  for (ti, t) in trgls.iter().enumerate() {
    for e in 0..3 {
      let a = t[e];
      let b = t[(e + 1) % 3];
      let key = (a.min(b), a.max(b));
      match by_edge.remove(&key) {
        Some((oi, oe)) => {
          out[ti][e] = oi as i32;
          out[oi as usize][oe as usize] = ti as i32;
        }
        None => {
          by_edge.insert(key, (ti as u32, e as u32));
        }
      }
    }
  }
  out
}

/// Rotate a triangle so its smallest vertex index comes first. Keeps the
/// cyclic order, so orientation survives.
#[inline]
pub fn rotate_to_min(t: [u32; 3]) -> [u32; 3] {
  if t[0] <= t[1] && t[0] <= t[2] {
    t
  } else if t[1] <= t[2] {
    [t[1], t[2], t[0]]
  } else {
    [t[2], t[0], t[1]]
  }
}

/// Total surface area in the squared units of `points`.
pub fn surface_area(points: &[Vec3], trgls: &[[u32; 3]]) -> f64 {
  face_normals(points, trgls)
    .iter()
    .map(|n| 0.5 * n.length() as f64)
    .sum()
}

/// Surface area in cm^2 for voxels of the given pitch in micrometers.
pub fn area_sq_cm(points: &[Vec3], trgls: &[[u32; 3]], voxel_size_um: f64) -> f64 {
  let um2_per_cm2 = 1e8;
  surface_area(points, trgls) * voxel_size_um * voxel_size_um / um2_per_cm2
}

/// Region grow from the triangles around `seed`, walking `neighbors` and
/// keeping triangles whose normal stays within `max_angle_deg` of `axis`
/// (the depth axis of the view driving the selection). The sign of the
/// seed's normals decides which way along the axis counts as agreeing.
/// Returns triangle indices.
pub fn region_by_normals(mesh: &TriMesh, seed: u32, max_angle_deg: f32, axis: usize) -> Vec<u32> {
  let min_dot = (max_angle_deg * PI / 180.0).cos();
  let normals: Vec<Vec3> = face_normals(&mesh.points, &mesh.trgls)
    .into_iter()
    .map(|n| n.normalize_or_zero())
    .collect();
  let start = trgls_around_point(seed, &mesh.trgls);
  let sum: f32 = start.iter().map(|&t| normals[t as usize][axis]).sum();
  let sgn = if sum < 0.0 { -1.0 } else { 1.0 };

  let mut stack: Vec<u32> = start.into_iter().collect();
  let mut done = vec![false; mesh.trgls.len()];
  let mut out = Vec::new();
  while let Some(t) = stack.pop() {
    if done[t as usize] {
      continue;
    }
    done[t as usize] = true;
    if sgn * normals[t as usize][axis] < min_dot {
      continue;
    }
    out.push(t);
    for &n in &mesh.neighbors[t as usize] {
      if n >= 0 && !done[n as usize] {
        stack.push(n as u32);
      }
    }
  }
  out
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
