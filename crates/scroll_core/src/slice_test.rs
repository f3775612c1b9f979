use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

#[test]
fn test_coplanar_triangle_yields_nothing() {
  // Triangle lying in the z = 0 plane: the nudge moves the plane off every
  // vertex, all signs agree, and the triangle is dropped.
  let points = vec![
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(10.0, 0.0, 0.0),
    Vec3::new(0.0, 10.0, 0.0),
  ];
  let out = find_intersections(&points, &[[0, 1, 2]], 2, 0.0);
  assert!(out.is_empty());
}

#[test]
fn test_crossing_triangle_yields_one_segment() {
  let points = vec![
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(10.0, 0.0, 1.0),
    Vec3::new(0.0, 10.0, 0.0),
  ];
  let out = find_intersections(&points, &[[0, 1, 2]], 2, 0.0);
  assert_eq!(out.len(), 1);
  assert_eq!(out.trgl_indices, vec![0]);
  let seg = out.segments[0];
  // Vertex 2 sits on the plane, so the nudged plane passes just below it:
  // one endpoint interpolates the 0-1 edge near (5, 0), the other hugs
  // vertex 2 at (0, 10).
  let (a, b) = (
    Vec3::new(seg[0], seg[1], seg[2]),
    Vec3::new(seg[3], seg[4], seg[5]),
  );
  let near_mid = |p: Vec3| (p.x - 5.0).abs() < 0.1 && p.y.abs() < 0.1;
  let near_vtx = |p: Vec3| p.x.abs() < 0.2 && (p.y - 10.0).abs() < 0.2;
  assert!(
    (near_mid(a) && near_vtx(b)) || (near_mid(b) && near_vtx(a)),
    "unexpected segment {seg:?}"
  );
}

#[test]
fn test_endpoints_lie_on_nudged_plane() {
  let points = vec![
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(10.0, 0.0, 1.0),
    Vec3::new(0.0, 10.0, 3.0),
    Vec3::new(4.0, 4.0, -2.0),
  ];
  let trgls = [[0, 1, 2], [1, 2, 3]];
  let out = find_intersections(&points, &trgls, 2, 0.5);
  assert_eq!(out.len(), 2);
  for seg in &out.segments {
    assert!((seg[2] - 0.5).abs() < 1e-5);
    assert!((seg[5] - 0.5).abs() < 1e-5);
  }
}

#[test]
fn test_closure_on_random_meshes() {
  // Every triangle whose vertex signs disagree produces a segment, and no
  // other triangle does; endpoints stay on the plane.
  let mut rng = StdRng::seed_from_u64(7);
  for _ in 0..20 {
    let n = rng.random_range(4..40);
    let points: Vec<Vec3> = (0..n)
      .map(|_| {
        Vec3::new(
          rng.random_range(-50.0..50.0),
          rng.random_range(-50.0..50.0),
          rng.random_range(-50.0..50.0),
        )
      })
      .collect();
    let trgls: Vec<[u32; 3]> = (0..rng.random_range(1..30))
      .map(|_| {
        let mut t = [0u32; 3];
        loop {
          for v in &mut t {
            *v = rng.random_range(0..n as u32);
          }
          if t[0] != t[1] && t[1] != t[2] && t[0] != t[2] {
            break;
          }
        }
        t
      })
      .collect();
    let axis = rng.random_range(0..3);
    let position = rng.random_range(-40.0..40.0);

    let out = find_intersections(&points, &trgls, axis, position);

    // Recompute the nudged position the same way the kernel does.
    let mut pos = position;
    while points.iter().any(|p| p[axis] == pos) {
      pos += 0.01;
    }
    let expect: Vec<u32> = trgls
      .iter()
      .enumerate()
      .filter(|(_, t)| {
        let s: Vec<f32> = t
          .iter()
          .map(|&v| (points[v as usize][axis] - pos).signum())
          .collect();
        !(s[0] == s[1] && s[1] == s[2])
      })
      .map(|(i, _)| i as u32)
      .collect();
    assert_eq!(out.trgl_indices, expect);
    for seg in &out.segments {
      assert!((seg[axis] - pos).abs() < 1e-3 * pos.abs().max(1.0));
      assert!((seg[3 + axis] - pos).abs() < 1e-3 * pos.abs().max(1.0));
    }
  }
}
