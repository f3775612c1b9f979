use glam::Vec2;

use super::*;

/// Nine irregular real points (index 4 interior, the rest on the hull) plus
/// a distant ring of 4 "outside" points with indices 9..13.
fn cloud_with_ring() -> (Vec<Vec2>, usize) {
  let pts = vec![
    Vec2::new(0.0, 0.0),
    Vec2::new(2.1, -0.3),
    Vec2::new(4.3, 0.4),
    Vec2::new(-0.4, 2.2),
    Vec2::new(2.0, 1.9),
    Vec2::new(4.1, 2.3),
    Vec2::new(0.2, 4.1),
    Vec2::new(2.3, 4.4),
    Vec2::new(4.4, 4.0),
  ];
  let n_real = pts.len();
  let mut pts = pts;
  pts.push(Vec2::new(-10.0, -10.0));
  pts.push(Vec2::new(14.0, -10.0));
  pts.push(Vec2::new(14.0, 14.0));
  pts.push(Vec2::new(-10.0, 14.0));
  (pts, n_real)
}

#[test]
fn test_window_collects_indices() {
  let (pts, n_real) = cloud_with_ring();
  let set = TriPointSet::new(&pts, n_real, Vec2::new(1.0, 0.8), 1.5);
  assert_eq!(set.len(), 4); // points 0, 1, 3, 4
}

#[test]
fn test_triangulate_drops_ring_and_canonicalizes() {
  let (pts, n_real) = cloud_with_ring();
  let set = TriPointSet::new(&pts, n_real, Vec2::new(2.0, 2.0), 100.0);
  let trgls = set.triangulate().unwrap();
  // 9 points, 8 on the hull: 2*9 - 2 - 8 = 8 triangles, ring dropped.
  assert_eq!(trgls.len(), 8);
  for t in &trgls {
    assert!(t.iter().all(|&v| v < n_real as u32));
    assert!(t[0] <= t[1] && t[0] <= t[2]);
  }
}

#[test]
fn test_triangulate_collinear_fails() {
  let pts = vec![
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(2.0, 0.0),
  ];
  let set = TriPointSet::new(&pts, 3, Vec2::new(1.0, 0.0), 10.0);
  assert!(set.triangulate().is_err());
}

#[test]
fn test_trgl_diff_empty_for_identical_sets() {
  let (pts, n_real) = cloud_with_ring();
  let a = TriPointSet::new(&pts, n_real, Vec2::new(2.0, 2.0), 100.0);
  let b = a.clone();
  let (removed, added) = trgl_diff(&a, &b).unwrap();
  assert!(removed.is_empty());
  assert!(added.is_empty());
}

#[test]
fn test_trgl_diff_on_delete_localizes() {
  let (pts, n_real) = cloud_with_ring();
  let old = TriPointSet::new(&pts, n_real, Vec2::new(2.0, 2.0), 100.0);
  let mut new = old.clone();
  new.delete_point(4); // the interior point
  let (removed, added) = trgl_diff(&old, &new).unwrap();
  // The cavity around the deleted vertex loses its k incident triangles and
  // refills with k - 2.
  assert!(!removed.is_empty());
  assert!(removed.iter().all(|t| t.contains(&4)));
  assert_eq!(removed.len(), added.len() + 2);
  assert!(added.iter().all(|t| !t.contains(&4)));
}

#[test]
fn test_replace_trgls_splices() {
  let mut trgls = vec![[0u32, 1, 4], [1, 2, 4], [2, 5, 4]];
  replace_trgls(&mut trgls, &[[1, 2, 4]], &[[1, 2, 8], [2, 5, 8]]);
  assert_eq!(trgls, vec![[0, 1, 4], [2, 5, 4], [1, 2, 8], [2, 5, 8]]);
}

#[test]
fn test_replace_trgls_matches_any_rotation() {
  // The stored triangle is a rotation of the canonical removal key.
  let mut trgls = vec![[4u32, 0, 1]];
  replace_trgls(&mut trgls, &[[0, 1, 4]], &[]);
  assert!(trgls.is_empty());
}

#[test]
fn test_add_point_at_end_takes_next_real_index() {
  let (pts, n_real) = cloud_with_ring();
  let mut set = TriPointSet::new(&pts, n_real, Vec2::new(2.0, 2.0), 100.0);
  set.add_point_at_end(Vec2::new(2.2, 2.4));
  let trgls = set.triangulate().unwrap();
  assert!(trgls.iter().any(|t| t.contains(&(n_real as u32))));
}
