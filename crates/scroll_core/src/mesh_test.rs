use glam::{Vec2, Vec3};

use super::*;

/// Two triangles sharing the edge (1, 2), forming a unit square in the xz
/// plane at y = 0.
fn quad() -> TriMesh {
  let points = vec![
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
  ];
  let uvs = vec![
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
  ];
  TriMesh::new(points, uvs, vec![[0, 1, 2], [1, 3, 2]])
}

#[test]
fn test_face_normals_unnormalized() {
  let m = quad();
  let ns = face_normals(&m.points, &m.trgls);
  assert_eq!(ns.len(), 2);
  // cross((1,0,0), (0,0,1)) = (0,-1,0); length = 2 * area = 1
  assert!((ns[0] - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
  assert!((ns[0].length() - 1.0).abs() < 1e-6);
}

#[test]
fn test_point_normals_unit_length() {
  let m = quad();
  let ns = point_normals(&m.points, &m.trgls);
  for n in &ns {
    assert!((n.length() - 1.0).abs() < 1e-6);
    assert!((n.y.abs() - 1.0).abs() < 1e-6);
  }
}

#[test]
fn test_trgls_around_point() {
  let m = quad();
  let around = trgls_around_point(1, &m.trgls);
  assert_eq!(around.as_slice(), &[0, 1]);
  let around = trgls_around_point(0, &m.trgls);
  assert_eq!(around.as_slice(), &[0]);
}

#[test]
fn test_find_neighbors_symmetry() {
  let m = quad();
  // edge 1 of triangle 0 is (1,2), shared with triangle 1
  assert_eq!(m.neighbors[0], [-1, 1, -1]);
  // triangle 1 edges: (1,3), (3,2), (2,1); the shared edge is index 2
  assert_eq!(m.neighbors[1], [-1, -1, 0]);
}

#[test]
fn test_rotate_to_min_keeps_cycle() {
  assert_eq!(rotate_to_min([3, 1, 2]), [1, 2, 3]);
  assert_eq!(rotate_to_min([2, 3, 1]), [1, 2, 3]);
  assert_eq!(rotate_to_min([1, 2, 3]), [1, 2, 3]);
  assert_eq!(rotate_to_min([5, 9, 7]), [5, 9, 7]);
}

#[test]
fn test_surface_area() {
  let m = quad();
  assert!((surface_area(&m.points, &m.trgls) - 1.0).abs() < 1e-9);
  // 1 voxel^2 at 10000 um pitch = 1 cm^2
  assert!((area_sq_cm(&m.points, &m.trgls, 10_000.0) - 1.0).abs() < 1e-9);
}

#[test]
fn test_validate_catches_bad_index() {
  let mut m = quad();
  m.trgls.push([0, 1, 9]);
  assert!(m.validate().is_err());
}

#[test]
fn test_region_by_normals_stops_at_fold() {
  // A strip of 4 triangles in the xz plane, then 2 folded straight up.
  let points = vec![
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(2.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(2.0, 0.0, 1.0),
    // folded edge rising in y at z = 1
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
  ];
  let trgls = vec![
    [0, 1, 3],
    [1, 4, 3],
    [1, 2, 4],
    [2, 5, 4],
    [3, 4, 6],
    [4, 7, 6],
  ];
  let mesh = TriMesh::new(points, Vec::new(), trgls);
  let mut region = region_by_normals(&mesh, 0, 30.0, 1);
  region.sort_unstable();
  assert_eq!(region, vec![0, 1, 2, 3]);
}
