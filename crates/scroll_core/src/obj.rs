//! Fragment file format: an OBJ subset plus .mtl and .json sidecars.
//!
//! The subset understood here is what scroll segmentation tools exchange:
//! `v x y z` (an optional trailing color is ignored), `vt u v`,
//! `f a/a/a b/b/b c/c/c` with vertex and texture indices assumed equal,
//! comments, `mtllib`, `usemtl`. Two header comments are load-bearing
//! metadata: `# Created: <timestamp>` and `# Name: <name>`.
//!
//! The `.mtl` sidecar carries the fragment color as `Kd r g b`; the `.json`
//! sidecar carries area and element counts. Both are optional on load.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScrollError};
use crate::mesh::{self, TriMesh};

/// Which OBJ `vt` field maps to u. Some producers write `vt v u`; the
/// importer makes the choice explicit instead of guessing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvOrder {
  #[default]
  Uv,
  Vu,
}

/// Fragment metadata carried outside the mesh itself.
#[derive(Clone, Debug)]
pub struct FragmentMeta {
  pub name: String,
  pub created: String,
  /// Linear rgb in [0, 1].
  pub color: [f32; 3],
}

/// A loaded fragment: mesh plus metadata.
#[derive(Clone, Debug)]
pub struct Fragment {
  pub mesh: TriMesh,
  pub meta: FragmentMeta,
}

/// Element counts and area recorded in the `.json` sidecar.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SidecarInfo {
  pub name: String,
  pub area_sq_cm: f64,
  pub n_vrts: usize,
  pub n_trgls: usize,
}

static NEXT_COLOR: AtomicUsize = AtomicUsize::new(0);

const DEFAULT_PALETTE: [[f32; 3]; 8] = [
  [0.91, 0.36, 0.23],
  [0.27, 0.63, 0.87],
  [0.42, 0.80, 0.35],
  [0.93, 0.79, 0.25],
  [0.72, 0.42, 0.87],
  [0.32, 0.83, 0.74],
  [0.90, 0.51, 0.70],
  [0.62, 0.62, 0.62],
];

/// Rotating fallback color for fragments without a readable `.mtl`.
pub fn next_default_color() -> [f32; 3] {
  let i = NEXT_COLOR.fetch_add(1, Ordering::Relaxed);
  DEFAULT_PALETTE[i % DEFAULT_PALETTE.len()]
}

/// Load a fragment from `path` (an `.obj` file). Non-structural malformed
/// lines are skipped with a warning; a face referencing a missing vertex
/// aborts the load.
pub fn load_fragment(path: &Path, uv_order: UvOrder) -> Result<Fragment> {
  let text = fs::read_to_string(path)?;
  let mut points: Vec<Vec3> = Vec::new();
  let mut uvs: Vec<Vec2> = Vec::new();
  let mut trgls: Vec<[u32; 3]> = Vec::new();
  let mut created = String::new();
  let mut name = String::new();

  for (lineno, raw) in text.lines().enumerate() {
    let lineno = lineno + 1;
    let words: Vec<&str> = raw.split_whitespace().collect();
    let Some(&first) = words.first() else {
      continue;
    };
    if first.starts_with('#') {
      if words.len() > 2 {
        match words[1] {
          "Created:" => created = words[2].to_string(),
          "Name:" => name = words[2].to_string(),
          _ => {}
        }
      }
      continue;
    }
    match first {
      "v" => {
        // 4 words for plain position, 7 with an attached color (ignored)
        if words.len() == 4 || words.len() == 7 {
          match parse_floats::<3>(&words[1..4]) {
            Some(p) => points.push(Vec3::from_array(p)),
            None => warn!(line = lineno, "skipping malformed v line"),
          }
        } else {
          warn!(line = lineno, "skipping malformed v line");
        }
      }
      "vn" => {}
      "vt" => {
        if let Some(t) = (words.len() == 3)
          .then(|| parse_floats::<2>(&words[1..3]))
          .flatten()
        {
          let uv = match uv_order {
            UvOrder::Uv => Vec2::new(t[0], t[1]),
            UvOrder::Vu => Vec2::new(t[1], t[0]),
          };
          uvs.push(uv);
        } else {
          warn!(line = lineno, "skipping malformed vt line");
        }
      }
      "f" => {
        if words.len() != 4 {
          warn!(line = lineno, "skipping non-triangle face");
          continue;
        }
        let mut t = [0u32; 3];
        for (i, w) in words[1..4].iter().enumerate() {
          let field = w.split('/').next().unwrap_or("");
          let v: i64 = field.parse().map_err(|_| ScrollError::FileParseError {
            path: path.to_path_buf(),
            line: lineno,
            msg: format!("bad face index {field:?}"),
          })?;
          if v < 1 {
            return Err(ScrollError::FileParseError {
              path: path.to_path_buf(),
              line: lineno,
              msg: format!("face index {v} out of range"),
            });
          }
          t[i] = (v - 1) as u32;
        }
        trgls.push(t);
      }
      "mtllib" | "usemtl" | "o" | "g" | "s" => {}
      other => warn!(line = lineno, "skipping unknown obj keyword {other:?}"),
    }
  }

  let nv = points.len();
  if let Some(t) = trgls
    .iter()
    .find(|t| t.iter().any(|&v| v as usize >= nv))
  {
    return Err(ScrollError::FileParseError {
      path: path.to_path_buf(),
      line: 0,
      msg: format!("face {t:?} references a vertex beyond {nv}"),
    });
  }
  if !uvs.is_empty() && uvs.len() != nv {
    warn!(
      n_uvs = uvs.len(),
      n_vrts = nv,
      "uv count does not match vertex count; dropping uvs"
    );
    uvs.clear();
  }

  if name.is_empty() {
    name = path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
  }
  let color = load_mtl_color(&path.with_extension("mtl")).unwrap_or_else(next_default_color);

  Ok(Fragment {
    mesh: TriMesh::new(points, uvs, trgls),
    meta: FragmentMeta {
      name,
      created,
      color,
    },
  })
}

fn parse_floats<const N: usize>(words: &[&str]) -> Option<[f32; N]> {
  let mut out = [0.0f32; N];
  for (o, w) in out.iter_mut().zip(words) {
    *o = w.parse().ok()?;
  }
  Some(out)
}

/// First `Kd r g b` of the sidecar, if it exists and parses.
fn load_mtl_color(path: &Path) -> Option<[f32; 3]> {
  let text = fs::read_to_string(path).ok()?;
  for line in text.lines() {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.len() == 4 && words[0] == "Kd" {
      if let Some(rgb) = parse_floats::<3>(&words[1..4]) {
        return Some(rgb);
      }
    }
  }
  None
}

/// Save the fragment as `.obj` + `.mtl`, and when `area_sq_cm` is known also
/// a `.json` sidecar with counts and area.
pub fn save_fragment(path: &Path, frag: &Fragment, area_sq_cm: Option<f64>) -> Result<()> {
  let mesh = &frag.mesh;
  let name = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();

  let mut obj = String::new();
  let _ = writeln!(obj, "# Scroll fragment OBJ file");
  let _ = writeln!(obj, "# Created: {}", frag.meta.created);
  let _ = writeln!(obj, "# Name: {}", frag.meta.name);
  let _ = writeln!(obj, "# Vertices: {}", mesh.points.len());
  let normals = mesh::point_normals(&mesh.points, &mesh.trgls);
  for (p, n) in mesh.points.iter().zip(&normals) {
    let _ = writeln!(obj, "v {} {} {}", p.x, p.y, p.z);
    let _ = writeln!(obj, "vn {} {} {}", n.x, n.y, n.z);
  }
  let _ = writeln!(obj, "# Color and texture information");
  let _ = writeln!(obj, "mtllib {name}.mtl");
  let _ = writeln!(obj, "usemtl default");
  let has_texture = mesh.uvs.len() == mesh.points.len();
  if has_texture {
    for t in &mesh.uvs {
      let _ = writeln!(obj, "vt {} {}", t.x, t.y);
    }
  }
  let _ = writeln!(obj, "# Faces: {}", mesh.trgls.len());
  for t in &mesh.trgls {
    let mut line = String::from("f");
    for &v in t {
      let v = v + 1;
      if has_texture {
        let _ = write!(line, " {v}/{v}/{v}");
      } else {
        let _ = write!(line, " {v}/{v}");
      }
    }
    let _ = writeln!(obj, "{line}");
  }
  fs::write(path.with_extension("obj"), obj)?;

  let [r, g, b] = frag.meta.color;
  let mut mtl = String::new();
  let _ = writeln!(mtl, "newmtl default");
  let _ = writeln!(mtl, "Ka {r} {g} {b}");
  let _ = writeln!(mtl, "Kd {r} {g} {b}");
  let _ = writeln!(mtl, "Ks 0.0 0.0 0.0");
  let _ = writeln!(mtl, "illum 2");
  let _ = writeln!(mtl, "d 1.0");
  fs::write(path.with_extension("mtl"), mtl)?;

  if let Some(area) = area_sq_cm {
    let info = SidecarInfo {
      name: frag.meta.name.clone(),
      area_sq_cm: area,
      n_vrts: mesh.points.len(),
      n_trgls: mesh.trgls.len(),
    };
    let mut doc = serde_json::Map::new();
    doc.insert(frag.meta.name.clone(), serde_json::to_value(&info)?);
    fs::write(
      path.with_extension("json"),
      serde_json::to_string_pretty(&doc)?,
    )?;
  }
  Ok(())
}

#[cfg(test)]
#[path = "obj_test.rs"]
mod obj_test;
