//! Single-cell polygonisation.
//!
//! A cell is 8 corner samples in [`CORNER_OFFSETS`] order. Each crossed edge
//! contributes one vertex, linearly interpolated to the iso level:
//!
//! ```text
//!   a ●────────×────────● b        t = clamp((iso - a) / (b - a), 0, 1)
//!     0        t        1
//! ```

use glam::Vec3;
use smallvec::SmallVec;

use crate::edge_table::{cube_index, EDGE_CONNECTIONS, MAX_TRIANGLES_PER_CELL, TRI_TABLE};

pub use crate::edge_table::CORNER_OFFSETS;

/// Triangles produced by one cell, as edge-index triples.
pub type EdgeTriangles = SmallVec<[[usize; 3]; MAX_TRIANGLES_PER_CELL]>;

/// World-space triangles produced by one cell.
pub type CellTriangles = SmallVec<[[Vec3; 3]; MAX_TRIANGLES_PER_CELL]>;

/// Where an edge crosses the iso level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeCrossing {
  /// Corner at `t = 0`.
  pub from: usize,
  /// Corner at `t = 1`.
  pub to: usize,
  pub t: f32,
}

impl EdgeCrossing {
  /// The corner on the solid side of the crossing.
  #[inline]
  pub fn solid_corner(&self, values: &[f32; 8]) -> usize {
    if values[self.from] >= values[self.to] {
      self.from
    } else {
      self.to
    }
  }
}

/// Interpolation parameter of the iso crossing between values `a` and `b`.
#[inline]
pub fn interpolate(a: f32, b: f32, iso_level: f32) -> f32 {
  let denom = b - a;
  if denom.abs() < 1e-6 {
    return 0.5;
  }
  ((iso_level - a) / denom).clamp(0.0, 1.0)
}

#[inline]
pub fn edge_crossing(values: &[f32; 8], edge: usize, iso_level: f32) -> EdgeCrossing {
  let [from, to] = EDGE_CONNECTIONS[edge];
  EdgeCrossing {
    from,
    to,
    t: interpolate(values[from], values[to], iso_level),
  }
}

/// Edge triples for the configuration of `values`.
///
/// Empty for homogeneous cells (index 0 or 255).
pub fn cell_edge_triangles(values: &[f32; 8], iso_level: f32) -> EdgeTriangles {
  let row = &TRI_TABLE[cube_index(values, iso_level)];
  row
    .chunks_exact(3)
    .take_while(|tri| tri[0] >= 0)
    .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
    .collect()
}

/// Polygonise one cell whose corners sit at `corners`.
pub fn polygonize_cell(values: &[f32; 8], corners: &[Vec3; 8], iso_level: f32) -> CellTriangles {
  let vertex = |edge: usize| {
    let c = edge_crossing(values, edge, iso_level);
    corners[c.from].lerp(corners[c.to], c.t)
  };
  cell_edge_triangles(values, iso_level)
    .into_iter()
    .map(|[a, b, c]| [vertex(a), vertex(b), vertex(c)])
    .collect()
}

/// Corner positions of an axis-aligned cell.
pub fn cell_corners(min: Vec3, size: Vec3) -> [Vec3; 8] {
  std::array::from_fn(|i| {
    let [x, y, z] = CORNER_OFFSETS[i];
    min + Vec3::new(x as f32, y as f32, z as f32) * size
  })
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
