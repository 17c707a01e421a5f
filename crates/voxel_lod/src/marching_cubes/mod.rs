//! Marching cubes over a rectangular grid of iso samples.
//!
//! # Processing
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ INPUT  SampleGrid: iso/type samples, cell counts,        │
//! │        world origin and per-axis spacing                 │
//! └──────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ PER CELL  configuration index → TRI_TABLE edge triples   │
//! │           vertex per crossed edge (linear interpolation) │
//! │           normal = -gradient interpolated along edge     │
//! │           type   = type of the solid edge corner         │
//! └──────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ OUTPUT RawMeshBuffers, triangles wound so the geometric  │
//! │        normal agrees with the gradient normal            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Solid is high: samples `>= iso_level` are inside.

pub mod cell;
pub mod gradient;
pub mod stitch;

use glam::{IVec3, UVec3, Vec3};

pub use cell::{
  cell_corners, cell_edge_triangles, edge_crossing, interpolate, polygonize_cell, CellTriangles,
  EdgeCrossing, CORNER_OFFSETS,
};
pub use gradient::{cell_gradient, central_difference, surface_normal};
pub use stitch::{stitch_face, transition_slab, StitchInput, TransitionSlab};

use crate::types::RawMeshBuffers;

/// Borrowed view of a rectangular sample grid.
///
/// Samples are stored X fastest, Z slowest, with `cells + 1` samples per
/// axis.
#[derive(Clone, Copy, Debug)]
pub struct SampleGrid<'a> {
  pub iso: &'a [f32],
  pub types: &'a [u32],
  /// Cell count per axis.
  pub cells: UVec3,
  /// World position of sample (0, 0, 0).
  pub origin: Vec3,
  /// World distance between neighbouring samples, per axis.
  pub spacing: Vec3,
}

impl<'a> SampleGrid<'a> {
  /// Cubic grid with uniform spacing.
  pub fn cubic(iso: &'a [f32], types: &'a [u32], cells: u32, origin: Vec3, spacing: f32) -> Self {
    Self {
      iso,
      types,
      cells: UVec3::splat(cells),
      origin,
      spacing: Vec3::splat(spacing),
    }
  }

  #[inline]
  pub fn samples(&self) -> UVec3 {
    self.cells + UVec3::ONE
  }

  /// True when both buffers hold exactly one value per sample.
  pub fn is_consistent(&self) -> bool {
    let n = self.samples();
    let len = (n.x * n.y * n.z) as usize;
    self.iso.len() == len && self.types.len() == len
  }

  #[inline]
  pub fn index(&self, coord: IVec3) -> usize {
    let n = self.samples().as_ivec3();
    (coord.x + n.x * (coord.y + n.y * coord.z)) as usize
  }

  #[inline]
  pub fn value(&self, coord: IVec3) -> f32 {
    self.iso[self.index(coord)]
  }

  #[inline]
  pub fn position(&self, coord: IVec3) -> Vec3 {
    self.origin + coord.as_vec3() * self.spacing
  }

  /// Field gradient at a sample, in world units.
  pub fn gradient(&self, coord: IVec3) -> Vec3 {
    central_difference(|c| self.value(c), coord, self.cells.as_ivec3()) / self.spacing
  }
}

/// Cells to leave out on each face, indexed like [`crate::octree::Face`].
///
/// A skipped face drops the outermost cell layer on that side so a
/// transition strip can take its place.
pub type FaceSkip = [bool; 6];

/// Extract the iso surface of `grid`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "marching_cubes::extract"))]
pub fn extract(grid: &SampleGrid<'_>, iso_level: f32, skip: FaceSkip) -> RawMeshBuffers {
  let mut out = RawMeshBuffers::new();
  if !grid.is_consistent() {
    log::warn!(
      "marching cubes grid {:?} does not match buffers of {} samples",
      grid.cells,
      grid.iso.len()
    );
    return out;
  }

  let mut lo = IVec3::ZERO;
  let mut hi = grid.cells.as_ivec3();
  for axis in 0..3 {
    // Face order is +X, -X, +Y, -Y, +Z, -Z.
    if skip[axis * 2] {
      hi[axis] -= 1;
    }
    if skip[axis * 2 + 1] {
      lo[axis] += 1;
    }
  }

  for z in lo.z..hi.z {
    for y in lo.y..hi.y {
      for x in lo.x..hi.x {
        polygonize_into(grid, IVec3::new(x, y, z), iso_level, &mut out);
      }
    }
  }
  out
}

fn polygonize_into(grid: &SampleGrid<'_>, cell: IVec3, iso_level: f32, out: &mut RawMeshBuffers) {
  let coords: [IVec3; 8] = std::array::from_fn(|i| {
    let [x, y, z] = CORNER_OFFSETS[i];
    cell + IVec3::new(x as i32, y as i32, z as i32)
  });
  let values = coords.map(|c| grid.value(c));
  let triangles = cell_edge_triangles(&values, iso_level);
  if triangles.is_empty() {
    return;
  }

  let corner_normals = coords.map(|c| grid.gradient(c));
  let fallback = surface_normal(cell_gradient(&values) / grid.spacing, Vec3::Y);

  for edges in triangles {
    let mut positions = [Vec3::ZERO; 3];
    let mut normals = [Vec3::ZERO; 3];
    let mut types = [0u32; 3];
    for (k, edge) in edges.into_iter().enumerate() {
      let crossing = edge_crossing(&values, edge, iso_level);
      let (a, b) = (coords[crossing.from], coords[crossing.to]);
      positions[k] = grid.position(a).lerp(grid.position(b), crossing.t);
      let gradient = corner_normals[crossing.from].lerp(corner_normals[crossing.to], crossing.t);
      normals[k] = surface_normal(gradient, fallback);
      types[k] = grid.types[grid.index(coords[crossing.solid_corner(&values)])];
    }

    let face = (positions[1] - positions[0]).cross(positions[2] - positions[0]);
    let mean = normals[0] + normals[1] + normals[2];
    if face.dot(mean) < 0.0 {
      positions.swap(1, 2);
      normals.swap(1, 2);
      types.swap(1, 2);
    }
    out.push_triangle(positions, normals, types);
  }
}
