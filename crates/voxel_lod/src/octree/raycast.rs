//! Segment hit-testing against the iso surface of the global field.
//!
//! The clipped segment is walked along its dominant axis one voxel plane at
//! a time. Each step covers at most 2x2 cells on the tangent axes:
//!
//! ```text
//!     tangent
//!        ▲        step k      step k+1
//!        │      ┌───────┬───────┐
//!        │      │      ╱│       │
//!        │      ├─────╱─┼───────┤
//!        │      │   ╱   │       │
//!        │      └─●─────┴───────┘
//!        └──────────────────────────▶ dominant axis
//! ```
//!
//! A segment whose entry point already samples solid hits there. Past that,
//! cells entirely below the iso level are skipped, cells entirely at or
//! above it are hit where the segment enters them, and mixed cells are
//! polygonised and tested triangle by triangle.

use glam::{IVec3, Vec3};
use smallvec::SmallVec;

use super::{Aabb, Octree};
use crate::edge_table::{cube_index, CORNER_OFFSETS};
use crate::marching_cubes::{cell_corners, polygonize_cell};
use crate::types::HitPoint;

const ALL_EMPTY: usize = 255;
const ALL_SOLID: usize = 0;

/// Hit along a grid-space sub-segment.
#[derive(Clone, Copy, Debug)]
struct LocalHit {
  /// Parameter along the sub-segment, in `[0, 1]`.
  t: f32,
  normal: Vec3,
}

impl Octree {
  /// First intersection of the segment `start..end` with the surface.
  ///
  /// Returns `None` when the segment misses the body or leaves it without
  /// crossing the surface.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::raycast"))]
  pub fn raycast_to_voxel_body(&self, start: Vec3, end: Vec3) -> Option<HitPoint> {
    let (t_in, t_out) = self.config.world_bounds().clip_segment(start, end)?;
    let dir = end - start;
    let g0 = self.world_to_grid(start + dir * t_in);
    let g1 = self.world_to_grid(start + dir * t_out);
    let d = g1 - g0;

    // Entering straight into solid material: the entry point is the hit.
    let entry_cell = self.cell_containing(g0);
    if self.value_at(g0) >= self.config.iso_level {
      return Some(HitPoint {
        position: start + dir * t_in,
        distance: dir.length() * t_in,
        normal: entry_normal(entry_cell.as_vec3(), g0, d),
      });
    }

    let axis = dominant_axis(d);
    for (sa, sb) in plane_steps(g0[axis], g1[axis]) {
      let p0 = g0 + d * sa;
      let p1 = g0 + d * sb;
      if let Some(hit) = self.hit_in_step(p0, p1, axis) {
        let s = sa + hit.t * (sb - sa);
        let t = t_in + s * (t_out - t_in);
        let position = start + dir * t;
        return Some(HitPoint {
          position,
          distance: dir.length() * t,
          normal: hit.normal,
        });
      }
    }
    None
  }

  /// Nearest hit among the cells touched by the sub-segment `p0..p1`.
  fn hit_in_step(&self, p0: Vec3, p1: Vec3, axis: usize) -> Option<LocalHit> {
    let last = self.config.finest_voxels_per_axis() as i32 - 1;
    let cell_of = |v: f32| (v.floor() as i32).clamp(0, last);

    let (u, v) = match axis {
      0 => (1, 2),
      1 => (0, 2),
      _ => (0, 1),
    };
    let main = cell_of((p0[axis] + p1[axis]) * 0.5);
    let span = |a: usize| -> SmallVec<[i32; 2]> {
      let (lo, hi) = (cell_of(p0[a].min(p1[a])), cell_of(p0[a].max(p1[a])));
      (lo..=hi).collect()
    };

    let mut best: Option<LocalHit> = None;
    for cu in span(u) {
      for cv in span(v) {
        let mut cell = IVec3::ZERO;
        cell[axis] = main;
        cell[u] = cu;
        cell[v] = cv;
        if let Some(hit) = self.hit_in_cell(cell, p0, p1) {
          if best.map_or(true, |b| hit.t < b.t) {
            best = Some(hit);
          }
        }
      }
    }
    best
  }

  fn cell_containing(&self, g: Vec3) -> IVec3 {
    let last = self.config.finest_voxels_per_axis() as i32 - 1;
    g.floor().as_ivec3().clamp(IVec3::ZERO, IVec3::splat(last))
  }

  /// Trilinear field value at grid position `g`.
  fn value_at(&self, g: Vec3) -> f32 {
    let cell = self.cell_containing(g);
    let f = (g - cell.as_vec3()).clamp(Vec3::ZERO, Vec3::ONE);
    let mut value = 0.0;
    for [x, y, z] in CORNER_OFFSETS {
      let w = Vec3::new(x as f32, y as f32, z as f32);
      let weight = (w * f + (Vec3::ONE - w) * (Vec3::ONE - f)).element_product();
      value += weight * self.field.sampled_value(cell + IVec3::new(x as i32, y as i32, z as i32));
    }
    value
  }

  fn hit_in_cell(&self, cell: IVec3, p0: Vec3, p1: Vec3) -> Option<LocalHit> {
    let values: [f32; 8] = std::array::from_fn(|i| {
      let [x, y, z] = CORNER_OFFSETS[i];
      self.field.sampled_value(cell + IVec3::new(x as i32, y as i32, z as i32))
    });
    let dir = p1 - p0;

    match cube_index(&values, self.config.iso_level) {
      ALL_EMPTY => None,
      ALL_SOLID => {
        let min = cell.as_vec3();
        let (entry, _) = Aabb::new(min, min + Vec3::ONE).clip_segment(p0, p1)?;
        Some(LocalHit {
          t: entry,
          normal: entry_normal(min, p0 + dir * entry, dir),
        })
      }
      _ => {
        let corners = cell_corners(cell.as_vec3(), Vec3::ONE);
        polygonize_cell(&values, &corners, self.config.iso_level)
          .into_iter()
          .filter_map(|tri| segment_triangle(p0, dir, tri))
          .min_by(|a, b| a.t.total_cmp(&b.t))
      }
    }
  }
}

fn dominant_axis(d: Vec3) -> usize {
  let a = d.abs();
  if a.x >= a.y && a.x >= a.z {
    0
  } else if a.y >= a.z {
    1
  } else {
    2
  }
}

/// Split `[0, 1]` at every integer crossing of the coordinate `from..to`.
fn plane_steps(from: f32, to: f32) -> Vec<(f32, f32)> {
  let delta = to - from;
  let mut cuts = vec![0.0];
  if delta.abs() > f32::EPSILON {
    let (lo, hi) = (from.min(to), from.max(to));
    let mut k = lo.floor() + 1.0;
    let mut inner = Vec::new();
    while k < hi {
      inner.push((k - from) / delta);
      k += 1.0;
    }
    if delta < 0.0 {
      inner.reverse();
    }
    cuts.extend(inner);
  }
  cuts.push(1.0);
  cuts.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Normal of the cell face the segment enters through.
fn entry_normal(cell_min: Vec3, entry: Vec3, dir: Vec3) -> Vec3 {
  let local = entry - cell_min;
  let mut best = (f32::INFINITY, Vec3::ZERO);
  for axis in 0..3 {
    for (plane, sign) in [(0.0, -1.0), (1.0, 1.0)] {
      let gap = (local[axis] - plane).abs();
      if gap < best.0 && dir[axis] * sign <= 0.0 {
        let mut n = Vec3::ZERO;
        n[axis] = sign;
        best = (gap, n);
      }
    }
  }
  if best.1 == Vec3::ZERO {
    -dir.normalize_or_zero()
  } else {
    best.1
  }
}

/// Two-sided Möller–Trumbore test of `origin + t * dir`, `t` in `[0, 1]`.
///
/// The returned normal faces the segment origin.
fn segment_triangle(origin: Vec3, dir: Vec3, [a, b, c]: [Vec3; 3]) -> Option<LocalHit> {
  const EPS: f32 = 1e-7;
  let e1 = b - a;
  let e2 = c - a;
  let p = dir.cross(e2);
  let det = e1.dot(p);
  if det.abs() < EPS {
    return None;
  }
  let inv = det.recip();
  let s = origin - a;
  let bu = s.dot(p) * inv;
  if !(0.0..=1.0).contains(&bu) {
    return None;
  }
  let q = s.cross(e1);
  let bv = dir.dot(q) * inv;
  if bv < 0.0 || bu + bv > 1.0 {
    return None;
  }
  let t = e2.dot(q) * inv;
  if !(0.0..=1.0).contains(&t) {
    return None;
  }
  let n = e1.cross(e2).normalize_or_zero();
  let normal = if n.dot(dir) > 0.0 { -n } else { n };
  Some(LocalHit { t, normal })
}

#[cfg(test)]
#[path = "raycast_test.rs"]
mod raycast_test;
