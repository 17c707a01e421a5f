//! Sculpting: additive and subtractive edits on the delta layer.
//!
//! ```text
//!   weight
//!   influence ┤●
//!             │ ●
//!             │   ●
//!             │      ●
//!           0 ┼──────────●──▶ distance
//!             0          r
//!
//!   weight = influence * clamp(1 - d/r, 0, 1)^2
//! ```

use glam::{UVec3, Vec3};

use super::Octree;
use crate::constants::coord_to_index;

/// Direction of a sculpt stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushMode {
  /// Raise iso values (add material).
  Additive,
  /// Lower iso values (dig).
  Subtractive,
}

/// A sculpt stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Brush {
  /// World-space radius.
  pub radius: f32,
  /// Peak weight at the brush center.
  pub influence: f32,
  pub mode: BrushMode,
  /// Material painted onto samples an additive stroke raises.
  pub material: Option<u32>,
}

impl Brush {
  pub fn additive(radius: f32, influence: f32) -> Self {
    Self {
      radius,
      influence,
      mode: BrushMode::Additive,
      material: None,
    }
  }

  pub fn subtractive(radius: f32, influence: f32) -> Self {
    Self {
      radius,
      influence,
      mode: BrushMode::Subtractive,
      material: None,
    }
  }

  pub fn with_material(mut self, material: u32) -> Self {
    self.material = Some(material);
    self
  }
}

impl Octree {
  /// Apply a radial falloff edit centered at `world_pos`.
  ///
  /// Returns the number of samples whose effective value changed.
  pub fn apply_deformation_at_position(
    &mut self,
    world_pos: Vec3,
    radius: f32,
    influence: f32,
    additive: bool,
  ) -> usize {
    let brush = if additive {
      Brush::additive(radius, influence)
    } else {
      Brush::subtractive(radius, influence)
    };
    self.apply_brush(world_pos, &brush)
  }

  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "octree::deform"))]
  pub fn apply_brush(&mut self, world_pos: Vec3, brush: &Brush) -> usize {
    if !(brush.radius > 0.0) || brush.influence == 0.0 || !world_pos.is_finite() {
      return 0;
    }

    let p = self.world_to_grid(world_pos);
    let r = brush.radius / self.config.voxel_size();
    let max = (self.field.samples_per_axis() - 1) as f32;
    let lo = (p - Vec3::splat(r)).floor().max(Vec3::ZERO);
    let hi = (p + Vec3::splat(r)).ceil().min(Vec3::splat(max));
    if lo.cmpgt(hi).any() {
      return 0;
    }
    let (lo, hi) = (lo.as_uvec3(), hi.as_uvec3());

    let sign = match brush.mode {
      BrushMode::Additive => 1.0,
      BrushMode::Subtractive => -1.0,
    };
    let paint = match brush.mode {
      BrushMode::Additive => brush.material,
      BrushMode::Subtractive => None,
    };

    let s = self.field.samples_per_axis();
    let mut changed = 0;
    for z in lo.z..=hi.z {
      for y in lo.y..=hi.y {
        for x in lo.x..=hi.x {
          let d = Vec3::new(x as f32, y as f32, z as f32).distance(p);
          let t = (1.0 - d / r).clamp(0.0, 1.0);
          let weight = brush.influence * t * t;
          if weight == 0.0 {
            continue;
          }
          let idx = coord_to_index(x as usize, y as usize, z as usize, s);
          let mut touched = self.field.offset_delta(idx, sign * weight);
          if let Some(material) = paint {
            touched |= self.field.paint_type(idx, material);
          }
          if touched {
            changed += 1;
          }
        }
      }
    }

    if changed > 0 {
      self.mark_region_stale(lo, hi);
      log::trace!("deformation at {:?} changed {} samples", world_pos, changed);
    }
    changed
  }

  /// Drop every edit, restoring the base field.
  pub fn clear_deformation(&mut self) {
    if self.field.clear_delta() {
      let max = (self.field.samples_per_axis() - 1) as u32;
      self.mark_region_stale(UVec3::ZERO, UVec3::splat(max));
    }
  }
}

#[cfg(test)]
#[path = "deformation_test.rs"]
mod deformation_test;
