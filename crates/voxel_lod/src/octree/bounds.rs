//! Axis-aligned bounding box for octree nodes and the body volume.

use glam::Vec3;

use super::Face;
use crate::constants::{octant_offset, ADJACENCY_EPSILON};

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
	/// Minimum corner (inclusive).
	pub min: Vec3,
	/// Maximum corner (inclusive).
	pub max: Vec3,
}

impl Aabb {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: Vec3, max: Vec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Create a new AABB from center and half-extents.
	pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
		Self::new(center - half_extents, center + half_extents)
	}

	#[inline]
	pub fn center(&self) -> Vec3 {
		(self.min + self.max) * 0.5
	}

	/// Half size.
	#[inline]
	pub fn extent(&self) -> Vec3 {
		(self.max - self.min) * 0.5
	}

	#[inline]
	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	#[inline]
	pub fn contains_point(&self, point: Vec3) -> bool {
		point.cmpge(self.min).all() && point.cmple(self.max).all()
	}

	/// Two AABBs overlap if they share any interior or boundary points.
	#[inline]
	pub fn overlaps(&self, other: &Aabb) -> bool {
		self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
	}

	/// Bounds of child octant `octant` (bit 0 = +X, bit 1 = +Y, bit 2 = +Z).
	pub fn octant(&self, octant: usize) -> Aabb {
		let half = self.extent();
		let min = self.min + octant_offset(octant) * half;
		Aabb::new(min, min + half)
	}

	/// Coordinate of the face plane on its normal axis.
	#[inline]
	pub fn face_coordinate(&self, face: Face) -> f32 {
		if face.is_positive() {
			self.max[face.axis()]
		} else {
			self.min[face.axis()]
		}
	}

	/// True when `other` sits directly across `face` of `self`: the face
	/// planes coincide within tolerance and the boxes share a positive-area
	/// patch on both tangent axes.
	pub fn touches_across(&self, other: &Aabb, face: Face) -> bool {
		let eps = ADJACENCY_EPSILON * self.size().min_element().min(other.size().min_element());
		let plane = self.face_coordinate(face);
		let other_plane = other.face_coordinate(face.opposite());
		if (plane - other_plane).abs() > eps {
			return false;
		}
		let (u, v) = face.tangent_axes();
		[u, v]
			.into_iter()
			.all(|axis| self.min[axis] < other.max[axis] - eps && other.min[axis] < self.max[axis] - eps)
	}

	/// Clip the segment `start..end` against the box.
	///
	/// Returns the entry and exit parameters in `[0, 1]`, or `None` if the
	/// segment misses. A segment starting inside has entry `0`.
	pub fn clip_segment(&self, start: Vec3, end: Vec3) -> Option<(f32, f32)> {
		let dir = end - start;
		let mut t0 = 0.0f32;
		let mut t1 = 1.0f32;
		for axis in 0..3 {
			let d = dir[axis];
			if d.abs() < f32::EPSILON {
				if start[axis] < self.min[axis] || start[axis] > self.max[axis] {
					return None;
				}
				continue;
			}
			let inv = 1.0 / d;
			let mut near = (self.min[axis] - start[axis]) * inv;
			let mut far = (self.max[axis] - start[axis]) * inv;
			if near > far {
				std::mem::swap(&mut near, &mut far);
			}
			t0 = t0.max(near);
			t1 = t1.min(far);
			if t0 > t1 {
				return None;
			}
		}
		Some((t0, t1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn unit_at(min: Vec3) -> Aabb {
		Aabb::new(min, min + Vec3::ONE)
	}

	#[test]
	fn test_from_center_half_extents() {
		let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(200.0));
		assert_eq!(aabb.min, Vec3::splat(-200.0));
		assert_eq!(aabb.max, Vec3::splat(200.0));
		assert_eq!(aabb.extent(), Vec3::splat(200.0));
		assert_eq!(aabb.size(), Vec3::splat(400.0));
		assert_eq!(aabb.center(), Vec3::ZERO);
	}

	#[test]
	fn test_contains_point() {
		let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
		assert!(aabb.contains_point(Vec3::splat(5.0)));
		assert!(aabb.contains_point(Vec3::ZERO));
		assert!(aabb.contains_point(Vec3::splat(10.0)));
		assert!(!aabb.contains_point(Vec3::splat(-1.0)));
		assert!(!aabb.contains_point(Vec3::new(5.0, 5.0, 10.5)));
	}

	#[test]
	fn test_overlaps() {
		let a = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
		assert!(a.overlaps(&Aabb::new(Vec3::splat(5.0), Vec3::splat(15.0))));
		assert!(a.overlaps(&Aabb::new(Vec3::splat(10.0), Vec3::splat(20.0))));
		assert!(!a.overlaps(&Aabb::new(Vec3::splat(11.0), Vec3::splat(20.0))));
	}

	#[test]
	fn test_octants_tile_parent() {
		let parent = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
		assert_eq!(parent.octant(0), unit_at(Vec3::ZERO));
		assert_eq!(parent.octant(1), unit_at(Vec3::X));
		assert_eq!(parent.octant(6), unit_at(Vec3::new(0.0, 1.0, 1.0)));
		let volume: f32 = (0..8).map(|i| parent.octant(i).size().element_product()).sum();
		assert_eq!(volume, 8.0);
	}

	#[test]
	fn test_touches_across_face() {
		let a = unit_at(Vec3::ZERO);
		let b = unit_at(Vec3::X);
		assert!(a.touches_across(&b, Face::PosX));
		assert!(b.touches_across(&a, Face::NegX));
		assert!(!a.touches_across(&b, Face::NegX));
		assert!(!a.touches_across(&b, Face::PosY));
	}

	/// Boxes that only share an edge or corner are not face adjacent.
	#[test]
	fn test_touches_across_rejects_edges() {
		let a = unit_at(Vec3::ZERO);
		assert!(!a.touches_across(&unit_at(Vec3::new(1.0, 1.0, 0.0)), Face::PosX));
		assert!(!a.touches_across(&unit_at(Vec3::ONE), Face::PosX));
	}

	#[test]
	fn test_touches_across_mixed_sizes() {
		let coarse = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
		let fine = Aabb::new(Vec3::new(2.0, 1.0, 0.0), Vec3::new(2.5, 1.5, 0.5));
		assert!(coarse.touches_across(&fine, Face::PosX));
		assert!(fine.touches_across(&coarse, Face::NegX));
	}

	#[test]
	fn test_clip_segment() {
		let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(10.0));
		let (t0, t1) = aabb
			.clip_segment(Vec3::new(-10.0, 5.0, 5.0), Vec3::new(20.0, 5.0, 5.0))
			.unwrap();
		assert!((t0 - 1.0 / 3.0).abs() < 1e-5);
		assert!((t1 - 2.0 / 3.0).abs() < 1e-5);

		let (t0, _) = aabb
			.clip_segment(Vec3::splat(5.0), Vec3::splat(50.0))
			.unwrap();
		assert_eq!(t0, 0.0);

		assert!(aabb
			.clip_segment(Vec3::new(-10.0, 20.0, 5.0), Vec3::new(20.0, 20.0, 5.0))
			.is_none());
		assert!(aabb
			.clip_segment(Vec3::new(-10.0, 5.0, 5.0), Vec3::new(-1.0, 5.0, 5.0))
			.is_none());
	}
}
