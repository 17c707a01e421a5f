//! Procedural planet base field.
//!
//! Two passes over the finest-resolution grid, in this order:
//!
//! ```text
//!   noise pass   iso   = smoothstep of signed distance to a displaced sphere
//!                        (1 inside, 0.5 on the surface, 0 outside)
//!   biome pass   types = depth band below the surface, ore in voronoi
//!                        cells above the threshold, AIR outside
//! ```
//!
//! Distances are measured in normalized body units: the body spans `[-1, 1]`
//! on every axis.

use glam::Vec3;
use noise::core::worley::ReturnType;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin, Worley};

use crate::constants::{sample_count, samples_per_axis, AIR};

/// Type id assigned to ore deposits.
pub const ORE: u32 = 255;

/// Parameters of the planet generator.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(default)
)]
pub struct GeneratorParams {
  pub seed: u32,
  /// Sphere radius as a fraction of the body half size.
  pub planet_scale_ratio: f32,
  pub fbm_amplitude: f32,
  /// Noise frequency per world unit.
  pub fbm_frequency: f32,
  pub fbm_octaves: usize,
  /// Share of the fbm displacement applied to the surface.
  pub fbm_weight: f32,
  /// Voronoi frequency relative to `fbm_frequency`.
  pub voronoi_scale: f32,
  pub voronoi_weight: f32,
  /// Weighted voronoi cell value above which a cell becomes ore.
  pub voronoi_threshold: f32,
  /// Width of the surface falloff and of the biome bands.
  pub surface_weight: f32,
  pub surface_layers: u32,
}

impl Default for GeneratorParams {
  fn default() -> Self {
    Self {
      seed: 0,
      planet_scale_ratio: 0.8,
      fbm_amplitude: 0.2,
      fbm_frequency: 0.02,
      fbm_octaves: 4,
      fbm_weight: 0.3,
      voronoi_scale: 0.5,
      voronoi_weight: 0.5,
      voronoi_threshold: 0.3,
      surface_weight: 0.3,
      surface_layers: 3,
    }
  }
}

/// A request for the whole-body base field.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorRequest {
  pub params: GeneratorParams,
  /// Voxels per axis of the finest-resolution grid.
  pub voxels_per_axis: u32,
  /// World size of the body.
  pub scale: f32,
  pub iso_level: f32,
}

/// Output of a generation request: finest-resolution base buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedField {
  pub iso: Vec<f32>,
  pub types: Vec<u32>,
}

/// Noise-displaced sphere with layered biomes.
#[derive(Clone, Debug)]
pub struct PlanetGenerator {
  params: GeneratorParams,
  fbm: Fbm<Perlin>,
}

impl PlanetGenerator {
  pub fn new(params: GeneratorParams) -> Self {
    let fbm = Fbm::<Perlin>::new(params.seed)
      .set_octaves(params.fbm_octaves.max(1))
      .set_frequency(params.fbm_frequency as f64);
    Self { params, fbm }
  }

  pub fn params(&self) -> &GeneratorParams {
    &self.params
  }

  /// Run both passes.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "generator::generate"))]
  pub fn generate(&self, request: &GeneratorRequest) -> GeneratedField {
    let iso = self.noise_pass(request.voxels_per_axis, request.scale);
    let types = self.biome_pass(request.voxels_per_axis, request.scale, &iso, request.iso_level);
    GeneratedField { iso, types }
  }

  /// Iso values for every sample of a `voxels_per_axis` grid.
  pub fn noise_pass(&self, voxels_per_axis: u32, scale: f32) -> Vec<f32> {
    let band = self.band();
    let mut iso = Vec::with_capacity(sample_count(voxels_per_axis));
    for_each_sample(voxels_per_axis, |p| {
      let d = self.signed_distance(p, scale);
      iso.push(smoothstep(-band, band, d));
    });
    iso
  }

  /// Material types from previously generated iso values.
  pub fn biome_pass(
    &self,
    voxels_per_axis: u32,
    scale: f32,
    iso: &[f32],
    iso_level: f32,
  ) -> Vec<u32> {
    let voronoi = Worley::new(self.params.seed.wrapping_add(1))
      .set_frequency((self.params.fbm_frequency * self.params.voronoi_scale) as f64)
      .set_return_type(ReturnType::Value);
    let layers = self.params.surface_layers.max(1);
    let thickness =
      (self.params.planet_scale_ratio * self.params.surface_weight / layers as f32).max(1e-4);

    let mut types = Vec::with_capacity(iso.len());
    let mut i = 0;
    for_each_sample(voxels_per_axis, |p| {
      let value = iso.get(i).copied().unwrap_or(0.0);
      i += 1;
      if value < iso_level {
        types.push(AIR);
        return;
      }
      let depth = self.signed_distance(p, scale).max(0.0);
      let band = ((depth / thickness) as u32).min(layers);
      if band >= 1 {
        let world = p * scale * 0.5;
        let cell = voronoi.get([world.x as f64, world.y as f64, world.z as f64]) as f32;
        if (cell * 0.5 + 0.5) * self.params.voronoi_weight > self.params.voronoi_threshold {
          types.push(ORE);
          return;
        }
      }
      types.push(band + 1);
    });
    types
  }

  /// Signed distance to the displaced surface, positive inside.
  pub fn signed_distance(&self, p: Vec3, scale: f32) -> f32 {
    let world = p * scale * 0.5;
    let n = self
      .fbm
      .get([world.x as f64, world.y as f64, world.z as f64]) as f32;
    let displacement = n * self.params.fbm_amplitude * self.params.fbm_weight;
    self.params.planet_scale_ratio + displacement - p.length()
  }

  fn band(&self) -> f32 {
    (self.params.surface_weight * 0.1).max(1e-3)
  }
}

/// Visit every sample in index order with its normalized position.
fn for_each_sample(voxels_per_axis: u32, mut visit: impl FnMut(Vec3)) {
  let s = samples_per_axis(voxels_per_axis);
  let inv = 2.0 / voxels_per_axis.max(1) as f32;
  for z in 0..s {
    for y in 0..s {
      for x in 0..s {
        visit(Vec3::new(x as f32, y as f32, z as f32) * inv - Vec3::ONE);
      }
    }
  }
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
  let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
  t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod generator_test;
