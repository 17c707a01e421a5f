//! Configuration parsing for the LOD simulation.
//!
//! ```toml
//! [terrain]
//! scale = 400.0
//! max_depth = 4
//!
//! [terrain.generator]
//! seed = 7
//!
//! [simulation]
//! ticks = 240
//! camera_path = [[0.0, 600.0, 0.0], [0.0, 170.0, 0.0]]
//!
//! [[strokes]]
//! tick = 120
//! position = [0.0, 160.0, 0.0]
//! radius = 12.0
//! mode = "Subtractive"
//! ```

use anyhow::{Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::path::Path;
use voxel_lod::{BodyCommand, Brush, BrushMode, TerrainConfig};

/// Root configuration for a simulation run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
	/// Body construction parameters.
	pub terrain: TerrainConfig,
	/// Run length and camera motion.
	pub simulation: SimulationConfig,
	/// Scripted sculpt strokes.
	pub strokes: Vec<StrokeConfig>,
}

/// Run length and camera motion.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Number of ticks to run.
	pub ticks: u64,
	/// Wall-clock pause between ticks, in milliseconds.
	pub tick_interval_ms: u64,
	/// Extra ticks allowed after the run for outstanding requests to land.
	pub settle_ticks: u64,
	/// Camera waypoints, visited at even spacing over the run.
	pub camera_path: Vec<[f32; 3]>,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			ticks: 240,
			tick_interval_ms: 4,
			settle_ticks: 2000,
			camera_path: vec![[0.0, 600.0, 0.0], [0.0, 170.0, 0.0]],
		}
	}
}

/// A sculpt stroke applied on one tick.
#[derive(Debug, Deserialize)]
pub struct StrokeConfig {
	/// Tick on which the stroke is queued.
	pub tick: u64,
	/// World-space brush center.
	pub position: [f32; 3],
	pub radius: f32,
	#[serde(default = "default_influence")]
	pub influence: f32,
	#[serde(default = "default_mode")]
	pub mode: BrushMode,
	/// Material painted by additive strokes.
	#[serde(default)]
	pub material: Option<u32>,
}

fn default_influence() -> f32 {
	0.5
}

fn default_mode() -> BrushMode {
	BrushMode::Subtractive
}

impl SimConfig {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration TOML.
	pub fn parse(content: &str) -> Result<Self> {
		let config: SimConfig =
			toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		config
			.terrain
			.validate()
			.context("Invalid [terrain] section")?;
		if config.simulation.camera_path.is_empty() {
			anyhow::bail!("camera_path must have at least one waypoint");
		}
		for stroke in &config.strokes {
			if !(stroke.radius > 0.0) {
				anyhow::bail!(
					"stroke on tick {} has radius {}, must be positive",
					stroke.tick,
					stroke.radius
				);
			}
		}

		Ok(config)
	}
}

impl SimulationConfig {
	/// Camera position at `tick`, walking the path linearly over `ticks`.
	pub fn camera_at(&self, tick: u64, ticks: u64) -> Vec3 {
		let path = &self.camera_path;
		match path.len() {
			0 => Vec3::ZERO,
			1 => Vec3::from_array(path[0]),
			n => {
				let progress = if ticks > 1 {
					(tick.min(ticks - 1) as f32 / (ticks - 1) as f32) * (n - 1) as f32
				} else {
					0.0
				};
				let segment = (progress.floor() as usize).min(n - 2);
				let t = progress - segment as f32;
				Vec3::from_array(path[segment]).lerp(Vec3::from_array(path[segment + 1]), t)
			}
		}
	}
}

impl StrokeConfig {
	/// The body command for this stroke.
	pub fn command(&self) -> BodyCommand {
		BodyCommand::Deform {
			position: Vec3::from_array(self.position),
			brush: Brush {
				radius: self.radius,
				influence: self.influence,
				mode: self.mode,
				material: self.material,
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_load_full_config() {
		let file = write_config(
			r#"
[terrain]
scale = 64.0
voxels_per_axis = 4
max_depth = 2
base_lod_distance = 128.0

[terrain.generator]
seed = 9
surface_layers = 2

[simulation]
ticks = 10
camera_path = [[0.0, 100.0, 0.0]]

[[strokes]]
tick = 3
position = [1.0, 2.0, 3.0]
radius = 4.0
mode = "Additive"
material = 5
"#,
		);
		let config = SimConfig::load(file.path()).unwrap();

		assert_eq!(config.terrain.scale, 64.0);
		assert_eq!(config.terrain.max_depth, 2);
		assert_eq!(config.terrain.iso_level, 0.5);
		assert_eq!(config.terrain.generator.seed, 9);
		assert_eq!(config.terrain.generator.surface_layers, 2);
		assert_eq!(config.simulation.ticks, 10);
		assert_eq!(config.strokes.len(), 1);

		let stroke = &config.strokes[0];
		assert_eq!(stroke.influence, 0.5);
		assert_eq!(
			stroke.command(),
			BodyCommand::Deform {
				position: Vec3::new(1.0, 2.0, 3.0),
				brush: Brush::additive(4.0, 0.5).with_material(5),
			}
		);
	}

	#[test]
	fn test_empty_file_uses_defaults() {
		let file = write_config("");
		let config = SimConfig::load(file.path()).unwrap();

		assert_eq!(config.terrain, TerrainConfig::default());
		assert_eq!(config.simulation.ticks, 240);
		assert!(config.strokes.is_empty());
	}

	#[test]
	fn test_invalid_terrain_rejected() {
		let err = SimConfig::parse("[terrain]\nvoxels_per_axis = 0\n").unwrap_err();
		assert!(format!("{:#}", err).contains("voxels_per_axis"));
	}

	#[test]
	fn test_empty_camera_path_rejected() {
		assert!(SimConfig::parse("[simulation]\ncamera_path = []\n").is_err());
	}

	#[test]
	fn test_bad_stroke_radius_rejected() {
		let content = "[[strokes]]\ntick = 1\nposition = [0.0, 0.0, 0.0]\nradius = 0.0\n";
		assert!(SimConfig::parse(content).is_err());
	}

	#[test]
	fn test_missing_file() {
		let err = SimConfig::load(Path::new("/nonexistent/lod_sim.toml")).unwrap_err();
		assert!(err.to_string().contains("Failed to read config file"));
	}

	#[test]
	fn test_camera_walks_path() {
		let sim = SimulationConfig {
			camera_path: vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0]],
			..SimulationConfig::default()
		};

		assert_eq!(sim.camera_at(0, 5), Vec3::ZERO);
		assert_eq!(sim.camera_at(2, 5), Vec3::new(10.0, 0.0, 0.0));
		assert_eq!(sim.camera_at(3, 5), Vec3::new(10.0, 5.0, 0.0));
		assert_eq!(sim.camera_at(4, 5), Vec3::new(10.0, 10.0, 0.0));
		// Past the end the camera stays on the last waypoint.
		assert_eq!(sim.camera_at(9, 5), Vec3::new(10.0, 10.0, 0.0));
	}
}
