//! Noise-based height field

use glam::Vec3;
use noise::{NoiseFn, Value};
use serde::{Deserialize, Serialize};

use super::biome;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub seed: u32,
    pub base_frequency: f32, // Cycles per world unit of the first octave
    pub octaves: u32,        // FBM octaves (detail levels)
    pub persistence: f32,    // Amplitude falloff per octave
    pub lacunarity: f32,     // Frequency gain per octave
    pub contrast: f32,       // Stretch applied before clamping to [-1, 1]
    pub min_elevation: f32,  // Height of noise value -1
    pub max_elevation: f32,  // Height of noise value +1
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 1337,
            base_frequency: 0.0025,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            contrast: 1.8,
            min_elevation: -15.0,
            max_elevation: 90.0,
        }
    }
}

/// Deterministic height function over the infinite XZ plane.
///
/// Fractal sum of value noise. Every query is a pure function of its inputs
/// and the parameters, so any two chunks sampling the same world coordinate
/// see the same height.
pub struct HeightField {
    params: TerrainParams,
    octaves: Vec<Value>,
    amplitude_sum: f64,
}

impl HeightField {
    /// Create a height field with the given parameters
    pub fn new(params: TerrainParams) -> Self {
        let count = params.octaves.max(1);
        let octaves = (0..count)
            .map(|i| Value::new(params.seed.wrapping_add(i)))
            .collect();

        let mut amplitude_sum = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..count {
            amplitude_sum += amplitude;
            amplitude *= params.persistence as f64;
        }

        Self {
            params,
            octaves,
            amplitude_sum,
        }
    }

    /// Get terrain parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Normalized fbm value in [-1, 1]
    fn sample(&self, x: f64, z: f64) -> f64 {
        let mut frequency = self.params.base_frequency as f64;
        let mut amplitude = 1.0;
        let mut sum = 0.0;

        for octave in &self.octaves {
            sum += octave.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity as f64;
            amplitude *= self.params.persistence as f64;
        }

        if self.amplitude_sum > 0.0 {
            sum /= self.amplitude_sum;
        }
        (sum * self.params.contrast as f64).clamp(-1.0, 1.0)
    }

    /// Terrain height at world position (x, z)
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let n = self.sample(x as f64, z as f64);
        let t = (n + 1.0) * 0.5;
        let min = self.params.min_elevation as f64;
        let max = self.params.max_elevation as f64;
        (min + t * (max - min)) as f32
    }

    /// Surface normal from central differences one unit apart
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        normal_from_neighbors(
            self.height(x - 1.0, z),
            self.height(x + 1.0, z),
            self.height(x, z - 1.0),
            self.height(x, z + 1.0),
        )
    }

    /// Vertex color for a given height
    pub fn color(&self, height: f32) -> Vec3 {
        biome::height_color(height)
    }
}

impl Default for HeightField {
    fn default() -> Self {
        Self::new(TerrainParams::default())
    }
}

/// Normal from the four axis neighbours of a sample. Shared by the mesh
/// builder so both paths produce bit-identical results.
#[inline]
pub fn normal_from_neighbors(left: f32, right: f32, down: f32, up: f32) -> Vec3 {
    Vec3::new(left - right, 2.0, down - up).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_params_default() {
        let params = TerrainParams::default();
        assert_eq!(params.octaves, 6);
        assert_eq!(params.persistence, 0.5);
        assert_eq!(params.lacunarity, 2.0);
        assert_eq!(params.min_elevation, -15.0);
        assert_eq!(params.max_elevation, 90.0);
    }

    #[test]
    fn test_height_is_deterministic() {
        let field = HeightField::default();
        let a = field.height(100.0, 100.0);
        let b = field.height(100.0, 100.0);
        assert_eq!(a.to_bits(), b.to_bits());

        let other = HeightField::default();
        assert_eq!(other.height(100.0, 100.0).to_bits(), a.to_bits());
    }

    #[test]
    fn test_height_within_elevation_range() {
        let field = HeightField::default();
        for i in -50..50 {
            for j in -50..50 {
                let h = field.height(i as f32 * 37.0, j as f32 * 41.0);
                assert!((-15.0..=90.0).contains(&h), "h = {h}");
            }
        }
    }

    #[test]
    fn test_height_is_continuous() {
        let field = HeightField::default();
        for i in 0..200 {
            let x = i as f32 * 3.7 - 300.0;
            let a = field.height(x, 12.0);
            let b = field.height(x + 0.01, 12.0);
            assert!((a - b).abs() < 0.5, "jump at {x}: {a} -> {b}");
        }
    }

    #[test]
    fn test_seed_changes_terrain() {
        let a = HeightField::new(TerrainParams { seed: 1, ..Default::default() });
        let b = HeightField::new(TerrainParams { seed: 2, ..Default::default() });
        let differs = (0..64).any(|i| {
            let x = i as f32 * 53.0;
            a.height(x, -x) != b.height(x, -x)
        });
        assert!(differs);
    }

    #[test]
    fn test_normal_points_up() {
        let field = HeightField::default();
        for i in 0..100 {
            let n = field.normal(i as f32 * 11.0, i as f32 * -7.0);
            assert!(n.y > 0.0);
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_flat_ground_normal() {
        let n = normal_from_neighbors(5.0, 5.0, 5.0, 5.0);
        assert_eq!(n, Vec3::Y);
    }
}
