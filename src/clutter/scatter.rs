//! Deterministic per-chunk decoration placement.
//!
//! Each decoration kind of each chunk draws from its own `StdRng`, seeded by
//! hashing the chunk coordinate, the terrain seed and a per-kind salt.
//! Regenerating a chunk after eviction therefore reproduces exactly the same
//! placements, independent of the order chunks are built in.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{ClutterConfig, DecorationKind, ScatterRule};
use super::instance::{BoatInstance, ChunkInstances, FlowerInstance, Placement};
use crate::streaming::ChunkCoord;
use crate::terrain::HeightField;

/// Petal colors flowers pick from
pub const PETAL_PALETTE: [Vec3; 6] = [
    Vec3::new(0.95, 0.25, 0.30),
    Vec3::new(0.98, 0.85, 0.20),
    Vec3::new(0.60, 0.35, 0.90),
    Vec3::new(1.00, 1.00, 1.00),
    Vec3::new(1.00, 0.55, 0.75),
    Vec3::new(0.30, 0.55, 0.95),
];

/// 64-bit seed for one decoration kind of one chunk
pub fn chunk_seed(coord: ChunkCoord, terrain_seed: u32, salt: u32) -> u64 {
    let packed = ((coord.x as u32 as u64) << 32) | coord.z as u32 as u64;
    let mut h = packed
        ^ (terrain_seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (salt as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    // splitmix64 finalizer
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

/// Places trees, cabins, flowers and boats on chunks.
#[derive(Clone, Debug)]
pub struct ScatterGenerator {
    config: ClutterConfig,
    seed: u32,
}

impl ScatterGenerator {
    pub fn new(config: ClutterConfig, seed: u32) -> Self {
        Self { config, seed }
    }

    pub fn config(&self) -> &ClutterConfig {
        &self.config
    }

    /// Decorations for the chunk at `coord`
    pub fn scatter(&self, field: &HeightField, coord: ChunkCoord, chunk_size: u32) -> ChunkInstances {
        if !self.config.enabled {
            return ChunkInstances::default();
        }

        ChunkInstances {
            trees: self.scatter_kind(field, coord, chunk_size, DecorationKind::Tree, |p, _| p),
            cabins: self.scatter_kind(field, coord, chunk_size, DecorationKind::Cabin, |p, _| p),
            flowers: self.scatter_kind(field, coord, chunk_size, DecorationKind::Flower, |placement, rng| {
                FlowerInstance {
                    placement,
                    petal_color: PETAL_PALETTE[rng.gen_range(0..PETAL_PALETTE.len())],
                }
            }),
            boats: self.scatter_kind(field, coord, chunk_size, DecorationKind::Boat, |placement, rng| {
                BoatInstance {
                    placement,
                    phase: rng.gen_range(0.0..TAU),
                }
            }),
        }
    }

    fn scatter_kind<T>(
        &self,
        field: &HeightField,
        coord: ChunkCoord,
        chunk_size: u32,
        kind: DecorationKind,
        mut finish: impl FnMut(Placement, &mut StdRng) -> T,
    ) -> Vec<T> {
        let rule = self.config.rule(kind);
        let mut rng = StdRng::seed_from_u64(chunk_seed(coord, self.seed, kind.salt()));

        let count = candidate_count(rule, &mut rng);
        if count == 0 {
            return Vec::new();
        }

        let margin = self.config.margin.min(chunk_size / 2);
        let lo = margin as f32;
        let hi = (chunk_size - margin) as f32;
        let origin = coord.world_origin(chunk_size);

        let mut placed = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let x = origin.x + rng.gen_range(lo..=hi);
            let z = origin.z + rng.gen_range(lo..=hi);
            let y = field.height(x, z);

            let normal_y = if rule.min_normal_y > 0.0 {
                field.normal(x, z).y
            } else {
                1.0
            };
            if !rule.accepts(y, normal_y) {
                continue;
            }

            let placement = Placement {
                position: Vec3::new(x, y, z),
                rotation: rng.gen_range(0.0..TAU),
                scale: rng.gen_range(rule.scale_min..=rule.scale_max),
            };
            placed.push(finish(placement, &mut rng));
        }

        log::trace!("Scattered {} {:?} in chunk {}", placed.len(), kind, coord);
        placed
    }
}

fn candidate_count(rule: &ScatterRule, rng: &mut StdRng) -> u32 {
    if rule.max_candidates == 0 {
        return 0;
    }
    if rule.spawn_chance < 1.0 && !rng.gen_bool(rule.spawn_chance.clamp(0.0, 1.0) as f64) {
        return 0;
    }
    let min = rule.min_candidates.min(rule.max_candidates);
    rng.gen_range(min..=rule.max_candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> (HeightField, ScatterGenerator) {
        let field = HeightField::default();
        let scatter = ScatterGenerator::new(ClutterConfig::default(), field.params().seed);
        (field, scatter)
    }

    #[test]
    fn test_scatter_is_deterministic() {
        let (field, scatter) = generator();
        for coord in [ChunkCoord::new(0, 0), ChunkCoord::new(-7, 12), ChunkCoord::new(100, -3)] {
            let a = scatter.scatter(&field, coord, 64);
            let b = scatter.scatter(&field, coord, 64);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_placements_sit_on_terrain() {
        let (field, scatter) = generator();
        let cfg = scatter.config().clone();
        for coord in ChunkCoord::new(0, 0).square(4) {
            let inst = scatter.scatter(&field, coord, 64);
            for p in inst.placements() {
                assert_eq!(p.position.y.to_bits(), field.height(p.position.x, p.position.z).to_bits());
                assert!((0.0..TAU).contains(&p.rotation));
            }
            for t in &inst.trees {
                assert!(cfg.trees.accepts(t.position.y, 1.0));
                assert!((0.8..=1.5).contains(&t.scale));
            }
            for c in &inst.cabins {
                let n = field.normal(c.position.x, c.position.z);
                assert!(cfg.cabins.accepts(c.position.y, n.y));
            }
            for f in &inst.flowers {
                let n = field.normal(f.placement.position.x, f.placement.position.z);
                assert!(n.y > 0.7);
                assert!(PETAL_PALETTE.contains(&f.petal_color));
            }
            for b in &inst.boats {
                assert!(b.placement.position.y > -15.0 && b.placement.position.y < 0.0);
                assert!((0.0..TAU).contains(&b.phase));
            }
        }
    }

    #[test]
    fn test_placements_respect_margin() {
        let (field, scatter) = generator();
        let coord = ChunkCoord::new(3, -2);
        let origin = coord.world_origin(64);
        for p in scatter.scatter(&field, coord, 64).placements() {
            let lx = p.position.x - origin.x;
            let lz = p.position.z - origin.z;
            assert!((2.0..=62.0).contains(&lx), "lx = {lx}");
            assert!((2.0..=62.0).contains(&lz), "lz = {lz}");
        }
    }

    #[test]
    fn test_trees_appear_somewhere() {
        let (field, scatter) = generator();
        let trees: usize = ChunkCoord::new(0, 0)
            .square(4)
            .map(|c| scatter.scatter(&field, c, 64).trees.len())
            .sum();
        assert!(trees > 0);
    }

    #[test]
    fn test_disabled_config_places_nothing() {
        let field = HeightField::default();
        let config = ClutterConfig { enabled: false, ..Default::default() };
        let scatter = ScatterGenerator::new(config, 1);
        assert!(scatter.scatter(&field, ChunkCoord::new(0, 0), 64).is_empty());
    }

    #[test]
    fn test_zero_spawn_chance() {
        let field = HeightField::default();
        let mut config = ClutterConfig::default();
        config.cabins.spawn_chance = 0.0;
        let scatter = ScatterGenerator::new(config, 1);
        for coord in ChunkCoord::new(0, 0).square(3) {
            assert!(scatter.scatter(&field, coord, 64).cabins.is_empty());
        }
    }

    #[test]
    fn test_chunk_seed_varies() {
        let a = chunk_seed(ChunkCoord::new(0, 1), 7, 1);
        assert_ne!(a, chunk_seed(ChunkCoord::new(1, 0), 7, 1));
        assert_ne!(a, chunk_seed(ChunkCoord::new(0, 1), 8, 1));
        assert_ne!(a, chunk_seed(ChunkCoord::new(0, 1), 7, 2));
    }
}
