//! Decoration scatter configuration.

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Kinds of decoration placed on the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationKind {
    Tree,
    Cabin,
    Flower,
    Boat,
}

impl DecorationKind {
    pub const ALL: [DecorationKind; 4] = [
        DecorationKind::Tree,
        DecorationKind::Cabin,
        DecorationKind::Flower,
        DecorationKind::Boat,
    ];

    /// Mixed into the chunk seed so each kind draws an independent stream.
    pub fn salt(self) -> u32 {
        match self {
            DecorationKind::Tree => 0x7265_6531,
            DecorationKind::Cabin => 0x6361_6232,
            DecorationKind::Flower => 0x666c_7733,
            DecorationKind::Boat => 0x626f_6134,
        }
    }
}

/// Placement rule for one decoration kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterRule {
    /// Smallest candidate count per chunk
    pub min_candidates: u32,
    /// Largest candidate count per chunk (inclusive)
    pub max_candidates: u32,
    /// Probability that a chunk gets any candidates at all
    pub spawn_chance: f32,
    /// Accepted heights, exclusive on both ends
    pub height_min: f32,
    pub height_max: f32,
    /// Required `normal.y`, exclusive. 0 accepts every slope.
    pub min_normal_y: f32,
    /// Uniform scale range (inclusive)
    pub scale_min: f32,
    pub scale_max: f32,
}

impl Default for ScatterRule {
    fn default() -> Self {
        Self {
            min_candidates: 0,
            max_candidates: 0,
            spawn_chance: 1.0,
            height_min: f32::NEG_INFINITY,
            height_max: f32::INFINITY,
            min_normal_y: 0.0,
            scale_min: 1.0,
            scale_max: 1.0,
        }
    }
}

impl ScatterRule {
    pub fn trees() -> Self {
        Self {
            min_candidates: 15,
            max_candidates: 15,
            height_min: 5.0,
            height_max: 50.0,
            scale_min: 0.8,
            scale_max: 1.5,
            ..Default::default()
        }
    }

    pub fn cabins() -> Self {
        Self {
            min_candidates: 1,
            max_candidates: 2,
            spawn_chance: 0.6,
            height_min: 10.0,
            height_max: 35.0,
            min_normal_y: 0.85,
            scale_min: 0.8,
            scale_max: 1.2,
        }
    }

    pub fn flowers() -> Self {
        Self {
            min_candidates: 18,
            max_candidates: 18,
            height_min: 15.0,
            height_max: 55.0,
            min_normal_y: 0.7,
            scale_min: 0.6,
            scale_max: 1.2,
            ..Default::default()
        }
    }

    pub fn boats() -> Self {
        Self {
            min_candidates: 3,
            max_candidates: 6,
            spawn_chance: 0.7,
            height_min: -15.0,
            height_max: 0.0,
            scale_min: 0.8,
            scale_max: 1.3,
            ..Default::default()
        }
    }

    /// Whether a sample with the given height and normal passes the rule
    pub fn accepts(&self, height: f32, normal_y: f32) -> bool {
        height > self.height_min && height < self.height_max && normal_y > self.min_normal_y
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.min_candidates > self.max_candidates {
            return Err(Error::Config(format!(
                "{name}: min_candidates {} exceeds max_candidates {}",
                self.min_candidates, self.max_candidates
            )));
        }
        if !(0.0..=1.0).contains(&self.spawn_chance) {
            return Err(Error::Config(format!(
                "{name}: spawn_chance {} outside [0, 1]",
                self.spawn_chance
            )));
        }
        if self.scale_min > self.scale_max || self.scale_min <= 0.0 {
            return Err(Error::Config(format!(
                "{name}: invalid scale range {}..{}",
                self.scale_min, self.scale_max
            )));
        }
        Ok(())
    }
}

/// Configuration for decoration scattering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClutterConfig {
    /// Whether decorations are generated at all
    pub enabled: bool,
    /// Distance kept from chunk edges when picking candidates
    pub margin: u32,
    pub trees: ScatterRule,
    pub cabins: ScatterRule,
    pub flowers: ScatterRule,
    pub boats: ScatterRule,
}

impl Default for ClutterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            margin: 2,
            trees: ScatterRule::trees(),
            cabins: ScatterRule::cabins(),
            flowers: ScatterRule::flowers(),
            boats: ScatterRule::boats(),
        }
    }
}

impl ClutterConfig {
    /// Rule for a decoration kind
    pub fn rule(&self, kind: DecorationKind) -> &ScatterRule {
        match kind {
            DecorationKind::Tree => &self.trees,
            DecorationKind::Cabin => &self.cabins,
            DecorationKind::Flower => &self.flowers,
            DecorationKind::Boat => &self.boats,
        }
    }

    /// Check every rule for internal consistency
    pub fn validate(&self) -> Result<()> {
        self.trees.validate("trees")?;
        self.cabins.validate("cabins")?;
        self.flowers.validate("flowers")?;
        self.boats.validate("boats")?;
        Ok(())
    }
}
