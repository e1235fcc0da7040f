//! Elevation bands and terrain coloring

use glam::Vec3;

/// Height over which two neighbouring band colors are blended
pub const TRANSITION_WIDTH: f32 = 4.0;

/// Biome types, ordered by elevation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Water,
    Beach,
    Grassland,
    Forest,
    Rock,
    Snow,
}

/// Lower bound of every band above water, ascending.
const BANDS: [(f32, Biome); 5] = [
    (-2.0, Biome::Beach),
    (3.0, Biome::Grassland),
    (22.0, Biome::Forest),
    (48.0, Biome::Rock),
    (70.0, Biome::Snow),
];

impl Biome {
    /// Flat color of the band
    pub fn base_color(&self) -> Vec3 {
        match self {
            Biome::Water => Vec3::new(0.12, 0.32, 0.58),
            Biome::Beach => Vec3::new(0.86, 0.80, 0.60),
            Biome::Grassland => Vec3::new(0.36, 0.62, 0.26),
            Biome::Forest => Vec3::new(0.18, 0.42, 0.16),
            Biome::Rock => Vec3::new(0.46, 0.43, 0.40),
            Biome::Snow => Vec3::new(0.95, 0.96, 0.98),
        }
    }
}

/// Terrain color at `height`.
///
/// Inside `TRANSITION_WIDTH / 2` of a threshold the two adjacent band colors
/// are mixed linearly, so the result is continuous in height.
pub fn height_color(height: f32) -> Vec3 {
    let half = TRANSITION_WIDTH * 0.5;
    let mut below = Biome::Water;

    for &(threshold, above) in &BANDS {
        if height < threshold - half {
            return below.base_color();
        }
        if height < threshold + half {
            let t = (height - (threshold - half)) / TRANSITION_WIDTH;
            return below.base_color().lerp(above.base_color(), t);
        }
        below = above;
    }

    below.base_color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_band_colors() {
        assert_eq!(height_color(-14.0), Biome::Water.base_color());
        assert_eq!(height_color(12.0), Biome::Grassland.base_color());
        assert_eq!(height_color(89.0), Biome::Snow.base_color());
    }

    #[test]
    fn test_color_is_continuous() {
        let mut h = -15.0f32;
        let mut prev = height_color(h);
        while h < 90.0 {
            h += 0.05;
            let c = height_color(h);
            assert!((c - prev).abs().max_element() < 0.05, "jump at {h}");
            prev = c;
        }
    }

    #[test]
    fn test_threshold_midpoint_blends() {
        let mid = height_color(22.0);
        let expected = Biome::Grassland.base_color().lerp(Biome::Forest.base_color(), 0.5);
        assert!((mid - expected).length() < 1e-5);
    }
}
