use serde::{Deserialize, Serialize};

use crate::{OrbError, Result};

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(OrbError::InvalidColor(value.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| OrbError::InvalidColor(value.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Attaches an alpha value, clamped to `[0, 1]`.
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            r: self.r as f32 / 255.0,
            g: self.g as f32 / 255.0,
            b: self.b as f32 / 255.0,
            a: if alpha.is_finite() {
                alpha.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// Straight-alpha colour with `f32` channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Linear interpolation between two colours.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn scale_alpha(self, factor: f32) -> Rgba {
        Rgba {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Colour and motion settings for one shape layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub color: Rgb,
    pub base_opacity: f32,
    /// Spatial noise frequency (blob) or wave count across the width (waveform).
    pub frequency: f32,
    pub speed: f32,
    pub phase_offset: f32,
}

/// Fixed, non-empty set of layer configs indexed cyclically.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    layers: Vec<LayerConfig>,
}

const DEFAULT_LAYERS: [LayerConfig; 6] = [
    LayerConfig {
        color: Rgb::new(0x3b, 0x82, 0xf6),
        base_opacity: 0.55,
        frequency: 1.2,
        speed: 0.6,
        phase_offset: 0.0,
    },
    LayerConfig {
        color: Rgb::new(0x06, 0xb6, 0xd4),
        base_opacity: 0.5,
        frequency: 1.5,
        speed: 0.8,
        phase_offset: 1.3,
    },
    LayerConfig {
        color: Rgb::new(0x8b, 0x5c, 0xf6),
        base_opacity: 0.45,
        frequency: 1.8,
        speed: 0.7,
        phase_offset: 2.1,
    },
    LayerConfig {
        color: Rgb::new(0xec, 0x48, 0x99),
        base_opacity: 0.4,
        frequency: 2.1,
        speed: 0.9,
        phase_offset: 3.4,
    },
    LayerConfig {
        color: Rgb::new(0x22, 0xd3, 0xee),
        base_opacity: 0.35,
        frequency: 2.4,
        speed: 1.1,
        phase_offset: 4.2,
    },
    LayerConfig {
        color: Rgb::new(0xa7, 0x8b, 0xfa),
        base_opacity: 0.3,
        frequency: 2.8,
        speed: 1.3,
        phase_offset: 5.0,
    },
];

impl Default for Palette {
    fn default() -> Self {
        Self {
            layers: DEFAULT_LAYERS.to_vec(),
        }
    }
}

impl Palette {
    /// Builds a palette from explicit layer configs.
    pub fn new(layers: Vec<LayerConfig>) -> Result<Self> {
        if layers.is_empty() {
            return Err(OrbError::config("palette must contain at least one layer"));
        }
        Ok(Self { layers })
    }

    /// Overrides the default colours while keeping the default layer motion.
    pub fn from_hex_list<S: AsRef<str>>(colors: &[S]) -> Result<Self> {
        let layers = colors
            .iter()
            .enumerate()
            .map(|(index, hex)| {
                Ok(LayerConfig {
                    color: Rgb::from_hex(hex.as_ref())?,
                    ..DEFAULT_LAYERS[index % DEFAULT_LAYERS.len()]
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(layers)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer config for `index`, wrapping around the palette length.
    pub fn layer(&self, index: usize) -> &LayerConfig {
        &self.layers[index % self.layers.len()]
    }

    pub fn color(&self, index: usize) -> Rgb {
        self.layer(index).color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        assert_eq!(Rgb::from_hex("#00d4ff").unwrap(), Rgb::new(0, 0xd4, 0xff));
        assert_eq!(Rgb::from_hex("0088aa").unwrap(), Rgb::new(0, 0x88, 0xaa));
    }

    #[test]
    fn rejects_malformed_hex() {
        let err = Rgb::from_hex("#12345").unwrap_err();
        assert!(format!("{err}").contains("#12345"));
        assert!(Rgb::from_hex("#gg0000").is_err());
    }

    #[test]
    fn palette_indexes_cyclically() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 6);
        assert_eq!(palette.layer(7), palette.layer(1));
        assert_eq!(palette.color(12), palette.color(0));
    }

    #[test]
    fn hex_override_keeps_layer_motion() {
        let palette = Palette::from_hex_list(&["#ff0000", "#00ff00"]).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.color(1), Rgb::new(0, 255, 0));
        assert_eq!(palette.layer(1).speed, DEFAULT_LAYERS[1].speed);
    }

    #[test]
    fn empty_override_is_rejected() {
        let empty: [&str; 0] = [];
        assert!(Palette::from_hex_list(&empty).is_err());
    }

    #[test]
    fn alpha_is_clamped() {
        let c = Rgb::WHITE.with_alpha(1.4);
        assert_eq!(c.a, 1.0);
        assert_eq!(Rgb::WHITE.with_alpha(f32::NAN).a, 0.0);
    }
}
