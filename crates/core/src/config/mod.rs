use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    mapping::{ModeBand, ModeTargets},
    palette::Palette,
    smoothing::Band,
    OrbError, Result,
};

/// Top-level configuration structure for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    pub surface: SurfaceConfig,
    pub animation: AnimationConfig,
    pub targets: ModeTargets,
    pub shape: ShapeConfig,
    pub particles: ParticleConfig,
    /// Optional `#rrggbb` list replacing the default layer colours.
    pub palette: Option<Vec<String>>,
}

impl OrbConfig {
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading orb configuration");
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolves the palette override, falling back to the built-in palette.
    pub fn palette(&self) -> Result<Palette> {
        match &self.palette {
            Some(colors) => Palette::from_hex_list(colors),
            None => Ok(Palette::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let surface = &self.surface;
        if !surface.device_pixel_ratio.is_finite() || surface.device_pixel_ratio <= 0.0 {
            return Err(OrbError::config("surface.device_pixel_ratio must be positive"));
        }

        let animation = &self.animation;
        check_rate("animation.intensity_rate", animation.intensity_rate)?;
        check_rate("animation.scale_rate", animation.scale_rate)?;
        check_band("animation.intensity_band", &animation.intensity_band)?;
        check_band("animation.scale_band", &animation.scale_band)?;
        if animation.jitter_period_ms == 0 {
            return Err(OrbError::config("animation.jitter_period_ms must be positive"));
        }

        for (name, band) in [
            ("idle", &self.targets.idle),
            ("listening", &self.targets.listening),
            ("speaking", &self.targets.speaking),
        ] {
            check_mode_band(name, band)?;
        }

        if self.shape.layers == 0 {
            return Err(OrbError::config("shape.layers must be at least 1"));
        }
        if self.shape.waves == 0 {
            return Err(OrbError::config("shape.waves must be at least 1"));
        }
        if self.shape.segments < 3 {
            return Err(OrbError::config("shape.segments must be at least 3"));
        }
        if !self.shape.deformation.is_finite() || !(0.0..1.0).contains(&self.shape.deformation) {
            return Err(OrbError::config("shape.deformation must lie in [0, 1)"));
        }

        self.palette()?;
        Ok(())
    }
}

fn check_rate(name: &str, rate: f32) -> Result<()> {
    if rate.is_finite() && rate > 0.0 && rate < 1.0 {
        Ok(())
    } else {
        Err(OrbError::config(format!("{name} must lie in (0, 1), got {rate}")))
    }
}

fn check_band(name: &str, band: &Band) -> Result<()> {
    if band.is_valid() {
        Ok(())
    } else {
        Err(OrbError::config(format!(
            "{name} is inverted or non-finite: [{}, {}]",
            band.min, band.max
        )))
    }
}

fn check_mode_band(mode: &str, band: &ModeBand) -> Result<()> {
    check_band(&format!("targets.{mode}.intensity"), &band.intensity)?;
    check_band(&format!("targets.{mode}.scale"), &band.scale)
}

/// Requested drawing size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Logical edge length in pixels; the orb is drawn into a square.
    pub size: f32,
    pub device_pixel_ratio: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            size: 200.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Smoothing rates, seed values and the jitter cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub initial_intensity: f32,
    pub initial_scale: f32,
    pub intensity_rate: f32,
    pub scale_rate: f32,
    pub intensity_band: Band,
    pub scale_band: Band,
    pub jitter_period_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            initial_intensity: 0.9,
            initial_scale: 1.0,
            intensity_rate: 0.03,
            scale_rate: 0.05,
            intensity_band: Band::new(0.0, 1.1),
            scale_band: Band::new(0.5, 1.5),
            jitter_period_ms: 120,
        }
    }
}

/// Which shape generator the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeStyle {
    #[default]
    Noise,
    Waveform,
}

impl std::str::FromStr for ShapeStyle {
    type Err = OrbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noise" | "blob" => Ok(Self::Noise),
            "waveform" | "wave" => Ok(Self::Waveform),
            other => Err(OrbError::msg(format!("unknown shape style `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub style: ShapeStyle,
    /// Blob layer count.
    pub layers: usize,
    /// Vertices per blob ring.
    pub segments: usize,
    /// Wave count for the waveform generator.
    pub waves: usize,
    /// Maximum relative radius deviation at intensity 1.
    pub deformation: f32,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            style: ShapeStyle::Noise,
            layers: 6,
            segments: 120,
            waves: 4,
            deformation: 0.12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub active_count: usize,
    pub idle_count: usize,
    /// Radians per second of orbital drift.
    pub drift_speed: f32,
    pub phase_spread: f32,
    /// Logical radius of a particle at rest.
    pub base_size: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            active_count: 20,
            idle_count: 12,
            drift_speed: 0.2,
            phase_spread: 0.7,
            base_size: 1.6,
        }
    }
}
