//! Per-frame shape synthesis.
//!
//! Two interchangeable strategies sit behind [`ShapeGenerator`]:
//! [`NoiseBlobGenerator`] deforms concentric rings with multi-octave noise,
//! [`WaveformGenerator`] sums attenuated sine waves across the width. Both
//! return layers in paint order (back to front).

use std::f32::consts::TAU;

use crate::{
    config::{ShapeConfig, ShapeStyle},
    noise::{attenuate, ring_noise, wave_sample},
    palette::Palette,
    surface::{Point, SurfaceSize},
};

/// Intensity ceiling used by the shape math; larger values are clamped.
pub const MAX_SHAPE_INTENSITY: f32 = 1.1;

/// Fraction of the smaller surface edge used as the orb base radius at scale 1.
pub const BASE_RADIUS_FRACTION: f32 = 0.28;

/// Snapshot of everything a frame's geometry depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: f32,
    pub height: f32,
    pub center: Point,
    /// Orb base radius, already multiplied by the current scale.
    pub base_radius: f32,
    pub elapsed: f32,
    pub intensity: f32,
    pub scale: f32,
}

impl FrameGeometry {
    pub fn new(size: &SurfaceSize, elapsed: f32, intensity: f32, scale: f32) -> Self {
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, MAX_SHAPE_INTENSITY)
        } else {
            0.0
        };
        let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
        let (width, height) = if size.is_drawable() {
            (size.logical_width, size.logical_height)
        } else {
            (0.0, 0.0)
        };

        Self {
            width,
            height,
            center: Point::new(width * 0.5, height * 0.5),
            base_radius: width.min(height) * BASE_RADIUS_FRACTION * scale,
            elapsed,
            intensity,
            scale,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    /// Filled ring outline.
    Closed(Vec<Point>),
    /// Stroked open path.
    Open(Vec<Point>),
}

impl Outline {
    pub fn points(&self) -> &[Point] {
        match self {
            Outline::Closed(points) | Outline::Open(points) => points,
        }
    }
}

/// Geometry for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerShape {
    /// Palette / depth index of the layer.
    pub index: usize,
    pub outline: Outline,
    /// Nominal ring radius (blob) or peak amplitude (waveform).
    pub extent: f32,
}

pub trait ShapeGenerator: Send {
    fn style(&self) -> ShapeStyle;

    /// Layer geometry for the frame, in paint order.
    fn generate(&self, frame: &FrameGeometry, palette: &Palette) -> Vec<LayerShape>;
}

/// Builds the generator selected by `config.style`.
pub fn create_generator(config: &ShapeConfig) -> Box<dyn ShapeGenerator> {
    match config.style {
        ShapeStyle::Noise => Box::new(NoiseBlobGenerator::new(
            config.layers,
            config.segments,
            config.deformation,
        )),
        ShapeStyle::Waveform => Box::new(WaveformGenerator::new(config.waves)),
    }
}

/// Concentric noise-deformed rings.
#[derive(Debug, Clone)]
pub struct NoiseBlobGenerator {
    layers: usize,
    segments: usize,
    deformation: f32,
}

impl NoiseBlobGenerator {
    pub fn new(layers: usize, segments: usize, deformation: f32) -> Self {
        Self {
            layers: layers.max(1),
            segments: segments.max(3),
            deformation: deformation.clamp(0.0, 0.99),
        }
    }

    /// Largest relative deviation from a ring's nominal radius.
    pub fn max_deviation(&self) -> f32 {
        self.deformation * MAX_SHAPE_INTENSITY
    }

    /// `base · (0.6 + 0.45 · l / L)`
    pub fn layer_radius(&self, layer: usize, base_radius: f32) -> f32 {
        base_radius * (0.6 + 0.45 * layer as f32 / self.layers as f32)
    }

    pub fn vertex_radius(
        &self,
        layer: usize,
        angle: f32,
        frame: &FrameGeometry,
        palette: &Palette,
    ) -> f32 {
        let config = palette.layer(layer);
        let noise = ring_noise(
            angle,
            frame.elapsed + config.phase_offset,
            config.frequency,
            config.speed,
        );
        self.layer_radius(layer, frame.base_radius)
            * (1.0 + noise * self.deformation * frame.intensity)
    }
}

impl ShapeGenerator for NoiseBlobGenerator {
    fn style(&self) -> ShapeStyle {
        ShapeStyle::Noise
    }

    fn generate(&self, frame: &FrameGeometry, palette: &Palette) -> Vec<LayerShape> {
        if frame.is_empty() {
            return Vec::new();
        }

        // Largest, blurriest ring first.
        (0..self.layers)
            .rev()
            .map(|layer| {
                let points = (0..self.segments)
                    .map(|i| {
                        let angle = TAU * i as f32 / self.segments as f32;
                        let radius = self.vertex_radius(layer, angle, frame, palette);
                        frame
                            .center
                            .offset(angle.cos() * radius, angle.sin() * radius)
                    })
                    .collect();
                LayerShape {
                    index: layer,
                    outline: Outline::Closed(points),
                    extent: self.layer_radius(layer, frame.base_radius),
                }
            })
            .collect()
    }
}

/// Peak amplitude of the loudest wave as a fraction of surface height.
const WAVE_HEIGHT_FRACTION: f32 = 0.3;
/// Phase advance per second per unit of layer speed.
const WAVE_PHASE_RATE: f32 = 3.0;

/// Attenuated sine waves spanning the full width.
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    waves: usize,
}

impl WaveformGenerator {
    pub fn new(waves: usize) -> Self {
        Self {
            waves: waves.max(1),
        }
    }

    /// Wave 0 is the loudest; later waves fade toward 0.4.
    pub fn amplitude_multiplier(&self, wave: usize) -> f32 {
        1.0 - 0.6 * wave as f32 / self.waves as f32
    }

    pub fn max_amplitude(&self, wave: usize, frame: &FrameGeometry) -> f32 {
        frame.height * WAVE_HEIGHT_FRACTION * frame.intensity * frame.scale
            * self.amplitude_multiplier(wave)
    }

    /// Vertical position of `wave` at logical `x`.
    pub fn sample(&self, wave: usize, x: f32, frame: &FrameGeometry, palette: &Palette) -> f32 {
        let config = palette.layer(wave);
        let phase = frame.elapsed * config.speed * WAVE_PHASE_RATE + config.phase_offset;
        let normalized = if frame.width > 0.0 { x / frame.width } else { 0.0 };
        frame.center.y
            + wave_sample(normalized, config.frequency, phase)
                * self.max_amplitude(wave, frame)
                * attenuate(x, frame.width)
    }
}

impl ShapeGenerator for WaveformGenerator {
    fn style(&self) -> ShapeStyle {
        ShapeStyle::Waveform
    }

    fn generate(&self, frame: &FrameGeometry, palette: &Palette) -> Vec<LayerShape> {
        if frame.is_empty() {
            return Vec::new();
        }

        let steps = frame.width.floor() as usize;
        let mut shapes: Vec<LayerShape> = (0..self.waves)
            .map(|wave| {
                let points = (0..=steps)
                    .map(|step| {
                        let x = step as f32;
                        Point::new(x, self.sample(wave, x, frame, palette))
                    })
                    .collect();
                LayerShape {
                    index: wave,
                    outline: Outline::Open(points),
                    extent: self.max_amplitude(wave, frame),
                }
            })
            .collect();

        // Quietest wave at the back.
        shapes.sort_by(|a, b| a.extent.total_cmp(&b.extent));
        shapes
    }
}
