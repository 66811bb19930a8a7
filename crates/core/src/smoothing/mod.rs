//! Exponential smoothing of animation parameters toward their targets.

use serde::{Deserialize, Serialize};

use crate::mapping::TargetParameters;

/// Inclusive `[min, max]` band a value is clamped into before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.midpoint();
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    /// Point at `t` (0 = min, 1 = max).
    pub fn at(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t.clamp(0.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// A single scalar that approaches its target by a fixed fraction per step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    current: f32,
    target: f32,
    rate: f32,
}

impl Smoothed {
    pub fn new(initial: f32, rate: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            rate: rate.clamp(0.0, 1.0),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// `current += (target - current) * rate`
    pub fn step(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.rate;
        self.current
    }

    fn clamp_into(&mut self, band: &Band) -> bool {
        let clamped = band.clamp(self.current);
        let changed = clamped != self.current;
        self.current = clamped;
        changed
    }
}

/// Current intensity and scale, each smoothed at its own rate.
#[derive(Debug, Clone)]
pub struct ParameterSmoother {
    intensity: Smoothed,
    scale: Smoothed,
    intensity_band: Band,
    scale_band: Band,
}

impl ParameterSmoother {
    pub fn new(
        initial: TargetParameters,
        intensity_rate: f32,
        scale_rate: f32,
        intensity_band: Band,
        scale_band: Band,
    ) -> Self {
        Self {
            intensity: Smoothed::new(intensity_band.clamp(initial.intensity), intensity_rate),
            scale: Smoothed::new(scale_band.clamp(initial.scale), scale_rate),
            intensity_band,
            scale_band,
        }
    }

    /// Replaces the targets, clamped into their bands. Current values are
    /// left untouched.
    pub fn set_targets(&mut self, targets: TargetParameters) {
        let intensity = self.intensity_band.clamp(targets.intensity);
        let scale = self.scale_band.clamp(targets.scale);
        if intensity != targets.intensity {
            tracing::warn!(
                requested = targets.intensity,
                clamped = intensity,
                "intensity target left its safe band and was clamped"
            );
        }
        if scale != targets.scale {
            tracing::warn!(
                requested = targets.scale,
                clamped = scale,
                "scale target left its safe band and was clamped"
            );
        }
        self.intensity.set_target(intensity);
        self.scale.set_target(scale);
    }

    pub fn targets(&self) -> TargetParameters {
        TargetParameters {
            intensity: self.intensity.target(),
            scale: self.scale.target(),
        }
    }

    pub fn current(&self) -> TargetParameters {
        TargetParameters {
            intensity: self.intensity.current(),
            scale: self.scale.current(),
        }
    }

    /// Advances both parameters one frame and clamps them into their bands.
    pub fn step(&mut self) -> TargetParameters {
        self.intensity.step();
        self.scale.step();

        if self.intensity.clamp_into(&self.intensity_band) {
            tracing::debug!(intensity = self.intensity.current(), "intensity clamped");
        }
        if self.scale.clamp_into(&self.scale_band) {
            tracing::debug!(scale = self.scale.current(), "scale clamped");
        }

        self.current()
    }
}
