use std::fmt;

use serde::{Deserialize, Serialize};

use crate::smoothing::Band;

/// Conversational state of the voice agent, as reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMode {
    #[default]
    Idle,
    Listening,
    Speaking,
}

impl AnimationMode {
    /// Speaking wins over listening; neither flag means idle.
    pub fn from_flags(is_speaking: bool, is_listening: bool) -> Self {
        if is_speaking {
            Self::Speaking
        } else if is_listening {
            Self::Listening
        } else {
            Self::Idle
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AnimationMode {
    type Err = crate::OrbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" | "dormant" => Ok(Self::Idle),
            "listening" => Ok(Self::Listening),
            "speaking" => Ok(Self::Speaking),
            other => Err(crate::OrbError::msg(format!("unknown mode `{other}`"))),
        }
    }
}

/// Values the smoother converges toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetParameters {
    pub intensity: f32,
    pub scale: f32,
}

/// Intensity and scale bands for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeBand {
    pub intensity: Band,
    pub scale: Band,
}

impl ModeBand {
    /// Steady target: the middle of each band.
    pub fn steady(&self) -> TargetParameters {
        TargetParameters {
            intensity: self.intensity.midpoint(),
            scale: self.scale.midpoint(),
        }
    }
}

/// Per-mode target bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTargets {
    pub idle: ModeBand,
    pub listening: ModeBand,
    pub speaking: ModeBand,
}

impl Default for ModeTargets {
    fn default() -> Self {
        Self {
            idle: ModeBand {
                intensity: Band::new(0.6, 0.7),
                scale: Band::new(0.85, 0.9),
            },
            listening: ModeBand {
                intensity: Band::new(0.85, 0.9),
                scale: Band::new(0.9, 0.95),
            },
            speaking: ModeBand {
                intensity: Band::new(0.95, 1.0),
                scale: Band::new(1.05, 1.1),
            },
        }
    }
}

impl ModeTargets {
    pub fn band(&self, mode: AnimationMode) -> &ModeBand {
        match mode {
            AnimationMode::Idle => &self.idle,
            AnimationMode::Listening => &self.listening,
            AnimationMode::Speaking => &self.speaking,
        }
    }

    /// Steady targets for `mode`, without jitter.
    pub fn targets_for(&self, mode: AnimationMode) -> TargetParameters {
        self.band(mode).steady()
    }
}

/// Source of uniform values in `[0, 1)` for speaking jitter.
pub trait JitterSource: Send {
    fn next_unit(&mut self) -> f32;
}

/// Default jitter backed by `fastrand`.
#[derive(Debug, Clone)]
pub struct FastrandJitter {
    rng: fastrand::Rng,
}

impl FastrandJitter {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for FastrandJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for FastrandJitter {
    fn next_unit(&mut self) -> f32 {
        self.rng.f32()
    }
}

/// Replays a fixed sequence, wrapping around. Handy for deterministic runs.
#[derive(Debug, Clone)]
pub struct SequenceJitter {
    values: Vec<f32>,
    next: usize,
}

impl SequenceJitter {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, next: 0 }
    }
}

impl JitterSource for SequenceJitter {
    fn next_unit(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.5;
        }
        let value = self.values[self.next % self.values.len()];
        self.next = self.next.wrapping_add(1);
        value
    }
}

/// Turns the caller's mode flags into smoother targets.
pub struct TargetMapper {
    targets: ModeTargets,
    mode: AnimationMode,
    jitter: Box<dyn JitterSource>,
}

impl TargetMapper {
    pub fn new(targets: ModeTargets, jitter: Box<dyn JitterSource>) -> Self {
        Self {
            targets,
            mode: AnimationMode::Idle,
            jitter,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn targets(&self) -> &ModeTargets {
        &self.targets
    }

    /// Records the new mode and returns its steady target.
    pub fn apply_mode(&mut self, mode: AnimationMode) -> TargetParameters {
        self.mode = mode;
        self.targets.targets_for(mode)
    }

    /// Re-rolls the speaking intensity inside its band.
    ///
    /// Returns `None` outside speaking mode so that a late timer tick after
    /// a mode change never overrides the new steady target.
    pub fn jitter(&mut self) -> Option<TargetParameters> {
        if self.mode != AnimationMode::Speaking {
            return None;
        }

        let band = self.targets.band(AnimationMode::Speaking);
        let unit = self.jitter.next_unit();
        Some(TargetParameters {
            intensity: band.intensity.at(unit),
            scale: band.scale.midpoint(),
        })
    }
}

impl fmt::Debug for TargetMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetMapper")
            .field("targets", &self.targets)
            .field("mode", &self.mode)
            .finish()
    }
}
