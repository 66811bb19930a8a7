//! Core library for the voice orb.
//!
//! The orb is an animated blob that reflects a voice agent's conversational
//! state. Each module owns one piece of the pipeline: noise and wave math,
//! parameter smoothing, mode-to-target mapping, shape generation, particles,
//! compositing onto a [`Canvas`], and the frame loop that ties them together
//! in [`OrbEngine`].

pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod noise;
pub mod palette;
pub mod particles;
pub mod record;
pub mod render;
pub mod shape;
pub mod smoothing;
pub mod surface;
pub mod timeline;

pub use config::{
    AnimationConfig, OrbConfig, ParticleConfig, ShapeConfig, ShapeStyle, SurfaceConfig,
};
pub use engine::{AnimationParameters, FrameOutcome, OrbEngine};
pub use error::{OrbError, Result};
pub use mapping::{AnimationMode, FastrandJitter, JitterSource, SequenceJitter, TargetParameters};
pub use palette::{Palette, Rgb};
pub use record::{FrameRecorder, RecordingSettings};
pub use render::Compositor;
pub use shape::{NoiseBlobGenerator, ShapeGenerator, WaveformGenerator};
pub use surface::{Canvas, PixelCanvas, SurfaceSize};
pub use timeline::{FrameToken, LoopState, ModeScript, PlaybackClock, ScheduledEvent};
