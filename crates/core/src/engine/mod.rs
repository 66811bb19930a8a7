//! The orb engine: one owned animation context driven frame by frame.
//!
//! Lifecycle is `Uninitialized → Running → Stopped`. Binding a surface
//! starts the loop and yields the first [`FrameToken`]; every accepted frame
//! performs exactly one smoother step and one compositor pass and hands back
//! the next token. Mode changes and jitter ticks only ever rewrite targets.

use std::time::Duration;

use crate::{
    config::OrbConfig,
    mapping::{AnimationMode, FastrandJitter, JitterSource, TargetMapper, TargetParameters},
    palette::Palette,
    particles::ParticleField,
    render::{Compositor, FrameInput},
    shape::{create_generator, FrameGeometry, ShapeGenerator},
    smoothing::ParameterSmoother,
    surface::{Canvas, SurfaceSize},
    timeline::{FrameScheduler, FrameToken, IntervalTimer, LoopState, PlaybackClock},
    Result,
};

/// Parameters as drawn on the most recent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParameters {
    pub intensity: f32,
    pub scale: f32,
    pub elapsed_time: f64,
}

/// Per-instance mutable state carried across frames.
#[derive(Debug, Clone)]
pub struct AnimationContext {
    pub clock: PlaybackClock,
    pub smoother: ParameterSmoother,
    pub size: SurfaceSize,
    pub frames_drawn: u64,
}

impl AnimationContext {
    pub fn parameters(&self) -> AnimationParameters {
        let current = self.smoother.current();
        AnimationParameters {
            intensity: current.intensity,
            scale: current.scale,
            elapsed_time: self.clock.time_seconds,
        }
    }

    /// Advances time and parameters by one frame and returns the geometry to draw.
    pub fn step(&mut self, dt: f32) -> FrameGeometry {
        let elapsed = self.clock.advance(dt) as f32;
        let current = self.smoother.step();
        self.frames_drawn += 1;
        FrameGeometry::new(&self.size, elapsed, current.intensity, current.scale)
    }
}

/// Result of delivering a frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A full frame was painted.
    Drawn { next: FrameToken },
    /// The requested size is not drawable; the surface was only cleared.
    Cleared { next: FrameToken },
    /// No surface is bound; nothing was touched.
    Skipped { next: FrameToken },
    /// Stale token or stopped engine; nothing happened and nothing was scheduled.
    Ignored,
}

impl FrameOutcome {
    pub fn next_token(&self) -> Option<FrameToken> {
        match *self {
            FrameOutcome::Drawn { next }
            | FrameOutcome::Cleared { next }
            | FrameOutcome::Skipped { next } => Some(next),
            FrameOutcome::Ignored => None,
        }
    }
}

pub struct OrbEngine<C: Canvas> {
    context: AnimationContext,
    mapper: TargetMapper,
    generator: Box<dyn ShapeGenerator>,
    particles: ParticleField,
    palette: Palette,
    compositor: Compositor,
    scheduler: FrameScheduler,
    jitter_timer: IntervalTimer,
    canvas: Option<C>,
}

impl<C: Canvas> OrbEngine<C> {
    /// Creates an engine with `fastrand`-backed jitter.
    pub fn new(config: &OrbConfig) -> Result<Self> {
        Self::with_jitter(config, Box::new(FastrandJitter::new()))
    }

    pub fn with_jitter(config: &OrbConfig, jitter: Box<dyn JitterSource>) -> Result<Self> {
        config.validate()?;

        let animation = &config.animation;
        let mut smoother = ParameterSmoother::new(
            TargetParameters {
                intensity: animation.initial_intensity,
                scale: animation.initial_scale,
            },
            animation.intensity_rate,
            animation.scale_rate,
            animation.intensity_band,
            animation.scale_band,
        );
        let mut mapper = TargetMapper::new(config.targets, jitter);
        smoother.set_targets(mapper.apply_mode(AnimationMode::Idle));

        Ok(Self {
            context: AnimationContext {
                clock: PlaybackClock::default(),
                smoother,
                size: SurfaceSize::square(config.surface.size, config.surface.device_pixel_ratio),
                frames_drawn: 0,
            },
            mapper,
            generator: create_generator(&config.shape),
            particles: ParticleField::new(&config.particles),
            palette: config.palette()?,
            compositor: Compositor::new(),
            scheduler: FrameScheduler::new(),
            jitter_timer: IntervalTimer::new(Duration::from_millis(animation.jitter_period_ms)),
            canvas: None,
        })
    }

    pub fn state(&self) -> LoopState {
        self.scheduler.state()
    }

    pub fn mode(&self) -> AnimationMode {
        self.mapper.mode()
    }

    pub fn parameters(&self) -> AnimationParameters {
        self.context.parameters()
    }

    pub fn targets(&self) -> TargetParameters {
        self.context.smoother.targets()
    }

    pub fn size(&self) -> SurfaceSize {
        self.context.size
    }

    pub fn frames_drawn(&self) -> u64 {
        self.context.frames_drawn
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.scheduler.pending()
    }

    pub fn canvas(&self) -> Option<&C> {
        self.canvas.as_ref()
    }

    pub fn generator(&self) -> &dyn ShapeGenerator {
        self.generator.as_ref()
    }

    /// Binds (or rebinds) the drawing surface at `size`.
    ///
    /// The first binding starts the frame loop. Returns the pending frame
    /// token, or `None` (dropping `canvas`) once the engine is stopped.
    pub fn bind_surface(&mut self, mut canvas: C, size: SurfaceSize) -> Option<FrameToken> {
        if self.scheduler.state() == LoopState::Stopped {
            tracing::debug!("ignoring surface bind after teardown");
            return None;
        }

        let (width, height) = size.physical();
        canvas.resize(width, height);
        self.context.size = size;
        self.canvas = Some(canvas);

        let token = match self.scheduler.state() {
            LoopState::Uninitialized => self.scheduler.start(),
            _ => self.scheduler.request(),
        };
        tracing::debug!(width, height, dpr = size.device_pixel_ratio, "surface bound");
        token
    }

    /// Releases the surface while keeping the loop alive; frames are skipped
    /// until a surface is bound again.
    pub fn detach_surface(&mut self) -> Option<C> {
        let canvas = self.canvas.take();
        if canvas.is_some() {
            tracing::debug!("surface detached");
        }
        canvas
    }

    /// Updates the requested size and reallocates the bound surface.
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.scheduler.state() == LoopState::Stopped || size == self.context.size {
            return;
        }
        self.context.size = size;
        let (width, height) = size.physical();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.resize(width, height);
        }
        tracing::debug!(width, height, "surface resized");
    }

    /// Applies the caller's conversational flags. Only targets change.
    pub fn set_mode(&mut self, is_speaking: bool, is_listening: bool) {
        self.set_animation_mode(AnimationMode::from_flags(is_speaking, is_listening));
    }

    pub fn set_animation_mode(&mut self, mode: AnimationMode) {
        if self.scheduler.state() == LoopState::Stopped || mode == self.mapper.mode() {
            return;
        }

        let targets = self.mapper.apply_mode(mode);
        self.context.smoother.set_targets(targets);
        if mode == AnimationMode::Speaking {
            self.jitter_timer.arm();
        } else {
            self.jitter_timer.cancel();
        }
        tracing::debug!(
            %mode,
            intensity = targets.intensity,
            scale = targets.scale,
            "mode changed"
        );
    }

    /// Jitter timer callback: re-rolls the speaking intensity target.
    pub fn on_jitter_tick(&mut self) {
        if self.scheduler.state() == LoopState::Stopped {
            return;
        }
        if let Some(targets) = self.mapper.jitter() {
            self.context.smoother.set_targets(targets);
            tracing::trace!(intensity = targets.intensity, "jitter target");
        }
    }

    /// Advances the jitter timer by wall-clock `delta` and returns the number
    /// of elapsed periods. Any number of periods re-rolls the target once.
    pub fn advance_timers(&mut self, delta: f32) -> u32 {
        let fired = self.jitter_timer.advance(delta);
        if fired > 0 {
            self.on_jitter_tick();
        }
        fired
    }

    /// Frame callback for `token`, `dt` seconds after the previous frame.
    pub fn on_frame(&mut self, token: FrameToken, dt: f32) -> FrameOutcome {
        if !self.scheduler.begin_frame(token) {
            tracing::trace!(token = token.id(), "ignoring stale frame callback");
            return FrameOutcome::Ignored;
        }
        let Some(next) = self.scheduler.request() else {
            return FrameOutcome::Ignored;
        };

        if self.canvas.is_none() {
            tracing::debug!("no surface bound, skipping frame");
            return FrameOutcome::Skipped { next };
        }

        if !self.context.size.is_drawable() {
            if let Some(canvas) = self.canvas.as_mut() {
                canvas.clear();
            }
            return FrameOutcome::Cleared { next };
        }

        let geometry = self.context.step(dt);
        let layers = self.generator.generate(&geometry, &self.palette);
        let particles = self
            .particles
            .particles(self.mapper.mode(), &geometry, &self.palette);

        if let Some(canvas) = self.canvas.as_mut() {
            self.compositor.draw(
                canvas,
                &FrameInput {
                    size: &self.context.size,
                    geometry: &geometry,
                    layers: &layers,
                    particles: &particles,
                    palette: &self.palette,
                },
            );
        }
        tracing::trace!(
            frame = self.context.frames_drawn,
            intensity = geometry.intensity,
            "frame drawn"
        );
        FrameOutcome::Drawn { next }
    }

    /// Fires due jitter ticks, then runs the pending frame, if any.
    pub fn advance(&mut self, dt: f32) -> FrameOutcome {
        self.advance_timers(dt);
        match self.scheduler.pending() {
            Some(token) => self.on_frame(token, dt),
            None => FrameOutcome::Ignored,
        }
    }

    /// Stops the frame loop and the jitter timer and releases the surface.
    ///
    /// Only the first call has an effect.
    pub fn teardown(&mut self) -> Option<C> {
        if !self.scheduler.stop() {
            return None;
        }
        self.jitter_timer.cancel();
        tracing::debug!(frames = self.context.frames_drawn, "orb engine stopped");
        self.canvas.take()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        config::ShapeStyle,
        mapping::SequenceJitter,
        surface::{
            recording::{DrawCall, RecordingCanvas},
            Paint, PixelCanvas, Point,
        },
    };

    const DT: f32 = 1.0 / 60.0;

    /// Recording canvas whose log stays readable after the engine lets go of it.
    #[derive(Debug, Clone, Default)]
    struct SharedCanvas(Rc<RefCell<RecordingCanvas>>);

    impl SharedCanvas {
        fn call_count(&self) -> usize {
            self.0.borrow().calls.len()
        }
    }

    impl Canvas for SharedCanvas {
        fn physical_size(&self) -> (u32, u32) {
            self.0.borrow().physical_size()
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.0.borrow_mut().resize(width, height);
        }

        fn clear(&mut self) {
            self.0.borrow_mut().clear();
        }

        fn set_scale(&mut self, factor: f32) {
            self.0.borrow_mut().set_scale(factor);
        }

        fn reset_transform(&mut self) {
            self.0.borrow_mut().reset_transform();
        }

        fn fill_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
            self.0.borrow_mut().fill_circle(center, radius, paint);
        }

        fn fill_polygon(&mut self, points: &[Point], paint: &Paint, blur: f32) {
            self.0.borrow_mut().fill_polygon(points, paint, blur);
        }

        fn stroke_polyline(&mut self, points: &[Point], width: f32, paint: &Paint) {
            self.0.borrow_mut().stroke_polyline(points, width, paint);
        }
    }

    fn with_jitter<C: Canvas>(values: Vec<f32>) -> OrbEngine<C> {
        OrbEngine::with_jitter(&OrbConfig::default(), Box::new(SequenceJitter::new(values)))
            .unwrap()
    }

    fn engine(values: Vec<f32>) -> OrbEngine<RecordingCanvas> {
        with_jitter(values)
    }

    fn running(values: Vec<f32>) -> (OrbEngine<RecordingCanvas>, FrameToken) {
        let mut engine = engine(values);
        let token = engine
            .bind_surface(RecordingCanvas::default(), SurfaceSize::square(200.0, 1.0))
            .unwrap();
        (engine, token)
    }

    #[test]
    fn idle_first_frame_moves_slightly() {
        let (mut engine, token) = running(vec![0.5]);
        engine.set_mode(false, false);

        assert!(matches!(engine.on_frame(token, DT), FrameOutcome::Drawn { .. }));
        assert!((engine.targets().intensity - 0.65).abs() < 1e-5);
        let intensity = engine.parameters().intensity;
        assert!((intensity - 0.8925).abs() < 1e-5, "{intensity}");
    }

    #[test]
    fn speaking_settles_in_band() {
        let (mut engine, _) = running(vec![0.0, 0.3, 0.9, 0.6, 1.0]);
        engine.set_mode(true, false);

        for _ in 0..100 {
            assert!(matches!(engine.advance(DT), FrameOutcome::Drawn { .. }));
        }
        let intensity = engine.parameters().intensity;
        assert!((0.9..=1.0).contains(&intensity), "{intensity}");
        assert!(engine.parameters().scale > 1.0);
    }

    #[test]
    fn teardown_blocks_later_frames() {
        let log = SharedCanvas::default();
        let mut engine: OrbEngine<SharedCanvas> = with_jitter(vec![0.5]);
        let token = engine
            .bind_surface(log.clone(), SurfaceSize::square(200.0, 1.0))
            .unwrap();
        let next = engine.on_frame(token, DT).next_token().unwrap();

        let calls_at_teardown = log.call_count();
        assert!(calls_at_teardown > 0);
        let frames_at_teardown = engine.frames_drawn();
        drop(engine.teardown().unwrap());

        assert_eq!(engine.on_frame(next, DT), FrameOutcome::Ignored);
        assert_eq!(engine.advance(DT), FrameOutcome::Ignored);
        assert_eq!(log.call_count(), calls_at_teardown);
        assert_eq!(engine.frames_drawn(), frames_at_teardown);
        assert!(engine.canvas().is_none());
        assert_eq!(engine.state(), LoopState::Stopped);
        assert!(engine.teardown().is_none(), "second teardown is a no-op");
    }

    #[test]
    fn huge_frame_gap_draws_once() {
        let (mut engine, _) = running(vec![0.0, 1.0]);
        engine.set_mode(true, false);
        let before = engine.parameters().elapsed_time;

        assert!(matches!(engine.advance(1.0e8), FrameOutcome::Drawn { .. }));
        assert!((engine.targets().intensity - 0.95).abs() < 1e-6, "one re-roll");
        assert!(engine.parameters().elapsed_time > before);
        assert_eq!(engine.frames_drawn(), 1);
    }

    #[test]
    fn mode_change_only_rewrites_targets() {
        let (mut engine, token) = running(vec![0.5]);
        let next = engine.on_frame(token, DT).next_token().unwrap();
        let before = engine.parameters();

        engine.set_mode(true, false);
        assert!(engine.targets().intensity >= 0.95);
        assert_eq!(engine.parameters(), before);

        engine.on_frame(next, DT);
        let after = engine.parameters();
        assert!(after.intensity > before.intensity);
        assert!(after.intensity < engine.targets().intensity);
    }

    #[test]
    fn jitter_timer_runs_only_while_speaking() {
        let (mut engine, _) = running(vec![0.0, 1.0]);
        assert_eq!(engine.advance_timers(1.0), 0);

        engine.set_mode(true, true);
        assert_eq!(engine.advance_timers(0.125), 1);
        assert!((engine.targets().intensity - 0.95).abs() < 1e-6);
        engine.advance_timers(0.12);
        assert!((engine.targets().intensity - 1.0).abs() < 1e-6);

        engine.set_mode(false, true);
        assert_eq!(engine.advance_timers(1.0), 0);
        assert!((engine.targets().intensity - 0.875).abs() < 1e-5);
    }

    #[test]
    fn late_jitter_tick_after_mode_change_is_ignored() {
        let (mut engine, _) = running(vec![0.0]);
        engine.set_mode(true, false);
        engine.set_mode(false, false);
        engine.on_jitter_tick();
        assert!((engine.targets().intensity - 0.65).abs() < 1e-5);
    }

    #[test]
    fn elapsed_time_strictly_increases() {
        let (mut engine, _) = running(vec![0.5]);
        let mut last = engine.parameters().elapsed_time;
        for dt in [DT, 0.0, DT, -1.0] {
            engine.advance(dt);
            let now = engine.parameters().elapsed_time;
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn missing_surface_skips_and_recovers() {
        let (mut engine, token) = running(vec![0.5]);
        let detached = engine.detach_surface().unwrap();

        let outcome = engine.on_frame(token, DT);
        let next = match outcome {
            FrameOutcome::Skipped { next } => next,
            other => panic!("expected skip, got {other:?}"),
        };
        assert_eq!(engine.frames_drawn(), 0);

        engine.bind_surface(detached, SurfaceSize::square(200.0, 1.0));
        assert!(matches!(engine.on_frame(next, DT), FrameOutcome::Drawn { .. }));
    }

    #[test]
    fn zero_size_only_clears() {
        let mut engine = engine(vec![0.5]);
        let token = engine
            .bind_surface(RecordingCanvas::default(), SurfaceSize::square(0.0, 1.0))
            .unwrap();
        let before = engine.parameters();

        assert!(matches!(engine.on_frame(token, DT), FrameOutcome::Cleared { .. }));
        assert_eq!(engine.canvas().unwrap().calls, vec![DrawCall::Clear]);
        assert_eq!(engine.parameters(), before);

        engine.resize(SurfaceSize::square(80.0, 1.0));
        assert!(matches!(engine.advance(DT), FrameOutcome::Drawn { .. }));
    }

    #[test]
    fn stale_tokens_are_ignored() {
        let (mut engine, token) = running(vec![0.5]);
        engine.on_frame(token, DT);
        assert_eq!(engine.on_frame(token, DT), FrameOutcome::Ignored);
        assert_eq!(engine.frames_drawn(), 1);
    }

    #[test]
    fn stopped_engine_ignores_inputs() {
        let (mut engine, _) = running(vec![0.5]);
        engine.teardown();
        let targets = engine.targets();

        engine.set_mode(true, false);
        engine.on_jitter_tick();
        assert_eq!(engine.targets(), targets);
        assert!(engine
            .bind_surface(RecordingCanvas::default(), SurfaceSize::square(10.0, 1.0))
            .is_none());
    }

    #[test]
    fn teardown_before_binding_is_terminal() {
        let mut engine = engine(vec![0.5]);
        assert!(engine.teardown().is_none());
        assert_eq!(engine.state(), LoopState::Stopped);
    }

    #[test]
    fn renders_pixels_at_device_ratio() {
        let mut config = OrbConfig::default();
        config.shape.style = ShapeStyle::Waveform;
        let mut engine: OrbEngine<PixelCanvas> =
            OrbEngine::with_jitter(&config, Box::new(SequenceJitter::new(vec![0.5]))).unwrap();
        engine.bind_surface(PixelCanvas::new(0, 0), SurfaceSize::square(48.0, 2.0));
        engine.set_mode(false, true);

        for _ in 0..3 {
            engine.advance(DT);
        }
        let canvas = engine.canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (96, 96));
        assert!(canvas.total_alpha() > 0.0);
        assert_eq!(canvas.scale(), 1.0);
    }

    #[test]
    fn resize_reallocates_bound_surface() {
        let (mut engine, _) = running(vec![0.5]);
        engine.resize(SurfaceSize::square(150.0, 2.0));
        assert_eq!(engine.canvas().unwrap().physical_size(), (300, 300));
    }
}
