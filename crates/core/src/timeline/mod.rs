use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AnimationMode, OrbError, Result};

/// Smallest time step a frame may advance the clock by.
pub const MIN_FRAME_STEP: f32 = 1e-4;

/// Monotonic animation clock.
///
/// Kept in `f64` so that a minimum step still registers after hours of
/// uptime; consumers narrow to `f32` per frame.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    /// Advances by `delta`, never by less than [`MIN_FRAME_STEP`], so that
    /// successive frames always see strictly increasing time.
    pub fn advance(&mut self, delta: f32) -> f64 {
        let step = if delta.is_finite() {
            delta.max(MIN_FRAME_STEP)
        } else {
            MIN_FRAME_STEP
        };
        self.time_seconds += f64::from(step);
        self.time_seconds
    }
}

/// Handle for the single outstanding frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Uninitialized,
    Running,
    Stopped,
}

/// Cooperative schedule → draw → reschedule loop with at most one pending frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    state: LoopState,
    pending: Option<FrameToken>,
    issued: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Uninitialized → Running. Returns the first frame token; no-op otherwise.
    pub fn start(&mut self) -> Option<FrameToken> {
        if self.state != LoopState::Uninitialized {
            return None;
        }
        self.state = LoopState::Running;
        self.request()
    }

    /// Consumes `token` if it is the pending frame of a running loop.
    ///
    /// Stale tokens and callbacks arriving after [`stop`](Self::stop) return `false`.
    pub fn begin_frame(&mut self, token: FrameToken) -> bool {
        if self.state != LoopState::Running || self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Schedules the next frame unless one is already pending.
    pub fn request(&mut self) -> Option<FrameToken> {
        if self.state != LoopState::Running {
            return None;
        }
        if let Some(token) = self.pending {
            return Some(token);
        }
        self.issued += 1;
        let token = FrameToken(self.issued);
        self.pending = Some(token);
        Some(token)
    }

    /// Running/Uninitialized → Stopped. Returns `true` only on the first call.
    pub fn stop(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        self.state = LoopState::Stopped;
        self.pending = None;
        true
    }
}

/// Fixed-period timer driven by externally supplied time deltas.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: f32,
    accumulated: f32,
    active: bool,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.as_secs_f32().max(MIN_FRAME_STEP),
            accumulated: 0.0,
            active: false,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f32(self.period)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Arms the timer; the first tick fires one full period later.
    pub fn arm(&mut self) {
        if !self.active {
            self.active = true;
            self.accumulated = 0.0;
        }
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.accumulated = 0.0;
    }

    /// Returns how many periods elapsed during `delta`, saturating at `u32::MAX`.
    pub fn advance(&mut self, delta: f32) -> u32 {
        if !self.active || !delta.is_finite() || delta <= 0.0 {
            return 0;
        }
        let total = self.accumulated + delta;
        if !total.is_finite() {
            self.accumulated = 0.0;
            return u32::MAX;
        }
        let periods = (total / self.period).floor();
        let remainder = total % self.period;
        self.accumulated = if (0.0..self.period).contains(&remainder) {
            remainder
        } else {
            0.0
        };
        // Float-to-int `as` saturates.
        periods as u32
    }
}

/// Mode change scheduled at a point on the animation clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub time_seconds: f32,
    pub mode: AnimationMode,
}

impl ScheduledEvent {
    pub fn new(time_seconds: f32, mode: AnimationMode) -> Self {
        Self { time_seconds, mode }
    }
}

/// Ordered list of scheduled mode changes, each released exactly once.
#[derive(Debug, Default, Clone)]
pub struct ModeScript {
    events: Vec<ScheduledEvent>,
    next_event: usize,
}

impl ModeScript {
    pub fn new(mut events: Vec<ScheduledEvent>) -> Self {
        events.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        Self {
            events,
            next_event: 0,
        }
    }

    /// Parses `"0:idle,1.5:listening,3:speaking"`.
    pub fn parse(source: &str) -> Result<Self> {
        let events = source
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (time, mode) = entry.split_once(':').ok_or_else(|| {
                    OrbError::msg(format!(
                        "script entry `{entry}` must look like `<seconds>:<mode>`"
                    ))
                })?;
                let time_seconds: f32 = time
                    .trim()
                    .parse()
                    .map_err(|_| OrbError::msg(format!("invalid time `{time}` in script")))?;
                if !time_seconds.is_finite() || time_seconds < 0.0 {
                    return Err(OrbError::msg(format!("script time `{time}` must be non-negative")));
                }
                Ok(ScheduledEvent::new(time_seconds, mode.parse()?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(events))
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.next_event >= self.events.len()
    }

    /// Events whose time has been reached and that were not yet released.
    pub fn due(&mut self, time_seconds: f64) -> &[ScheduledEvent] {
        let start = self.next_event;
        while let Some(event) = self.events.get(self.next_event) {
            if time_seconds < f64::from(event.time_seconds) {
                break;
            }
            self.next_event += 1;
        }
        &self.events[start..self.next_event]
    }
}
