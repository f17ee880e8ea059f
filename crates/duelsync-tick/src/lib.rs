//! Fixed-rate frame clock for duelsync game loops.
//!
//! A game calls [`FrameClock::wait_for_frame`] at the top of its loop,
//! runs its update with the returned `dt`, ticks the sync loop, and calls
//! [`FrameClock::record_frame_end`] when it is done:
//!
//! ```ignore
//! let mut clock = FrameClock::new(FrameConfig::default());
//! loop {
//!     let frame = clock.wait_for_frame().await;
//!     world.update(frame.dt);
//!     sync.tick(frame.dt)?;
//!     clock.record_frame_end();
//! }
//! ```
//!
//! A frame that fires late never triggers a burst of catch-up frames. The
//! next frame is scheduled one period after the late one, and the frames
//! that were missed are reported in [`Frame::skipped`].

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Frame clock configuration.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Frames per second. Clamped to `1..=MAX_RATE_HZ`.
    pub rate_hz: u32,
    /// Fraction of the frame budget (0.0–1.0) after which
    /// [`FrameClock::record_frame_end`] logs a warning. Default: 0.80.
    pub budget_warn_threshold: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            rate_hz: 40,
            budget_warn_threshold: 0.80,
        }
    }
}

impl FrameConfig {
    pub const MAX_RATE_HZ: u32 = 240;

    pub fn with_rate(rate_hz: u32) -> Self {
        Self {
            rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        let clamped = self.rate_hz.clamp(1, Self::MAX_RATE_HZ);
        if clamped != self.rate_hz {
            warn!(
                rate = self.rate_hz,
                clamped, "rate_hz out of range, clamping"
            );
            self.rate_hz = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }

    /// The length of one frame.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One frame handed out by [`FrameClock::wait_for_frame`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Starts at 1 and increases by one per frame.
    pub number: u64,
    /// Fixed: always `1 / rate_hz`.
    pub dt: Duration,
    /// The clock woke up more than a tenth of a frame after the deadline.
    pub late: bool,
    /// Whole frames that were missed while late.
    pub skipped: u64,
}

/// Counters kept across the life of a clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub total_frames: u64,
    pub late_frames: u64,
    pub skipped_frames: u64,
    /// Longest frame seen by `record_frame_end`.
    pub max_frame_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// Hands out frames at a fixed rate.
#[derive(Debug)]
pub struct FrameClock {
    config: FrameConfig,
    frame_duration: Duration,
    frame_count: u64,
    next_frame: TokioInstant,
    /// Set by `wait_for_frame`, consumed by `record_frame_end`.
    frame_start: Option<Instant>,
    stats: FrameStats,
}

impl FrameClock {
    /// The first frame is due one period from now.
    pub fn new(config: FrameConfig) -> Self {
        let config = config.validated();
        let frame_duration = config.frame_duration();

        debug!(
            rate_hz = config.rate_hz,
            budget_ms = frame_duration.as_secs_f64() * 1000.0,
            "frame clock created"
        );

        Self {
            config,
            frame_duration,
            frame_count: 0,
            next_frame: TokioInstant::now() + frame_duration,
            frame_start: None,
            stats: FrameStats::default(),
        }
    }

    pub fn with_rate(rate_hz: u32) -> Self {
        Self::new(FrameConfig::with_rate(rate_hz))
    }

    /// Sleeps until the next frame is due.
    pub async fn wait_for_frame(&mut self) -> Frame {
        let deadline = self.next_frame;
        let period = self.frame_duration;

        time::sleep_until(deadline).await;

        let now = TokioInstant::now();
        self.frame_count += 1;
        self.frame_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(deadline);
        let late = late_by > period / 10;
        let skipped = if late {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };
        if skipped > 0 {
            warn!(
                frame = self.frame_count,
                skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "frame overrun, skipping ahead"
            );
        }

        // Scheduled from now, not from the missed deadline.
        self.next_frame = now + period;

        self.stats.total_frames += 1;
        if late {
            self.stats.late_frames += 1;
        }
        self.stats.skipped_frames += skipped;

        trace!(frame = self.frame_count, late, "frame fired");

        Frame {
            number: self.frame_count,
            dt: period,
            late,
            skipped,
        }
    }

    /// Marks the end of the work for the current frame.
    ///
    /// Does nothing unless a frame is in progress.
    pub fn record_frame_end(&mut self) {
        let Some(start) = self.frame_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        let utilization = elapsed.as_secs_f64() / self.frame_duration.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                frame = self.frame_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.frame_duration.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "frame approaching budget limit"
            );
        }

        if elapsed > self.stats.max_frame_time {
            self.stats.max_frame_time = elapsed;
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn rate_hz(&self) -> u32 {
        self.config.rate_hz
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}
