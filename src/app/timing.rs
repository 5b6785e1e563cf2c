use std::time::{Duration, Instant};
use winit::window::Window;

/// Assumed cadence for the first frame, before any interval is measured.
const FIRST_FRAME: Duration = Duration::from_millis(16);

/// Timing handed to every frame subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the first frame.
    pub elapsed: f64,
    /// Seconds since the previous frame, after clamping.
    pub delta: f32,
}

pub trait FrameDriven {
    fn on_frame(&mut self, tick: &FrameTick);
}

pub struct FrameClock {
    start: Option<Instant>,
    last_frame_time: Option<Instant>,
    max_delta: Option<Duration>,
}

impl FrameClock {
    pub fn new(max_delta: Option<Duration>) -> Self {
        Self {
            start: None,
            last_frame_time: None,
            max_delta,
        }
    }

    pub fn advance(&mut self, now: Instant) -> FrameTick {
        let start = *self.start.get_or_insert(now);
        let mut delta = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => FIRST_FRAME,
        };
        if let Some(max_delta) = self.max_delta {
            if delta > max_delta {
                log::trace!("Clamping frame delta {:?} to {:?}", delta, max_delta);
                delta = max_delta;
            }
        }
        // An out-of-order `now` must not move time backwards.
        if self.last_frame_time.map_or(true, |last| now > last) {
            self.last_frame_time = Some(now);
        }
        let elapsed = self
            .last_frame_time
            .map_or(Duration::ZERO, |last| last.saturating_duration_since(start));
        FrameTick {
            elapsed: elapsed.as_secs_f64(),
            delta: delta.as_secs_f32(),
        }
    }
}

/// Advances one clock per frame and ticks every subscriber with it. Also
/// keeps the fps readout in the window title.
pub struct FrameScheduler {
    clock: FrameClock,
    last_fps_time: Option<Instant>,
    frame_count: u32,
    last_tick: Option<FrameTick>,
    base_title: String,
}

impl FrameScheduler {
    pub fn new(base_title: String, max_delta: Option<Duration>) -> Self {
        Self {
            clock: FrameClock::new(max_delta),
            last_fps_time: None,
            frame_count: 0,
            last_tick: None,
            base_title,
        }
    }

    #[cfg(test)]
    pub fn last_tick(&self) -> Option<FrameTick> {
        self.last_tick
    }

    pub fn dispatch(&mut self, now: Instant, subscribers: &mut [&mut dyn FrameDriven]) -> FrameTick {
        let tick = self.clock.advance(now);
        for subscriber in subscribers.iter_mut() {
            subscriber.on_frame(&tick);
        }
        self.last_tick = Some(tick);
        tick
    }

    pub fn update_title(&mut self, window: Option<&Window>, now: Instant) {
        let last_fps_time = *self.last_fps_time.get_or_insert(now);
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(last_fps_time);
        if elapsed.as_secs_f32() < 0.5 {
            return;
        }
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        let ms = self.last_tick.map_or(0.0, |tick| tick.delta * 1000.0);
        if let Some(window) = window {
            window.set_title(&format!(
                "{} - {:.1} fps (cadence {:.2} ms)",
                self.base_title, fps, ms
            ));
        }
        self.frame_count = 0;
        self.last_fps_time = Some(now);
    }
}
