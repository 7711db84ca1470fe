use crate::display::Element;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

pub const TWEEN_DURATION: Duration = Duration::from_millis(1000);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Running(i64),
    Done(i64),
}

/// Constant-step interpolation from a start value to a target.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    target: i64,
    step: f64,
    current: f64,
}

impl Tween {
    pub fn new(start: i64, target: i64, duration: Duration, frame: Duration) -> Self {
        let frames = duration.as_secs_f64() / frame.as_secs_f64();
        Self {
            target,
            step: target.saturating_sub(start) as f64 / frames,
            current: start as f64,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn tick(&mut self) -> Frame {
        if self.step == 0.0 {
            return Frame::Done(self.target);
        }

        self.current += self.step;
        let target = self.target as f64;
        if (self.step > 0.0 && self.current >= target) || (self.step < 0.0 && self.current <= target) {
            Frame::Done(self.target)
        } else {
            Frame::Running(self.current.floor() as i64)
        }
    }
}

/// An element showing a number that moves toward new values over time.
///
/// Starting a tween supersedes any tween still running on the same display;
/// the superseded one stops without writing another frame.
#[derive(Debug, Clone)]
pub struct CounterDisplay<E> {
    element: E,
    generation: Arc<AtomicU64>,
    duration: Duration,
    frame: Duration,
}

impl<E: Element> CounterDisplay<E> {
    pub fn new(element: E) -> Self {
        Self::with_timing(element, TWEEN_DURATION, FRAME_INTERVAL)
    }

    pub fn with_timing(element: E, duration: Duration, frame: Duration) -> Self {
        Self {
            element,
            generation: Arc::new(AtomicU64::new(0)),
            duration,
            frame,
        }
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    /// Integer currently on screen; text without a leading number reads as 0.
    pub fn current_value(&self) -> i64 {
        parse_leading_int(&self.element.text()).unwrap_or(0)
    }

    /// Writes text immediately, stopping any running tween.
    pub fn set_text(&self, text: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.element.set_text(text);
    }

    pub async fn animate_to(&self, target: u64) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let target = i64::try_from(target).unwrap_or(i64::MAX);
        let mut tween = Tween::new(self.current_value(), target, self.duration, self.frame);

        let mut ticker = time::interval(self.frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(to = target, "tween superseded");
                return;
            }
            match tween.tick() {
                Frame::Running(value) => self.element.set_text(&value.to_string()),
                Frame::Done(value) => {
                    self.element.set_text(&value.to_string());
                    return;
                }
            }
        }
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}
