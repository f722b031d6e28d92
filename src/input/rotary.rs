//! # Rotary Decoder Module
//!
//! Decodes the two lines of a detented rotary selector into direction steps.
//!
//! Both lines are debounced. A step is emitted on the stable falling edge of
//! the clock line, and its direction is the debounced level of the data line
//! at that moment; raw edges of either line never produce a step.

use std::time::Duration;

use super::debounce::{Debouncer, Edge};

/// Direction of one detent step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Data line low at the clock edge
    CounterClockwise = 0,
    /// Data line high at the clock edge
    Clockwise = 1,
}

impl Direction {
    #[must_use]
    pub fn from_level(data_high: bool) -> Self {
        if data_high {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Signed step value, +1 clockwise
    #[must_use]
    pub fn delta(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Debounced clock/data decoder
#[derive(Debug, Clone)]
pub struct RotaryDecoder {
    clock: Debouncer,
    data: Debouncer,
}

impl RotaryDecoder {
    /// Creates a decoder with both pulled-up lines idle high
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            clock: Debouncer::new(window, true),
            data: Debouncer::new(window, true),
        }
    }

    /// Feeds one poll of both lines; returns the step decoded at this poll
    pub fn update(&mut self, clock_level: bool, data_level: bool, now: Duration) -> Option<Direction> {
        // Data first, so the clock edge sees the freshest settled direction
        self.data.sample(data_level, now);
        self.data.take_edge();

        self.clock.sample(clock_level, now);
        match self.clock.take_edge() {
            Some(Edge::Falling) => Some(Direction::from_level(self.data.is_high())),
            _ => None,
        }
    }
}
