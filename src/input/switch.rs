//! # Switch Bank Module
//!
//! Debounced state of every panel switch plus the rotary selector.
//!
//! All switches share one debounce core; what an accepted edge *means* is
//! decided by the switch's [`SwitchKind`]: pushbuttons map to a report bit,
//! toggles select a mode of the control mapper.

use std::time::Duration;
use tracing::debug;

use super::debounce::{Debouncer, Edge};
use super::rotary::{Direction, RotaryDecoder};
use super::PanelState;

/// Number of switches on the panel
pub const SWITCH_COUNT: usize = 14;

/// Identity of each panel switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchId {
    FlapsUp,
    FlapsDown,
    GearUp,
    GearDown,
    RedButton,
    GreenButton,
    HatCenter,
    Set,
    Reset,
    Reverser,
    SpeedBrake,
    /// Ground mode: pitch/roll drive the wheel brakes
    Brake,
    /// HAT drives the trim buttons
    HatModeToggle,
    /// HAT drives the quick-view buttons
    ViewModeToggle,
}

/// What an accepted edge of a switch means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// Momentary button reported at the given button bit
    Pushbutton { bit: u8 },
    /// Latching mode selector
    Toggle,
}

impl SwitchId {
    /// All switches in panel order
    pub const ALL: [SwitchId; SWITCH_COUNT] = [
        SwitchId::FlapsUp,
        SwitchId::FlapsDown,
        SwitchId::GearUp,
        SwitchId::GearDown,
        SwitchId::RedButton,
        SwitchId::GreenButton,
        SwitchId::HatCenter,
        SwitchId::Set,
        SwitchId::Reset,
        SwitchId::Reverser,
        SwitchId::SpeedBrake,
        SwitchId::Brake,
        SwitchId::HatModeToggle,
        SwitchId::ViewModeToggle,
    ];

    /// Index into [`PanelState::switches`]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn kind(self) -> SwitchKind {
        match self {
            SwitchId::Brake | SwitchId::HatModeToggle | SwitchId::ViewModeToggle => SwitchKind::Toggle,
            button => SwitchKind::Pushbutton { bit: button as u8 },
        }
    }
}

/// Semantic result of a debounced edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchEvent {
    Button { id: SwitchId, pressed: bool },
    Mode { id: SwitchId, on: bool },
    Encoder(Direction),
}

/// Debounce state of the whole panel
#[derive(Debug, Clone)]
pub struct SwitchBank {
    debouncers: [Debouncer; SWITCH_COUNT],
    encoder: RotaryDecoder,
}

impl SwitchBank {
    /// Creates a bank with every switch open
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            debouncers: std::array::from_fn(|_| Debouncer::new(window, false)),
            encoder: RotaryDecoder::new(window),
        }
    }

    /// Feeds one panel reading taken at `now`, returning the events it produced
    pub fn update(&mut self, panel: &PanelState, now: Duration) -> Vec<SwitchEvent> {
        let mut events = Vec::new();

        for id in SwitchId::ALL {
            let debouncer = &mut self.debouncers[id.index()];
            debouncer.sample(panel.is_closed(id), now);
            let Some(edge) = debouncer.take_edge() else {
                continue;
            };

            let closed = edge == Edge::Rising;
            let event = match id.kind() {
                SwitchKind::Pushbutton { .. } => SwitchEvent::Button { id, pressed: closed },
                SwitchKind::Toggle => SwitchEvent::Mode { id, on: closed },
            };
            debug!("Switch event: {:?}", event);
            events.push(event);
        }

        if let Some(direction) = self.encoder.update(panel.encoder_clock, panel.encoder_data, now) {
            debug!("Encoder step: {:?}", direction);
            events.push(SwitchEvent::Encoder(direction));
        }

        events
    }

    /// Debounced contact state
    #[must_use]
    pub fn is_closed(&self, id: SwitchId) -> bool {
        self.debouncers[id.index()].is_high()
    }

    /// Report bits of the pushbuttons, a cleared bit meaning "pressed"
    #[must_use]
    pub fn button_bits(&self) -> u32 {
        SwitchId::ALL.iter().fold(0, |bits, &id| match id.kind() {
            SwitchKind::Pushbutton { bit } if !self.is_closed(id) => bits | (1 << bit),
            _ => bits,
        })
    }
}
