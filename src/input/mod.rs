//! # Input Module
//!
//! Mechanical switches, the rotary selector, the HAT switch and the
//! potentiometers of the yoke panel.
//!
//! This module handles:
//! - Debouncing every digital line ([`debounce`])
//! - Decoding the rotary selector into direction steps ([`rotary`])
//! - Decoding the 4-line HAT bus into one of nine positions ([`hat`])
//! - Turning debounced edges into switch events by switch kind ([`switch`])

pub mod debounce;
pub mod hat;
pub mod rotary;
pub mod switch;

use std::sync::{Arc, Mutex};

pub use switch::{SwitchId, SWITCH_COUNT};

/// One reading of every panel input
///
/// `switches` hold contact state (`true` = closed); the panel reader has
/// already resolved the pull-up polarity. `hat_lines` and the encoder lines
/// are raw line levels of pulled-up inputs (`1` / `true` = high = open).
/// Potentiometers are normalised to 0.0..=1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub switches: [bool; SWITCH_COUNT],
    pub hat_lines: u8,
    pub encoder_clock: bool,
    pub encoder_data: bool,
    pub throttle: f32,
    pub propeller: f32,
    pub mixture: f32,
    pub gain: f32,
}

impl Default for PanelState {
    /// All switches open, HAT released, encoder idle high, levers at minimum,
    /// gain knob centred
    fn default() -> Self {
        Self {
            switches: [false; SWITCH_COUNT],
            hat_lines: 0x0F,
            encoder_clock: true,
            encoder_data: true,
            throttle: 0.0,
            propeller: 0.0,
            mixture: 0.0,
            gain: 0.5,
        }
    }
}

impl PanelState {
    /// Contact state of one switch
    #[must_use]
    pub fn is_closed(&self, id: SwitchId) -> bool {
        self.switches[id.index()]
    }

    pub fn set_switch(&mut self, id: SwitchId, closed: bool) {
        self.switches[id.index()] = closed;
    }
}

/// Source of panel readings, sampled once per control cycle
pub trait InputPanel: Send {
    fn read(&mut self) -> PanelState;
}

/// Panel whose state is set from outside, through a shared handle
///
/// Stands in for GPIO/ADC hardware on a host and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPanel {
    state: Arc<Mutex<PanelState>>,
}

impl StaticPanel {
    #[must_use]
    pub fn new(state: PanelState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Shared handle to the panel state
    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<PanelState>> {
        Arc::clone(&self.state)
    }
}

impl InputPanel for StaticPanel {
    fn read(&mut self) -> PanelState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_panel_is_idle() {
        let state = PanelState::default();
        assert!(state.switches.iter().all(|&closed| !closed));
        assert_eq!(state.hat_lines, 0x0F);
        assert!(state.encoder_clock);
    }

    #[test]
    fn test_static_panel_reflects_handle_updates() {
        let mut panel = StaticPanel::new(PanelState::default());
        let handle = panel.handle();

        handle.lock().unwrap().set_switch(SwitchId::GearDown, true);
        handle.lock().unwrap().throttle = 0.7;

        let state = panel.read();
        assert!(state.is_closed(SwitchId::GearDown));
        assert!(!state.is_closed(SwitchId::GearUp));
        assert_eq!(state.throttle, 0.7);
    }
}
