//! Digital input polling.
//!
//! An [`InputPort`] exposes the raw button and switch bitmasks. The button and
//! switch tasks sample them once per period, debounce, decode each bit on its
//! own, and publish the resulting signals.

use cruise_kernel::sync::{Arc, Mutex};
use cruise_kernel::{PeriodicJob, TaskContext};
use log::debug;

use crate::signals::{ButtonWriters, LoadSetting, OnOff, SwitchWriters};

/// Button bitmask layout (logical, active high).
pub mod buttons {
    pub const GAS_PEDAL: u32 = 0x08;
    pub const BRAKE_PEDAL: u32 = 0x04;
    pub const CRUISE_CONTROL: u32 = 0x02;
}

/// Switch bitmask layout.
pub mod switches {
    pub const ENGINE: u32 = 0x01;
    pub const TOP_GEAR: u32 = 0x02;
    /// Extra-load level switches, bits 4..9.
    pub const LOAD_MASK: u32 = 0x3F0;
    pub const LOAD_SHIFT: u32 = 4;
}

/// Source of raw digital inputs.
pub trait InputPort: Send + Sync {
    fn buttons(&self) -> u32;
    fn switches(&self) -> u32;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct InputState {
    buttons: u32,
    switches: u32,
}

/// In-memory input port that a driver, scenario or test can set.
#[derive(Debug, Clone, Default)]
pub struct SharedInputs {
    state: Arc<Mutex<InputState>>,
}

impl SharedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buttons(&self, mask: u32) {
        self.state.lock().buttons = mask;
    }

    pub fn press(&self, mask: u32) {
        self.state.lock().buttons |= mask;
    }

    pub fn release(&self, mask: u32) {
        self.state.lock().buttons &= !mask;
    }

    pub fn set_switches(&self, mask: u32) {
        self.state.lock().switches = mask;
    }

    pub fn switch_on(&self, mask: u32) {
        self.state.lock().switches |= mask;
    }

    pub fn switch_off(&self, mask: u32) {
        self.state.lock().switches &= !mask;
    }

    /// Sets the load switches to `level`, saturating at all six switches on.
    pub fn set_load_level(&self, level: u8) {
        let all_on = switches::LOAD_MASK >> switches::LOAD_SHIFT;
        let bits = u32::from(level).min(all_on) << switches::LOAD_SHIFT;
        let mut state = self.state.lock();
        state.switches = (state.switches & !switches::LOAD_MASK) | bits;
    }
}

impl InputPort for SharedInputs {
    fn buttons(&self) -> u32 {
        self.state.lock().buttons
    }

    fn switches(&self) -> u32 {
        self.state.lock().switches
    }
}

/// Decoded buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub gas: OnOff,
    pub brake: OnOff,
    pub cruise: OnOff,
}

pub fn decode_buttons(mask: u32) -> ButtonState {
    ButtonState {
        gas: OnOff::from(mask & buttons::GAS_PEDAL != 0),
        brake: OnOff::from(mask & buttons::BRAKE_PEDAL != 0),
        cruise: OnOff::from(mask & buttons::CRUISE_CONTROL != 0),
    }
}

/// Decoded switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchState {
    pub engine: OnOff,
    pub top_gear: OnOff,
    pub load: LoadSetting,
}

pub fn decode_switches(mask: u32, max_load_level: u8) -> SwitchState {
    let load_bits = mask & switches::LOAD_MASK;
    // Six bits, so the shifted value is below 64.
    let level = (load_bits >> switches::LOAD_SHIFT) as u8;
    SwitchState {
        engine: OnOff::from(mask & switches::ENGINE != 0),
        top_gear: OnOff::from(mask & switches::TOP_GEAR != 0),
        load: LoadSetting {
            level: level.min(max_load_level),
            switches: load_bits,
        },
    }
}

/// Accepts a new raw value only after it has been read `stable_samples`
/// times in a row.
#[derive(Debug, Clone)]
pub struct Debouncer {
    stable_samples: u32,
    value: u32,
    candidate: u32,
    streak: u32,
}

impl Debouncer {
    pub fn new(stable_samples: u32) -> Self {
        Self {
            stable_samples: stable_samples.max(1),
            value: 0,
            candidate: 0,
            streak: 0,
        }
    }

    pub fn sample(&mut self, raw: u32) -> u32 {
        if raw == self.value {
            self.streak = 0;
            return self.value;
        }
        if raw == self.candidate {
            self.streak += 1;
        } else {
            self.candidate = raw;
            self.streak = 1;
        }
        if self.streak >= self.stable_samples {
            self.value = raw;
            self.streak = 0;
        }
        self.value
    }
}

/// Polls the buttons and publishes pedal and cruise-button signals.
pub struct ButtonTask {
    port: Arc<dyn InputPort>,
    debouncer: Debouncer,
    writers: ButtonWriters,
    last: Option<ButtonState>,
}

impl ButtonTask {
    pub fn new(port: Arc<dyn InputPort>, debounce_samples: u32, writers: ButtonWriters) -> Self {
        Self {
            port,
            debouncer: Debouncer::new(debounce_samples),
            writers,
            last: None,
        }
    }
}

impl PeriodicJob for ButtonTask {
    fn on_release(&mut self, _ctx: &mut TaskContext) {
        let mask = self.debouncer.sample(self.port.buttons());
        let state = decode_buttons(mask);
        if self.last != Some(state) {
            debug!("buttons: {state:?}");
            self.last = Some(state);
        }
        self.writers.cruise_button.publish(state.cruise);
        self.writers.gas_pedal.publish(state.gas);
        self.writers.brake_pedal.publish(state.brake);
    }
}

/// Polls the switches and publishes engine, gear and extra-load signals.
pub struct SwitchTask {
    port: Arc<dyn InputPort>,
    debouncer: Debouncer,
    max_load_level: u8,
    writers: SwitchWriters,
    last: Option<SwitchState>,
}

impl SwitchTask {
    pub fn new(
        port: Arc<dyn InputPort>,
        debounce_samples: u32,
        max_load_level: u8,
        writers: SwitchWriters,
    ) -> Self {
        Self {
            port,
            debouncer: Debouncer::new(debounce_samples),
            max_load_level,
            writers,
            last: None,
        }
    }
}

impl PeriodicJob for SwitchTask {
    fn on_release(&mut self, _ctx: &mut TaskContext) {
        let mask = self.debouncer.sample(self.port.switches());
        let state = decode_switches(mask, self.max_load_level);
        if self.last != Some(state) {
            debug!("switches: {state:?}");
            self.last = Some(state);
        }
        self.writers.engine_switch.publish(state.engine);
        self.writers.top_gear.publish(state.top_gear);
        self.writers.extra_load.publish(state.load);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_decode_independently() {
        let state = decode_buttons(buttons::GAS_PEDAL | buttons::CRUISE_CONTROL);
        assert_eq!(state.gas, OnOff::On);
        assert_eq!(state.cruise, OnOff::On);
        assert_eq!(state.brake, OnOff::Off);

        assert_eq!(decode_buttons(0), ButtonState::default());
    }

    #[test]
    fn switches_decode_load_level() {
        let state = decode_switches(switches::ENGINE | (7 << 4), 50);
        assert_eq!(state.engine, OnOff::On);
        assert_eq!(state.top_gear, OnOff::Off);
        assert_eq!(state.load.level, 7);
        assert_eq!(state.load.switches, 0x70);

        let state = decode_switches(switches::LOAD_MASK | switches::TOP_GEAR, 50);
        assert_eq!(state.load.level, 50);
        assert_eq!(state.load.switches, 0x3F0);
        assert_eq!(state.top_gear, OnOff::On);
    }

    #[test]
    fn shared_inputs_edit_bits() {
        let inputs = SharedInputs::new();
        inputs.press(buttons::GAS_PEDAL | buttons::BRAKE_PEDAL);
        inputs.release(buttons::GAS_PEDAL);
        assert_eq!(inputs.buttons(), buttons::BRAKE_PEDAL);

        inputs.switch_on(switches::ENGINE);
        inputs.set_load_level(40);
        assert_eq!(inputs.switches(), switches::ENGINE | (40 << 4));
        inputs.set_load_level(0);
        inputs.switch_off(switches::ENGINE);
        assert_eq!(inputs.switches(), 0);
    }

    #[test]
    fn load_level_past_the_switches_saturates() {
        let inputs = SharedInputs::new();
        inputs.set_load_level(70);
        assert_eq!(inputs.switches(), switches::LOAD_MASK);
        inputs.set_load_level(64);
        assert_eq!(decode_switches(inputs.switches(), 50).load.level, 50);
    }

    #[test]
    fn single_sample_debounce_is_immediate() {
        let mut debouncer = Debouncer::new(1);
        assert_eq!(debouncer.sample(0x08), 0x08);
        assert_eq!(debouncer.sample(0), 0);
    }

    #[test]
    fn debounce_requires_stable_streak() {
        let mut debouncer = Debouncer::new(3);
        assert_eq!(debouncer.sample(0x04), 0);
        assert_eq!(debouncer.sample(0x04), 0);
        assert_eq!(debouncer.sample(0x04), 0x04);

        // A glitch shorter than the streak is ignored.
        assert_eq!(debouncer.sample(0), 0x04);
        assert_eq!(debouncer.sample(0x04), 0x04);
        assert_eq!(debouncer.sample(0), 0x04);
        assert_eq!(debouncer.sample(0), 0x04);
        assert_eq!(debouncer.sample(0), 0);
    }
}
