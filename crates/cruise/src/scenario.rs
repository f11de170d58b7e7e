//! Tick-indexed input scripts.

use crate::io::{buttons, switches, SharedInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press(u32),
    Release(u32),
    SwitchOn(u32),
    SwitchOff(u32),
    LoadLevel(u8),
}

impl InputEvent {
    pub fn apply(self, inputs: &SharedInputs) {
        match self {
            Self::Press(mask) => inputs.press(mask),
            Self::Release(mask) => inputs.release(mask),
            Self::SwitchOn(mask) => inputs.switch_on(mask),
            Self::SwitchOff(mask) => inputs.switch_off(mask),
            Self::LoadLevel(level) => inputs.set_load_level(level),
        }
    }
}

/// Input changes keyed by the tick on which they take effect.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    steps: Vec<(u64, InputEvent)>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, tick: u64, event: InputEvent) -> Self {
        let index = self.steps.partition_point(|(t, _)| *t <= tick);
        self.steps.insert(index, (tick, event));
        self
    }

    /// Applies every event scheduled for `tick`, in insertion order. Returns
    /// how many were applied.
    pub fn apply(&self, tick: u64, inputs: &SharedInputs) -> usize {
        let start = self.steps.partition_point(|(t, _)| *t < tick);
        let mut applied = 0;
        for (_, event) in self.steps[start..].iter().take_while(|(t, _)| *t == tick) {
            event.apply(inputs);
            applied += 1;
        }
        applied
    }

    /// Replaces every load change with a constant `level` from tick 0.
    pub fn fixed_load(mut self, level: u8) -> Self {
        self.steps
            .retain(|(_, event)| !matches!(event, InputEvent::LoadLevel(_)));
        self.at(0, InputEvent::LoadLevel(level))
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.steps.last().map(|(tick, _)| *tick)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// A drive around the track: accelerate, engage cruise, brake, engage
    /// again, then ramp the extra load up to overload.
    pub fn demo() -> Self {
        Self::new()
            .at(0, InputEvent::SwitchOn(switches::ENGINE | switches::TOP_GEAR))
            .at(3, InputEvent::Press(buttons::GAS_PEDAL))
            .at(24, InputEvent::Release(buttons::GAS_PEDAL))
            .at(27, InputEvent::Press(buttons::CRUISE_CONTROL))
            .at(33, InputEvent::Release(buttons::CRUISE_CONTROL))
            .at(150, InputEvent::Press(buttons::BRAKE_PEDAL))
            .at(156, InputEvent::Release(buttons::BRAKE_PEDAL))
            .at(159, InputEvent::Press(buttons::GAS_PEDAL))
            .at(171, InputEvent::Release(buttons::GAS_PEDAL))
            .at(174, InputEvent::Press(buttons::CRUISE_CONTROL))
            .at(180, InputEvent::Release(buttons::CRUISE_CONTROL))
            .at(240, InputEvent::LoadLevel(20))
            .at(270, InputEvent::LoadLevel(40))
            .at(300, InputEvent::LoadLevel(50))
            .at(330, InputEvent::LoadLevel(0))
            .at(345, InputEvent::SwitchOff(switches::ENGINE))
    }
}
