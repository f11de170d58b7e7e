//! Indicator LEDs and seven-segment encoding.
//!
//! The display task composes one [`Frame`] per period from the signals other
//! tasks publish and hands it to an [`OutputPort`]. No task writes LEDs
//! directly.

use cruise_kernel::sync::{Arc, Mutex};
use cruise_kernel::{PeriodicJob, Sampled, TaskContext};
use log::trace;

use crate::signals::{CruiseState, LoadSetting, OnOff, SignalBoard, VehicleStatus};

/// Digit to segment pattern, active low; index 10 is the minus sign.
pub const SEVEN_SEGMENT: [u8; 11] = [
    0x40, 0x79, 0x24, 0x30, 0x19, 0x12, 0x02, 0x78, 0x00, 0x18, 0x3F,
];
pub const MINUS: usize = 10;

/// Red LED bits.
pub mod red {
    pub const ENGINE: u32 = 1 << 0;
    pub const TOP_GEAR: u32 = 1 << 1;
    /// Mirrors the extra-load switches.
    pub const LOAD_MASK: u32 = 0x3F0;
    /// Position bands, LED 17 for [0, 400) down to LED 12 for [2000, 2400].
    pub const POSITION: [u32; 6] = [1 << 17, 1 << 16, 1 << 15, 1 << 14, 1 << 13, 1 << 12];
    pub const POSITION_MASK: u32 = 0x3F000;
}

/// Green LED bits.
pub mod green {
    pub const CRUISE_ACTIVE: u16 = 1 << 0;
    pub const CRUISE_BUTTON: u16 = 1 << 2;
    pub const BRAKE_PEDAL: u16 = 1 << 4;
    pub const GAS_PEDAL: u16 = 1 << 6;
}

pub fn seven_segment(digit: usize) -> u8 {
    SEVEN_SEGMENT[digit.min(MINUS)]
}

/// Two least significant decimal digits of `value`.
fn digits(value: u32) -> (usize, usize) {
    let value = (value % 100) as usize;
    (value / 10, value % 10)
}

/// Velocity word: a leading zero glyph, the sign, then tens and ones, seven
/// bits each.
pub fn velocity_word(velocity: i32) -> u32 {
    let sign = if velocity < 0 {
        seven_segment(MINUS)
    } else {
        seven_segment(0)
    };
    let (tens, ones) = digits(velocity.unsigned_abs());
    u32::from(seven_segment(0)) << 21
        | u32::from(sign) << 14
        | u32::from(seven_segment(tens)) << 7
        | u32::from(seven_segment(ones))
}

/// Target word: tens and ones. Shows 0 when no target is set.
pub fn target_word(target: Option<i32>) -> u32 {
    let (tens, ones) = digits(target.unwrap_or(0).unsigned_abs());
    u32::from(seven_segment(tens)) << 7 | u32::from(seven_segment(ones))
}

/// Red LED for the track band containing `position`; none past the track.
pub fn position_led(position: i32) -> u32 {
    match position {
        p if p < 0 => 0,
        p if p <= 2400 => red::POSITION[(p / 400).min(5) as usize],
        _ => 0,
    }
}

/// Everything shown on the panel for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub red: u32,
    pub green: u16,
    pub velocity: u32,
    pub target: u32,
}

/// Panel state decoded from the signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelInputs {
    pub vehicle: VehicleStatus,
    pub engine: OnOff,
    pub top_gear: OnOff,
    pub load: LoadSetting,
    pub cruise: CruiseState,
    pub gas: OnOff,
    pub brake: OnOff,
    pub cruise_button: OnOff,
}

pub fn compose(inputs: &PanelInputs) -> Frame {
    let mut red_bits = inputs.load.switches & red::LOAD_MASK;
    if inputs.engine.is_on() {
        red_bits |= red::ENGINE;
    }
    if inputs.top_gear.is_on() {
        red_bits |= red::TOP_GEAR;
    }
    red_bits |= position_led(inputs.vehicle.position);

    let mut green_bits = 0;
    if inputs.cruise.is_active() {
        green_bits |= green::CRUISE_ACTIVE;
    }
    if inputs.cruise_button.is_on() {
        green_bits |= green::CRUISE_BUTTON;
    }
    if inputs.brake.is_on() {
        green_bits |= green::BRAKE_PEDAL;
    }
    if inputs.gas.is_on() {
        green_bits |= green::GAS_PEDAL;
    }

    Frame {
        red: red_bits,
        green: green_bits,
        velocity: velocity_word(inputs.vehicle.velocity),
        target: target_word(inputs.cruise.target()),
    }
}

/// Sink for composed frames.
pub trait OutputPort: Send {
    fn write(&mut self, frame: &Frame);
}

/// Discards frames after logging them at trace level.
#[derive(Debug, Default)]
pub struct LogOutput;

impl OutputPort for LogOutput {
    fn write(&mut self, frame: &Frame) {
        trace!(
            "panel: red {:#07x} green {:#05x} hex-low {:#09x} hex-high {:#06x}",
            frame.red,
            frame.green,
            frame.velocity,
            frame.target
        );
    }
}

/// Keeps every frame written; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.lock().last().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl OutputPort for RecordingOutput {
    fn write(&mut self, frame: &Frame) {
        self.frames.lock().push(*frame);
    }
}

pub struct DisplayTask {
    output: Box<dyn OutputPort>,
    vehicle: Sampled<VehicleStatus>,
    engine: Sampled<OnOff>,
    top_gear: Sampled<OnOff>,
    load: Sampled<LoadSetting>,
    cruise: Sampled<CruiseState>,
    gas: Sampled<OnOff>,
    brake: Sampled<OnOff>,
    cruise_button: Sampled<OnOff>,
}

impl DisplayTask {
    pub fn new(board: &SignalBoard, output: Box<dyn OutputPort>) -> Self {
        Self {
            output,
            vehicle: board.vehicle.sampled(VehicleStatus::default()),
            engine: board.engine.sampled(OnOff::Off),
            top_gear: board.top_gear.sampled(OnOff::Off),
            load: board.extra_load.sampled(LoadSetting::default()),
            cruise: board.cruise.sampled(CruiseState::Inactive),
            gas: board.gas_pedal.sampled(OnOff::Off),
            brake: board.brake_pedal.sampled(OnOff::Off),
            cruise_button: board.cruise_button.sampled(OnOff::Off),
        }
    }
}

impl PeriodicJob for DisplayTask {
    fn on_release(&mut self, _ctx: &mut TaskContext) {
        let inputs = PanelInputs {
            vehicle: self.vehicle.sample(),
            engine: self.engine.sample(),
            top_gear: self.top_gear.sample(),
            load: self.load.sample(),
            cruise: self.cruise.sample(),
            gas: self.gas.sample(),
            brake: self.brake.sample(),
            cruise_button: self.cruise_button.sample(),
        };
        let frame = compose(&inputs);
        self.output.write(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_word_layout() {
        let zero = u32::from(SEVEN_SEGMENT[0]);
        let four = u32::from(SEVEN_SEGMENT[4]);
        let two = u32::from(SEVEN_SEGMENT[2]);
        let seven = u32::from(SEVEN_SEGMENT[7]);
        let minus = u32::from(SEVEN_SEGMENT[MINUS]);
        assert_eq!(
            velocity_word(42),
            zero << 21 | zero << 14 | four << 7 | two
        );
        assert_eq!(
            velocity_word(-7),
            zero << 21 | minus << 14 | zero << 7 | seven
        );
    }

    #[test]
    fn target_shows_zero_when_inactive() {
        let zero = u32::from(SEVEN_SEGMENT[0]);
        assert_eq!(target_word(None), zero << 7 | zero);
        assert_eq!(target_word(Some(30)), u32::from(SEVEN_SEGMENT[3]) << 7 | zero);
    }

    #[test]
    fn position_bands_light_one_led() {
        assert_eq!(position_led(0), 1 << 17);
        assert_eq!(position_led(399), 1 << 17);
        assert_eq!(position_led(400), 1 << 16);
        assert_eq!(position_led(1999), 1 << 13);
        assert_eq!(position_led(2000), 1 << 12);
        assert_eq!(position_led(2400), 1 << 12);
        assert_eq!(position_led(2401), 0);
    }

    #[test]
    fn frame_combines_every_writer() {
        let frame = compose(&PanelInputs {
            vehicle: VehicleStatus {
                position: 500,
                velocity: 31,
                ..VehicleStatus::default()
            },
            engine: OnOff::On,
            top_gear: OnOff::On,
            load: LoadSetting {
                level: 3,
                switches: 0x30,
            },
            cruise: CruiseState::Active { target: 30 },
            gas: OnOff::Off,
            brake: OnOff::On,
            cruise_button: OnOff::On,
        });
        assert_eq!(frame.red, red::ENGINE | red::TOP_GEAR | 0x30 | 1 << 16);
        assert_eq!(
            frame.green,
            green::CRUISE_ACTIVE | green::CRUISE_BUTTON | green::BRAKE_PEDAL
        );
        assert_eq!(frame.target, target_word(Some(30)));
    }

    #[test]
    fn recording_output_shares_frames() {
        let recorder = RecordingOutput::new();
        let mut port: Box<dyn OutputPort> = Box::new(recorder.clone());
        port.write(&Frame::default());
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.last(), Some(Frame::default()));
    }
}
