//! Signals exchanged between the cruise-control tasks.
//!
//! [`signal_board`] creates every mailbox once at start-up. The read side,
//! [`SignalBoard`], is shared by all tasks; each group of write handles goes
//! to exactly one task.

use cruise_kernel::{mailbox, Mailbox, Publisher};

/// Two-valued on/off state used for pedals, buttons, switches and the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OnOff {
    #[default]
    Off,
    On,
}

impl OnOff {
    pub fn is_on(self) -> bool {
        self == Self::On
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }
}

impl From<bool> for OnOff {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Cruise controller activation state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CruiseState {
    #[default]
    Inactive,
    Active { target: i32 },
}

impl CruiseState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn target(self) -> Option<i32> {
        match self {
            Self::Active { target } => Some(target),
            Self::Inactive => None,
        }
    }
}

/// Snapshot of the vehicle after one integration step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleStatus {
    pub position: i32,
    pub velocity: i32,
    pub acceleration: i32,
    pub throttle: u8,
}

/// Extra-load switch setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadSetting {
    /// Requested load level, already clamped.
    pub level: u8,
    /// Raw load switch bits, in place (bits 4..9).
    pub switches: u32,
}

/// Read side of every inter-task signal.
#[derive(Clone)]
pub struct SignalBoard {
    /// Written by the vehicle task.
    pub velocity: Mailbox<i32>,
    /// Written by the vehicle task.
    pub vehicle: Mailbox<VehicleStatus>,
    /// Written by the control task.
    pub throttle: Mailbox<u8>,
    /// Written by the control task; engine state after the coasting rule.
    pub engine: Mailbox<OnOff>,
    /// Written by the control task; brake pedal forwarded to the vehicle.
    pub brake: Mailbox<OnOff>,
    /// Written by the control task.
    pub cruise: Mailbox<CruiseState>,
    /// Written by the button task.
    pub gas_pedal: Mailbox<OnOff>,
    /// Written by the button task.
    pub brake_pedal: Mailbox<OnOff>,
    /// Written by the button task.
    pub cruise_button: Mailbox<OnOff>,
    /// Written by the switch task.
    pub engine_switch: Mailbox<OnOff>,
    /// Written by the switch task.
    pub top_gear: Mailbox<OnOff>,
    /// Written by the switch task.
    pub extra_load: Mailbox<LoadSetting>,
}

pub struct VehicleWriters {
    pub velocity: Publisher<i32>,
    pub status: Publisher<VehicleStatus>,
}

pub struct ControlWriters {
    pub throttle: Publisher<u8>,
    pub engine: Publisher<OnOff>,
    pub brake: Publisher<OnOff>,
    pub cruise: Publisher<CruiseState>,
}

pub struct ButtonWriters {
    pub gas_pedal: Publisher<OnOff>,
    pub brake_pedal: Publisher<OnOff>,
    pub cruise_button: Publisher<OnOff>,
}

pub struct SwitchWriters {
    pub engine_switch: Publisher<OnOff>,
    pub top_gear: Publisher<OnOff>,
    pub extra_load: Publisher<LoadSetting>,
}

/// Write handles, one group per producing task.
pub struct SignalWriters {
    pub vehicle: VehicleWriters,
    pub control: ControlWriters,
    pub buttons: ButtonWriters,
    pub switches: SwitchWriters,
}

/// Creates all mailboxes, empty.
pub fn signal_board() -> (SignalBoard, SignalWriters) {
    let (velocity_tx, velocity) = mailbox("velocity");
    let (status_tx, vehicle) = mailbox("vehicle");
    let (throttle_tx, throttle) = mailbox("throttle");
    let (engine_tx, engine) = mailbox("engine");
    let (brake_tx, brake) = mailbox("brake");
    let (cruise_tx, cruise) = mailbox("cruise");
    let (gas_tx, gas_pedal) = mailbox("gas-pedal");
    let (brake_pedal_tx, brake_pedal) = mailbox("brake-pedal");
    let (cruise_button_tx, cruise_button) = mailbox("cruise-button");
    let (engine_switch_tx, engine_switch) = mailbox("engine-switch");
    let (gear_tx, top_gear) = mailbox("top-gear");
    let (load_tx, extra_load) = mailbox("extra-load");

    let board = SignalBoard {
        velocity,
        vehicle,
        throttle,
        engine,
        brake,
        cruise,
        gas_pedal,
        brake_pedal,
        cruise_button,
        engine_switch,
        top_gear,
        extra_load,
    };
    let writers = SignalWriters {
        vehicle: VehicleWriters {
            velocity: velocity_tx,
            status: status_tx,
        },
        control: ControlWriters {
            throttle: throttle_tx,
            engine: engine_tx,
            brake: brake_tx,
            cruise: cruise_tx,
        },
        buttons: ButtonWriters {
            gas_pedal: gas_tx,
            brake_pedal: brake_pedal_tx,
            cruise_button: cruise_button_tx,
        },
        switches: SwitchWriters {
            engine_switch: engine_switch_tx,
            top_gear: gear_tx,
            extra_load: load_tx,
        },
    };
    (board, writers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_off_from_bool() {
        assert_eq!(OnOff::from(true), OnOff::On);
        assert_eq!(OnOff::from(false), OnOff::Off);
        assert!(OnOff::On.is_on());
        assert!(OnOff::default().is_off());
    }

    #[test]
    fn board_starts_empty_and_sees_writes() {
        let (board, writers) = signal_board();
        assert_eq!(board.velocity.peek(), None);

        writers.vehicle.velocity.publish(42);
        writers.control.cruise.publish(CruiseState::Active { target: 30 });

        assert_eq!(board.velocity.peek(), Some(42));
        assert_eq!(board.cruise.peek().and_then(CruiseState::target), Some(30));
    }
}
