//! # cruise-control
//!
//! Simulated cruise-control controller running as eight periodic tasks on
//! `cruise-kernel`. Tasks only communicate through the mailboxes of a
//! [`SignalBoard`]; a vehicle model stands in for the car and a settable input
//! port for the buttons and switches.
//!
//! ## Module Overview
//! - [`config`]   – Task table, model constants and validation.
//! - [`signals`]  – Signal types and the mailbox board.
//! - [`vehicle`]  – Vehicle dynamics and the vehicle task.
//! - [`control`]  – Cruise controller state machine and the control task.
//! - [`io`]       – Button and switch decoding and polling tasks.
//! - [`display`]  – LED and seven-segment frames.
//! - [`load`]     – Extra-load task.
//! - [`watchdog`] – Heartbeat overload detection.
//! - [`scenario`] – Scripted driver inputs.
//! - [`system`]   – Bring-up and the tick loop.

pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod io;
pub mod load;
pub mod scenario;
pub mod signals;
pub mod system;
pub mod vehicle;
pub mod watchdog;

pub use config::{
    ControllerParams, CruiseConfig, CruiseConfigBuilder, TaskTable, TaskTiming, VehicleParams,
};
pub use control::{ControlInputs, ControlOutput, CruiseController};
pub use display::{Frame, LogOutput, OutputPort, RecordingOutput};
pub use error::CruiseError;
pub use io::{InputPort, SharedInputs};
pub use scenario::{InputEvent, Scenario};
pub use signals::{signal_board, CruiseState, LoadSetting, OnOff, SignalBoard, VehicleStatus};
pub use system::{CruiseSystem, CruiseSystemBuilder, TaskHandles};
pub use vehicle::VehicleModel;
pub use watchdog::{HealthMonitor, HealthReport, Heartbeat};
