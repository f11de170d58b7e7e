//! Cruise-control state machine and the control task.

use cruise_kernel::{PeriodicJob, Sampled, TaskContext};
use log::{debug, info};

use crate::config::ControllerParams;
use crate::signals::{ControlWriters, CruiseState, OnOff, SignalBoard};

/// Sampled inputs for one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInputs {
    pub velocity: i32,
    pub gas: OnOff,
    pub brake: OnOff,
    pub cruise: OnOff,
    pub top_gear: OnOff,
    pub engine_switch: OnOff,
}

/// Commands produced by one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutput {
    pub throttle: u8,
    pub engine: OnOff,
    pub brake: OnOff,
    pub cruise: CruiseState,
}

/// Throttle for holding `target` at `velocity`, using two hysteresis bands
/// on either side of the target.
pub fn band_throttle(velocity: i32, target: i32, params: &ControllerParams) -> u8 {
    let [far_above, near_above, on_target, near_below, far_below] = params.band_throttle;
    let near = params.near_band;
    let far = params.far_band;
    if velocity >= target + far {
        far_above
    } else if velocity >= target + near {
        near_above
    } else if velocity > target - near {
        on_target
    } else if velocity > target - far {
        near_below
    } else {
        far_below
    }
}

/// Two-state cruise controller. Owns the cruise state and the logical engine
/// state; nothing else mutates either.
#[derive(Debug, Clone)]
pub struct CruiseController {
    params: ControllerParams,
    state: CruiseState,
    engine: OnOff,
}

impl CruiseController {
    pub fn new(params: ControllerParams) -> Self {
        Self {
            params,
            state: CruiseState::Inactive,
            engine: OnOff::Off,
        }
    }

    pub fn state(&self) -> CruiseState {
        self.state
    }

    pub fn engine(&self) -> OnOff {
        self.engine
    }

    pub fn step(&mut self, inputs: ControlInputs) -> ControlOutput {
        self.update_engine(&inputs);

        let releasing = inputs.top_gear.is_off() || inputs.gas.is_on() || inputs.brake.is_on();
        match self.state {
            CruiseState::Inactive if self.may_engage(&inputs) => {
                let target = inputs.velocity.max(self.params.min_target);
                info!("cruise control engaged at {target} m/s");
                self.state = CruiseState::Active { target };
            }
            CruiseState::Active { .. } if releasing => {
                info!("cruise control released");
                self.state = CruiseState::Inactive;
            }
            _ => {}
        }

        let throttle = match self.state {
            CruiseState::Active { target } => band_throttle(inputs.velocity, target, &self.params),
            CruiseState::Inactive if self.engine.is_on() && inputs.gas.is_on() => {
                self.params.gas_throttle
            }
            CruiseState::Inactive => 0,
        };

        ControlOutput {
            throttle,
            engine: self.engine,
            brake: inputs.brake,
            cruise: self.state,
        }
    }

    fn may_engage(&self, inputs: &ControlInputs) -> bool {
        inputs.cruise.is_on()
            && inputs.top_gear.is_on()
            && inputs.gas.is_off()
            && inputs.brake.is_off()
            && inputs.velocity >= self.params.activation_velocity
    }

    /// The engine follows its switch, except that turning the switch off only
    /// stops a running engine once the vehicle stands still.
    fn update_engine(&mut self, inputs: &ControlInputs) {
        let next = match (inputs.engine_switch, inputs.velocity) {
            (OnOff::On, _) => OnOff::On,
            (OnOff::Off, 0) => OnOff::Off,
            (OnOff::Off, _) => self.engine,
        };
        if next != self.engine {
            debug!("engine {:?} -> {:?}", self.engine, next);
        }
        self.engine = next;
    }
}

/// Periodic task running [`CruiseController`] on sampled signals.
pub struct ControlTask {
    controller: CruiseController,
    writers: ControlWriters,
    velocity: Sampled<i32>,
    gas: Sampled<OnOff>,
    brake: Sampled<OnOff>,
    cruise: Sampled<OnOff>,
    top_gear: Sampled<OnOff>,
    engine_switch: Sampled<OnOff>,
}

impl ControlTask {
    pub fn new(params: ControllerParams, board: &SignalBoard, writers: ControlWriters) -> Self {
        Self {
            controller: CruiseController::new(params),
            writers,
            velocity: board.velocity.sampled(0),
            gas: board.gas_pedal.sampled(OnOff::Off),
            brake: board.brake_pedal.sampled(OnOff::Off),
            cruise: board.cruise_button.sampled(OnOff::Off),
            top_gear: board.top_gear.sampled(OnOff::Off),
            engine_switch: board.engine_switch.sampled(OnOff::Off),
        }
    }

    fn sample_inputs(&mut self) -> ControlInputs {
        ControlInputs {
            velocity: self.velocity.sample(),
            gas: self.gas.sample(),
            brake: self.brake.sample(),
            cruise: self.cruise.sample(),
            top_gear: self.top_gear.sample(),
            engine_switch: self.engine_switch.sample(),
        }
    }
}

impl PeriodicJob for ControlTask {
    fn on_start(&mut self, _ctx: &mut TaskContext) {
        self.writers.cruise.publish(CruiseState::Inactive);
    }

    fn on_release(&mut self, _ctx: &mut TaskContext) {
        let inputs = self.sample_inputs();
        let output = self.controller.step(inputs);
        self.writers.throttle.publish(output.throttle);
        self.writers.engine.publish(output.engine);
        self.writers.brake.publish(output.brake);
        self.writers.cruise.publish(output.cruise);
    }
}
