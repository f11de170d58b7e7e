//! Vehicle dynamics model and the task that advances it once per period.
//!
//! All arithmetic is integer and truncates toward zero. Position is in meters
//! along a closed track, velocity in m/s, acceleration in m/s².

use core::time::Duration;

use cruise_kernel::{PeriodicJob, Sampled, TaskContext};
use log::info;

use crate::config::VehicleParams;
use crate::signals::{OnOff, SignalBoard, VehicleStatus, VehicleWriters};

/// Slope contribution to acceleration at `position`.
///
/// The track is split into six 400 m bands: flat, uphill, steep uphill,
/// flat, steep downhill, downhill.
pub fn gravity(position: i32, params: &VehicleParams) -> i32 {
    let g = params.gravity_factor;
    match position {
        p if p < 400 => 0,
        p if p < 800 => -g,
        p if p < 1200 => -2 * g,
        p if p < 1600 => 0,
        p if p < 2000 => 2 * g,
        _ => g,
    }
}

/// Position and velocity carried between periods. Acceleration is recomputed
/// every step and never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleState {
    pub position: i32,
    pub velocity: i32,
}

/// Actuator inputs for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actuation {
    pub throttle: u8,
    pub brake: OnOff,
    pub engine: OnOff,
}

#[derive(Debug, Clone)]
pub struct VehicleModel {
    params: VehicleParams,
    state: VehicleState,
}

impl VehicleModel {
    pub fn new(params: VehicleParams) -> Self {
        Self::with_state(params, VehicleState::default())
    }

    pub fn with_state(params: VehicleParams, state: VehicleState) -> Self {
        Self { params, state }
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    /// Acceleration for the current state. The brake overrides engine torque.
    pub fn acceleration(&self, actuation: Actuation) -> i32 {
        let v = self.state.velocity;
        if actuation.brake.is_on() {
            return -self.params.brake_factor * v;
        }
        let mut a = -self.params.wind_factor * v;
        if actuation.engine.is_on() {
            a += i32::from(self.clamp_throttle(actuation.throttle));
        }
        a + gravity(self.state.position, &self.params)
    }

    /// Integrates one period and returns the acceleration that was applied.
    /// Position advances with the velocity from before the step.
    pub fn step(&mut self, actuation: Actuation, period: Duration) -> i32 {
        let a = self.acceleration(actuation);
        let period_ms = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
        let VehicleState { position, velocity } = self.state;

        let mut next_position = position + velocity * period_ms / 1000;
        let next_velocity = (velocity * 1000 + a * period_ms) / 1000;
        if next_position > self.params.track_length || next_position < 0 {
            next_position = 0;
        }

        self.state = VehicleState {
            position: next_position,
            velocity: next_velocity,
        };
        a
    }

    pub fn clamp_throttle(&self, throttle: u8) -> u8 {
        throttle.min(self.params.max_throttle)
    }
}

/// Periodic task wrapping [`VehicleModel`].
///
/// Publishes velocity at start-up and after every step, so the controller
/// always acts on the velocity of the previous period.
pub struct VehicleTask {
    model: VehicleModel,
    writers: VehicleWriters,
    throttle: Sampled<u8>,
    brake: Sampled<OnOff>,
    engine: Sampled<OnOff>,
}

impl VehicleTask {
    pub fn new(params: VehicleParams, board: &SignalBoard, writers: VehicleWriters) -> Self {
        Self {
            model: VehicleModel::new(params),
            writers,
            throttle: board.throttle.sampled(0),
            brake: board.brake.sampled(OnOff::Off),
            engine: board.engine.sampled(OnOff::Off),
        }
    }

    fn publish(&self, acceleration: i32, throttle: u8) {
        let state = self.model.state();
        self.writers.velocity.publish(state.velocity);
        self.writers.status.publish(VehicleStatus {
            position: state.position,
            velocity: state.velocity,
            acceleration,
            throttle,
        });
    }
}

impl PeriodicJob for VehicleTask {
    fn on_start(&mut self, _ctx: &mut TaskContext) {
        self.publish(0, 0);
    }

    fn on_release(&mut self, ctx: &mut TaskContext) {
        let actuation = Actuation {
            throttle: self.model.clamp_throttle(self.throttle.sample()),
            brake: self.brake.sample(),
            engine: self.engine.sample(),
        };
        let before = self.model.state();
        let acceleration = self.model.step(actuation, ctx.period());
        info!(
            "position {} m, velocity {} m/s, acceleration {} m/s2, throttle {}",
            before.position, before.velocity, acceleration, actuation.throttle
        );
        self.publish(acceleration, actuation.throttle);
    }
}
