//! System configuration.
//!
//! Defaults reproduce the lab set-up: a 100 ms tick and every task released
//! each 300 ms.

use core::time::Duration;

use cruise_kernel::{KernelConfig, TaskSpec};

use crate::error::CruiseError;

pub const VEHICLE_TASK: &str = "vehicle";
pub const CONTROL_TASK: &str = "control";
pub const BUTTON_TASK: &str = "buttons";
pub const SWITCH_TASK: &str = "switches";
pub const DISPLAY_TASK: &str = "display";
pub const EXTRA_LOAD_TASK: &str = "extra-load";
pub const WATCHDOG_TASK: &str = "watchdog";
pub const DETECTION_TASK: &str = "detection";

const DEFAULT_PERIOD: Duration = Duration::from_millis(300);

/// Release period and priority of one task. Higher priority wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskTiming {
    pub period: Duration,
    pub priority: u8,
}

impl TaskTiming {
    pub const fn new(period: Duration, priority: u8) -> Self {
        Self { period, priority }
    }

    pub fn spec(&self, name: &'static str) -> TaskSpec {
        TaskSpec::new(name, self.period, self.priority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskTable {
    pub watchdog: TaskTiming,
    pub vehicle: TaskTiming,
    pub control: TaskTiming,
    pub buttons: TaskTiming,
    pub switches: TaskTiming,
    pub display: TaskTiming,
    pub extra_load: TaskTiming,
    pub detection: TaskTiming,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self {
            watchdog: TaskTiming::new(DEFAULT_PERIOD, 10),
            vehicle: TaskTiming::new(DEFAULT_PERIOD, 9),
            control: TaskTiming::new(DEFAULT_PERIOD, 8),
            buttons: TaskTiming::new(DEFAULT_PERIOD, 7),
            switches: TaskTiming::new(DEFAULT_PERIOD, 6),
            display: TaskTiming::new(DEFAULT_PERIOD, 5),
            extra_load: TaskTiming::new(DEFAULT_PERIOD, 4),
            detection: TaskTiming::new(DEFAULT_PERIOD, 1),
        }
    }
}

impl TaskTable {
    /// Every task with its name, highest default priority first.
    pub fn entries(&self) -> [(&'static str, TaskTiming); 8] {
        [
            (WATCHDOG_TASK, self.watchdog),
            (VEHICLE_TASK, self.vehicle),
            (CONTROL_TASK, self.control),
            (BUTTON_TASK, self.buttons),
            (SWITCH_TASK, self.switches),
            (DISPLAY_TASK, self.display),
            (EXTRA_LOAD_TASK, self.extra_load),
            (DETECTION_TASK, self.detection),
        ]
    }

    /// Checks the ordering the control loop depends on: vehicle and control
    /// above input polling, input polling and extra load above detection, and
    /// detection below every other task.
    pub fn check_priorities(&self) -> Result<(), CruiseError> {
        let ordered = [
            ((VEHICLE_TASK, self.vehicle), (BUTTON_TASK, self.buttons)),
            ((VEHICLE_TASK, self.vehicle), (SWITCH_TASK, self.switches)),
            ((CONTROL_TASK, self.control), (BUTTON_TASK, self.buttons)),
            ((CONTROL_TASK, self.control), (SWITCH_TASK, self.switches)),
        ];
        for ((higher, hi), (lower, lo)) in ordered {
            outranks(higher, hi, lower, lo)?;
        }
        for (name, timing) in self.entries() {
            if name != DETECTION_TASK {
                outranks(name, timing, DETECTION_TASK, self.detection)?;
            }
        }
        Ok(())
    }
}

fn outranks(
    higher: &'static str,
    hi: TaskTiming,
    lower: &'static str,
    lo: TaskTiming,
) -> Result<(), CruiseError> {
    if hi.priority > lo.priority {
        Ok(())
    } else {
        Err(CruiseError::PriorityInversion {
            higher,
            higher_priority: hi.priority,
            lower,
            lower_priority: lo.priority,
        })
    }
}

/// Vehicle model constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleParams {
    pub wind_factor: i32,
    pub brake_factor: i32,
    pub gravity_factor: i32,
    pub max_throttle: u8,
    /// Track length in meters; position wraps to 0 beyond it.
    pub track_length: i32,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            wind_factor: 1,
            brake_factor: 4,
            gravity_factor: 2,
            max_throttle: 80,
            track_length: 2400,
        }
    }
}

/// Cruise controller constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerParams {
    /// Minimum velocity at which cruise control may engage.
    pub activation_velocity: i32,
    /// Lower bound applied to the captured target.
    pub min_target: i32,
    /// Throttle applied while the gas pedal is held and cruise is inactive.
    pub gas_throttle: u8,
    /// Inner hysteresis band around the target.
    pub near_band: i32,
    /// Outer hysteresis band around the target.
    pub far_band: i32,
    /// Throttle per band: far above, near above, on target, near below, far below.
    pub band_throttle: [u8; 5],
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            activation_velocity: 25,
            min_target: 25,
            gas_throttle: 80,
            near_band: 2,
            far_band: 4,
            band_throttle: [5, 15, 40, 50, 60],
        }
    }
}

/// Complete configuration of the cruise-control system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CruiseConfig {
    pub tick: Duration,
    pub tasks: TaskTable,
    pub vehicle: VehicleParams,
    pub controller: ControllerParams,
    /// Consecutive identical samples before an input change is accepted.
    pub debounce_samples: u32,
    /// Extra-load time unit as a percentage of the extra-load period.
    pub load_unit_percent: u32,
    pub max_load_level: u8,
    /// Releases a task may have outstanding before further ones are missed.
    pub max_pending_releases: usize,
    /// Initial heartbeat value; `true` keeps the first watchdog check quiet.
    pub heartbeat_initially_ok: bool,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            tasks: TaskTable::default(),
            vehicle: VehicleParams::default(),
            controller: ControllerParams::default(),
            debounce_samples: 1,
            load_unit_percent: 2,
            max_load_level: 50,
            max_pending_releases: 1,
            heartbeat_initially_ok: true,
        }
    }
}

impl CruiseConfig {
    pub fn builder() -> CruiseConfigBuilder {
        CruiseConfigBuilder::default()
    }

    /// Validates task periods against the tick and the priority ordering.
    pub fn validate(&self) -> Result<(), CruiseError> {
        let kernel = self.kernel_config();
        for (task, timing) in self.tasks.entries() {
            if kernel.ticks_for(timing.period).is_none() {
                return Err(CruiseError::InvalidPeriod {
                    task,
                    period_ms: timing.period.as_millis(),
                    tick_ms: self.tick.as_millis(),
                });
            }
        }
        self.tasks.check_priorities()
    }

    /// Accepts an extra-load level no higher than `max_load_level`.
    pub fn check_load_level(&self, level: u32) -> Result<u8, CruiseError> {
        u8::try_from(level)
            .ok()
            .filter(|level| *level <= self.max_load_level)
            .ok_or(CruiseError::LoadLevel {
                level,
                max: self.max_load_level,
            })
    }

    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig::builder()
            .name("cruise")
            .tick(self.tick)
            .max_tasks(self.tasks.entries().len() as u8)
            .max_pending_releases(self.max_pending_releases)
            .build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CruiseConfigBuilder {
    config: CruiseConfig,
}

impl CruiseConfigBuilder {
    pub fn tick(mut self, tick: Duration) -> Self {
        self.config.tick = tick;
        self
    }

    pub fn tasks(mut self, tasks: TaskTable) -> Self {
        self.config.tasks = tasks;
        self
    }

    /// Sets the same period on every task.
    pub fn period(mut self, period: Duration) -> Self {
        let tasks = &mut self.config.tasks;
        for timing in [
            &mut tasks.watchdog,
            &mut tasks.vehicle,
            &mut tasks.control,
            &mut tasks.buttons,
            &mut tasks.switches,
            &mut tasks.display,
            &mut tasks.extra_load,
            &mut tasks.detection,
        ] {
            timing.period = period;
        }
        self
    }

    pub fn vehicle(mut self, params: VehicleParams) -> Self {
        self.config.vehicle = params;
        self
    }

    pub fn controller(mut self, params: ControllerParams) -> Self {
        self.config.controller = params;
        self
    }

    pub fn debounce_samples(mut self, samples: u32) -> Self {
        self.config.debounce_samples = samples.max(1);
        self
    }

    pub fn load_unit_percent(mut self, percent: u32) -> Self {
        self.config.load_unit_percent = percent;
        self
    }

    pub fn max_load_level(mut self, level: u8) -> Self {
        self.config.max_load_level = level;
        self
    }

    pub fn max_pending_releases(mut self, max: usize) -> Self {
        self.config.max_pending_releases = max.max(1);
        self
    }

    pub fn heartbeat_initially_ok(mut self, ok: bool) -> Self {
        self.config.heartbeat_initially_ok = ok;
        self
    }

    pub fn build(self) -> CruiseConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CruiseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel_config().ticks_for(config.tasks.vehicle.period), Some(3));
    }

    #[test]
    fn load_level_above_maximum_is_rejected() {
        let config = CruiseConfig::default();
        assert_eq!(config.check_load_level(0), Ok(0));
        assert_eq!(config.check_load_level(50), Ok(50));
        assert_eq!(
            config.check_load_level(64),
            Err(CruiseError::LoadLevel { level: 64, max: 50 })
        );
        assert_eq!(
            config.check_load_level(300),
            Err(CruiseError::LoadLevel { level: 300, max: 50 })
        );
    }

    #[test]
    fn detection_must_be_lowest() {
        let mut tasks = TaskTable::default();
        tasks.detection.priority = 12;
        let err = CruiseConfig::builder().tasks(tasks).build().validate().unwrap_err();
        assert!(matches!(
            err,
            CruiseError::PriorityInversion {
                lower: DETECTION_TASK,
                ..
            }
        ));
    }

    #[test]
    fn inputs_must_not_outrank_control() {
        let mut tasks = TaskTable::default();
        tasks.buttons.priority = 20;
        let err = CruiseConfig::builder().tasks(tasks).build().validate().unwrap_err();
        assert_eq!(
            err,
            CruiseError::PriorityInversion {
                higher: VEHICLE_TASK,
                higher_priority: 9,
                lower: BUTTON_TASK,
                lower_priority: 20,
            }
        );
    }

    #[test]
    fn period_must_be_tick_multiple() {
        let config = CruiseConfig::builder()
            .period(Duration::from_millis(250))
            .build();
        assert!(matches!(
            config.validate(),
            Err(CruiseError::InvalidPeriod { period_ms: 250, .. })
        ));
    }
}
