//! Bring-up: creates the signals, registers every task and wraps the kernel in
//! a runtime.

use cruise_kernel::sync::Arc;
use cruise_kernel::{
    ClockRef, Kernel, Runtime, SystemClock, TaskHandle, TaskStats, TickReport, TraceHook,
};
use log::info;

use crate::config::{
    CruiseConfig, BUTTON_TASK, CONTROL_TASK, DETECTION_TASK, DISPLAY_TASK, EXTRA_LOAD_TASK,
    SWITCH_TASK, VEHICLE_TASK, WATCHDOG_TASK,
};
use crate::control::ControlTask;
use crate::display::{DisplayTask, LogOutput, OutputPort};
use crate::error::CruiseError;
use crate::io::{ButtonTask, InputPort, SharedInputs, SwitchTask};
use crate::load::ExtraLoadTask;
use crate::signals::{signal_board, CruiseState, SignalBoard, VehicleStatus};
use crate::vehicle::VehicleTask;
use crate::watchdog::{DetectionTask, HealthMonitor, Heartbeat, WatchdogTask};

/// Kernel handles of every task.
#[derive(Debug, Clone, Copy)]
pub struct TaskHandles {
    pub watchdog: TaskHandle,
    pub vehicle: TaskHandle,
    pub control: TaskHandle,
    pub buttons: TaskHandle,
    pub switches: TaskHandle,
    pub display: TaskHandle,
    pub extra_load: TaskHandle,
    pub detection: TaskHandle,
}

pub struct CruiseSystemBuilder {
    config: CruiseConfig,
    clock: Option<ClockRef>,
    inputs: Option<Arc<dyn InputPort>>,
    output: Option<Box<dyn OutputPort>>,
    trace: Option<TraceHook>,
}

impl CruiseSystemBuilder {
    pub fn new(config: CruiseConfig) -> Self {
        Self {
            config,
            clock: None,
            inputs: None,
            output: None,
            trace: None,
        }
    }

    pub fn clock(mut self, clock: ClockRef) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn inputs(mut self, inputs: Arc<dyn InputPort>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn output(mut self, output: Box<dyn OutputPort>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn trace_hook(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    /// Validates the configuration, creates every signal and task, and starts
    /// the kernel. Any failure here is fatal to bring-up.
    pub fn build(self) -> Result<CruiseSystem, CruiseError> {
        let config = self.config;
        config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as ClockRef);
        let inputs = self
            .inputs
            .unwrap_or_else(|| Arc::new(SharedInputs::new()) as Arc<dyn InputPort>);
        let output = self
            .output
            .unwrap_or_else(|| Box::new(LogOutput) as Box<dyn OutputPort>);

        let (board, writers) = signal_board();
        let heartbeat = Heartbeat::new(config.heartbeat_initially_ok);
        let monitor = HealthMonitor::new();
        let tasks = &config.tasks;

        let mut builder = Kernel::with_config(config.kernel_config()).with_clock(clock);
        if let Some(hook) = self.trace {
            builder = builder.with_trace_hook(hook);
        }

        let handles = TaskHandles {
            watchdog: builder.register(
                tasks.watchdog.spec(WATCHDOG_TASK),
                WatchdogTask::new(heartbeat.clone(), monitor.clone()),
            )?,
            vehicle: builder.register(
                tasks.vehicle.spec(VEHICLE_TASK),
                VehicleTask::new(config.vehicle, &board, writers.vehicle),
            )?,
            control: builder.register(
                tasks.control.spec(CONTROL_TASK),
                ControlTask::new(config.controller, &board, writers.control),
            )?,
            buttons: builder.register(
                tasks.buttons.spec(BUTTON_TASK),
                ButtonTask::new(Arc::clone(&inputs), config.debounce_samples, writers.buttons),
            )?,
            switches: builder.register(
                tasks.switches.spec(SWITCH_TASK),
                SwitchTask::new(
                    Arc::clone(&inputs),
                    config.debounce_samples,
                    config.max_load_level,
                    writers.switches,
                ),
            )?,
            display: builder.register(
                tasks.display.spec(DISPLAY_TASK),
                DisplayTask::new(&board, output),
            )?,
            extra_load: builder.register(
                tasks.extra_load.spec(EXTRA_LOAD_TASK),
                ExtraLoadTask::new(&board, config.load_unit_percent),
            )?,
            detection: builder.register(
                tasks.detection.spec(DETECTION_TASK),
                DetectionTask::new(heartbeat),
            )?,
        };

        let runtime = Runtime::with_builder(builder);
        info!(
            "cruise control up: {} tasks, tick {} ms",
            runtime.kernel().tasks().len(),
            config.tick.as_millis()
        );

        Ok(CruiseSystem {
            config,
            runtime,
            board,
            monitor,
            handles,
        })
    }
}

/// The running cruise-control system.
pub struct CruiseSystem {
    config: CruiseConfig,
    runtime: Runtime,
    board: SignalBoard,
    monitor: HealthMonitor,
    handles: TaskHandles,
}

impl CruiseSystem {
    pub fn builder(config: CruiseConfig) -> CruiseSystemBuilder {
        CruiseSystemBuilder::new(config)
    }

    /// Processes one tick.
    pub fn step(&mut self) -> Result<TickReport, CruiseError> {
        Ok(self.runtime.step()?)
    }

    pub fn run_ticks(&mut self, count: u64) -> Result<(), CruiseError> {
        Ok(self.runtime.run_ticks(count)?)
    }

    pub fn ticks(&self) -> u64 {
        self.runtime.ticks()
    }

    pub fn config(&self) -> &CruiseConfig {
        &self.config
    }

    pub fn board(&self) -> &SignalBoard {
        &self.board
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn handles(&self) -> &TaskHandles {
        &self.handles
    }

    pub fn kernel(&self) -> Arc<Kernel> {
        self.runtime.kernel()
    }

    pub fn stats(&self, task: TaskHandle) -> Result<TaskStats, CruiseError> {
        Ok(self.runtime.kernel().stats(task.id)?)
    }

    /// Last published vehicle status.
    pub fn vehicle(&self) -> VehicleStatus {
        self.board.vehicle.peek().unwrap_or_default()
    }

    /// Last published cruise state.
    pub fn cruise(&self) -> CruiseState {
        self.board.cruise.peek().unwrap_or_default()
    }
}
