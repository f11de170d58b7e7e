//! Host simulation of the cruise-control system.
//!
//! Environment:
//! - `CRUISE_TICKS`: ticks to run (default 360, two minutes of simulated time).
//! - `CRUISE_LOAD`: constant extra-load level instead of the scripted ramp.
//! - `CRUISE_REALTIME`: pace ticks on the wall clock; Ctrl-C stops the run.
//! - `RUST_LOG`: log filter, `info` by default.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use cruise_control::{CruiseConfig, CruiseSystem, InputPort, Scenario, SharedInputs};
use cruise_kernel::{ClockRef, SimulatedClock, SystemClock};
use log::{error, info, warn};

const DEFAULT_TICKS: u64 = 360;

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {key}={raw}")),
        Err(_) => Ok(None),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let ticks = env_parse::<u64>("CRUISE_TICKS")?.unwrap_or(DEFAULT_TICKS);
    let config = CruiseConfig::default();
    let load = env_parse::<u32>("CRUISE_LOAD")?
        .map(|level| config.check_load_level(level))
        .transpose()
        .context("invalid CRUISE_LOAD")?;
    let realtime = env::var("CRUISE_REALTIME").is_ok();

    let scenario = match load {
        Some(level) => Scenario::demo().fixed_load(level),
        None => Scenario::demo(),
    };

    let clock: ClockRef = if realtime {
        Arc::new(SystemClock::new())
    } else {
        Arc::new(SimulatedClock::new())
    };

    let stop = Arc::new(AtomicBool::new(false));
    if realtime {
        let flag = Arc::clone(&stop);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
    }

    let inputs = SharedInputs::new();
    let built = CruiseSystem::builder(config)
        .clock(clock)
        .inputs(Arc::new(inputs.clone()) as Arc<dyn InputPort>)
        .build();
    let mut system = match built {
        Ok(system) => system,
        Err(err) => {
            error!("bring-up failed: {err}");
            return Err(err).context("cruise control bring-up failed");
        }
    };

    info!(
        "running {ticks} ticks ({} clock)",
        if realtime { "wall" } else { "simulated" }
    );

    while system.ticks() < ticks && !stop.load(Ordering::SeqCst) {
        scenario.apply(system.ticks(), &inputs);
        let report = system.step()?;
        if report.missed > 0 {
            warn!("tick {}: {} release(s) missed", report.tick, report.missed);
        }
    }

    for (handle, spec) in system.kernel().tasks() {
        let stats = system.stats(handle)?;
        info!(
            "{:>10}: releases {} runs {} missed {}",
            spec.name, stats.releases, stats.runs, stats.missed
        );
    }
    let vehicle = system.vehicle();
    info!(
        "finished after {} ticks: position {} m, velocity {} m/s, {} overload(s) in {} checks",
        system.ticks(),
        vehicle.position,
        vehicle.velocity,
        system.monitor().overloads(),
        system.monitor().checks()
    );
    Ok(())
}
