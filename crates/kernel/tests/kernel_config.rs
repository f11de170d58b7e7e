//! Tests for KernelConfig builder and functionality.

use std::time::Duration;

use cruise_kernel::kernel::{Kernel, KernelConfig};

#[test]
fn kernel_config_builder() {
    let config = KernelConfig::builder()
        .name("TestKernel")
        .tick(Duration::from_millis(10))
        .max_tasks(32)
        .max_pending_releases(3)
        .build();

    assert_eq!(config.name, "TestKernel");
    assert_eq!(config.tick, Duration::from_millis(10));
    assert_eq!(config.max_tasks, 32);
    assert_eq!(config.max_pending_releases, 3);
}

#[test]
fn kernel_config_default() {
    let config = KernelConfig::default();

    assert_eq!(config.name, "cruise-rt");
    assert_eq!(config.tick, Duration::from_millis(100));
    assert_eq!(config.max_tasks, 16);
    assert_eq!(config.max_pending_releases, 1);
    assert!(config.idle_callback.is_none());
}

#[test]
fn pending_release_bound_is_at_least_one() {
    let config = KernelConfig::builder().max_pending_releases(0).build();
    assert_eq!(config.max_pending_releases, 1);
}

#[test]
fn ticks_for_requires_whole_multiples() {
    let config = KernelConfig::default();
    assert_eq!(config.ticks_for(Duration::from_millis(300)), Some(3));
    assert_eq!(config.ticks_for(Duration::from_millis(100)), Some(1));
    assert_eq!(config.ticks_for(Duration::from_millis(150)), None);
    assert_eq!(config.ticks_for(Duration::ZERO), None);
}

#[test]
fn kernel_with_custom_config() {
    let config = KernelConfig::builder()
        .name("CustomKernel")
        .max_tasks(64)
        .build();

    let kernel = Kernel::with_config(config).build();

    assert_eq!(kernel.config().name, "CustomKernel");
    assert_eq!(kernel.config().max_tasks, 64);
    assert!(kernel.tasks().is_empty());
}

#[test]
fn kernel_idle_callback() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static IDLE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn idle_callback() {
        IDLE_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let config = KernelConfig::builder().idle_callback(idle_callback).build();
    let kernel = Kernel::with_config(config).build();

    kernel.run_until_idle();
    kernel.run_until_idle();

    assert_eq!(IDLE_CALLS.load(Ordering::SeqCst), 2);
}
