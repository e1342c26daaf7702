//! Background services

pub mod registry;
pub mod watchdog;

pub use registry::WatchdogRegistry;
pub use watchdog::{CycleOutcome, StagnationWatchdog, WatchdogHandle};
