//! Test doubles: an in-memory filesystem with ready-made scenarios, and
//! scripted providers for exercising task and scheduler failure paths.

mod filesystem;
mod providers;
mod scenarios;

pub use filesystem::MockFs;
pub use providers::{FailingProvider, FixedComPorts, FixedProcesses, PanickingProvider, SlowProvider};
