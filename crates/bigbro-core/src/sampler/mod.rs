//! Multi-rate sampling: task configuration, the sampling task itself, and
//! the scheduler that fires tasks independently of each other.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bigbro_core::collector::Providers;
//! use bigbro_core::logging::{RotatingLogWriter, Tombstone};
//! use bigbro_core::sampler::{SampleCategory, Scheduler, TaskConfig};
//!
//! let writer = Arc::new(RotatingLogWriter::open_temporary("/var/log/bigbro").unwrap());
//! let tombstone = Arc::new(Tombstone::new("/var/log/bigbro/BB-TOMBSTONE.txt", "BigBrother"));
//! let mut scheduler = Scheduler::new(writer, tombstone, Providers::unavailable());
//!
//! let config = TaskConfig::builder("F")
//!     .period(Duration::from_secs(5))
//!     .category(SampleCategory::ComPorts)
//!     .build()
//!     .unwrap();
//! let handle = scheduler.add_task(config);
//! scheduler.start(handle).unwrap();
//! ```

mod config;
mod scheduler;
mod task;

pub use crate::model::SampleCategory;
pub use config::{ConfigError, TaskConfig, TaskConfigBuilder};
pub use scheduler::{Scheduler, SchedulerError, TaskHandle};
pub use task::{SamplingTask, TaskStats, TickOutcome};
