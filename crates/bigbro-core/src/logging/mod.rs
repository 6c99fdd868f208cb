//! Product-log output: the rotating log writer and the crash tombstone.
//!
//! Both are explicit objects created once at start-up and shared by handle
//! (`Arc`) with the scheduler and every sampling task.

mod error;
mod settle;
mod tombstone;
mod writer;

pub use error::LogError;
pub use settle::{SETTLE_BEGIN_BANNER, SETTLE_END_BANNER, spawn_settle_rename};
pub use tombstone::Tombstone;
pub use writer::RotatingLogWriter;
