//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is open.
//!
//! # Tasks
//! - Expired-sweep: removes expired and corrupt entries at the configured interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
