//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiration sweep: removes expired entries from every registered category

mod sweep;

pub use sweep::spawn_sweep_task;
