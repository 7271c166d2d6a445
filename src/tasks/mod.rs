//! Background Tasks Module
//!
//! - TTL sweep: drops expired local entries at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
