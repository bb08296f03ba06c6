//! Services: remote execution and process-level plumbing

pub mod log_dirs;
pub mod remote;
pub mod terminal_modes;
#[cfg(feature = "runtime")]
pub mod tracing_setup;
