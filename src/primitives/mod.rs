//! Low-level primitives
//!
//! ANSI escape handling for captured command output.

pub mod ansi;
