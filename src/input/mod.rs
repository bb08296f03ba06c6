//! Input handling: line editing, command history and panel key dispatch

pub mod history;
pub mod line_edit;
pub mod panel_keys;
