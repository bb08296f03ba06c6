//! View layer: output buffer, command panel and drawing

pub mod command_panel;
pub mod output_buffer;
pub mod ui;
