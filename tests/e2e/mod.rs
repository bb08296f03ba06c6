#[cfg(unix)]
mod browser;
#[cfg(unix)]
mod command_panel;
#[cfg(unix)]
mod search;
