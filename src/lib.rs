//! rex: browse a remote filesystem and run commands on it over ssh

pub mod app;
pub mod config;
pub mod input;
pub mod primitives;
pub mod services;
pub mod view;
