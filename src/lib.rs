// This file makes the crate a library and declares modules for use
// by the binary (main.rs) and integration tests.

pub mod actions;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod sync;
pub mod ui;
