//! End-to-end tests for the snapped binary's output modes.

#[path = "../common/mod.rs"]
mod common;

mod environment;
mod human_mode;
mod robot_mode;
