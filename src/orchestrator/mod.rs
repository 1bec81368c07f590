//! Application-level orchestration.
//!
//! This module owns the state holder and the run lifecycle: UI layers send
//! commands in, the controller mutates state, drives analysis runs, and emits
//! events back to presentation layers.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
