//! Application-level orchestration.
//!
//! `state` holds the run state machine and history ownership; `controller`
//! drives engine tasks from UI commands and publishes snapshots. UI/CLI layers
//! only talk to the controller.

mod controller;
mod state;

pub(crate) use controller::{run_controller, Controller, UiCommand};
