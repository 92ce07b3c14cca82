//! Prism Main Loop
//!
//! Drives rendering of every registered view, across all devices and scenes, in
//! continuous paced cycles on a dedicated thread.
//!
//! Key points:
//! - Scene updates and view preparation run concurrently, renders fan out per device
//! - A failing view is deregistered; a failing scene fails the cycle, never the loop
//! - Scenes and 2D resources are unloaded only after the cycle's rendering finished
//! - Views are registered weakly: dropping the last handle removes them

pub mod cancel;
pub mod config;
pub mod error;
pub mod instrumentation;
pub mod main_loop;
pub mod query;
pub mod view;
pub mod waiter;

mod phases;
mod registry;

#[cfg(test)]
mod testing;

pub use cancel::*;
pub use config::*;
pub use error::*;
pub use instrumentation::*;
pub use main_loop::*;
pub use query::*;
pub use view::*;
pub use waiter::*;
