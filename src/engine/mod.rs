//! Async runtime around the game machines: one arena slot per game kind,
//! tokio timer tasks per slot, and a broadcast channel of [`EngineEvent`]s.

mod controller;
mod drivers;
pub mod events;
mod state;

pub use controller::GameEngine;
pub use events::EngineEvent;
pub use state::GameSnapshot;
