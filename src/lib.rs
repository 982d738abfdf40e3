//! Champion-select overlay agent.
//!
//! Follows the game client's phases, detects the cosmetic being previewed,
//! pre-builds its overlay while the player browses and activates it when the
//! loadout countdown runs out.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod injection;
pub mod lcu;
pub mod league_path;
pub mod logging;
pub mod monitors;
pub mod state;

#[cfg(test)]
mod tests;
