//! Seams to the game server that hosts the screen.

pub mod console;
pub mod events;
pub mod store;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::gamepad::BoundingBox;
use crate::placement::Owner;

pub use console::ConsoleHost;
pub use events::HostEvent;
pub use store::JsonStore;

/// A player's pawn and where it stands
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub pawn: String,
    pub pos: [f64; 3],
}

/// Crouch flag for a pawn, fetched separately from positions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrouchState {
    pub pawn: String,
    pub crouched: bool,
}

pub trait Host {
    /// Load an artifact into the world, shifted by `offset`.
    /// `snapped` marks a frame whose colors were already snapped to the server palette.
    fn place_artifact(&mut self, artifact: &Path, offset: [i32; 3], quiet: bool, snapped: bool) -> Result<()>;
    /// Remove everything attributed to `owner`
    fn clear_owner(&mut self, owner: &Owner, quiet: bool) -> Result<()>;
    fn player_positions(&mut self) -> Result<Vec<PlayerPosition>>;
    fn crouch_states(&mut self) -> Result<Vec<CrouchState>>;
    /// Bounds of whatever `player` currently holds in their clipboard
    fn template_bounds(&mut self, player: &str) -> Result<Option<BoundingBox>>;
    fn broadcast(&mut self, message: &str) -> Result<()>;
}

/// Persistent plugin storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()>;
}
