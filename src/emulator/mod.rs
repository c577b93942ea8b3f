//! The emulator core is external; this is the surface the session drives.

pub mod library;
pub mod replay;

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::gamepad::Button;
use crate::renderer::Frame;

pub use library::Library;
pub use replay::ReplayCore;

pub trait Emulator {
    /// Back to power-on state; the loaded ROM stays
    fn reset(&mut self);
    fn load_rom(&mut self, path: &Path) -> Result<()>;
    fn load_save(&mut self, data: &[u8]) -> Result<()>;
    /// Battery save contents, if the cartridge has any
    fn save_data(&self) -> Option<Vec<u8>>;
    /// Run for `elapsed` of emulated time
    fn advance(&mut self, elapsed: Duration);
    fn screenshot(&self) -> Frame;
    fn key_down(&mut self, button: Button);
    fn key_up(&mut self, button: Button);
    /// Tap: down now, released after the next emulated frame
    fn press(&mut self, button: Button);
}

/// Builds a fresh core. Failing here means the environment cannot host an emulator at all.
pub type EmulatorFactory = Box<dyn Fn() -> Result<Box<dyn Emulator>>>;
