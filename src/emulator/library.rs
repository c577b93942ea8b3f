use anyhow::Result;
use std::path::PathBuf;

use crate::core::error::SessionError;
use crate::shared::constants;
use crate::utils::file_utils;

/// ROM and save directories
#[derive(Clone, Debug)]
pub struct Library {
    rom_dir: PathBuf,
    saves_dir: PathBuf,
}

/// Plain file stems only; anything that could walk out of the directory is refused.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

impl Library {
    pub fn new(rom_dir: impl Into<PathBuf>, saves_dir: impl Into<PathBuf>) -> Self {
        Self {
            rom_dir: rom_dir.into(),
            saves_dir: saves_dir.into(),
        }
    }

    pub fn rom_path(&self, name: &str) -> Result<PathBuf, SessionError> {
        let not_found = || SessionError::RomNotFound(name.to_string());
        if !is_plain_name(name) {
            return Err(not_found());
        }
        let path = file_utils::named_file(&self.rom_dir, name, constants::ROM_EXTENSION);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }

    pub fn save_path(&self, name: &str) -> Result<PathBuf, SessionError> {
        if !is_plain_name(name) {
            return Err(SessionError::InvalidSaveName);
        }
        Ok(file_utils::named_file(&self.saves_dir, name, constants::SAVE_EXTENSION))
    }

    /// Path of an existing save, `SaveNotFound` otherwise
    pub fn existing_save(&self, name: &str) -> Result<PathBuf, SessionError> {
        let path = self.save_path(name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(SessionError::SaveNotFound(name.to_string()))
        }
    }

    pub fn write_save(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.save_path(name)?;
        file_utils::write_file(&path, data)?;
        Ok(path)
    }

    /// Names of the ROMs on disk
    pub fn roms(&self) -> Result<Vec<String>> {
        if !self.rom_dir.exists() {
            return Ok(Vec::new());
        }
        Ok(file_utils::list_files(&self.rom_dir, constants::ROM_EXTENSION)?
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect())
    }
}
