use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use super::config::Config;
use super::error::SessionError;
use crate::convert::ConversionMode;
use crate::emulator::{Emulator, EmulatorFactory, Library};
use crate::gamepad::{BoundingBox, Button, ButtonRegions, HeldKeys, KeyEvent};
use crate::host::KeyValueStore;
use crate::placement::PlacementBuffer;
use crate::renderer::{FrameProcessor, Palette, ProcessSettings};
use crate::shared::constants;
use crate::utils::{file_utils, logger};

/// Everything one running screen owns. The scheduler holds it and lends it to ticks and commands.
pub struct Session {
    host_name: String,
    library: Library,
    factory: EmulatorFactory,
    emulator: Option<Box<dyn Emulator>>,
    processor: FrameProcessor,
    placement: PlacementBuffer,
    buttons: ButtonRegions,
    keys: HeldKeys,
    work_dir: PathBuf,
    artifact_dir: PathBuf,
    mode: ConversionMode,
    started: bool,

    pub rendering: bool,
    pub downscale: bool,
    pub block: usize,
    pub snap: bool,
    pub slow: bool,
    pub physical: bool,
}

impl Session {
    pub fn new(
        config: &Config,
        palette: Palette,
        buttons: ButtonRegions,
        factory: EmulatorFactory,
    ) -> Result<Self> {
        let placement = PlacementBuffer::new(config.placement, config.converter.scale)?;
        Ok(Self {
            host_name: config.host_name.clone(),
            library: Library::new(&config.paths.roms, &config.paths.saves),
            factory,
            emulator: None,
            processor: FrameProcessor::new(palette),
            placement,
            buttons,
            keys: HeldKeys::new(),
            work_dir: config.paths.work.clone(),
            artifact_dir: config.paths.artifacts.clone(),
            mode: config.converter.mode,
            started: false,
            rendering: false,
            downscale: config.toggles.downscale,
            block: config.toggles.block,
            snap: config.toggles.snap,
            slow: config.toggles.slow,
            physical: config.toggles.physical,
        })
    }

    pub fn is_authorized(&self, player: &str) -> bool {
        !self.host_name.is_empty() && player == self.host_name
    }

    #[cfg(test)]
    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn has_emulator(&self) -> bool {
        self.emulator.is_some()
    }

    #[cfg(test)]
    pub fn started(&self) -> bool {
        self.started
    }

    pub fn settings(&self) -> ProcessSettings {
        ProcessSettings {
            downscale: self.downscale,
            block: self.block,
            snap: self.snap,
        }
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn emulator_mut(&mut self) -> Option<&mut (dyn Emulator + 'static)> {
        self.emulator.as_deref_mut()
    }

    pub fn processor_mut(&mut self) -> &mut FrameProcessor {
        &mut self.processor
    }

    pub fn placement(&self) -> &PlacementBuffer {
        &self.placement
    }

    pub fn placement_mut(&mut self) -> &mut PlacementBuffer {
        &mut self.placement
    }

    pub fn buttons(&self) -> &ButtonRegions {
        &self.buttons
    }

    pub fn frame_image_path(&self) -> PathBuf {
        self.work_dir.join(constants::FRAME_IMAGE_FILE)
    }

    pub fn artifact_path(&self, artifact_slot: usize) -> PathBuf {
        file_utils::named_file(
            &self.artifact_dir,
            &format!("{}{}", constants::TEMP_ARTIFACT_PREFIX, artifact_slot),
            constants::ARTIFACT_EXTENSION,
        )
    }

    /// Start (or restart) the emulator on `rom`, then load `save` or the autosave.
    ///
    /// The ROM and save are loaded into a fresh core; the running one is only
    /// replaced once both loads succeed.
    pub fn start(&mut self, rom: &str, save: Option<&str>) -> Result<()> {
        let rom_path = self.library.rom_path(rom)?;
        let save_path = match save {
            Some(name) => Some(self.library.existing_save(name)?),
            None => self.library.existing_save(constants::AUTOSAVE_NAME).ok(),
        };

        let mut emulator = (self.factory)()
            .map_err(|e| SessionError::EmulatorUnavailable(format!("{:#}", e)))?;
        emulator.load_rom(&rom_path)?;
        logger::info(&format!("Loaded rom {}", rom_path.display()));

        if let Some(path) = save_path {
            let data = file_utils::read_file(&path)?;
            emulator
                .load_save(&data)
                .with_context(|| format!("Error loading save {}", path.display()))?;
            logger::info(&format!("Loaded save {}", path.display()));
        }

        self.emulator = Some(emulator);
        self.processor.reset();
        self.keys = HeldKeys::new();
        self.started = true;
        self.rendering = true;
        Ok(())
    }

    /// Write the cartridge's battery save to `<saves>/<name>.sav`.
    pub fn save(&self, name: Option<&str>) -> Result<PathBuf> {
        let name = name.filter(|n| !n.is_empty()).ok_or(SessionError::InvalidSaveName)?;
        let emulator = self
            .emulator
            .as_ref()
            .ok_or(SessionError::EmulatorNotInitialized)?;
        let data = emulator.save_data().ok_or(SessionError::NoSaveDataAvailable)?;
        self.library.write_save(name, &data)
    }

    /// Periodic `_autosave`; does nothing until a ROM has been started.
    pub fn autosave(&self) -> Result<Option<PathBuf>> {
        if !self.started {
            return Ok(None);
        }
        self.save(Some(constants::AUTOSAVE_NAME)).map(Some)
    }

    /// Bind `button` to the template bounds and persist all bindings.
    pub fn set_button(
        &mut self,
        button: Option<&str>,
        bounds: Option<BoundingBox>,
        store: &mut dyn KeyValueStore,
    ) -> Result<(Button, BoundingBox)> {
        let bounds = bounds.ok_or(SessionError::NoTemplate)?;
        let button = Button::parse(button.unwrap_or_default())?;
        self.buttons.set(button, bounds);
        self.buttons.save(store)?;
        Ok((button, bounds))
    }

    /// Tap a key from chat. False when there is no emulator to receive it.
    pub fn tap(&mut self, button: Button) -> bool {
        match self.emulator.as_mut() {
            Some(emulator) => {
                emulator.press(button);
                true
            }
            None => false,
        }
    }

    /// Move the held keypad state to `pressed` and forward the transitions.
    pub fn apply_pressed(&mut self, pressed: &std::collections::BTreeSet<Button>) -> Vec<KeyEvent> {
        let events = self.keys.apply(pressed);
        self.forward_keys(&events);
        events
    }

    /// Let go of every held key.
    pub fn release_keys(&mut self) -> Vec<KeyEvent> {
        let events = self.keys.release_all();
        self.forward_keys(&events);
        events
    }

    fn forward_keys(&mut self, events: &[KeyEvent]) {
        if let Some(emulator) = self.emulator.as_mut() {
            for event in events {
                match *event {
                    KeyEvent::Down(button) => emulator.key_down(button),
                    KeyEvent::Up(button) => emulator.key_up(button),
                }
            }
        }
    }

    pub fn advance(&mut self, elapsed: Duration) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.advance(elapsed);
        }
    }
}
