use anyhow::{bail, Result};
use std::path::Path;
use std::time::Duration;

use super::Emulator;
use crate::gamepad::Button;
use crate::renderer::Frame;
use crate::utils::file_utils;

/// Native refresh of the handheld
const REFRESH_HZ: f64 = 59.7275;
/// Battery RAM size, erased state is all 0xFF
const SAVE_SIZE: usize = 0x8000;
const HEADER_LEN: usize = 8;

/// Core that plays back a recorded screen capture instead of executing the cartridge.
///
/// Capture layout: Width(u16) Height(u16) FrameCount(u32), little endian, then
/// `FrameCount` RGBA frames back to back.
pub struct ReplayCore {
    width: usize,
    height: usize,
    frames: Vec<Vec<u8>>,
    emulated: Duration,
    save: Option<Vec<u8>>,
    /// Keypad bits, one per `Button::code`
    keys: u16,
    taps: u16,
}

impl ReplayCore {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            frames: Vec::new(),
            emulated: Duration::ZERO,
            save: None,
            keys: 0,
            taps: 0,
        }
    }

    #[cfg(test)]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn elapsed_frames(&self) -> u64 {
        (self.emulated.as_secs_f64() * REFRESH_HZ) as u64
    }

    /// Index of the frame currently on screen
    pub fn frame_index(&self) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        (self.elapsed_frames() % self.frames.len() as u64) as usize
    }

    #[cfg(test)]
    pub fn keys(&self) -> u16 {
        self.keys | self.taps
    }

    fn parse_capture(data: &[u8]) -> Result<(usize, usize, Vec<Vec<u8>>)> {
        if data.len() < HEADER_LEN {
            bail!("Capture is {} bytes, too short for a header", data.len());
        }
        let width = u16::from_le_bytes([data[0], data[1]]) as usize;
        let height = u16::from_le_bytes([data[2], data[3]]) as usize;
        let frame_count = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

        let frame_len = width * height * 4;
        if frame_len == 0 || frame_count == 0 {
            bail!("Capture has no frames ({}x{}, {} frames)", width, height, frame_count);
        }
        let body = &data[HEADER_LEN..];
        if body.len() < frame_len * frame_count {
            bail!(
                "Capture body is {} bytes, expected {}",
                body.len(),
                frame_len * frame_count
            );
        }

        let frames = body
            .chunks_exact(frame_len)
            .take(frame_count)
            .map(|f| f.to_vec())
            .collect();
        Ok((width, height, frames))
    }
}

impl Default for ReplayCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator for ReplayCore {
    fn reset(&mut self) {
        self.emulated = Duration::ZERO;
        self.keys = 0;
        self.taps = 0;
    }

    fn load_rom(&mut self, path: &Path) -> Result<()> {
        let data = file_utils::read_file(path)?;
        let (width, height, frames) = Self::parse_capture(&data)?;
        self.width = width;
        self.height = height;
        self.frames = frames;
        self.save = Some(vec![0xFF; SAVE_SIZE]);
        self.reset();
        Ok(())
    }

    fn load_save(&mut self, data: &[u8]) -> Result<()> {
        match self.save.as_mut() {
            Some(save) => {
                save.clear();
                save.extend_from_slice(data);
                Ok(())
            }
            None => bail!("No cartridge loaded"),
        }
    }

    fn save_data(&self) -> Option<Vec<u8>> {
        self.save.clone()
    }

    fn advance(&mut self, elapsed: Duration) {
        let before = self.elapsed_frames();
        self.emulated += elapsed;
        if self.elapsed_frames() != before {
            self.taps = 0;
        }
    }

    fn screenshot(&self) -> Frame {
        match self.frames.get(self.frame_index()) {
            Some(data) => Frame {
                width: self.width,
                height: self.height,
                data: data.clone(),
            },
            None => Frame::screen(),
        }
    }

    fn key_down(&mut self, button: Button) {
        self.keys |= 1 << button.code();
    }

    fn key_up(&mut self, button: Button) {
        self.keys &= !(1 << button.code());
    }

    fn press(&mut self, button: Button) {
        self.taps |= 1 << button.code();
    }
}
