use super::differ::FrameDiffer;
use super::downscale::downscale;
use super::frame::Frame;
use super::palette::Palette;
use super::quantizer::Quantizer;

/// Per-tick image toggles, owned by the session and flipped by chat commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessSettings {
    pub downscale: bool,
    pub block: usize,
    pub snap: bool,
}

/// Frame preparation ahead of conversion: downscale, palette snap, change detection.
pub struct FrameProcessor {
    quantizer: Quantizer,
    differ: FrameDiffer,
}

impl FrameProcessor {
    pub fn new(palette: Palette) -> Self {
        Self {
            quantizer: Quantizer::new(palette),
            differ: FrameDiffer::new(),
        }
    }

    /// Transform `frame` in place and report whether it differs from the last one seen.
    pub fn process_frame(&mut self, frame: &mut Frame, settings: &ProcessSettings) -> bool {
        if settings.downscale {
            downscale(frame, settings.block);
        }
        if settings.snap {
            self.quantizer.quantize_frame(frame);
        }
        self.differ.observe(frame)
    }

    /// Forget the previous frame so the next one is always emitted
    pub fn reset(&mut self) {
        self.differ.reset();
    }

    #[cfg(test)]
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }
}
