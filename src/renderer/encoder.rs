use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::frame::Frame;

/// Encode a frame as an 8-bit RGBA PNG
pub fn encode_png<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    let mut encoder = png::Encoder::new(writer, frame.width as u32, frame.height as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut png_writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    png_writer
        .write_image_data(&frame.data)
        .context("Failed to write PNG data")?;
    Ok(())
}

/// Write the frame to `path` for the converter to pick up
pub fn write_png(frame: &Frame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create frame image {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    encode_png(frame, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush frame image {}", path.display()))
}
