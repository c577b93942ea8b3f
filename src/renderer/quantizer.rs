use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use super::frame::{Frame, RgbColor};
use super::palette::Palette;

/// Snaps colors to the nearest palette entry.
///
/// Every color ever looked up stays cached for the lifetime of the quantizer.
pub struct Quantizer {
    palette: Palette,
    cache: HashMap<RgbColor, RgbColor>,
}

impl Quantizer {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn nearest(&mut self, color: RgbColor) -> RgbColor {
        let palette = self.palette.colors();
        *self
            .cache
            .entry(color)
            .or_insert_with(|| nearest_color(palette, color))
    }

    /// Snap the RGB of every pixel in place; alpha is left alone.
    pub fn quantize_frame(&mut self, frame: &mut Frame) {
        let misses: HashSet<RgbColor> = frame
            .data
            .chunks_exact(4)
            .map(|px| RgbColor(px[0], px[1], px[2]))
            .filter(|c| !self.cache.contains_key(c))
            .collect();

        if !misses.is_empty() {
            let palette = self.palette.colors();
            let resolved: Vec<(RgbColor, RgbColor)> = misses
                .into_par_iter()
                .map(|c| (c, nearest_color(palette, c)))
                .collect();
            self.cache.extend(resolved);
        }

        let cache = &self.cache;
        frame.data.par_chunks_mut(4).for_each(|px| {
            if let Some(snapped) = cache.get(&RgbColor(px[0], px[1], px[2])) {
                px[0] = snapped.0;
                px[1] = snapped.1;
                px[2] = snapped.2;
            }
        });
    }
}

/// Linear scan; the first entry wins ties.
pub fn nearest_color(palette: &[RgbColor], color: RgbColor) -> RgbColor {
    let mut closest = palette[0];
    let mut dist = closest.distance_sq(color);
    for &candidate in &palette[1..] {
        let d = candidate.distance_sq(color);
        if d < dist {
            closest = candidate;
            dist = d;
        }
    }
    closest
}
