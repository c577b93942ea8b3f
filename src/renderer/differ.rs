use super::frame::Frame;

/// Whole-frame change detector.
///
/// The retained copy always tracks the most recently observed frame, whether
/// or not that frame was reported as changed.
pub struct FrameDiffer {
    last_rgb: Option<Vec<u8>>,
}

impl FrameDiffer {
    pub fn new() -> Self {
        Self { last_rgb: None }
    }

    /// Compare against the retained frame, then retain this one.
    /// The first frame after construction or [`reset`](Self::reset) counts as changed.
    pub fn observe(&mut self, frame: &Frame) -> bool {
        let rgb_len = frame.pixel_count() * 3;
        if let Some(last) = self.last_rgb.as_mut().filter(|v| v.len() == rgb_len) {
            let mut changed = false;
            for (rgb, rgba) in last.chunks_exact_mut(3).zip(frame.data.chunks_exact(4)) {
                if rgb[..] != rgba[..3] {
                    rgb.copy_from_slice(&rgba[..3]);
                    changed = true;
                }
            }
            return changed;
        }

        let mut rgb = vec![0u8; rgb_len];
        copy_rgb(frame, &mut rgb);
        self.last_rgb = Some(rgb);
        true
    }

    pub fn reset(&mut self) {
        self.last_rgb = None;
    }
}

impl Default for FrameDiffer {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_rgb(frame: &Frame, rgb: &mut [u8]) {
    for (dst, src) in rgb.chunks_exact_mut(3).zip(frame.data.chunks_exact(4)) {
        dst.copy_from_slice(&src[..3]);
    }
}
