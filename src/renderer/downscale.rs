use super::frame::Frame;

/// Replace each `block`x`block` square with its top-left pixel's RGB.
///
/// Edge blocks are clipped to the frame. Alpha is not touched. A block size
/// of 0 or 1 leaves the frame as it is.
pub fn downscale(frame: &mut Frame, block: usize) {
    if block <= 1 {
        return;
    }

    for by in (0..frame.height).step_by(block) {
        for bx in (0..frame.width).step_by(block) {
            let representative = frame.pixel(bx, by);
            let y_end = (by + block).min(frame.height);
            let x_end = (bx + block).min(frame.width);
            for y in by..y_end {
                for x in bx..x_end {
                    frame.set_pixel(x, y, representative);
                }
            }
        }
    }
}
