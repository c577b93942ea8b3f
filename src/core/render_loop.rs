use anyhow::{Context, Result};

use super::error::SessionError;
use super::session::Session;
use crate::convert::{ConversionRequest, Reduction};
use crate::host::Host;
use crate::placement::Placement;
use crate::renderer::encoder;
use crate::utils::logger;

/// A changed frame on its way through the converter, with the placement it was planned for.
#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub request: ConversionRequest,
    pub placement: Placement,
    /// Palette snapping was on when the frame was processed
    pub snapped: bool,
}

/// Screenshot, process, and stage the frame for conversion.
///
/// `None` when there is nothing to do: rendering is off, no emulator, or the frame did not change.
pub fn prepare(session: &mut Session) -> Result<Option<ConversionJob>> {
    if !session.rendering {
        return Ok(None);
    }
    let settings = session.settings();
    let Some(emulator) = session.emulator_mut() else {
        return Ok(None);
    };
    let mut frame = emulator.screenshot();
    if !session.processor_mut().process_frame(&mut frame, &settings) {
        return Ok(None);
    }

    let placement = session.placement().plan();
    let input = session.frame_image_path();
    encoder::write_png(&frame, &input)
        .with_context(|| format!("Failed to write frame image {}", input.display()))?;

    let request = ConversionRequest {
        input,
        output: session.artifact_path(placement.artifact_slot),
        owner: *placement.owner(),
        mode: session.mode(),
    };
    Ok(Some(ConversionJob { request, placement, snapped: settings.snap }))
}

/// Place a converted artifact and advance the buffer. A failed conversion places nothing.
pub fn finish(
    session: &mut Session,
    host: &mut dyn Host,
    job: &ConversionJob,
    result: Result<Reduction, SessionError>,
) -> Result<()> {
    let reduction = result?;
    logger::debug(&format!(
        "Frame {} reduced {} to {}",
        session.placement().total_frames(),
        reduction.before,
        reduction.after
    ));

    let placement = &job.placement;
    host.place_artifact(&job.request.output, placement.offset, true, job.snapped)?;
    if let Some(owner) = placement.clear_owner() {
        host.clear_owner(owner, true)?;
    }
    session.placement_mut().commit();
    Ok(())
}
