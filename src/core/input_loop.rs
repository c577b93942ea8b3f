use anyhow::{Context, Result};
use std::collections::BTreeSet;

use super::session::Session;
use crate::gamepad::{correlate, pressed_buttons, KeyEvent};
use crate::host::Host;

/// Poll player poses and drive the emulator keypad from the physical gamepad.
///
/// Keys are only held while rendering with enough buttons bound; anything else releases them.
pub fn input_tick(session: &mut Session, host: &mut dyn Host) -> Result<Vec<KeyEvent>> {
    if !session.has_emulator() {
        return Ok(Vec::new());
    }
    if !session.physical {
        return Ok(session.release_keys());
    }

    let mut pressed = BTreeSet::new();
    if session.rendering && session.buttons().len() >= crate::shared::constants::MIN_BUTTON_REGIONS {
        let positions = host.player_positions().context("error getting positions")?;
        let crouches = host.crouch_states().context("error getting crouch states")?;
        pressed = pressed_buttons(session.buttons(), &correlate(&positions, &crouches));
    }
    Ok(session.apply_pressed(&pressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::tests::RecordingHost;
    use crate::core::session::tests::{session_with_rom, MemoryStore};
    use crate::gamepad::{BoundingBox, Button};
    use crate::host::{CrouchState, PlayerPosition};

    fn bind_five(session: &mut Session) {
        let mut store = MemoryStore::default();
        for (i, name) in ["a", "b", "start", "select", "up"].iter().enumerate() {
            let x = i as f64 * 200.0;
            let bounds = BoundingBox {
                min_bound: [x, 0.0, 0.0],
                max_bound: [x + 100.0, 100.0, 100.0],
            };
            session.set_button(Some(name), Some(bounds), &mut store).unwrap();
        }
    }

    fn standing_on_a(crouched: bool) -> RecordingHost {
        RecordingHost {
            positions: vec![PlayerPosition { pawn: "BP_FigureV2_C_1".into(), pos: [50.0, 50.0, 149.0] }],
            crouches: vec![CrouchState { pawn: "BP_FigureV2_C_1".into(), crouched }],
            ..Default::default()
        }
    }

    #[test]
    fn test_crouching_holds_and_releases() {
        let mut session = session_with_rom("input_hold", &[[0, 0, 0]]);
        session.start("tetris", None).unwrap();
        bind_five(&mut session);

        let mut host = standing_on_a(true);
        assert_eq!(input_tick(&mut session, &mut host).unwrap(), vec![KeyEvent::Down(Button::A)]);
        assert!(input_tick(&mut session, &mut host).unwrap().is_empty());

        let mut host = standing_on_a(false);
        assert_eq!(input_tick(&mut session, &mut host).unwrap(), vec![KeyEvent::Up(Button::A)]);
    }

    #[test]
    fn test_idle_until_enough_buttons() {
        let mut session = session_with_rom("input_few", &[[0, 0, 0]]);
        let mut host = standing_on_a(true);
        assert!(input_tick(&mut session, &mut host).unwrap().is_empty());

        session.start("tetris", None).unwrap();
        let mut store = MemoryStore::default();
        let bounds = BoundingBox { min_bound: [0.0; 3], max_bound: [100.0; 3] };
        session.set_button(Some("a"), Some(bounds), &mut store).unwrap();
        assert!(input_tick(&mut session, &mut host).unwrap().is_empty());
    }

    #[test]
    fn test_pause_and_physical_release_keys() {
        let mut session = session_with_rom("input_release", &[[0, 0, 0]]);
        session.start("tetris", None).unwrap();
        bind_five(&mut session);
        let mut host = standing_on_a(true);
        input_tick(&mut session, &mut host).unwrap();

        session.rendering = false;
        assert_eq!(input_tick(&mut session, &mut host).unwrap(), vec![KeyEvent::Up(Button::A)]);

        session.rendering = true;
        input_tick(&mut session, &mut host).unwrap();
        session.physical = false;
        assert_eq!(input_tick(&mut session, &mut host).unwrap(), vec![KeyEvent::Up(Button::A)]);
    }

    #[test]
    fn test_query_failure_is_an_error() {
        let mut session = session_with_rom("input_error", &[[0, 0, 0]]);
        session.start("tetris", None).unwrap();
        bind_five(&mut session);
        let mut host = RecordingHost { fail_positions: true, ..Default::default() };
        assert!(input_tick(&mut session, &mut host).is_err());
    }
}
