use std::collections::{BTreeSet, HashMap};

use super::buttons::{BoundingBox, Button, ButtonRegions};
use crate::host::{CrouchState, PlayerPosition};
use crate::shared::constants;

/// A player reduced to what the gamepad cares about
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityPose {
    pub pos: [f64; 3],
    pub crouched: bool,
}

/// Join positions with crouch flags by pawn; pawns without a crouch entry are standing.
pub fn correlate(positions: &[PlayerPosition], crouches: &[CrouchState]) -> Vec<EntityPose> {
    let crouched: HashMap<&str, bool> = crouches
        .iter()
        .map(|c| (c.pawn.as_str(), c.crouched))
        .collect();

    positions
        .iter()
        .map(|p| EntityPose {
            pos: p.pos,
            crouched: crouched.get(p.pawn.as_str()).copied().unwrap_or(false),
        })
        .collect()
}

impl BoundingBox {
    /// Crouching inside the horizontal footprint, no higher than the tolerance above the top.
    pub fn is_pressed_by(&self, pose: &EntityPose) -> bool {
        let [x, y, z] = pose.pos;
        pose.crouched
            && self.min_bound[0] < x
            && x < self.max_bound[0]
            && self.min_bound[1] < y
            && y < self.max_bound[1]
            && z < self.max_bound[2] + constants::BUTTON_VERTICAL_TOLERANCE
    }
}

/// Buttons held down this tick. Empty until enough regions are bound.
pub fn pressed_buttons(regions: &ButtonRegions, poses: &[EntityPose]) -> BTreeSet<Button> {
    if regions.len() < constants::MIN_BUTTON_REGIONS {
        return BTreeSet::new();
    }

    regions
        .iter()
        .filter(|(_, region)| poses.iter().any(|pose| region.is_pressed_by(pose)))
        .map(|(button, _)| button)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(x: f64) -> BoundingBox {
        BoundingBox { min_bound: [x, 0.0, 0.0], max_bound: [x + 100.0, 100.0, 100.0] }
    }

    fn five_regions() -> ButtonRegions {
        let mut regions = ButtonRegions::new();
        for (i, button) in [Button::A, Button::B, Button::Start, Button::Select, Button::Up]
            .into_iter()
            .enumerate()
        {
            regions.set(button, cube(i as f64 * 200.0));
        }
        regions
    }

    fn pose(x: f64, y: f64, z: f64, crouched: bool) -> EntityPose {
        EntityPose { pos: [x, y, z], crouched }
    }

    #[test]
    fn test_tolerance_band_above_region() {
        let region = cube(0.0);
        assert!(region.is_pressed_by(&pose(50.0, 50.0, 149.0, true)));
        assert!(!region.is_pressed_by(&pose(50.0, 50.0, 149.0, false)));
        assert!(!region.is_pressed_by(&pose(50.0, 50.0, 150.0, true)));
    }

    #[test]
    fn test_horizontal_bounds_are_strict() {
        let region = cube(0.0);
        assert!(!region.is_pressed_by(&pose(0.0, 50.0, 120.0, true)));
        assert!(!region.is_pressed_by(&pose(100.0, 50.0, 120.0, true)));
        assert!(!region.is_pressed_by(&pose(50.0, 100.0, 120.0, true)));
        assert!(region.is_pressed_by(&pose(0.5, 99.5, 120.0, true)));
    }

    #[test]
    fn test_pressed_set() {
        let regions = five_regions();
        let poses = [
            pose(50.0, 50.0, 110.0, true),
            pose(450.0, 50.0, 110.0, true),
            pose(250.0, 50.0, 110.0, false),
        ];
        let pressed = pressed_buttons(&regions, &poses);
        assert_eq!(pressed.into_iter().collect::<Vec<_>>(), vec![Button::A, Button::Start]);
    }

    #[test]
    fn test_idle_until_enough_regions() {
        let mut regions = ButtonRegions::new();
        for button in [Button::A, Button::B, Button::L, Button::R] {
            regions.set(button, cube(0.0));
        }
        let poses = [pose(50.0, 50.0, 110.0, true)];
        assert!(pressed_buttons(&regions, &poses).is_empty());

        regions.set(Button::Up, cube(0.0));
        assert_eq!(pressed_buttons(&regions, &poses).len(), 5);
    }

    #[test]
    fn test_correlate_by_pawn() {
        let positions = vec![
            PlayerPosition { pawn: "p1".into(), pos: [1.0, 1.0, 1.0] },
            PlayerPosition { pawn: "p2".into(), pos: [2.0, 2.0, 2.0] },
            PlayerPosition { pawn: "p3".into(), pos: [3.0, 3.0, 3.0] },
        ];
        let crouches = vec![
            CrouchState { pawn: "p2".into(), crouched: true },
            CrouchState { pawn: "p1".into(), crouched: false },
        ];
        let poses = correlate(&positions, &crouches);
        assert_eq!(
            poses.iter().map(|p| p.crouched).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        assert_eq!(poses[1].pos, [2.0, 2.0, 2.0]);
    }
}
