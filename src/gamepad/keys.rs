use std::collections::BTreeSet;

use super::buttons::Button;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Button),
    Up(Button),
}

/// Keys currently held on the emulator's keypad.
#[derive(Default)]
pub struct HeldKeys {
    held: BTreeSet<Button>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_held(&self, button: Button) -> bool {
        self.held.contains(&button)
    }

    /// Move to `pressed`, returning only the transitions. Releases come first.
    pub fn apply(&mut self, pressed: &BTreeSet<Button>) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = self
            .held
            .difference(pressed)
            .map(|b| KeyEvent::Up(*b))
            .collect();
        events.extend(pressed.difference(&self.held).map(|b| KeyEvent::Down(*b)));
        self.held = pressed.clone();
        events
    }

    pub fn release_all(&mut self) -> Vec<KeyEvent> {
        self.apply(&BTreeSet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(buttons: &[Button]) -> BTreeSet<Button> {
        buttons.iter().copied().collect()
    }

    #[test]
    fn test_only_transitions_are_emitted() {
        let mut keys = HeldKeys::new();
        assert_eq!(
            keys.apply(&set(&[Button::A, Button::Up])),
            vec![KeyEvent::Down(Button::A), KeyEvent::Down(Button::Up)]
        );
        assert!(keys.apply(&set(&[Button::A, Button::Up])).is_empty());
        assert_eq!(
            keys.apply(&set(&[Button::Up, Button::B])),
            vec![KeyEvent::Up(Button::A), KeyEvent::Down(Button::B)]
        );
        assert!(keys.is_held(Button::B));
        assert!(!keys.is_held(Button::A));
    }

    #[test]
    fn test_release_all() {
        let mut keys = HeldKeys::new();
        keys.apply(&set(&[Button::Start]));
        assert_eq!(keys.release_all(), vec![KeyEvent::Up(Button::Start)]);
        assert!(keys.release_all().is_empty());
    }
}
