pub mod buttons;
pub mod hit_test;
pub mod keys;

pub use buttons::{BoundingBox, Button, ButtonRegions};
pub use hit_test::{correlate, pressed_buttons};
pub use keys::{HeldKeys, KeyEvent};
