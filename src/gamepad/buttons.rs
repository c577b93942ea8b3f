use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::error::SessionError;
use crate::host::KeyValueStore;
use crate::shared::constants;

/// The ten digital inputs of the handheld, in keypad bit order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
}

impl Button {
    pub const ALL: [Button; 10] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::R,
        Button::L,
    ];

    /// Keypad bit index
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Right => "RIGHT",
            Button::Left => "LEFT",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::R => "R",
            Button::L => "L",
        }
    }

    /// Case-insensitive lookup by name
    pub fn parse(name: &str) -> Result<Button, SessionError> {
        let upper = name.trim().to_ascii_uppercase();
        Button::ALL
            .into_iter()
            .find(|b| b.name() == upper)
            .ok_or_else(|| SessionError::InvalidButtonName(name.trim().to_string()))
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned box in world units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_bound: [f64; 3],
    pub max_bound: [f64; 3],
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_bound[0] - self.min_bound[0]
    }

    pub fn depth(&self) -> f64 {
        self.max_bound[1] - self.min_bound[1]
    }
}

/// Button -> region map, persisted under one store key
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonRegions(BTreeMap<Button, BoundingBox>);

impl ButtonRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, button: Button) -> Option<&BoundingBox> {
        self.0.get(&button)
    }

    pub fn set(&mut self, button: Button, bounds: BoundingBox) {
        self.0.insert(button, bounds);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Button, &BoundingBox)> {
        self.0.iter().map(|(b, r)| (*b, r))
    }

    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        match store.get(constants::BUTTONS_STORE_KEY)? {
            Some(value) => serde_json::from_value(value).context("Stored buttons are malformed"),
            None => Ok(Self::new()),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(constants::BUTTONS_STORE_KEY, serde_json::to_value(self)?)
    }
}
