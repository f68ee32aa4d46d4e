use super::Extent;
use serde::{Deserialize, Serialize};

/// A named interval on the model timeline (milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub non_looping: bool,
    pub rarity: u32,
    /// Only written for sequences whose name contains "walk"
    pub movement_speed: f32,
    pub extent: Option<Extent>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: 0,
            end: 0,
            non_looping: false,
            rarity: 0,
            movement_speed: 270.0,
            extent: None,
        }
    }
}

impl Sequence {
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            ..Default::default()
        }
    }

    /// The sequence every exported model falls back to.
    pub fn stand() -> Self {
        Self::new("Stand", 0, 3333)
    }

    pub fn is_walk(&self) -> bool {
        self.name.to_lowercase().contains("walk")
    }
}
