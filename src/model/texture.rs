use serde::{Deserialize, Serialize};

/// Texture wrap flags as stored in TEXS records
pub const WRAP_WIDTH: u32 = 0x1;
pub const WRAP_HEIGHT: u32 = 0x2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Texture {
    pub path: String,
    pub replaceable_id: u32, // 0 = normal texture, 1 = team color, 2 = team glow, etc.
    pub flags: u32,
}

impl Texture {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn replaceable(replaceable_id: u32) -> Self {
        Self {
            replaceable_id,
            ..Default::default()
        }
    }
}
