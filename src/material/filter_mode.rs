use serde::{Deserialize, Serialize};

/// Layer blending, stored in MDX as its discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum FilterMode {
    #[default]
    None = 0,
    Transparent = 1,
    Blend = 2,
    Additive = 3,
    AddAlpha = 4,
    Modulate = 5,
    Modulate2x = 6,
}

const MODES: [(FilterMode, &str); 7] = [
    (FilterMode::None, "None"),
    (FilterMode::Transparent, "Transparent"),
    (FilterMode::Blend, "Blend"),
    (FilterMode::Additive, "Additive"),
    (FilterMode::AddAlpha, "AddAlpha"),
    (FilterMode::Modulate, "Modulate"),
    (FilterMode::Modulate2x, "Modulate2x"),
];

impl FilterMode {
    /// Unknown values fall back to `None`.
    pub fn from_u32(value: u32) -> Self {
        match MODES.get(value as usize) {
            Some((mode, _)) => *mode,
            None => {
                log::warn!("unknown filter mode {value}, using None");
                Self::None
            }
        }
    }

    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// MDL keyword
    pub fn name(self) -> &'static str {
        MODES[self as usize].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_discriminants() {
        for (i, (mode, _)) in MODES.iter().enumerate() {
            assert_eq!(mode.to_u32() as usize, i);
            assert_eq!(FilterMode::from_u32(i as u32), *mode);
        }
        assert_eq!(FilterMode::from_u32(42), FilterMode::None);
        assert_eq!(FilterMode::Modulate2x.name(), "Modulate2x");
    }
}
