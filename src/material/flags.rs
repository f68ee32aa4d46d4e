use serde::{Deserialize, Serialize};

/// Layer shading bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadingFlags {
    Unshaded = 0x1,
    SphereEnvMap = 0x2,
    TwoSided = 0x10,
    Unfogged = 0x20,
    NoDepthTest = 0x40,
    NoDepthSet = 0x80,
}

impl ShadingFlags {
    pub const ALL: [Self; 6] = [
        Self::Unshaded,
        Self::SphereEnvMap,
        Self::TwoSided,
        Self::Unfogged,
        Self::NoDepthTest,
        Self::NoDepthSet,
    ];

    /// Get all flags present in the bitfield
    pub fn from_bits(bits: u32) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|flag| bits & *flag as u32 != 0)
            .collect()
    }

    /// Convert array of flags back to bitfield
    pub fn to_bits(flags: &[Self]) -> u32 {
        flags.iter().fold(0, |bits, flag| bits | *flag as u32)
    }

    /// MDL keyword
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unshaded => "Unshaded",
            Self::SphereEnvMap => "SphereEnvMap",
            Self::TwoSided => "TwoSided",
            Self::Unfogged => "Unfogged",
            Self::NoDepthTest => "NoDepthTest",
            Self::NoDepthSet => "NoDepthSet",
        }
    }
}

/// Material-level bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialFlags {
    ConstantColor = 0x1,
    SortPrimsNearZ = 0x8,
    SortPrimsFarZ = 0x10,
    FullResolution = 0x20,
}

impl MaterialFlags {
    pub const ALL: [Self; 4] = [
        Self::ConstantColor,
        Self::SortPrimsNearZ,
        Self::SortPrimsFarZ,
        Self::FullResolution,
    ];

    pub fn from_bits(bits: u32) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|flag| bits & *flag as u32 != 0)
            .collect()
    }

    pub fn to_bits(flags: &[Self]) -> u32 {
        flags.iter().fold(0, |bits, flag| bits | *flag as u32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstantColor => "ConstantColor",
            Self::SortPrimsNearZ => "SortPrimsNearZ",
            Self::SortPrimsFarZ => "SortPrimsFarZ",
            Self::FullResolution => "FullResolution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shading_bits_round_trip() {
        let flags = ShadingFlags::from_bits(0x1 | 0x10 | 0x80);
        assert_eq!(
            flags,
            vec![ShadingFlags::Unshaded, ShadingFlags::TwoSided, ShadingFlags::NoDepthSet]
        );
        assert_eq!(ShadingFlags::to_bits(&flags), 0x91);
    }

    #[test]
    fn unknown_bits_are_ignored() {
        assert!(MaterialFlags::from_bits(0x100).is_empty());
    }
}
