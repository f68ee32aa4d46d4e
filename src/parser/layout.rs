//! Fixed field widths, sentinels and version thresholds shared by the MDX
//! reader and writer.

/// Null-padded name fields
pub const NAME_WIDTH: usize = 0x50;
/// Null-padded file path fields
pub const PATH_WIDTH: usize = 0x104;

/// An absent optional index has all bits set.
pub const NONE_INDEX: u32 = u32::MAX;

/// Geoset selection flag bit
pub const SELECTION_UNSELECTABLE: u32 = 4;

/// Materials gain a shader name and layers an emissive gain from here on.
pub const EMISSIVE_VERSION: u32 = 900;
/// Layers gain fresnel color, opacity and team color from here on.
pub const FRESNEL_VERSION: u32 = 1000;

pub fn optional_index(raw: u32) -> Option<u32> {
    (raw != NONE_INDEX).then_some(raw)
}

pub fn raw_index(index: Option<u32>) -> u32 {
    index.unwrap_or(NONE_INDEX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_index_maps_to_absent() {
        assert_eq!(optional_index(NONE_INDEX), None);
        assert_eq!(optional_index(3), Some(3));
        assert_eq!(raw_index(None), u32::MAX);
        assert_eq!(raw_index(optional_index(7)), 7);
    }
}
