//! Guest color references and the compositor's color key.

/// A guest color reference, laid out as `0x00BBGGRR`.
///
/// The high byte carries the encoding: `0x01` marks a palette index and
/// `0x10ff` in the high word marks a DIB color-table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorRef(pub u32);

impl ColorRef {
    /// "No color" marker.
    pub const INVALID: Self = Self(0xffff_ffff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self((r as u32) | ((g as u32) << 8) | ((b as u32) << 16))
    }

    pub const fn red(self) -> u8 {
        self.0 as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        (self.0 >> 16) as u8
    }
}

/// Color treated as fully transparent during flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorKey {
    #[default]
    Disabled,
    /// Key in pixel order, `0x00RRGGBB`.
    Rgb(u32),
}

impl ColorKey {
    /// Convert a guest color reference into a key for a 32-bit surface.
    ///
    /// Palette and DIB indices cannot be resolved against a true-color
    /// surface and map to black.
    pub fn from_color_ref(key: ColorRef) -> Self {
        if key == ColorRef::INVALID {
            ColorKey::Disabled
        } else if key.0 & (1 << 24) != 0 {
            ColorKey::Rgb(0)
        } else if key.0 >> 16 == 0x10ff {
            ColorKey::Rgb(0)
        } else {
            ColorKey::Rgb(
                ((key.red() as u32) << 16) | ((key.green() as u32) << 8) | key.blue() as u32,
            )
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, ColorKey::Rgb(_))
    }

    /// Whether a source pixel's color bits equal the key.
    #[inline]
    pub fn matches(self, pixel: u32) -> bool {
        match self {
            ColorKey::Disabled => false,
            ColorKey::Rgb(key) => pixel & 0x00ff_ffff == key,
        }
    }
}
