//! Bitmap format descriptors for surface buffers.

/// How pixel bits map to color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain BGRA; the top byte is real per-pixel coverage.
    Rgb,
    /// Explicit channel masks; the top byte is unused.
    BitFields,
}

/// Size of a bitmap info header without color table.
const INFO_HEADER_SIZE: usize = 40;

/// Describes a surface buffer the way the guest graphics layer expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapFormat {
    pub width: i32,
    /// Negative for top-down buffers.
    pub height: i32,
    pub bit_count: u16,
    pub compression: Compression,
    /// Red, green and blue masks; zero for [`Compression::Rgb`].
    pub masks: [u32; 3],
}

impl BitmapFormat {
    /// Top-down 32-bit format for a surface of the given size.
    ///
    /// Per-pixel alpha surfaces carry coverage in the top byte; the others use
    /// channel masks and are treated as opaque.
    pub fn new(width: i32, height: i32, per_pixel_alpha: bool) -> Self {
        let (compression, masks) = if per_pixel_alpha {
            (Compression::Rgb, [0; 3])
        } else {
            (Compression::BitFields, [0x00ff_0000, 0x0000_ff00, 0x0000_00ff])
        };
        Self {
            width,
            height: -height,
            bit_count: 32,
            compression,
            masks,
        }
    }

    #[inline]
    pub fn has_per_pixel_alpha(&self) -> bool {
        self.compression == Compression::Rgb
    }

    /// Number of rows, whatever the orientation.
    #[inline]
    pub fn rows(&self) -> usize {
        self.height.unsigned_abs() as usize
    }

    /// Row pitch in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        dib_stride(self.width, self.bit_count)
    }

    /// Buffer size in bytes.
    #[inline]
    pub fn image_size(&self) -> usize {
        dib_image_size(self.width, self.height, self.bit_count)
    }

    /// Size of the info block describing this format, including masks.
    pub fn info_size(&self) -> usize {
        match self.compression {
            Compression::BitFields => INFO_HEADER_SIZE + 3 * 4,
            Compression::Rgb => INFO_HEADER_SIZE,
        }
    }
}

/// Row pitch in bytes: rows are padded to 4-byte boundaries.
#[inline]
pub fn dib_stride(width: i32, bit_count: u16) -> usize {
    let bits = width.max(0) as usize * bit_count as usize;
    ((bits + 31) >> 3) & !3
}

#[inline]
pub fn dib_image_size(width: i32, height: i32, bit_count: u16) -> usize {
    dib_stride(width, bit_count) * height.unsigned_abs() as usize
}
