//! Opaque identifiers for guest windows and host surfaces.

/// Number of registry slots addressable by [`WindowHandle::slot`].
pub const WINDOW_SLOTS: usize = 32768;

/// Guest window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Table slot for this handle.
    ///
    /// Guest handles keep their index in the low word, shifted left by one;
    /// the upper bits are a generation counter. Two handles may therefore
    /// share a slot, so a slot hit must still be checked against the full
    /// handle.
    #[inline]
    pub const fn slot(self) -> u16 {
        (self.0 as u16) >> 1
    }
}

/// Host-side identifier of a native drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSurfaceId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ignores_generation_bits() {
        let a = WindowHandle(0x0001_0024);
        let b = WindowHandle(0x0002_0024);
        assert_eq!(a.slot(), 0x12);
        assert_eq!(a.slot(), b.slot());
        assert!((a.slot() as usize) < WINDOW_SLOTS);
    }
}
