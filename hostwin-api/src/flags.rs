//! Guest flag words that cross into the driver.

use bitflags::bitflags;

bitflags! {
    /// Window-positioning flags passed with geometry changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PosFlags: u32 {
        const NOSIZE = 0x0001;
        const NOMOVE = 0x0002;
        const NOZORDER = 0x0004;
        const NOREDRAW = 0x0008;
        const NOACTIVATE = 0x0010;
        const FRAMECHANGED = 0x0020;
        const SHOWWINDOW = 0x0040;
        const HIDEWINDOW = 0x0080;
        const NOCLIENTSIZE = 0x0800;
        const NOCLIENTMOVE = 0x1000;
    }
}

bitflags! {
    /// The subset of window style bits the driver looks at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowStyle: u32 {
        const MINIMIZE = 0x2000_0000;
        const VISIBLE = 0x1000_0000;
        const CHILD = 0x4000_0000;
    }
}

bitflags! {
    /// The subset of extended style bits the driver looks at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExStyle: u32 {
        const LAYERED = 0x0008_0000;
    }
}

bitflags! {
    /// Which layered-window attributes are in effect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayeredFlags: u32 {
        const COLORKEY = 0x1;
        const ALPHA = 0x2;
    }
}

bitflags! {
    /// Event categories a message wait is willing to service.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AdmitMask: u32 {
        const KEY = 0x0001;
        const MOUSE = 0x0006;
        const POST_MESSAGE = 0x0008;
        const TIMER = 0x0010;
        const PAINT = 0x0020;
        const SEND_MESSAGE = 0x0040;
        const HOTKEY = 0x0080;
        const ALL_INPUT = Self::KEY.bits()
            | Self::MOUSE.bits()
            | Self::POST_MESSAGE.bits()
            | Self::TIMER.bits()
            | Self::PAINT.bits()
            | Self::SEND_MESSAGE.bits()
            | Self::HOTKEY.bits();
    }
}

/// Which style word a style change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Style,
    ExStyle,
}
