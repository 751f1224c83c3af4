use serde::{Deserialize, Serialize};

/// Upper bound of the normalized coordinate space used for absolute mouse moves
pub const ABSOLUTE_COORD_MAX: i32 = u16::MAX as i32;

/// Idle time preceding the next recorded event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayEvent {
    /// Idle time in milliseconds
    pub milliseconds: u32,
}

impl DelayEvent {
    pub fn new(milliseconds: u32) -> Self {
        Self { milliseconds }
    }

    /// Fold additional idle time into this entry. Saturates instead of wrapping.
    pub fn add_delay(&mut self, milliseconds: u32) {
        self.milliseconds = self.milliseconds.saturating_add(milliseconds);
    }
}

/// Represents a keyboard transition, stored by scan code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyEvent {
    /// Hardware scan code (layout independent)
    pub scan_code: u16,

    /// Whether the key was pressed or released
    pub pressed: bool,

    /// Whether the scan code carries the E0 extended prefix
    pub extended: bool,
}

/// Represents a mouse move
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseMoveEvent {
    pub x: i32,
    pub y: i32,

    /// When set, `x`/`y` are normalized to `0..=ABSOLUTE_COORD_MAX` of the
    /// capture surface. Otherwise they are raw relative deltas.
    pub absolute: bool,
}

impl MouseMoveEvent {
    /// A relative move that goes nowhere
    pub fn is_null_relative(&self) -> bool {
        !self.absolute && self.x == 0 && self.y == 0
    }
}

/// Represents the primary mouse buttons
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClickButton {
    Left,
    Right,
    Middle,
}

/// Represents the side (extra) mouse buttons
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum XButton {
    X1,
    X2,
}

/// Any mouse button, as understood by the injection sink
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl From<ClickButton> for MouseButton {
    fn from(button: ClickButton) -> Self {
        match button {
            ClickButton::Left => MouseButton::Left,
            ClickButton::Right => MouseButton::Right,
            ClickButton::Middle => MouseButton::Middle,
        }
    }
}

impl From<XButton> for MouseButton {
    fn from(button: XButton) -> Self {
        match button {
            XButton::X1 => MouseButton::X1,
            XButton::X2 => MouseButton::X2,
        }
    }
}

/// Represents a primary button transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseClickEvent {
    pub pressed: bool,
    pub button: ClickButton,
}

/// Represents a side button transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseXClickEvent {
    pub pressed: bool,
    pub button: XButton,
}

/// Represents wheel movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MouseScrollEvent {
    /// Signed wheel notches, positive away from the user
    pub ticks: i16,
}

/// Represents one entry of a recorded macro
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InputEvent {
    /// Idle time before the next entry
    Delay(DelayEvent),

    /// A keyboard event
    Key(KeyEvent),

    /// A mouse move
    MouseMove(MouseMoveEvent),

    /// A left/right/middle button event
    MouseClick(MouseClickEvent),

    /// A side button event
    MouseXClick(MouseXClickEvent),

    /// A wheel event
    MouseScroll(MouseScrollEvent),
}

impl InputEvent {
    pub fn delay(milliseconds: u32) -> Self {
        InputEvent::Delay(DelayEvent::new(milliseconds))
    }

    pub fn key(scan_code: u16, pressed: bool, extended: bool) -> Self {
        InputEvent::Key(KeyEvent {
            scan_code,
            pressed,
            extended,
        })
    }

    pub fn mouse_move(x: i32, y: i32, absolute: bool) -> Self {
        InputEvent::MouseMove(MouseMoveEvent { x, y, absolute })
    }

    pub fn mouse_click(button: ClickButton, pressed: bool) -> Self {
        InputEvent::MouseClick(MouseClickEvent { pressed, button })
    }

    pub fn mouse_x_click(button: XButton, pressed: bool) -> Self {
        InputEvent::MouseXClick(MouseXClickEvent { pressed, button })
    }

    pub fn mouse_scroll(ticks: i16) -> Self {
        InputEvent::MouseScroll(MouseScrollEvent { ticks })
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, InputEvent::Delay(_))
    }
}

/// Map a pixel coordinate into the normalized absolute range.
pub fn normalize_coord(pixel: i32, extent: i32) -> i32 {
    if extent <= 0 {
        return 0;
    }
    let scaled = i64::from(pixel) * i64::from(ABSOLUTE_COORD_MAX) / i64::from(extent);
    scaled.clamp(0, i64::from(ABSOLUTE_COORD_MAX)) as i32
}

/// Map a normalized absolute coordinate back onto a display of `extent` pixels.
pub fn denormalize_coord(normalized: i32, extent: i32) -> i32 {
    if extent <= 0 {
        return 0;
    }
    let clamped = i64::from(normalized.clamp(0, ABSOLUTE_COORD_MAX));
    (clamped * i64::from(extent) / i64::from(ABSOLUTE_COORD_MAX)) as i32
}
