//! Device-level input records and their translation into [`InputEvent`]s

use crate::events::{ClickButton, InputEvent, XButton};
use crate::keys::{scan_code_to_virtual_key, virtual_key_is_extended, virtual_key_to_scan_code};

pub const MOUSE_MOVE_RELATIVE: u16 = 0x00;
pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x01;

pub const LEFT_BUTTON_DOWN: u16 = 0x0001;
pub const LEFT_BUTTON_UP: u16 = 0x0002;
pub const RIGHT_BUTTON_DOWN: u16 = 0x0004;
pub const RIGHT_BUTTON_UP: u16 = 0x0008;
pub const MIDDLE_BUTTON_DOWN: u16 = 0x0010;
pub const MIDDLE_BUTTON_UP: u16 = 0x0020;
pub const BUTTON_4_DOWN: u16 = 0x0040;
pub const BUTTON_4_UP: u16 = 0x0080;
pub const BUTTON_5_DOWN: u16 = 0x0100;
pub const BUTTON_5_UP: u16 = 0x0200;
pub const WHEEL: u16 = 0x0400;

/// Wheel rotation reported for one notch
pub const WHEEL_DELTA: i16 = 120;

pub const KEY_BREAK: u16 = 0x01;
pub const KEY_E0: u16 = 0x02;

/// One raw mouse report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMouse {
    pub flags: u16,
    pub last_x: i32,
    pub last_y: i32,
    pub button_flags: u16,
    pub button_data: u16,
}

impl RawMouse {
    pub fn relative(dx: i32, dy: i32) -> Self {
        Self {
            flags: MOUSE_MOVE_RELATIVE,
            last_x: dx,
            last_y: dy,
            ..Default::default()
        }
    }

    pub fn absolute(x: i32, y: i32) -> Self {
        Self {
            flags: MOUSE_MOVE_ABSOLUTE,
            last_x: x,
            last_y: y,
            ..Default::default()
        }
    }

    /// A report with only button transitions
    pub fn buttons(button_flags: u16) -> Self {
        Self {
            button_flags,
            ..Default::default()
        }
    }

    /// A wheel report of `ticks` notches
    pub fn wheel(ticks: i16) -> Self {
        Self {
            button_flags: WHEEL,
            button_data: ticks.saturating_mul(WHEEL_DELTA) as u16,
            ..Default::default()
        }
    }

    fn has(&self, bit: u16) -> bool {
        self.button_flags & bit != 0
    }

    /// Events carried by this report, in the order they are recorded.
    pub fn to_events(&self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        if self.flags & MOUSE_MOVE_ABSOLUTE != 0 {
            events.push(InputEvent::mouse_move(self.last_x, self.last_y, true));
        } else if self.last_x != 0 || self.last_y != 0 {
            events.push(InputEvent::mouse_move(self.last_x, self.last_y, false));
        }

        let clicks = [
            (ClickButton::Left, LEFT_BUTTON_DOWN, LEFT_BUTTON_UP),
            (ClickButton::Right, RIGHT_BUTTON_DOWN, RIGHT_BUTTON_UP),
            (ClickButton::Middle, MIDDLE_BUTTON_DOWN, MIDDLE_BUTTON_UP),
        ];
        for (button, down, up) in clicks {
            if self.has(down) {
                events.push(InputEvent::mouse_click(button, true));
            } else if self.has(up) {
                events.push(InputEvent::mouse_click(button, false));
            }
        }

        let x_clicks = [
            (XButton::X1, BUTTON_4_DOWN, BUTTON_4_UP),
            (XButton::X2, BUTTON_5_DOWN, BUTTON_5_UP),
        ];
        for (button, down, up) in x_clicks {
            if self.has(down) {
                events.push(InputEvent::mouse_x_click(button, true));
            } else if self.has(up) {
                events.push(InputEvent::mouse_x_click(button, false));
            }
        }

        if self.has(WHEEL) {
            events.push(InputEvent::mouse_scroll(self.button_data as i16 / WHEEL_DELTA));
        }

        events
    }
}

/// One raw keyboard report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawKeyboard {
    pub make_code: u16,
    pub flags: u16,
    pub vkey: u16,
}

impl RawKeyboard {
    /// Build a report from a virtual key, filling the scan code from the table.
    pub fn from_virtual_key(vkey: u16, pressed: bool) -> Self {
        let mut flags = if pressed { 0 } else { KEY_BREAK };
        if virtual_key_is_extended(vkey) {
            flags |= KEY_E0;
        }
        Self {
            make_code: virtual_key_to_scan_code(vkey).unwrap_or_default(),
            flags,
            vkey,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.flags & KEY_BREAK == 0
    }

    pub fn is_extended(&self) -> bool {
        self.flags & KEY_E0 != 0
    }

    /// The virtual key, looked up from the scan code when the report has none.
    pub fn virtual_key(&self) -> Option<u16> {
        if self.vkey != 0 {
            return Some(self.vkey);
        }
        scan_code_to_virtual_key(self.make_code, self.is_extended())
    }

    /// The scan code, looked up from the virtual key when the report has none.
    pub fn scan_code(&self) -> Option<u16> {
        if self.make_code != 0 {
            return Some(self.make_code);
        }
        virtual_key_to_scan_code(self.vkey)
    }

    /// The recordable key event, or `None` when neither code resolves.
    pub fn to_event(&self) -> Option<InputEvent> {
        let scan_code = self.scan_code()?;
        let extended = self.is_extended() || (self.make_code == 0 && virtual_key_is_extended(self.vkey));
        Some(InputEvent::key(scan_code, self.is_pressed(), extended))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_CONTROL, VK_RIGHT};

    #[test]
    fn test_zero_relative_move_is_dropped() {
        assert!(RawMouse::relative(0, 0).to_events().is_empty());
        assert_eq!(
            RawMouse::relative(-4, 0).to_events(),
            vec![InputEvent::mouse_move(-4, 0, false)]
        );
    }

    #[test]
    fn test_absolute_move_always_kept() {
        assert_eq!(
            RawMouse::absolute(0, 0).to_events(),
            vec![InputEvent::mouse_move(0, 0, true)]
        );
    }

    #[test]
    fn test_event_order() {
        let raw = RawMouse {
            flags: MOUSE_MOVE_RELATIVE,
            last_x: 3,
            last_y: 1,
            button_flags: BUTTON_5_UP | LEFT_BUTTON_DOWN | WHEEL | MIDDLE_BUTTON_UP | RIGHT_BUTTON_UP,
            button_data: (-240i16) as u16,
        };
        assert_eq!(
            raw.to_events(),
            vec![
                InputEvent::mouse_move(3, 1, false),
                InputEvent::mouse_click(ClickButton::Left, true),
                InputEvent::mouse_click(ClickButton::Right, false),
                InputEvent::mouse_click(ClickButton::Middle, false),
                InputEvent::mouse_x_click(XButton::X2, false),
                InputEvent::mouse_scroll(-2),
            ]
        );
    }

    #[test]
    fn test_wheel_constructor() {
        assert_eq!(RawMouse::wheel(3).to_events(), vec![InputEvent::mouse_scroll(3)]);
        assert_eq!(RawMouse::wheel(-1).to_events(), vec![InputEvent::mouse_scroll(-1)]);
    }

    #[test]
    fn test_keyboard_flags() {
        let raw = RawKeyboard {
            make_code: 0x1D,
            flags: KEY_BREAK | KEY_E0,
            vkey: VK_CONTROL,
        };
        assert!(!raw.is_pressed());
        assert_eq!(raw.to_event(), Some(InputEvent::key(0x1D, false, true)));
    }

    #[test]
    fn test_keyboard_backfill() {
        let no_vkey = RawKeyboard {
            make_code: 0x1E,
            flags: 0,
            vkey: 0,
        };
        assert_eq!(no_vkey.virtual_key(), Some(u16::from(b'A')));

        let no_scan = RawKeyboard {
            make_code: 0,
            flags: 0,
            vkey: VK_RIGHT,
        };
        assert_eq!(no_scan.to_event(), Some(InputEvent::key(0x4D, true, true)));

        assert_eq!(RawKeyboard::default().to_event(), None);
    }

    #[test]
    fn test_from_virtual_key() {
        let raw = RawKeyboard::from_virtual_key(VK_RIGHT, false);
        assert_eq!(raw.make_code, 0x4D);
        assert!(raw.is_extended());
        assert!(!raw.is_pressed());
    }
}
