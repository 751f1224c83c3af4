//! Virtual-key / scan-code / character translation.
//!
//! Recordings store hardware scan codes so they replay the same physical keys
//! regardless of the active layout, while hot keys and bindings are configured
//! with virtual keys. The table below covers a US 101/104-key keyboard using
//! scan code set 1.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_PAUSE: u16 = 0x13;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_SPACE: u16 = 0x20;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_SNAPSHOT: u16 = 0x2C;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_LWIN: u16 = 0x5B;
pub const VK_RWIN: u16 = 0x5C;
pub const VK_APPS: u16 = 0x5D;
pub const VK_NUMPAD0: u16 = 0x60;
pub const VK_MULTIPLY: u16 = 0x6A;
pub const VK_ADD: u16 = 0x6B;
pub const VK_SUBTRACT: u16 = 0x6D;
pub const VK_DECIMAL: u16 = 0x6E;
pub const VK_DIVIDE: u16 = 0x6F;
pub const VK_F1: u16 = 0x70;
pub const VK_F2: u16 = 0x71;
pub const VK_F24: u16 = 0x87;
pub const VK_NUMLOCK: u16 = 0x90;
pub const VK_SCROLL: u16 = 0x91;
pub const VK_OEM_1: u16 = 0xBA;
pub const VK_OEM_PLUS: u16 = 0xBB;
pub const VK_OEM_COMMA: u16 = 0xBC;
pub const VK_OEM_MINUS: u16 = 0xBD;
pub const VK_OEM_PERIOD: u16 = 0xBE;
pub const VK_OEM_2: u16 = 0xBF;
pub const VK_OEM_3: u16 = 0xC0;
pub const VK_OEM_4: u16 = 0xDB;
pub const VK_OEM_5: u16 = 0xDC;
pub const VK_OEM_6: u16 = 0xDD;
pub const VK_OEM_7: u16 = 0xDE;

/// One physical key
struct KeyEntry {
    vk: u16,
    scan: u16,
    extended: bool,
    name: &'static str,
    /// Unshifted and shifted characters produced by the key
    chars: &'static [char],
}

const fn key(vk: u16, scan: u16, name: &'static str, chars: &'static [char]) -> KeyEntry {
    KeyEntry { vk, scan, extended: false, name, chars }
}

const fn ext(vk: u16, scan: u16, name: &'static str) -> KeyEntry {
    KeyEntry { vk, scan, extended: true, name, chars: &[] }
}

// The first entry for a virtual key wins for vk -> scan lookups, so left-hand
// modifiers come before their right-hand twins.
const KEYS: &[KeyEntry] = &[
    key(VK_ESCAPE, 0x01, "Escape", &[]),
    key(0x31, 0x02, "1", &['1', '!']),
    key(0x32, 0x03, "2", &['2', '@']),
    key(0x33, 0x04, "3", &['3', '#']),
    key(0x34, 0x05, "4", &['4', '$']),
    key(0x35, 0x06, "5", &['5', '%']),
    key(0x36, 0x07, "6", &['6', '^']),
    key(0x37, 0x08, "7", &['7', '&']),
    key(0x38, 0x09, "8", &['8', '*']),
    key(0x39, 0x0A, "9", &['9', '(']),
    key(0x30, 0x0B, "0", &['0', ')']),
    key(VK_OEM_MINUS, 0x0C, "-", &['-', '_']),
    key(VK_OEM_PLUS, 0x0D, "=", &['=', '+']),
    key(VK_BACK, 0x0E, "Backspace", &['\x08']),
    key(VK_TAB, 0x0F, "Tab", &['\t']),
    key(0x51, 0x10, "Q", &['q', 'Q']),
    key(0x57, 0x11, "W", &['w', 'W']),
    key(0x45, 0x12, "E", &['e', 'E']),
    key(0x52, 0x13, "R", &['r', 'R']),
    key(0x54, 0x14, "T", &['t', 'T']),
    key(0x59, 0x15, "Y", &['y', 'Y']),
    key(0x55, 0x16, "U", &['u', 'U']),
    key(0x49, 0x17, "I", &['i', 'I']),
    key(0x4F, 0x18, "O", &['o', 'O']),
    key(0x50, 0x19, "P", &['p', 'P']),
    key(VK_OEM_4, 0x1A, "[", &['[', '{']),
    key(VK_OEM_6, 0x1B, "]", &[']', '}']),
    key(VK_RETURN, 0x1C, "Enter", &['\n', '\r']),
    key(VK_CONTROL, 0x1D, "Ctrl", &[]),
    key(0x41, 0x1E, "A", &['a', 'A']),
    key(0x53, 0x1F, "S", &['s', 'S']),
    key(0x44, 0x20, "D", &['d', 'D']),
    key(0x46, 0x21, "F", &['f', 'F']),
    key(0x47, 0x22, "G", &['g', 'G']),
    key(0x48, 0x23, "H", &['h', 'H']),
    key(0x4A, 0x24, "J", &['j', 'J']),
    key(0x4B, 0x25, "K", &['k', 'K']),
    key(0x4C, 0x26, "L", &['l', 'L']),
    key(VK_OEM_1, 0x27, ";", &[';', ':']),
    key(VK_OEM_7, 0x28, "'", &['\'', '"']),
    key(VK_OEM_3, 0x29, "`", &['`', '~']),
    key(VK_SHIFT, 0x2A, "Shift", &[]),
    key(VK_OEM_5, 0x2B, "\\", &['\\', '|']),
    key(0x5A, 0x2C, "Z", &['z', 'Z']),
    key(0x58, 0x2D, "X", &['x', 'X']),
    key(0x43, 0x2E, "C", &['c', 'C']),
    key(0x56, 0x2F, "V", &['v', 'V']),
    key(0x42, 0x30, "B", &['b', 'B']),
    key(0x4E, 0x31, "N", &['n', 'N']),
    key(0x4D, 0x32, "M", &['m', 'M']),
    key(VK_OEM_COMMA, 0x33, ",", &[',', '<']),
    key(VK_OEM_PERIOD, 0x34, ".", &['.', '>']),
    key(VK_OEM_2, 0x35, "/", &['/', '?']),
    key(VK_SHIFT, 0x36, "Shift", &[]),
    key(VK_MULTIPLY, 0x37, "Num*", &[]),
    key(VK_MENU, 0x38, "Alt", &[]),
    key(VK_SPACE, 0x39, "Space", &[' ']),
    key(VK_CAPITAL, 0x3A, "CapsLock", &[]),
    key(VK_F1, 0x3B, "F1", &[]),
    key(0x71, 0x3C, "F2", &[]),
    key(0x72, 0x3D, "F3", &[]),
    key(0x73, 0x3E, "F4", &[]),
    key(0x74, 0x3F, "F5", &[]),
    key(0x75, 0x40, "F6", &[]),
    key(0x76, 0x41, "F7", &[]),
    key(0x77, 0x42, "F8", &[]),
    key(0x78, 0x43, "F9", &[]),
    key(0x79, 0x44, "F10", &[]),
    key(VK_NUMLOCK, 0x45, "NumLock", &[]),
    key(VK_SCROLL, 0x46, "ScrollLock", &[]),
    key(0x67, 0x47, "Num7", &[]),
    key(0x68, 0x48, "Num8", &[]),
    key(0x69, 0x49, "Num9", &[]),
    key(VK_SUBTRACT, 0x4A, "Num-", &[]),
    key(0x64, 0x4B, "Num4", &[]),
    key(0x65, 0x4C, "Num5", &[]),
    key(0x66, 0x4D, "Num6", &[]),
    key(VK_ADD, 0x4E, "Num+", &[]),
    key(0x61, 0x4F, "Num1", &[]),
    key(0x62, 0x50, "Num2", &[]),
    key(0x63, 0x51, "Num3", &[]),
    key(VK_NUMPAD0, 0x52, "Num0", &[]),
    key(VK_DECIMAL, 0x53, "Num.", &[]),
    key(0x7A, 0x57, "F11", &[]),
    key(0x7B, 0x58, "F12", &[]),
    key(0x7C, 0x64, "F13", &[]),
    key(0x7D, 0x65, "F14", &[]),
    key(0x7E, 0x66, "F15", &[]),
    key(0x7F, 0x67, "F16", &[]),
    key(0x80, 0x68, "F17", &[]),
    key(0x81, 0x69, "F18", &[]),
    key(0x82, 0x6A, "F19", &[]),
    key(0x83, 0x6B, "F20", &[]),
    key(0x84, 0x6C, "F21", &[]),
    key(0x85, 0x6D, "F22", &[]),
    key(0x86, 0x6E, "F23", &[]),
    key(VK_F24, 0x76, "F24", &[]),
    ext(VK_RETURN, 0x1C, "Enter"),
    ext(VK_CONTROL, 0x1D, "Ctrl"),
    ext(VK_DIVIDE, 0x35, "Num/"),
    ext(VK_SNAPSHOT, 0x37, "PrintScreen"),
    ext(VK_MENU, 0x38, "Alt"),
    ext(VK_PAUSE, 0x45, "Pause"),
    ext(VK_HOME, 0x47, "Home"),
    ext(VK_UP, 0x48, "Up"),
    ext(VK_PRIOR, 0x49, "PageUp"),
    ext(VK_LEFT, 0x4B, "Left"),
    ext(VK_RIGHT, 0x4D, "Right"),
    ext(VK_END, 0x4F, "End"),
    ext(VK_DOWN, 0x50, "Down"),
    ext(VK_NEXT, 0x51, "PageDown"),
    ext(VK_INSERT, 0x52, "Insert"),
    ext(VK_DELETE, 0x53, "Delete"),
    ext(VK_LWIN, 0x5B, "Win"),
    ext(VK_RWIN, 0x5C, "Win"),
    ext(VK_APPS, 0x5D, "Apps"),
];

const NAME_ALIASES: &[(&str, u16)] = &[
    ("control", VK_CONTROL),
    ("menu", VK_MENU),
    ("esc", VK_ESCAPE),
    ("return", VK_RETURN),
    ("pgup", VK_PRIOR),
    ("pgdn", VK_NEXT),
    ("del", VK_DELETE),
    ("ins", VK_INSERT),
    ("plus", VK_OEM_PLUS),
    ("minus", VK_OEM_MINUS),
];

struct KeyTable {
    vk_to_index: HashMap<u16, usize>,
    scan_to_vk: HashMap<(u16, bool), u16>,
    char_to_vk: HashMap<char, u16>,
    name_to_vk: HashMap<String, u16>,
}

impl KeyTable {
    fn build() -> Self {
        let mut table = KeyTable {
            vk_to_index: HashMap::new(),
            scan_to_vk: HashMap::new(),
            char_to_vk: HashMap::new(),
            name_to_vk: HashMap::new(),
        };

        for (index, entry) in KEYS.iter().enumerate() {
            table.vk_to_index.entry(entry.vk).or_insert(index);
            table.scan_to_vk.entry((entry.scan, entry.extended)).or_insert(entry.vk);
            for &ch in entry.chars {
                table.char_to_vk.entry(ch).or_insert(entry.vk);
            }
            table
                .name_to_vk
                .entry(entry.name.to_ascii_lowercase())
                .or_insert(entry.vk);
        }
        for &(alias, vk) in NAME_ALIASES {
            table.name_to_vk.insert(alias.to_string(), vk);
        }

        table
    }
}

fn table() -> &'static KeyTable {
    static TABLE: OnceLock<KeyTable> = OnceLock::new();
    TABLE.get_or_init(KeyTable::build)
}

/// Scan code of the key that produces `vk`.
pub fn virtual_key_to_scan_code(vk: u16) -> Option<u16> {
    let t = table();
    t.vk_to_index.get(&vk).map(|&i| KEYS[i].scan)
}

/// Whether `vk` is reported with the E0 prefix by its primary key.
pub fn virtual_key_is_extended(vk: u16) -> bool {
    let t = table();
    t.vk_to_index.get(&vk).is_some_and(|&i| KEYS[i].extended)
}

/// Virtual key for a scan code. Extended codes without their own entry fall
/// back to the plain code.
pub fn scan_code_to_virtual_key(scan_code: u16, extended: bool) -> Option<u16> {
    let t = table();
    t.scan_to_vk
        .get(&(scan_code, extended))
        .or_else(|| extended.then(|| t.scan_to_vk.get(&(scan_code, false))).flatten())
        .copied()
}

/// Virtual key of the key that types `ch` (shifted characters map to the same key).
pub fn char_to_virtual_key(ch: char) -> Option<u16> {
    table().char_to_vk.get(&ch).copied()
}

/// Display name of a virtual key, e.g. `Ctrl`, `F1`, `A`.
pub fn key_name(vk: u16) -> String {
    let t = table();
    match t.vk_to_index.get(&vk) {
        Some(&i) => KEYS[i].name.to_string(),
        None => format!("VK{:#04X}", vk),
    }
}

/// Parse a single key name (case-insensitive), e.g. `ctrl`, `Escape`, `a`.
pub fn virtual_key_from_name(name: &str) -> Option<u16> {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if let Some(vk) = char_to_virtual_key(ch) {
            return Some(vk);
        }
    }
    table().name_to_vk.get(&trimmed.to_ascii_lowercase()).copied()
}
