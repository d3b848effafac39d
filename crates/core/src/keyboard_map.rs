//! Symbolic key names accepted in the `keyboard` field of a cue, mapped to Linux
//! input event key codes.

/// Returned for names with no mapping.
pub const NO_KEY: i32 = -1;

const KEY_ESC: i32 = 1;
const KEY_BACKSPACE: i32 = 14;
const KEY_ENTER: i32 = 28;
const KEY_SPACE: i32 = 57;
const KEY_UP: i32 = 103;
const KEY_LEFT: i32 = 105;
const KEY_RIGHT: i32 = 106;
const KEY_DOWN: i32 = 108;

/// Letter key codes in alphabetical order (`KEY_A` .. `KEY_Z`).
const LETTER_CODES: [i32; 26] = [
    30, 48, 46, 32, 18, 33, 34, 35, 23, 36, 37, 38, 50, 49, 24, 25, 16, 19, 31, 20, 22, 47, 17,
    45, 21, 44,
];

/// Resolve a symbolic key name to its key code, or [`NO_KEY`] if the name is unknown.
pub fn key_code(name: &str) -> i32 {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c {
            'a'..='z' => LETTER_CODES[(c as u8 - b'a') as usize],
            'A'..='Z' => LETTER_CODES[(c as u8 - b'A') as usize],
            // KEY_1 = 2 .. KEY_9 = 10, KEY_0 = 11
            '1'..='9' => (c as u8 - b'1') as i32 + 2,
            '0' => 11,
            _ => NO_KEY,
        };
    }

    match name {
        "bs" | "BS" => KEY_BACKSPACE,
        "ent" | "ENT" => KEY_ENTER,
        "esc" | "ESC" => KEY_ESC,
        "space" | "SPACE" => KEY_SPACE,
        "up" | "UP" => KEY_UP,
        "down" | "DOWN" => KEY_DOWN,
        "left" | "LEFT" => KEY_LEFT,
        "right" | "RIGHT" => KEY_RIGHT,
        _ => NO_KEY,
    }
}
