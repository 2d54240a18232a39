//! Keysym and modifier names accepted in keybind definitions.

/// X11 modifier mask bits (xproto KeyButMask).
pub const SHIFT: u16 = 1 << 0;
pub const LOCK: u16 = 1 << 1;
pub const CONTROL: u16 = 1 << 2;
pub const MOD1: u16 = 1 << 3;
pub const MOD2: u16 = 1 << 4;
pub const MOD3: u16 = 1 << 5;
pub const MOD4: u16 = 1 << 6;
pub const MOD5: u16 = 1 << 7;

pub fn modifier_from_name(name: &str) -> Option<u16> {
    match name.to_ascii_lowercase().as_str() {
        "shift" => Some(SHIFT),
        "control" | "ctrl" => Some(CONTROL),
        "mod1" | "alt" => Some(MOD1),
        "mod2" => Some(MOD2),
        "mod3" => Some(MOD3),
        "mod4" | "super" => Some(MOD4),
        "mod5" => Some(MOD5),
        _ => None,
    }
}

/// Resolves a key name to its keysym. Printable ASCII maps directly; the
/// named keys cover what keybinds realistically use.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    if name.len() == 1 {
        let c = name.chars().next()?;
        if c.is_ascii_graphic() {
            return Some(c.to_ascii_lowercase() as u32);
        }
    }

    let sym = match name.to_ascii_lowercase().as_str() {
        "return" | "enter" => 0xff0d,
        "escape" => 0xff1b,
        "space" => 0x0020,
        "tab" => 0xff09,
        "backspace" => 0xff08,
        "delete" => 0xffff,
        "home" => 0xff50,
        "end" => 0xff57,
        "prior" | "pageup" => 0xff55,
        "next" | "pagedown" => 0xff56,
        "left" => 0xff51,
        "up" => 0xff52,
        "right" => 0xff53,
        "down" => 0xff54,
        "print" => 0xff61,
        "f1" => 0xffbe,
        "f2" => 0xffbf,
        "f3" => 0xffc0,
        "f4" => 0xffc1,
        "f5" => 0xffc2,
        "f6" => 0xffc3,
        "f7" => 0xffc4,
        "f8" => 0xffc5,
        "f9" => 0xffc6,
        "f10" => 0xffc7,
        "f11" => 0xffc8,
        "f12" => 0xffc9,
        _ => return None,
    };
    Some(sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_keys_map_to_their_codepoint() {
        assert_eq!(keysym_from_name("j"), Some('j' as u32));
        assert_eq!(keysym_from_name("1"), Some('1' as u32));
        assert_eq!(keysym_from_name("J"), Some('j' as u32));
    }

    #[test]
    fn named_keys_resolve() {
        assert_eq!(keysym_from_name("Return"), Some(0xff0d));
        assert_eq!(keysym_from_name("F4"), Some(0xffc1));
        assert_eq!(keysym_from_name("nosuchkey"), None);
    }

    #[test]
    fn modifier_names_resolve() {
        assert_eq!(modifier_from_name("Mod4"), Some(MOD4));
        assert_eq!(modifier_from_name("super"), Some(MOD4));
        assert_eq!(modifier_from_name("Shift"), Some(SHIFT));
        assert_eq!(modifier_from_name("hyper"), None);
    }
}
