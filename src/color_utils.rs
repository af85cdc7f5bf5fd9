//! Color parsing shared by the renderer and the class list.
//!
//! Class colors are stored as `#rrggbb` strings. Anything that does not parse
//! falls back to the default annotation color so a bad value never stops an
//! annotation from being drawn.

use crate::constants::DEFAULT_CLASS_COLOR;

/// RGBA color, components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const RED: Color = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Same color with an 8-bit alpha.
    pub fn with_alpha(self, alpha: u8) -> Self {
        Self {
            a: alpha as f32 / 255.0,
            ..self
        }
    }
}

/// Parse `#rrggbb` (or `#rrggbbaa`). The leading `#` is optional.
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let alpha = if digits.len() == 8 { byte(6)? } else { 0xff };
    Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, alpha))
}

/// Parse a class color, falling back to the default annotation color.
pub fn class_color(hex: &str) -> Color {
    parse_hex(hex).unwrap_or_else(|| {
        log::debug!("Invalid color {:?}, using {}", hex, DEFAULT_CLASS_COLOR);
        Color::RED
    })
}

/// Whether a string is a valid `#rrggbb` color.
pub fn is_valid_hex(hex: &str) -> bool {
    hex.starts_with('#') && hex.len() == 7 && parse_hex(hex).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_parse_hex() {
        let c = parse_hex("#3aa757").unwrap();
        assert!(approx_eq(c.r, 0x3a as f32 / 255.0));
        assert!(approx_eq(c.g, 0xa7 as f32 / 255.0));
        assert!(approx_eq(c.b, 0x57 as f32 / 255.0));
        assert!(approx_eq(c.a, 1.0));
        assert_eq!(parse_hex("FF0000"), Some(Color::RED));
    }

    #[test]
    fn test_parse_hex_with_alpha() {
        let c = parse_hex("#ff000040").unwrap();
        assert!(approx_eq(c.a, 0x40 as f32 / 255.0));
    }

    #[test]
    fn test_invalid_colors_fall_back_to_red() {
        for bad in ["", "#", "#12345", "#gg0000", "red", "#ffffffffff", "#ééé"] {
            assert!(parse_hex(bad).is_none(), "{:?}", bad);
            assert_eq!(class_color(bad), Color::RED);
        }
    }

    #[test]
    fn test_with_alpha_keeps_channels() {
        let base = parse_hex("#3aa757").unwrap();
        let c = base.with_alpha(0x40);
        assert!(approx_eq(c.a, 0.25));
        assert_eq!((c.r, c.g, c.b), (base.r, base.g, base.b));
    }

    #[test]
    fn test_is_valid_hex() {
        assert!(is_valid_hex("#00ff00"));
        assert!(!is_valid_hex("00ff00"));
        assert!(!is_valid_hex("#00ff0080"));
        assert!(!is_valid_hex("#ééé0"));
    }
}
