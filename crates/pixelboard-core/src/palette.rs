use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::PaletteError;

fn hex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static pattern is valid"))
}

/// Opaque RGB color, written as `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Convert to upper-case CSS hex color string
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse from a `#RRGGBB` string (case-insensitive)
    pub fn from_hex(hex: &str) -> Result<Self, PaletteError> {
        let hex = hex.trim();
        if !hex_pattern().is_match(hex) {
            return Err(PaletteError::MalformedColor(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| PaletteError::MalformedColor(hex.to_string()))
        };
        Ok(Color::rgb(channel(1..3)?, channel(3..5)?, channel(5..7)?))
    }

    // Common colors
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = PaletteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// The board's default drawing colors
pub const DEFAULT_COLORS: [Color; 18] = [
    Color::rgb(0x00, 0x00, 0x00),
    Color::rgb(0xFF, 0xFF, 0xFF),
    Color::rgb(0xFF, 0x00, 0x00),
    Color::rgb(0x00, 0xFF, 0x00),
    Color::rgb(0x00, 0x00, 0xFF),
    Color::rgb(0xFF, 0xFF, 0x00),
    Color::rgb(0xFF, 0x00, 0xFF),
    Color::rgb(0x00, 0xFF, 0xFF),
    Color::rgb(0xFF, 0xA5, 0x00),
    Color::rgb(0x80, 0x00, 0x80),
    Color::rgb(0xFF, 0xC0, 0xCB),
    Color::rgb(0xA5, 0x2A, 0x2A),
    Color::rgb(0x80, 0x80, 0x80),
    Color::rgb(0x00, 0x00, 0x80),
    Color::rgb(0x00, 0x80, 0x00),
    Color::rgb(0x80, 0x00, 0x00),
    Color::rgb(0xFF, 0xD7, 0x00),
    Color::rgb(0xC0, 0xC0, 0xC0),
];

/// The set of colors a placement may use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// Any well-formed RGB color
    Open,
    /// Only the listed colors
    Fixed(Vec<Color>),
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Fixed(DEFAULT_COLORS.to_vec())
    }
}

impl Palette {
    /// Build a fixed palette, dropping duplicates but keeping first-seen order
    pub fn fixed(colors: impl IntoIterator<Item = Color>) -> Result<Self, PaletteError> {
        let mut unique: Vec<Color> = Vec::new();
        for color in colors {
            if !unique.contains(&color) {
                unique.push(color);
            }
        }
        if unique.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Palette::Fixed(unique))
    }

    /// Parse a comma-separated list of `#RRGGBB` values, or `any` for an open palette
    pub fn parse(input: &str) -> Result<Self, PaletteError> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("any") {
            return Ok(Palette::Open);
        }
        let colors = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Color::from_hex)
            .collect::<Result<Vec<_>, _>>()?;
        Palette::fixed(colors)
    }

    pub fn contains(&self, color: Color) -> bool {
        match self {
            Palette::Open => true,
            Palette::Fixed(colors) => colors.contains(&color),
        }
    }

    /// Listed colors, `None` for an open palette
    pub fn colors(&self) -> Option<&[Color]> {
        match self {
            Palette::Open => None,
            Palette::Fixed(colors) => Some(colors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_pattern_compiles() {
        assert!(hex_pattern().is_match("#A0b1C2"));
        assert!(!hex_pattern().is_match("#A0b1C"));
    }

    #[test]
    fn test_color_hex_parsing() {
        assert_eq!(Color::from_hex("#ff0000").unwrap(), Color::RED);
        assert_eq!(Color::from_hex("#00FF00").unwrap(), Color::GREEN);
        assert_eq!(Color::from_hex(" #0000Ff ").unwrap(), Color::BLUE);

        assert!(Color::from_hex("ff0000").is_err());
        assert!(Color::from_hex("#ff00").is_err());
        assert!(Color::from_hex("#ff0000ff").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
    }

    #[test]
    fn test_color_serializes_as_upper_hex() {
        let json = serde_json::to_string(&Color::rgb(0xab, 0x01, 0xcd)).unwrap();
        assert_eq!(json, "\"#AB01CD\"");

        let parsed: Color = serde_json::from_str("\"#ab01cd\"").unwrap();
        assert_eq!(parsed, Color::rgb(0xab, 0x01, 0xcd));

        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }

    #[test]
    fn test_default_palette() {
        let palette = Palette::default();
        assert!(palette.contains(Color::WHITE));
        assert!(palette.contains(Color::from_hex("#FFD700").unwrap()));
        assert!(!palette.contains(Color::rgb(1, 2, 3)));
        assert_eq!(palette.colors().map(<[Color]>::len), Some(18));
    }

    #[test]
    fn test_palette_parse() {
        assert_eq!(Palette::parse("any").unwrap(), Palette::Open);
        assert!(Palette::Open.contains(Color::rgb(1, 2, 3)));

        let palette = Palette::parse("#FF0000, #0000ff,#ff0000").unwrap();
        assert_eq!(palette, Palette::Fixed(vec![Color::RED, Color::BLUE]));

        assert_eq!(Palette::parse(" , "), Err(PaletteError::Empty));
        assert!(matches!(
            Palette::parse("#FF0000,blue"),
            Err(PaletteError::MalformedColor(s)) if s == "blue"
        ));
    }
}
