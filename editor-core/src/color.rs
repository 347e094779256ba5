use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EditorError, Result};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` form.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }

    pub(crate) fn to_f64(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }

    /// Round and clamp a floating point triple back into channel range.
    pub(crate) fn from_f64(v: [f64; 3]) -> Self {
        let c = |x: f64| x.round().clamp(0.0, 255.0) as u8;
        Self::new(c(v[0]), c(v[1]), c(v[2]))
    }

    /// Human-readable bucket for this color.
    pub fn label(&self) -> ColorLabel {
        describe(*self)
    }
}

impl From<Rgb<u8>> for Color {
    fn from(p: Rgb<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<[u8; 3]> for Color {
    fn from(v: [u8; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        parse_color(s)
    }
}

/// Descriptive bucket attached to every background candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorLabel {
    WhiteVeryLight,
    BlackVeryDark,
    LightGray,
    MediumGray,
    DarkGray,
    Reddish,
    Greenish,
    Bluish,
    Yellowish,
    Magentaish,
    Cyanish,
    Mixed,
}

impl ColorLabel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WhiteVeryLight => "White/Very Light",
            Self::BlackVeryDark => "Black/Very Dark",
            Self::LightGray => "Light Gray",
            Self::MediumGray => "Medium Gray",
            Self::DarkGray => "Dark Gray",
            Self::Reddish => "Red-ish",
            Self::Greenish => "Green-ish",
            Self::Bluish => "Blue-ish",
            Self::Yellowish => "Yellow-ish",
            Self::Magentaish => "Magenta-ish",
            Self::Cyanish => "Cyan-ish",
            Self::Mixed => "Mixed Color",
        }
    }

    /// File-name friendly form, e.g. `white_very_light`.
    pub fn slug(&self) -> String {
        self.name().to_lowercase().replace(['/', ' '], "_")
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bucket a color by brightness, neutrality and dominant hue.
pub fn describe(color: Color) -> ColorLabel {
    let (r, g, b) = (color.r as i32, color.g as i32, color.b as i32);

    if r > 240 && g > 240 && b > 240 {
        return ColorLabel::WhiteVeryLight;
    }
    if r < 15 && g < 15 && b < 15 {
        return ColorLabel::BlackVeryDark;
    }
    if (r - g).abs() < 20 && (g - b).abs() < 20 && (r - b).abs() < 20 {
        return if r > 200 {
            ColorLabel::LightGray
        } else if r > 100 {
            ColorLabel::MediumGray
        } else {
            ColorLabel::DarkGray
        };
    }

    // Dominant channel must beat both others by a fixed margin
    const MARGIN: i32 = 30;
    let max = r.max(g).max(b);
    if r == max && r > g + MARGIN && r > b + MARGIN {
        ColorLabel::Reddish
    } else if g == max && g > r + MARGIN && g > b + MARGIN {
        ColorLabel::Greenish
    } else if b == max && b > r + MARGIN && b > g + MARGIN {
        ColorLabel::Bluish
    } else if r > 200 && g > 200 && b < 100 {
        ColorLabel::Yellowish
    } else if r > 200 && g < 100 && b > 200 {
        ColorLabel::Magentaish
    } else if r < 100 && g > 200 && b > 200 {
        ColorLabel::Cyanish
    } else {
        ColorLabel::Mixed
    }
}

/// Parse a color token: a known name, `#rrggbb`, or `r,g,b`.
pub fn parse_color(token: &str) -> Result<Color> {
    let t = token.trim().to_lowercase();
    let named = match t.as_str() {
        "white" => Some(Color::WHITE),
        "black" => Some(Color::BLACK),
        "red" => Some(Color::new(255, 0, 0)),
        "green" => Some(Color::new(0, 255, 0)),
        "blue" => Some(Color::new(0, 0, 255)),
        "yellow" => Some(Color::new(255, 255, 0)),
        "cyan" => Some(Color::new(0, 255, 255)),
        "magenta" => Some(Color::new(255, 0, 255)),
        "gray" | "grey" => Some(Color::new(128, 128, 128)),
        _ => None,
    };
    if let Some(c) = named {
        return Ok(c);
    }

    if let Some(hex) = t.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| EditorError::UnknownColor(token.to_string()));
    }

    if t.contains(',') {
        return parse_triple(&t).ok_or_else(|| EditorError::UnknownColor(token.to_string()));
    }

    Err(EditorError::UnknownColor(token.to_string()))
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::new(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_triple(s: &str) -> Option<Color> {
    let parts: Vec<u8> = s
        .split(',')
        .map(|p| p.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some(Color::new(*r, *g, *b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_buckets() {
        assert_eq!(describe(Color::new(250, 250, 250)), ColorLabel::WhiteVeryLight);
        assert_eq!(describe(Color::new(5, 5, 5)), ColorLabel::BlackVeryDark);
        assert_eq!(describe(Color::new(210, 215, 220)), ColorLabel::LightGray);
        assert_eq!(describe(Color::new(128, 128, 128)), ColorLabel::MediumGray);
        assert_eq!(describe(Color::new(50, 55, 60)), ColorLabel::DarkGray);
        assert_eq!(describe(Color::new(200, 40, 40)), ColorLabel::Reddish);
        assert_eq!(describe(Color::new(40, 200, 40)), ColorLabel::Greenish);
        assert_eq!(describe(Color::new(40, 40, 200)), ColorLabel::Bluish);
        assert_eq!(describe(Color::new(230, 220, 20)), ColorLabel::Yellowish);
        assert_eq!(describe(Color::new(230, 20, 220)), ColorLabel::Magentaish);
        assert_eq!(describe(Color::new(20, 230, 220)), ColorLabel::Cyanish);
        assert_eq!(describe(Color::new(150, 120, 60)), ColorLabel::Mixed);
    }

    #[test]
    fn test_label_slug() {
        assert_eq!(ColorLabel::WhiteVeryLight.slug(), "white_very_light");
        assert_eq!(ColorLabel::LightGray.slug(), "light_gray");
        assert_eq!(ColorLabel::Reddish.to_string(), "Red-ish");
    }

    #[test]
    fn test_parse_named_colors() {
        assert_eq!(parse_color("White").unwrap(), Color::WHITE);
        assert_eq!(parse_color("grey").unwrap(), Color::new(128, 128, 128));
        assert_eq!(parse_color(" magenta ").unwrap(), Color::new(255, 0, 255));
    }

    #[test]
    fn test_parse_hex_and_triple() {
        assert_eq!(parse_color("#FF8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(parse_color("10, 20,30").unwrap(), Color::new(10, 20, 30));
        assert_eq!(Color::new(255, 128, 0).hex(), "#ff8000");
    }

    #[test]
    fn test_parse_unknown_color() {
        assert!(matches!(parse_color("chartreuse"), Err(EditorError::UnknownColor(_))));
        assert!(matches!(parse_color("#12345"), Err(EditorError::UnknownColor(_))));
        assert!(matches!(parse_color("1,2,300"), Err(EditorError::UnknownColor(_))));
        assert!(matches!(parse_color("1,2"), Err(EditorError::UnknownColor(_))));
    }
}
