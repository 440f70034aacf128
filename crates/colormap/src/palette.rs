//! Palettes and multi-stop interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{ColormapError, Result};

/// RGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or a CSS color name.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let unknown = || ColormapError::UnknownColor(text.to_string());

        if let Some(rgb) = named(&trimmed.to_ascii_lowercase()) {
            return Ok(rgb);
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(unknown());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| unknown());
        match hex.len() {
            6 => Ok(Self::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let c = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::new(c(0)?, c(1)?, c(2)?))
            }
            _ => Err(unknown()),
        }
    }

    /// Lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// CSS colors the layer tables refer to by name
fn named(name: &str) -> Option<Rgb> {
    let rgb = match name {
        "black" => Rgb::new(0, 0, 0),
        "white" => Rgb::new(255, 255, 255),
        "red" => Rgb::new(255, 0, 0),
        "green" => Rgb::new(0, 128, 0),
        "blue" => Rgb::new(0, 0, 255),
        "yellow" => Rgb::new(255, 255, 0),
        "orange" => Rgb::new(255, 165, 0),
        "purple" => Rgb::new(128, 0, 128),
        "brown" => Rgb::new(165, 42, 42),
        "gray" | "grey" => Rgb::new(128, 128, 128),
        "cyan" => Rgb::new(0, 255, 255),
        "magenta" => Rgb::new(255, 0, 255),
        "lightblue" => Rgb::new(173, 216, 230),
        "darkblue" => Rgb::new(0, 0, 139),
        "darkgreen" => Rgb::new(0, 100, 0),
        "lightgreen" => Rgb::new(144, 238, 144),
        _ => return None,
    };
    Some(rgb)
}

/// Colors spread evenly over `[0, 1]`.
///
/// Serialized as the list of color strings it was parsed from, normalized
/// to lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.is_empty() {
            return Err(ColormapError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    pub fn parse<S: AsRef<str>>(colors: &[S]) -> Result<Self> {
        let colors = colors
            .iter()
            .map(|c| Rgb::parse(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Color at normalized position `t`, clamped to the ends.
    pub fn evaluate(&self, t: f64) -> Rgb {
        let last = self.colors.len() - 1;
        if last == 0 || t.is_nan() || t <= 0.0 {
            return self.colors[0];
        }
        if t >= 1.0 {
            return self.colors[last];
        }
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        self.colors[i].lerp(self.colors[i + 1], pos - i as f64)
    }
}

impl TryFrom<Vec<String>> for Palette {
    type Error = ColormapError;

    fn try_from(colors: Vec<String>) -> Result<Self> {
        Self::parse(&colors)
    }
}

impl From<Palette> for Vec<String> {
    fn from(p: Palette) -> Self {
        p.colors.into_iter().map(Rgb::to_hex).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(Rgb::parse("#008435").unwrap(), Rgb::new(0, 0x84, 0x35));
        assert_eq!(Rgb::parse("EDE6D6").unwrap(), Rgb::new(0xed, 0xe6, 0xd6));
        assert_eq!(Rgb::parse("#fff").unwrap(), Rgb::new(255, 255, 255));
        assert_eq!(Rgb::parse("LightBlue").unwrap(), Rgb::new(173, 216, 230));
        assert_eq!(Rgb::parse("brown").unwrap().to_hex(), "#a52a2a");
    }

    #[test]
    fn rejects_unknown_colors() {
        assert_eq!(
            Rgb::parse("chartreuse-ish"),
            Err(ColormapError::UnknownColor("chartreuse-ish".into()))
        );
        assert!(Rgb::parse("#12345").is_err());
        assert!(Palette::parse::<&str>(&[]).is_err());
    }

    #[test]
    fn evaluates_between_stops() {
        let p = Palette::parse(&["black", "white"]).unwrap();
        assert_eq!(p.evaluate(0.0), Rgb::new(0, 0, 0));
        assert_eq!(p.evaluate(0.5), Rgb::new(128, 128, 128));
        assert_eq!(p.evaluate(2.0), Rgb::new(255, 255, 255));

        let p = Palette::parse(&["red", "green", "blue"]).unwrap();
        assert_eq!(p.evaluate(0.5), Rgb::new(0, 128, 0));
        assert_eq!(p.evaluate(0.75), Rgb::new(0, 64, 128));
    }

    #[test]
    fn single_color_palette_is_constant() {
        let p = Palette::parse(&["#2171b5"]).unwrap();
        assert_eq!(p.evaluate(0.3), p.evaluate(0.9));
    }
}
