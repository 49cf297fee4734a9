//! RGB color handling with hex/CSS parsing and HSL conversion.

// Allow small types passed by reference for API consistency
#![allow(clippy::trivially_copy_pass_by_ref)]
// Allow intentional type casts for color math
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named CSS colors accepted in dataset configuration.
const NAMED_COLORS: &[(&str, RgbColor)] = &[
    ("black", RgbColor::new(0, 0, 0)),
    ("white", RgbColor::new(255, 255, 255)),
    ("red", RgbColor::new(255, 0, 0)),
    ("green", RgbColor::new(0, 128, 0)),
    ("blue", RgbColor::new(0, 0, 255)),
    ("yellow", RgbColor::new(255, 255, 0)),
    ("orange", RgbColor::new(255, 165, 0)),
];

/// RGB color value with hex string representation.
///
/// Serialized as a `#RRGGBB` string so configuration files stay readable.
/// Deserialization accepts anything [`RgbColor::from_css`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl RgbColor {
    /// Creates a new `RgbColor` from individual channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses an `RgbColor` from a hex string.
    ///
    /// Supports formats: "#RRGGBB", "RRGGBB", "#RGB", "RGB" (any case).
    ///
    /// # Examples
    ///
    /// ```
    /// use sitelayers::models::RgbColor;
    ///
    /// let color = RgbColor::from_hex("#27AE60").unwrap();
    /// assert_eq!(color, RgbColor::new(39, 174, 96));
    ///
    /// let color = RgbColor::from_hex("f00").unwrap();
    /// assert_eq!(color, RgbColor::new(255, 0, 0));
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);

        let expanded;
        let hex = match hex.len() {
            6 => hex,
            3 => {
                expanded = hex.chars().flat_map(|c| [c, c]).collect::<String>();
                expanded.as_str()
            }
            _ => anyhow::bail!(
                "Invalid hex color format '{hex}'. Expected 6 hex digits (RRGGBB) or 3 (RGB)"
            ),
        };

        if !hex.is_ascii() {
            anyhow::bail!("Invalid hex color '{hex}': non-ASCII characters");
        }

        let r = u8::from_str_radix(&hex[0..2], 16)
            .context(format!("Invalid red channel in hex color '{hex}'"))?;
        let g = u8::from_str_radix(&hex[2..4], 16)
            .context(format!("Invalid green channel in hex color '{hex}'"))?;
        let b = u8::from_str_radix(&hex[4..6], 16)
            .context(format!("Invalid blue channel in hex color '{hex}'"))?;

        Ok(Self::new(r, g, b))
    }

    /// Parses a CSS color: a hex literal or one of the supported color names.
    pub fn from_css(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some((_, color)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
            return Ok(*color);
        }

        Self::from_hex(trimmed).with_context(|| format!("Unrecognized color '{value}'"))
    }

    /// Converts the color to a hex string in the format "#RRGGBB" (uppercase).
    ///
    /// # Examples
    ///
    /// ```
    /// use sitelayers::models::RgbColor;
    ///
    /// assert_eq!(RgbColor::new(255, 0, 0).to_hex(), "#FF0000");
    /// assert_eq!(RgbColor::new(0, 128, 255).to_hex(), "#0080FF");
    /// ```
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Creates an `RgbColor` from HSL components.
    ///
    /// # Arguments
    ///
    /// * `h` - Hue in degrees (wrapped into 0.0-360.0)
    /// * `s` - Saturation (0.0-1.0, will be clamped)
    /// * `l` - Lightness (0.0-1.0, will be clamped)
    ///
    /// # Examples
    ///
    /// ```
    /// use sitelayers::models::RgbColor;
    ///
    /// assert_eq!(RgbColor::from_hsl(0.0, 1.0, 0.5), RgbColor::new(255, 0, 0));
    /// assert_eq!(RgbColor::from_hsl(240.0, 1.0, 0.5), RgbColor::new(0, 0, 255));
    /// ```
    #[must_use]
    #[allow(clippy::many_single_char_names)] // Standard HSL color model uses single-char names
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h_prime = h / 60.0;
        let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = if h_prime < 1.0 {
            (c, x, 0.0)
        } else if h_prime < 2.0 {
            (x, c, 0.0)
        } else if h_prime < 3.0 {
            (0.0, c, x)
        } else if h_prime < 4.0 {
            (0.0, x, c)
        } else if h_prime < 5.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        Self {
            r: ((r + m) * 255.0).round().clamp(0.0, 255.0) as u8,
            g: ((g + m) * 255.0).round().clamp(0.0, 255.0) as u8,
            b: ((b + m) * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for RgbColor {
    /// Default color is white (#FFFFFF).
    fn default() -> Self {
        Self::new(255, 255, 255)
    }
}

impl TryFrom<String> for RgbColor {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_css(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}
