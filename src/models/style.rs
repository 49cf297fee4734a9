//! Deterministic categorical styling.
//!
//! A category value (zoning description, flood-zone code, soil unit name...)
//! is turned into a color without any lookup table: the string is folded into
//! a rolling 32-bit hash and the hash picks a hue. The same string always
//! yields the same style, in every process and for every dataset.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::RgbColor;

/// Category used when a feature has no usable value.
pub const DEFAULT_CATEGORY: &str = "default";

/// Number of distinct hues on the color wheel.
const HUE_STEPS: i32 = 360;

/// Errors raised when a style is configured with out-of-range values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    /// Saturation or lightness above 100%.
    #[error("{field} must be between 0 and 100 (got {value})")]
    PercentOutOfRange {
        /// Offending field name
        field: &'static str,
        /// Rejected value
        value: u8,
    },
    /// Fill opacity outside 0.0-1.0.
    #[error("fill opacity must be between 0.0 and 1.0 (got {0})")]
    OpacityOutOfRange(f32),
    /// Stroke weight that is zero, negative or not finite.
    #[error("stroke weight must be a positive number (got {0})")]
    InvalidWeight(f32),
}

/// Maps an empty category to [`DEFAULT_CATEGORY`].
#[must_use]
pub fn normalize_category(key: &str) -> &str {
    if key.is_empty() {
        DEFAULT_CATEGORY
    } else {
        key
    }
}

/// Rolling hash over the Unicode scalar values of `key`.
///
/// Each step computes `acc = code(c) + ((acc << 5) - acc)` (i.e. `acc * 31 +
/// code(c)`) with two's-complement wraparound, so long strings may produce
/// negative values.
///
/// A hash carried in wider arithmetic drifts from this one once a value
/// overflows upward, and so does its hue:
/// "Commercial" is 282 here and 178 with an unwrapped sum.
///
/// # Examples
///
/// ```
/// use sitelayers::models::style::category_hash;
///
/// assert_eq!(category_hash("A"), 65);
/// assert_eq!(category_hash("AB"), 2081);
/// ```
#[must_use]
pub fn category_hash(key: &str) -> i32 {
    key.chars().fold(0_i32, |acc, c| {
        (u32::from(c) as i32).wrapping_add((acc << 5).wrapping_sub(acc))
    })
}

/// Hue (0-359) for a category value. Negative hashes wrap around the wheel.
///
/// The empty string is normalized to [`DEFAULT_CATEGORY`] first.
#[must_use]
pub fn hue_for(key: &str) -> u16 {
    category_hash(normalize_category(key)).rem_euclid(HUE_STEPS) as u16
}

/// Color expressed as hue / saturation / lightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HslColor {
    /// Hue in degrees (0-359)
    pub hue: u16,
    /// Saturation percentage (0-100)
    pub saturation: u8,
    /// Lightness percentage (0-100)
    pub lightness: u8,
}

impl HslColor {
    /// Creates a new HSL color. The hue is wrapped into 0-359.
    #[must_use]
    pub const fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue: hue % 360,
            saturation,
            lightness,
        }
    }

    /// CSS notation, e.g. `hsl(65, 50%, 60%)`.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!("hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }

    /// Converts to RGB.
    #[must_use]
    pub fn to_rgb(&self) -> RgbColor {
        RgbColor::from_hsl(
            f32::from(self.hue),
            f32::from(self.saturation) / 100.0,
            f32::from(self.lightness) / 100.0,
        )
    }
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Stroke/fill color of a style: either derived from a category or fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleColor {
    /// Hue-derived categorical color
    Hsl(HslColor),
    /// Fixed color from configuration
    Rgb(RgbColor),
}

impl StyleColor {
    /// CSS notation understood by any web mapping library.
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Hsl(hsl) => hsl.to_css(),
            Self::Rgb(rgb) => rgb.to_hex(),
        }
    }

    /// RGB value of the color.
    #[must_use]
    pub fn to_rgb(&self) -> RgbColor {
        match self {
            Self::Hsl(hsl) => hsl.to_rgb(),
            Self::Rgb(rgb) => *rgb,
        }
    }
}

/// Visual descriptor for one rendered geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleAssignment {
    /// Stroke and fill color
    pub color: StyleColor,
    /// Stroke weight in pixels
    pub weight: f32,
    /// Fill opacity (0.0-1.0)
    pub fill_opacity: f32,
}

impl StyleAssignment {
    /// Creates a fixed-color style.
    #[must_use]
    pub const fn fixed(color: RgbColor, weight: f32, fill_opacity: f32) -> Self {
        Self {
            color: StyleColor::Rgb(color),
            weight,
            fill_opacity,
        }
    }
}

/// Derives a style from a category value.
///
/// Saturation, lightness, weight and fill opacity are per-dataset constants;
/// only the hue depends on the key. There is no table and no collision
/// handling: two keys may share a hue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStyleAssigner {
    saturation: u8,
    lightness: u8,
    weight: f32,
    fill_opacity: f32,
}

impl CategoricalStyleAssigner {
    /// Creates an assigner with validated constants.
    pub fn new(
        saturation: u8,
        lightness: u8,
        weight: f32,
        fill_opacity: f32,
    ) -> Result<Self, StyleError> {
        validate_percent("saturation", saturation)?;
        validate_percent("lightness", lightness)?;
        validate_weight(weight)?;
        validate_opacity(fill_opacity)?;

        Ok(Self {
            saturation,
            lightness,
            weight,
            fill_opacity,
        })
    }

    /// Style for `key`. Empty keys are styled as [`DEFAULT_CATEGORY`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sitelayers::models::style::{CategoricalStyleAssigner, StyleColor};
    ///
    /// let assigner = CategoricalStyleAssigner::default();
    /// let style = assigner.assign("A");
    /// assert_eq!(style.color.to_css(), "hsl(65, 50%, 60%)");
    /// assert_eq!(style, assigner.assign("A"));
    /// ```
    #[must_use]
    pub fn assign(&self, key: &str) -> StyleAssignment {
        StyleAssignment {
            color: StyleColor::Hsl(HslColor::new(
                hue_for(key),
                self.saturation,
                self.lightness,
            )),
            weight: self.weight,
            fill_opacity: self.fill_opacity,
        }
    }

    /// Saturation percentage applied to every category.
    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Lightness percentage applied to every category.
    pub fn lightness(&self) -> u8 {
        self.lightness
    }

    /// Fill opacity applied to every category.
    pub fn fill_opacity(&self) -> f32 {
        self.fill_opacity
    }
}

impl Default for CategoricalStyleAssigner {
    fn default() -> Self {
        Self {
            saturation: 50,
            lightness: 60,
            weight: 1.0,
            fill_opacity: 0.3,
        }
    }
}

fn validate_percent(field: &'static str, value: u8) -> Result<(), StyleError> {
    if value > 100 {
        return Err(StyleError::PercentOutOfRange { field, value });
    }
    Ok(())
}

/// Rejects opacities outside 0.0-1.0 (and NaN).
pub(crate) fn validate_opacity(value: f32) -> Result<(), StyleError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(StyleError::OpacityOutOfRange(value));
    }
    Ok(())
}

/// Rejects non-positive or non-finite stroke weights.
pub(crate) fn validate_weight(value: f32) -> Result<(), StyleError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StyleError::InvalidWeight(value));
    }
    Ok(())
}
