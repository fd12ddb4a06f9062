//! Aspect-ratio resolution.
//!
//! A ratio arrives in one of several shapes: the keywords `"auto"` and
//! `"intrinsic"`, an `"x/y"` fraction, or a bare number. Numbers up to 5 are
//! read as width ÷ height directly; anything larger is a padding-top style
//! percentage (`56.25` → `1 / 0.5625`). Zero means "no ratio constraint".
//!
//! Textual forms are parsed into [`RatioSpec`] once at the boundary (via
//! [`FromStr`] or serde) and never re-parsed. [`resolve`] turns a spec plus
//! intrinsic dimensions into a canonical decimal ratio.

use crate::config::ConfigError;
use crate::error::{InputError, PictureError};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Numbers above this are percentages, not ratios.
const PERCENTAGE_THRESHOLD: f64 = 5.0;

/// How the display aspect ratio of an image is specified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioSpec {
    /// Derive from the intrinsic width and height.
    Auto,
    /// Alias of [`RatioSpec::Auto`].
    Intrinsic,
    /// `"x/y"`, both components non-zero.
    Fraction(u32, u32),
    /// A ratio (`≤ 5`) or a percentage (`> 5`).
    Decimal(f64),
    /// No ratio constraint.
    Zero,
}

impl RatioSpec {
    /// Whether this spec follows the image's own proportions.
    pub fn is_auto(self) -> bool {
        matches!(self, RatioSpec::Auto | RatioSpec::Intrinsic)
    }

    /// Build a spec from a number, rejecting negative and non-finite values.
    pub fn from_number(value: f64) -> Result<Self, InputError> {
        if !value.is_finite() || value < 0.0 {
            return Err(InputError::InvalidDecimalRatio(value));
        }
        if value == 0.0 {
            Ok(RatioSpec::Zero)
        } else {
            Ok(RatioSpec::Decimal(value))
        }
    }
}

impl FromStr for RatioSpec {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => return Ok(RatioSpec::Auto),
            "intrinsic" => return Ok(RatioSpec::Intrinsic),
            _ => {}
        }

        let (x, y) = s
            .split_once('/')
            .filter(|(x, y)| is_digits(x) && is_digits(y))
            .ok_or_else(|| InputError::InvalidRatio(s.to_string()))?;
        // Digit-only strings only fail to parse on overflow
        let x: u32 = x.parse().map_err(|_| InputError::InvalidRatio(s.to_string()))?;
        let y: u32 = y.parse().map_err(|_| InputError::InvalidRatio(s.to_string()))?;

        if x == 0 || y == 0 {
            return Err(InputError::ZeroRatioComponent(s.to_string()));
        }
        Ok(RatioSpec::Fraction(x, y))
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for RatioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatioSpec::Auto => write!(f, "auto"),
            RatioSpec::Intrinsic => write!(f, "intrinsic"),
            RatioSpec::Fraction(x, y) => write!(f, "{x}/{y}"),
            RatioSpec::Decimal(v) => write!(f, "{v}"),
            RatioSpec::Zero => write!(f, "0"),
        }
    }
}

impl<'de> Deserialize<'de> for RatioSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => RatioSpec::from_number(v).map_err(serde::de::Error::custom),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Resolve a ratio spec to width ÷ height.
///
/// `None` means no ratio constraint. `Auto`/`Intrinsic` need real
/// dimensions; a zero width or height is a configuration error.
pub fn resolve(spec: RatioSpec, width: u32, height: u32) -> Result<Option<f64>, PictureError> {
    match spec {
        RatioSpec::Auto | RatioSpec::Intrinsic => {
            if width == 0 || height == 0 {
                return Err(ConfigError::MissingDimensions { width, height }.into());
            }
            Ok(Some(intrinsic(width, height)))
        }
        RatioSpec::Fraction(x, y) => {
            if x == 0 || y == 0 {
                return Err(InputError::ZeroRatioComponent(spec.to_string()).into());
            }
            Ok(Some(f64::from(x) / f64::from(y)))
        }
        RatioSpec::Decimal(v) => {
            if !v.is_finite() || v < 0.0 {
                return Err(InputError::InvalidDecimalRatio(v).into());
            }
            if v == 0.0 {
                Ok(None)
            } else if v <= PERCENTAGE_THRESHOLD {
                Ok(Some(v))
            } else {
                Ok(Some(1.0 / (v / 100.0)))
            }
        }
        RatioSpec::Zero => Ok(None),
    }
}

/// The image's own proportions, independent of any display ratio.
pub fn intrinsic(width: u32, height: u32) -> f64 {
    f64::from(width) / f64::from(height)
}

/// Express a ratio as the padding-top percentage (`height / width * 100`).
pub fn to_percentage(ratio: f64) -> f64 {
    1.0 / ratio * 100.0
}

/// Resolve and convert to a percentage in one step, for percentage-based
/// layouts.
pub fn ratio_percentage(
    spec: RatioSpec,
    width: u32,
    height: u32,
) -> Result<Option<f64>, PictureError> {
    Ok(resolve(spec, width, height)?.map(to_percentage))
}
