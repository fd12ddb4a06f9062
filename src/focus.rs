//! Focus-aware `object-position`.
//!
//! When an image is cropped into a container of a different aspect ratio
//! (`object-fit: cover`), CSS centers the crop by default. Given a focus
//! point, [`compute_object_position`] finds the offset that keeps the focus
//! as close to the center of the visible area as the crop allows.
//!
//! ```text
//! image wider than container → cropped left/right → x offset moves
//! image taller than container → cropped top/bottom → y offset moves
//! ```
//!
//! Values stay unrounded until [`ObjectPosition::to_css`] so repeated use
//! (object-position and placeholder background-position) never compounds
//! rounding error.

use crate::error::InputError;
use crate::sizes::format_number;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Fractional focus coordinate within the source image, both axes in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    /// Build a focus point, clamping both axes into `[0, 1]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

impl FromStr for FocusPoint {
    type Err = InputError;

    /// Parse the stored focus formats: `"0.3;0.7"`, `"0.3,0.7"`,
    /// `"30% 70%"`, `"30 70"`. Components above 1 are percentages.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidFocus(s.to_string());

        let parts: Vec<&str> = s
            .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let [x, y] = parts.as_slice() else {
            return Err(invalid());
        };

        let coordinate = |raw: &str| -> Result<f64, InputError> {
            let value: f64 = raw
                .strip_suffix('%')
                .unwrap_or(raw)
                .parse()
                .map_err(|_| invalid())?;
            if !value.is_finite() || value < 0.0 {
                return Err(invalid());
            }
            Ok(if value > 1.0 { value / 100.0 } else { value })
        };

        Ok(FocusPoint::new(coordinate(x)?, coordinate(y)?))
    }
}

impl<'de> Deserialize<'de> for FocusPoint {
    /// Either a stored focus string or an `{ x, y }` map.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Point { x: f64, y: f64 },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Point { x, y } => Ok(FocusPoint::new(x, y)),
        }
    }
}

/// Percentage offset for `object-position`, both axes in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPosition {
    pub x: f64,
    pub y: f64,
}

impl ObjectPosition {
    /// `"X% Y%"`, each rounded to 4 decimals.
    pub fn to_css(self) -> String {
        format!("{}% {}%", format_number(self.x, 4), format_number(self.y, 4))
    }

    /// `object-position: X% Y%;`
    pub fn object_position_style(self) -> String {
        format!("object-position: {};", self.to_css())
    }

    /// `background-position: X% Y%;`, for a placeholder rendered beneath
    /// the image.
    pub fn background_position_style(self) -> String {
        format!("background-position: {};", self.to_css())
    }
}

/// Offset that keeps `focus` visible after a cover-style crop.
///
/// Returns `None` when no correction applies: a ratio-less `auto` display
/// mode, no focus point, no container ratio, unknown image dimensions
/// (`image_ratio` not finite and positive), or equal ratios (no crop).
pub fn compute_object_position(
    focus: Option<FocusPoint>,
    image_ratio: f64,
    container_ratio: Option<f64>,
    display_mode_is_auto: bool,
) -> Option<ObjectPosition> {
    if display_mode_is_auto {
        return None;
    }
    let focus = focus?;
    let container_ratio = container_ratio?;
    if !is_usable(image_ratio) || !is_usable(container_ratio) {
        return None;
    }
    if image_ratio == container_ratio {
        return None;
    }

    let mut x = focus.x * 100.0;
    let mut y = focus.y * 100.0;

    if image_ratio > container_ratio {
        // Wider: the visible width is container/image of the image width
        let base = image_ratio;
        let visible = container_ratio / image_ratio * base;
        let max_offset = base - visible;
        let offset = base * focus.x - visible * 0.5;
        x = offset / max_offset * 100.0;
    } else {
        // Taller: measured against the container, the visible height is image/container
        let base = container_ratio;
        let visible = image_ratio / container_ratio * base;
        let max_offset = base - visible;
        let offset = base * focus.y - visible * 0.5;
        y = offset / max_offset * 100.0;
    }

    Some(ObjectPosition {
        x: x.clamp(0.0, 100.0),
        y: y.clamp(0.0, 100.0),
    })
}

fn is_usable(ratio: f64) -> bool {
    ratio.is_finite() && ratio > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // FocusPoint parsing
    // =========================================================================

    #[test]
    fn parse_semicolon_fractions() {
        assert_eq!(
            "0.3;0.7".parse::<FocusPoint>().unwrap(),
            FocusPoint { x: 0.3, y: 0.7 }
        );
    }

    #[test]
    fn parse_comma_and_whitespace() {
        assert_eq!(
            "0.25, 0.75".parse::<FocusPoint>().unwrap(),
            FocusPoint { x: 0.25, y: 0.75 }
        );
    }

    #[test]
    fn parse_percentages() {
        assert_eq!(
            "30% 70%".parse::<FocusPoint>().unwrap(),
            FocusPoint { x: 0.3, y: 0.7 }
        );
        assert_eq!(
            "50 100".parse::<FocusPoint>().unwrap(),
            FocusPoint { x: 0.5, y: 1.0 }
        );
    }

    #[test]
    fn parse_clamps_above_full_percentage() {
        let focus: FocusPoint = "150% 0".parse().unwrap();
        assert_eq!(focus, FocusPoint { x: 1.0, y: 0.0 });
    }

    #[test]
    fn parse_rejects_malformed() {
        for s in ["", "0.5", "0.5;0.5;0.5", "left;top", "-0.2;0.5"] {
            assert!(
                matches!(s.parse::<FocusPoint>(), Err(InputError::InvalidFocus(_))),
                "expected '{s}' to be rejected"
            );
        }
    }

    #[test]
    fn deserialize_string_or_map() {
        let focus: FocusPoint = serde_json::from_str(r#""0.3;0.7""#).unwrap();
        assert_eq!(focus, FocusPoint { x: 0.3, y: 0.7 });
        let focus: FocusPoint = serde_json::from_str(r#"{"x": 1.5, "y": 0.25}"#).unwrap();
        assert_eq!(focus, FocusPoint { x: 1.0, y: 0.25 });
        assert!(serde_json::from_str::<FocusPoint>(r#""centre""#).is_err());
    }

    // =========================================================================
    // compute_object_position: no-correction cases
    // =========================================================================

    #[test]
    fn equal_ratios_need_no_offset() {
        let focus = Some(FocusPoint::new(0.2, 0.8));
        for r in [0.5, 1.0, 16.0 / 9.0, 3.0] {
            assert_eq!(compute_object_position(focus, r, Some(r), false), None);
        }
    }

    #[test]
    fn auto_mode_needs_no_offset() {
        let focus = Some(FocusPoint::new(0.2, 0.8));
        assert_eq!(compute_object_position(focus, 2.0, Some(1.0), true), None);
    }

    #[test]
    fn missing_inputs_need_no_offset() {
        let focus = Some(FocusPoint::new(0.2, 0.8));
        assert_eq!(compute_object_position(None, 2.0, Some(1.0), false), None);
        assert_eq!(compute_object_position(focus, 2.0, None, false), None);
        assert_eq!(compute_object_position(focus, f64::NAN, Some(1.0), false), None);
        assert_eq!(compute_object_position(focus, 0.0, Some(1.0), false), None);
    }

    // =========================================================================
    // compute_object_position: cropping
    // =========================================================================

    #[test]
    fn centered_focus_gives_centered_crop() {
        let pos = compute_object_position(Some(FocusPoint::new(0.5, 0.5)), 2.0, Some(1.0), false)
            .unwrap();
        assert_eq!(pos.x, 50.0);
        assert_eq!(pos.y, 50.0);

        let pos = compute_object_position(Some(FocusPoint::new(0.5, 0.5)), 0.5, Some(1.0), false)
            .unwrap();
        assert_eq!(pos.x, 50.0);
        assert_eq!(pos.y, 50.0);
    }

    #[test]
    fn wide_image_moves_horizontally() {
        // 2:1 image in a square: visible width 1 of 2, focus at 0.75 → center
        // at 1.5, left edge at 1.0 of a max offset of 1.0
        let pos = compute_object_position(Some(FocusPoint::new(0.75, 0.3)), 2.0, Some(1.0), false)
            .unwrap();
        assert!((pos.x - 100.0).abs() < 1e-9);
        assert!((pos.y - 30.0).abs() < 1e-9);

        let pos = compute_object_position(Some(FocusPoint::new(0.6, 0.3)), 2.0, Some(1.0), false)
            .unwrap();
        assert!((pos.x - 70.0).abs() < 1e-9);
    }

    #[test]
    fn tall_image_moves_vertically() {
        // 1:2 image in a square: base 1.0, visible 0.5, max offset 0.5
        let pos = compute_object_position(Some(FocusPoint::new(0.1, 0.4)), 0.5, Some(1.0), false)
            .unwrap();
        assert!((pos.x - 10.0).abs() < 1e-9);
        // (1.0 * 0.4 - 0.25) / 0.5 = 0.3
        assert!((pos.y - 30.0).abs() < 1e-9);
    }

    #[test]
    fn edge_focus_is_clamped() {
        let pos = compute_object_position(Some(FocusPoint::new(0.0, 1.0)), 3.0, Some(1.0), false)
            .unwrap();
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 100.0);

        let pos = compute_object_position(Some(FocusPoint::new(1.0, 1.0)), 0.25, Some(2.0), false)
            .unwrap();
        assert_eq!(pos.y, 100.0);
    }

    #[test]
    fn output_stays_within_range() {
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        let ratios = [0.1, 0.5, 0.75, 1.0, 4.0 / 3.0, 16.0 / 9.0, 3.0, 10.0];
        for &fx in &steps {
            for &fy in &steps {
                for &ir in &ratios {
                    for &cr in &ratios {
                        let focus = Some(FocusPoint::new(fx, fy));
                        if let Some(pos) = compute_object_position(focus, ir, Some(cr), false) {
                            assert!((0.0..=100.0).contains(&pos.x), "x {} for {ir}/{cr}", pos.x);
                            assert!((0.0..=100.0).contains(&pos.y), "y {} for {ir}/{cr}", pos.y);
                        }
                    }
                }
            }
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn css_rounds_to_four_decimals() {
        let pos = ObjectPosition {
            x: 100.0 / 3.0,
            y: 50.0,
        };
        assert_eq!(pos.to_css(), "33.3333% 50%");
        assert_eq!(pos.object_position_style(), "object-position: 33.3333% 50%;");
        assert_eq!(
            pos.background_position_style(),
            "background-position: 33.3333% 50%;"
        );
    }
}
