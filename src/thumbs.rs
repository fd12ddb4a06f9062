//! Thumbnail request planning.
//!
//! The engine never produces image URLs itself. It decides *which* request
//! to hand to the thumbnail service (dimensions, crop, format, quality) and
//! where the answer lands in the attribute set. These types describe *what*
//! to ask for; [`ImageHost`](crate::source::ImageHost) does the work.
//!
//! ## Types
//!
//! - [`ThumbOptions`]: a single thumbnail: width/height, crop, quality, format.
//! - [`ThumbSelector`]: a named preset from config, or inline options.
//! - [`SrcsetSelector`]: a named width list, inline widths, or no srcset.
//! - [`SrcsetRequest`]: widths plus the display ratio to crop each one to.
//! - [`PlaceholderRequest`]: a tiny blurred thumbnail for lazy images.

use crate::config::{ConfigError, DEFAULT_KEY, PlaceholderConfig, ThumbsConfig};
use serde::{Deserialize, Deserializer, Serialize};

/// Output encoding of a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Avif => "image/avif",
        }
    }
}

/// Options for a single thumbnail. Unset fields fall back to the service's
/// own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
}

impl ThumbOptions {
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    /// The same thumbnail re-encoded as WebP at `quality`.
    pub fn to_webp(&self, quality: u32) -> Self {
        Self {
            format: Some(ImageFormat::Webp),
            quality: Some(quality),
            ..self.clone()
        }
    }

    /// Crop box implied by a display ratio: a width-only thumbnail gains the
    /// matching height. Options that already fix the height are unchanged.
    pub fn cropped_to(&self, ratio: Option<f64>) -> Self {
        match (ratio, self.width, self.height) {
            (Some(ratio), Some(width), None) => Self {
                height: Some((f64::from(width) / ratio).round() as u32),
                crop: Some(true),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}

/// Which single thumbnail to request instead of a srcset.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbSelector {
    Preset(String),
    Options(ThumbOptions),
}

impl ThumbSelector {
    pub fn resolve(&self, thumbs: &ThumbsConfig) -> Result<ThumbOptions, ConfigError> {
        match self {
            ThumbSelector::Options(options) => Ok(options.clone()),
            ThumbSelector::Preset(name) => thumbs
                .presets
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownThumbPreset(name.clone())),
        }
    }
}

impl<'de> Deserialize<'de> for ThumbSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Preset(String),
            Options(ThumbOptions),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Preset(name) => ThumbSelector::Preset(name),
            Raw::Options(options) => ThumbSelector::Options(options),
        })
    }
}

/// Which widths to request for the `srcset`.
#[derive(Debug, Clone, PartialEq)]
pub enum SrcsetSelector {
    Disabled,
    Preset(String),
    Widths(Vec<u32>),
}

impl Default for SrcsetSelector {
    fn default() -> Self {
        SrcsetSelector::Preset(DEFAULT_KEY.to_string())
    }
}

impl SrcsetSelector {
    /// The widths to request, or `None` when no srcset is wanted.
    pub fn resolve(&self, thumbs: &ThumbsConfig) -> Result<Option<Vec<u32>>, ConfigError> {
        let widths = match self {
            SrcsetSelector::Disabled => return Ok(None),
            SrcsetSelector::Widths(widths) => widths.clone(),
            SrcsetSelector::Preset(name) => thumbs
                .srcsets
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownSrcsetPreset(name.clone()))?,
        };
        Ok(Some(widths).filter(|w| !w.is_empty()))
    }
}

impl<'de> Deserialize<'de> for SrcsetSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Preset(String),
            Widths(Vec<u32>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None | Some(Raw::Flag(false)) => SrcsetSelector::Disabled,
            Some(Raw::Flag(true)) => SrcsetSelector::default(),
            Some(Raw::Preset(name)) => SrcsetSelector::Preset(name),
            Some(Raw::Widths(widths)) => SrcsetSelector::Widths(widths),
        })
    }
}

/// A `srcset` to build: one candidate per width, each cropped to `ratio`
/// when set.
#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetRequest {
    pub candidates: Vec<ThumbOptions>,
    pub ratio: Option<f64>,
}

impl SrcsetRequest {
    pub fn new(widths: &[u32], ratio: Option<f64>) -> Self {
        Self {
            candidates: widths
                .iter()
                .map(|&w| ThumbOptions::width(w).cropped_to(ratio))
                .collect(),
            ratio,
        }
    }

    /// The same srcset with every candidate re-encoded as WebP.
    pub fn to_webp(&self, quality: u32) -> Self {
        Self {
            candidates: self.candidates.iter().map(|c| c.to_webp(quality)).collect(),
            ratio: self.ratio,
        }
    }
}

/// A low-quality placeholder to request for a lazy image.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRequest {
    pub thumb: ThumbOptions,
    pub blur_radius: u32,
}

impl PlaceholderRequest {
    /// Shrink `base` (the thumbnail that will eventually load) to
    /// `max_size` on one edge, keeping its proportions when both edges are
    /// known.
    pub fn plan(base: Option<&ThumbOptions>, config: &PlaceholderConfig) -> Self {
        let base = base.cloned().unwrap_or_default();
        let max = config.max_size;
        let (width, height) = match (base.width, base.height) {
            (Some(w), Some(h)) if w > 0 => {
                let h = (f64::from(max) / f64::from(w) * f64::from(h)).round() as u32;
                (Some(max), Some(h))
            }
            (_, Some(_)) => (None, Some(max)),
            _ => (Some(max), None),
        };
        Self {
            thumb: ThumbOptions {
                width,
                height,
                format: Some(ImageFormat::Webp),
                quality: Some(config.quality),
                ..base
            },
            blur_radius: config.blur_radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn webp_variant_overrides_format_and_quality() {
        let base = ThumbOptions {
            width: Some(800),
            quality: Some(90),
            format: Some(ImageFormat::Jpeg),
            ..ThumbOptions::default()
        };
        let webp = base.to_webp(85);
        assert_eq!(webp.width, Some(800));
        assert_eq!(webp.quality, Some(85));
        assert_eq!(webp.format, Some(ImageFormat::Webp));
    }

    #[test]
    fn cropped_to_adds_height() {
        let opts = ThumbOptions::width(1600).cropped_to(Some(16.0 / 9.0));
        assert_eq!(opts.height, Some(900));
        assert_eq!(opts.crop, Some(true));
    }

    #[test]
    fn cropped_to_keeps_explicit_height() {
        let opts = ThumbOptions {
            width: Some(600),
            height: Some(600),
            ..ThumbOptions::default()
        };
        assert_eq!(opts.cropped_to(Some(2.0)), opts);
        assert_eq!(ThumbOptions::width(600).cropped_to(None), ThumbOptions::width(600));
    }

    #[test]
    fn thumb_selector_resolves_presets() {
        let mut thumbs = ThumbsConfig::default();
        thumbs.presets.insert("card".into(), ThumbOptions::width(600));

        let sel = ThumbSelector::Preset("card".into());
        assert_eq!(sel.resolve(&thumbs).unwrap(), ThumbOptions::width(600));

        let sel = ThumbSelector::Preset("hero".into());
        assert!(matches!(
            sel.resolve(&thumbs),
            Err(ConfigError::UnknownThumbPreset(ref n)) if n == "hero"
        ));
    }

    #[test]
    fn srcset_selector_resolution() {
        let thumbs = ThumbsConfig {
            srcsets: BTreeMap::from([
                ("default".to_string(), vec![400, 800]),
                ("empty".to_string(), vec![]),
            ]),
            ..ThumbsConfig::default()
        };
        assert_eq!(
            SrcsetSelector::default().resolve(&thumbs).unwrap(),
            Some(vec![400, 800])
        );
        assert_eq!(SrcsetSelector::Disabled.resolve(&thumbs).unwrap(), None);
        assert_eq!(
            SrcsetSelector::Preset("empty".into()).resolve(&thumbs).unwrap(),
            None
        );
        assert!(SrcsetSelector::Preset("missing".into()).resolve(&thumbs).is_err());
    }

    #[test]
    fn selectors_deserialize() {
        let sel: ThumbSelector = serde_json::from_str(r#""card""#).unwrap();
        assert_eq!(sel, ThumbSelector::Preset("card".into()));
        let sel: ThumbSelector = serde_json::from_str(r#"{"width": 300}"#).unwrap();
        assert_eq!(sel, ThumbSelector::Options(ThumbOptions::width(300)));

        let sel: SrcsetSelector = serde_json::from_str("false").unwrap();
        assert_eq!(sel, SrcsetSelector::Disabled);
        let sel: SrcsetSelector = serde_json::from_str("[320, 640]").unwrap();
        assert_eq!(sel, SrcsetSelector::Widths(vec![320, 640]));
    }

    #[test]
    fn srcset_request_crops_each_candidate() {
        let req = SrcsetRequest::new(&[400, 800], Some(2.0));
        assert_eq!(req.candidates[0].height, Some(200));
        assert_eq!(req.candidates[1].height, Some(400));

        let webp = req.to_webp(85);
        assert!(webp.candidates.iter().all(|c| c.format == Some(ImageFormat::Webp)));
    }

    // =========================================================================
    // Placeholder planning
    // =========================================================================

    #[test]
    fn placeholder_keeps_thumb_proportions() {
        let base = ThumbOptions {
            width: Some(800),
            height: Some(600),
            crop: Some(true),
            ..ThumbOptions::default()
        };
        let req = PlaceholderRequest::plan(Some(&base), &PlaceholderConfig::default());
        assert_eq!(req.thumb.width, Some(16));
        assert_eq!(req.thumb.height, Some(12));
        assert_eq!(req.thumb.crop, Some(true));
        assert_eq!(req.thumb.quality, Some(40));
        assert_eq!(req.thumb.format, Some(ImageFormat::Webp));
        assert_eq!(req.blur_radius, 1);
    }

    #[test]
    fn placeholder_height_only() {
        let base = ThumbOptions {
            height: Some(600),
            ..ThumbOptions::default()
        };
        let req = PlaceholderRequest::plan(Some(&base), &PlaceholderConfig::default());
        assert_eq!(req.thumb.width, None);
        assert_eq!(req.thumb.height, Some(16));
    }

    #[test]
    fn placeholder_defaults_to_width() {
        let req = PlaceholderRequest::plan(None, &PlaceholderConfig::default());
        assert_eq!(req.thumb.width, Some(16));
        assert_eq!(req.thumb.height, None);
    }
}
