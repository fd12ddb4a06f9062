//! Image sources and the host system behind them.
//!
//! The host content system knows images as content fields, file handles,
//! plugin assets, or plain paths. [`ImageSource`] names which one, and
//! [`ImageHost::resolve`] turns it into a [`ResolvedImage`] once, at the
//! entry point. Nothing past that point branches on the kind of source.
//!
//! The [`ImageHost`] trait is the whole boundary to the outside world:
//!
//! | Operation | Returns |
//! |---|---|
//! | `resolve` | dimensions, extension, focus string, alt, original URL |
//! | `thumb_url` | URL of one resized/re-encoded thumbnail |
//! | `srcset` | a ready `"<url> <width>w, …"` list |
//! | `placeholder` | a data URI for a blurred low-quality preview |
//!
//! [`StaticImageHost`] serves pre-resolved records, for callers that have
//! already done the lookups (and for the CLI).

use crate::error::InputError;
use crate::focus::FocusPoint;
use crate::ratio;
use crate::thumbs::{ImageFormat, PlaceholderRequest, SrcsetRequest, ThumbOptions};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Extensions rendered as vector graphics: no srcset, no format variants.
const VECTOR_EXTENSIONS: &[&str] = &["svg"];

/// A reference to an image in the host content system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A content field that may hold a file reference (or be empty).
    Field(String),
    /// A file attached to a page.
    File(String),
    /// A plugin or theme asset.
    Asset(String),
    /// A path relative to the site root.
    Path(String),
}

/// Everything the engine needs to know about an image, resolved up front.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolvedImage {
    /// Host handle for the asset, passed back on thumbnail, srcset and
    /// placeholder calls. Empty when the host has no use for it.
    pub id: String,
    /// Intrinsic width in pixels, 0 if unknown.
    pub width: u32,
    /// Intrinsic height in pixels, 0 if unknown.
    pub height: u32,
    /// File extension without the dot.
    pub extension: String,
    /// Stored focus metadata, e.g. `"0.3;0.7"`.
    pub focus: Option<String>,
    /// Stored alt text.
    pub alt: Option<String>,
    /// URL of the original file.
    pub url: String,
}

impl ResolvedImage {
    pub fn is_vector(&self) -> bool {
        VECTOR_EXTENSIONS
            .iter()
            .any(|ext| self.extension.eq_ignore_ascii_case(ext))
    }

    /// Width ÷ height, or `None` when either dimension is unknown.
    pub fn intrinsic_ratio(&self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| ratio::intrinsic(self.width, self.height))
    }

    /// Parse the stored focus metadata. An empty string counts as absent.
    pub fn focus_point(&self) -> Result<Option<FocusPoint>, InputError> {
        match self.focus.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

/// The host content system: asset lookup and thumbnail generation.
///
/// Every operation may come back empty. A missing answer is not an error;
/// the engine renders without that attribute (or renders nothing when there
/// is no source URL at all).
pub trait ImageHost {
    /// Look up an image's dimensions, metadata, and URL.
    fn resolve(&self, source: &ImageSource) -> Option<ResolvedImage>;

    /// URL of a single thumbnail.
    fn thumb_url(&self, image: &ResolvedImage, options: &ThumbOptions) -> Option<String>;

    /// A complete `srcset` value.
    fn srcset(&self, image: &ResolvedImage, request: &SrcsetRequest) -> Option<String>;

    /// A placeholder data URI. Hosts without a placeholder generator keep
    /// the default.
    fn placeholder(&self, _image: &ResolvedImage, _request: &PlaceholderRequest) -> Option<String> {
        None
    }
}

/// An image record with every URL the host already produced.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StaticImage {
    #[serde(flatten)]
    pub image: ResolvedImage,
    /// Single-thumbnail URL.
    pub thumb: Option<String>,
    /// WebP single-thumbnail URL.
    pub thumb_webp: Option<String>,
    pub srcset: Option<String>,
    pub srcset_webp: Option<String>,
    pub placeholder: Option<String>,
}

/// Serves pre-resolved [`StaticImage`] records by source key.
#[derive(Debug, Clone, Default)]
pub struct StaticImageHost {
    images: BTreeMap<String, StaticImage>,
}

impl StaticImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, image: StaticImage) {
        self.images.insert(key.into(), image);
    }

    fn lookup(&self, image: &ResolvedImage) -> Option<&StaticImage> {
        self.images.get(&image.id)
    }
}

fn is_webp(format: Option<ImageFormat>) -> bool {
    format == Some(ImageFormat::Webp)
}

impl ImageHost for StaticImageHost {
    fn resolve(&self, source: &ImageSource) -> Option<ResolvedImage> {
        let key = match source {
            ImageSource::Field(k)
            | ImageSource::File(k)
            | ImageSource::Asset(k)
            | ImageSource::Path(k) => k,
        };
        self.images.get(key).map(|s| ResolvedImage {
            id: key.clone(),
            ..s.image.clone()
        })
    }

    fn thumb_url(&self, image: &ResolvedImage, options: &ThumbOptions) -> Option<String> {
        let entry = self.lookup(image)?;
        if is_webp(options.format) {
            entry.thumb_webp.clone()
        } else {
            entry.thumb.clone()
        }
    }

    fn srcset(&self, image: &ResolvedImage, request: &SrcsetRequest) -> Option<String> {
        let entry = self.lookup(image)?;
        let webp = request.candidates.iter().any(|c| is_webp(c.format));
        if webp {
            entry.srcset_webp.clone()
        } else {
            entry.srcset.clone()
        }
    }

    fn placeholder(&self, image: &ResolvedImage, _request: &PlaceholderRequest) -> Option<String> {
        self.lookup(image)?.placeholder.clone()
    }
}
