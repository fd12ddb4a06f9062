//! Picture assembly.
//!
//! Turns one image plus a [`PictureRequest`] into the attribute maps of a
//! responsive element. Each call is a single pass:
//!
//! ```text
//! ImageSource ──resolve──▶ ResolvedImage
//!                              │
//!             Render::new      │  validate request, resolve ratio, focus,
//!                              │  thumb preset, srcset widths
//!                              ▼
//!             Render::assemble    src? ─ none ─▶ Ok(None)
//!                              │
//!                              ├─ wrapper attrs  (class, data-extension, aspect-ratio style)
//!                              ├─ <source> attrs (WebP srcset, picture only, never SVG)
//!                              └─ <img> attrs    (eager or lazy set, alt)
//! ```
//!
//! `sizes` and the focus `object-position` are each needed in two places
//! (`<source>` and `<img>`, object-position and placeholder background), so
//! the render context computes them once and keeps them for the rest of the
//! pass. Nothing is shared between renders.
//!
//! Caller attribute maps (`attr`, `img_attr`) always win over computed
//! attributes. Computed attributes that come out empty are dropped; `alt`
//! is always present.

use crate::config::Config;
use crate::error::{InputError, PictureError};
use crate::focus::{FocusPoint, ObjectPosition, compute_object_position};
use crate::ratio::{self, RatioSpec};
use crate::sizes::{self, ContainerSpec, SizesRequest, SizesSpec, format_number};
use crate::source::{ImageHost, ImageSource, ResolvedImage};
use crate::thumbs::{
    ImageFormat, PlaceholderRequest, SrcsetRequest, SrcsetSelector, ThumbOptions, ThumbSelector,
};
use serde::{Deserialize, Deserializer};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Attribute name → value, serialized in name order.
pub type Attributes = BTreeMap<String, String>;

/// CSS `object-fit` of the image inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    #[default]
    Cover,
    Contain,
    Fill,
    None,
    ScaleDown,
}

impl ObjectFit {
    /// Wrapper class for the fits the stylesheet knows about.
    fn class(self) -> Option<&'static str> {
        match self {
            ObjectFit::Cover => Some("cover"),
            ObjectFit::Contain => Some("contain"),
            _ => None,
        }
    }

    fn background_size(self) -> &'static str {
        match self {
            ObjectFit::Contain => "contain",
            _ => "cover",
        }
    }
}

/// Which element wraps the `<img>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Element {
    /// `<picture>` with an optional WebP `<source>`.
    #[default]
    Picture,
    /// A bare `<img>` carrying the wrapper attributes itself.
    Img,
    /// Any other wrapper tag (`div`, `figure`, ...), no `<source>`.
    Wrapper(String),
}

impl Element {
    pub fn tag(&self) -> &str {
        match self {
            Element::Picture => "picture",
            Element::Img => "img",
            Element::Wrapper(tag) => tag,
        }
    }
}

impl FromStr for Element {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "picture" => return Ok(Element::Picture),
            "img" => return Ok(Element::Img),
            _ => {}
        }
        let mut chars = s.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(InputError::InvalidTag(s.to_string()));
        }
        Ok(Element::Wrapper(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Everything a caller can ask of one rendered image.
///
/// All fields are optional; `PictureRequest::default()` renders an eager
/// `<picture>` with the default srcset, `object-fit: cover`, and no ratio
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PictureRequest {
    /// Display aspect ratio. `None` leaves the image unconstrained.
    pub ratio: Option<RatioSpec>,
    /// A single thumbnail instead of a srcset.
    pub thumb: Option<ThumbSelector>,
    pub srcset: SrcsetSelector,
    /// Literal URL used instead of asking the host for one.
    pub src: Option<String>,
    pub alt: Option<String>,
    pub object_fit: Option<ObjectFit>,
    /// Legacy flag: `true` is `cover`, `false` is `contain`. Ignored when
    /// `object_fit` is set.
    pub crop: Option<bool>,
    #[serde(rename = "as")]
    pub element: Element,
    pub lazy: bool,
    /// Overrides `placeholder.enabled` from config. Lazy images only.
    pub placeholder: Option<bool>,
    pub sizes: Option<SizesSpec>,
    pub container: ContainerSpec,
    /// Overrides the focus point stored with the image.
    pub focus: Option<FocusPoint>,
    /// Extra wrapper class.
    pub class: Option<String>,
    /// Raw wrapper attributes.
    pub attr: BTreeMap<String, String>,
    /// Raw `<img>` attributes.
    pub img_attr: BTreeMap<String, String>,
}

impl PictureRequest {
    /// Reject requests whose options contradict each other.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.placeholder == Some(true) && !self.lazy {
            return Err(InputError::ConflictingOptions(
                "a placeholder needs `lazy`; eager images load directly".to_string(),
            ));
        }
        if self.thumb.is_some() && matches!(self.srcset, SrcsetSelector::Widths(_)) {
            return Err(InputError::ConflictingOptions(
                "`thumb` renders a single thumbnail, drop the explicit srcset widths".to_string(),
            ));
        }
        Ok(())
    }

    fn effective_object_fit(&self) -> ObjectFit {
        self.object_fit
            .or_else(|| {
                self.crop
                    .map(|crop| if crop { ObjectFit::Cover } else { ObjectFit::Contain })
            })
            .unwrap_or_default()
    }
}

/// The wrapping element of a rendered picture.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub tag: String,
    pub attributes: Attributes,
}

/// Attribute maps of one rendered element, ready for a serializer.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureOutput {
    /// `None` for a bare `<img>`.
    pub wrapper: Option<Wrapper>,
    /// WebP `<source>`, `<picture>` only.
    pub source: Option<Attributes>,
    pub img: Attributes,
}

/// Renders [`PictureRequest`]s against one configuration and host.
pub struct PictureAssembler<'a, H: ?Sized> {
    config: &'a Config,
    host: &'a H,
}

impl<'a, H: ImageHost + ?Sized> PictureAssembler<'a, H> {
    pub fn new(config: &'a Config, host: &'a H) -> Self {
        Self { config, host }
    }

    /// Resolve `source` through the host and render it.
    ///
    /// `Ok(None)` means there is nothing to show (the source did not
    /// resolve, or no URL could be produced). Bad content or configuration
    /// is an error.
    #[instrument(level = "debug", skip(self, request))]
    pub fn render(
        &self,
        source: &ImageSource,
        request: &PictureRequest,
    ) -> Result<Option<PictureOutput>, PictureError> {
        let Some(image) = self.host.resolve(source) else {
            debug!("image source did not resolve, rendering nothing");
            return Ok(None);
        };
        self.render_image(&image, request)
    }

    /// Render an image that is already resolved.
    #[instrument(level = "debug", skip_all, fields(url = %image.url))]
    pub fn render_image(
        &self,
        image: &ResolvedImage,
        request: &PictureRequest,
    ) -> Result<Option<PictureOutput>, PictureError> {
        let result =
            Render::new(self.config, self.host, image, request).and_then(|render| render.assemble());
        if let Err(err) = &result {
            warn!(error = %err, url = %image.url, "picture render aborted");
        }
        result
    }
}

// ============================================================================
// Per-render context
// ============================================================================

struct Render<'a, H: ?Sized> {
    config: &'a Config,
    host: &'a H,
    image: &'a ResolvedImage,
    request: &'a PictureRequest,
    ratio: Option<f64>,
    auto_ratio: bool,
    focus: Option<FocusPoint>,
    thumb: Option<ThumbOptions>,
    srcset_widths: Option<Vec<u32>>,
    object_fit: ObjectFit,
    placeholder: bool,
    sizes: OnceCell<Option<String>>,
    object_position: OnceCell<Option<ObjectPosition>>,
}

impl<'a, H: ImageHost + ?Sized> Render<'a, H> {
    /// Resolve every cross-field default in order: request sanity, ratio,
    /// focus, thumbnail preset, srcset widths.
    fn new(
        config: &'a Config,
        host: &'a H,
        image: &'a ResolvedImage,
        request: &'a PictureRequest,
    ) -> Result<Self, PictureError> {
        request.validate()?;

        let ratio = match request.ratio {
            Some(spec) => ratio::resolve(spec, image.width, image.height)?,
            None => None,
        };
        let focus = match request.focus {
            Some(focus) => Some(focus),
            None => image.focus_point()?,
        };
        let thumb = request
            .thumb
            .as_ref()
            .map(|selector| selector.resolve(&config.thumbs))
            .transpose()?;
        let vector = image.is_vector();
        let srcset_widths = if thumb.is_some() || vector {
            None
        } else {
            request.srcset.resolve(&config.thumbs)?
        };
        let placeholder =
            request.lazy && !vector && request.placeholder.unwrap_or(config.placeholder.enabled);

        Ok(Self {
            config,
            host,
            image,
            request,
            ratio,
            auto_ratio: request.ratio.is_some_and(RatioSpec::is_auto),
            focus,
            thumb,
            srcset_widths,
            object_fit: request.effective_object_fit(),
            placeholder,
            sizes: OnceCell::new(),
            object_position: OnceCell::new(),
        })
    }

    fn assemble(self) -> Result<Option<PictureOutput>, PictureError> {
        let Some(src) = self.src() else {
            debug!(url = %self.image.url, "no source URL, rendering nothing");
            return Ok(None);
        };

        let source = match self.request.element {
            Element::Picture if !self.image.is_vector() => self.source_attributes()?,
            _ => None,
        };
        let mut img = self.image_attributes(src)?;
        let mut wrapper = self.wrapper_attributes();

        let output = match &self.request.element {
            Element::Img => {
                merge_wrapper_onto(&mut img, wrapper);
                img.extend(self.request.attr.clone());
                img.extend(self.request.img_attr.clone());
                PictureOutput {
                    wrapper: None,
                    source: None,
                    img,
                }
            }
            element => {
                wrapper.extend(self.request.attr.clone());
                img.extend(self.request.img_attr.clone());
                PictureOutput {
                    wrapper: Some(Wrapper {
                        tag: element.tag().to_string(),
                        attributes: wrapper,
                    }),
                    source,
                    img,
                }
            }
        };
        Ok(Some(output))
    }

    // ------------------------------------------------------------------------
    // URLs
    // ------------------------------------------------------------------------

    fn src_override(&self) -> Option<String> {
        non_empty(self.request.src.clone())
    }

    fn src(&self) -> Option<String> {
        if let Some(src) = self.src_override() {
            return Some(src);
        }
        match &self.thumb {
            Some(options) => non_empty(self.host.thumb_url(self.image, options)),
            None => non_empty(Some(self.image.url.clone())),
        }
    }

    /// WebP variant of the single thumbnail.
    fn src_webp(&self) -> Option<String> {
        if let Some(src) = self.src_override() {
            return Some(src);
        }
        let options = self.thumb.as_ref()?.to_webp(self.config.thumbs.quality_webp);
        non_empty(self.host.thumb_url(self.image, &options))
    }

    fn srcset(&self, format: Option<ImageFormat>) -> Option<String> {
        let widths = self.srcset_widths.as_deref()?;
        let mut request = SrcsetRequest::new(widths, self.ratio);
        if format == Some(ImageFormat::Webp) {
            request = request.to_webp(self.config.thumbs.quality_webp);
        }
        non_empty(self.host.srcset(self.image, &request))
    }

    // ------------------------------------------------------------------------
    // Memoized geometry
    // ------------------------------------------------------------------------

    fn sizes(&self) -> Result<Option<&str>, PictureError> {
        if let Some(cached) = self.sizes.get() {
            return Ok(cached.as_deref());
        }
        let computed = self.compute_sizes()?;
        Ok(self.sizes.get_or_init(|| computed).as_deref())
    }

    fn compute_sizes(&self) -> Result<Option<String>, PictureError> {
        let request = self.request;
        if request.sizes.is_none() && !request.container.is_requested() {
            return Ok(None);
        }
        let mut sizes_request = SizesRequest {
            width: self.image.width,
            height: self.image.height,
            ratio: self.ratio,
            container: request.container.clone(),
            ..SizesRequest::default()
        };
        if let Some(spec) = &request.sizes {
            sizes_request = sizes_request.with_spec(spec.clone());
        }
        let rendered = sizes::render(&self.config.grid, &sizes_request)?;
        Ok(non_empty(Some(rendered)))
    }

    fn object_position(&self) -> Option<ObjectPosition> {
        *self.object_position.get_or_init(|| {
            let image_ratio = self.image.intrinsic_ratio()?;
            compute_object_position(self.focus, image_ratio, self.ratio, self.auto_ratio)
        })
    }

    /// Display ratio, or the image's own when nothing constrains it.
    fn data_aspect_ratio(&self) -> Option<String> {
        self.ratio
            .or_else(|| self.image.intrinsic_ratio())
            .map(|r| format_number(r, 4))
    }

    // ------------------------------------------------------------------------
    // Styles
    // ------------------------------------------------------------------------

    fn aspect_ratio_style(&self) -> Option<String> {
        let ratio = self.ratio?;
        Some(if self.config.legacy_aspect_ratio {
            format!(
                "--aspect-ratio: {}%;",
                format_number(ratio::to_percentage(ratio), 4)
            )
        } else {
            format!("aspect-ratio: {};", format_number(ratio, 4))
        })
    }

    fn placeholder_style(&self) -> Option<String> {
        if !self.placeholder {
            return None;
        }
        let base = self
            .thumb
            .clone()
            .or_else(|| (self.image.width > 0).then(|| ThumbOptions::width(self.image.width)))
            .map(|options| options.cropped_to(self.ratio));
        let request = PlaceholderRequest::plan(base.as_ref(), &self.config.placeholder);
        let uri = non_empty(self.host.placeholder(self.image, &request))?;

        let mut declarations = vec![
            format!("background-image: url(\"{uri}\");"),
            format!("background-size: {};", self.object_fit.background_size()),
        ];
        if let Some(position) = self.object_position() {
            declarations.push(position.background_position_style());
        }
        Some(declarations.join(" "))
    }

    fn image_style(&self) -> Option<String> {
        let declarations: Vec<String> = [
            self.object_position().map(ObjectPosition::object_position_style),
            self.placeholder_style(),
        ]
        .into_iter()
        .flatten()
        .collect();
        non_empty(Some(declarations.join(" ")))
    }

    // ------------------------------------------------------------------------
    // Attribute sets
    // ------------------------------------------------------------------------

    fn wrapper_attributes(&self) -> Attributes {
        let class: Vec<&str> = [
            self.object_fit.class(),
            self.request.class.as_deref().filter(|c| !c.is_empty()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut attrs = Attributes::new();
        insert(&mut attrs, "class", Some(class.join(" ")));
        insert(&mut attrs, "data-extension", Some(self.image.extension.clone()));
        insert(&mut attrs, "style", self.aspect_ratio_style());
        attrs
    }

    fn source_attributes(&self) -> Result<Option<Attributes>, PictureError> {
        let srcset = if self.thumb.is_some() {
            self.src_webp()
        } else {
            self.srcset(Some(ImageFormat::Webp))
        };
        let Some(srcset) = srcset else {
            return Ok(None);
        };

        let mut attrs = Attributes::new();
        if self.request.lazy {
            insert(&mut attrs, "data-srcset", Some(srcset));
            insert(&mut attrs, "data-aspectratio", self.data_aspect_ratio());
        } else {
            insert(&mut attrs, "srcset", Some(srcset));
            insert(&mut attrs, "sizes", self.sizes()?.map(str::to_string));
        }
        insert(
            &mut attrs,
            "type",
            Some(ImageFormat::Webp.mime_type().to_string()),
        );
        Ok(Some(attrs))
    }

    fn image_attributes(&self, src: String) -> Result<Attributes, PictureError> {
        let srcset = self.srcset(None);

        let mut attrs = Attributes::new();
        if self.request.lazy {
            insert(&mut attrs, "data-src", Some(src));
            insert(&mut attrs, "data-srcset", srcset);
            insert(&mut attrs, "sizes", Some("auto".to_string()));
            insert(&mut attrs, "data-sizes", Some("auto".to_string()));
            insert(&mut attrs, "data-aspectratio", self.data_aspect_ratio());
        } else {
            insert(&mut attrs, "src", Some(src));
            insert(&mut attrs, "srcset", srcset);
            insert(&mut attrs, "sizes", self.sizes()?.map(str::to_string));
        }
        insert(&mut attrs, "style", self.image_style());
        attrs.insert("alt".to_string(), self.alt());
        Ok(attrs)
    }

    fn alt(&self) -> String {
        non_empty(self.request.alt.clone())
            .or_else(|| non_empty(self.image.alt.clone()))
            .unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn insert(attrs: &mut Attributes, name: &str, value: Option<String>) {
    if let Some(value) = non_empty(value) {
        attrs.insert(name.to_string(), value);
    }
}

/// Fold wrapper attributes into a bare `<img>`. Styles concatenate, wrapper
/// first.
fn merge_wrapper_onto(img: &mut Attributes, wrapper: Attributes) {
    for (name, value) in wrapper {
        match img.get_mut(&name) {
            Some(existing) if name == "style" => *existing = format!("{value} {existing}"),
            Some(_) => {}
            None => {
                img.insert(name, value);
            }
        }
    }
}
