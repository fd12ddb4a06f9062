//! # Responsive Picture
//!
//! Geometry for responsive images: given an image's intrinsic size, an
//! optional display ratio, an optional focus point, and the grid the image
//! sits in, compute everything a `<picture>`/`<img>` needs to be displayed
//! correctly at every viewport width.
//!
//! The crate never touches pixels or URLs. Asset lookup, thumbnail URLs and
//! placeholder data URIs come from the host content system through the
//! [`source::ImageHost`] trait; the engine only decides *what* to ask for and
//! *where* the answers go.
//!
//! # Pipeline
//!
//! ```text
//! ImageSource ─▶ ResolvedImage ─▶ ratio ─▶ focus ─▶ sizes ─▶ PictureOutput ─▶ markup
//!   (host)        (w, h, focus)   (w÷h)   (offset)  (ladder)  (attribute maps)  (HTML)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ratio`] | Ratio specs (`"16/9"`, `56.25`, `"auto"`) resolved to width ÷ height |
//! | [`focus`] | Focus points and the `object-position` that keeps them in view |
//! | [`sizes`] | Breakpoint ladder and the `sizes` attribute |
//! | [`thumbs`] | Which thumbnails, srcsets, and placeholders to request |
//! | [`source`] | Image sources and the [`ImageHost`](source::ImageHost) boundary |
//! | [`picture`] | Assembles wrapper, `<source>`, and `<img>` attribute sets |
//! | [`markup`] | Serializes a [`PictureOutput`](picture::PictureOutput) to HTML |
//! | [`config`] | `config.toml` loading, validation, and stock defaults |
//! | [`error`] | Input errors and the umbrella [`PictureError`](error::PictureError) |
//!
//! # Example
//!
//! ```rust
//! use responsive_picture::config::GridConfig;
//! use responsive_picture::sizes::{self, SizesRequest, SizesSpec};
//!
//! let grid = GridConfig::default();
//! let spans = sizes::parse_column_spans("md:6 lg:4").unwrap();
//! let request = SizesRequest::default().with_spec(SizesSpec::Classes(spans));
//! let attr = sizes::render(&grid, &request).unwrap();
//! assert!(attr.contains("(max-width: 991.98px)"));
//! ```
//!
//! # Design Decisions
//!
//! ## Absence Is Not an Error
//!
//! A missing focus point, unknown dimensions, or an asset that no longer
//! exists are normal in content-managed sites. They resolve to `None` and the
//! element renders without the affected attribute, or not at all. Malformed
//! content (a `"16:9"` ratio) and broken configuration (a share above 1, an
//! unknown breakpoint) are errors and always reach the caller.
//!
//! ## Parse at the Boundary
//!
//! Textual formats (`"x/y"` ratios, `"lg:6"` column spans, `"0.3;0.7"` focus
//! strings) are parsed into typed values once, through `FromStr` and serde.
//! Nothing past the boundary re-parses a string.
//!
//! ## One Render, One Context
//!
//! Configuration is loaded once and passed by reference. Values needed twice
//! within a render (`sizes`, `object-position`) are memoized in a context
//! that lives exactly as long as that render.

pub mod config;
pub mod error;
pub mod focus;
pub mod markup;
pub mod picture;
pub mod ratio;
pub mod sizes;
pub mod source;
pub mod thumbs;

#[cfg(test)]
pub(crate) mod test_helpers;
