//! Shared test utilities.
//!
//! [`MockHost`] stands in for the host content system. It serves one image,
//! builds predictable thumbnail URLs from the requested options, and records
//! every call so tests can assert on *what* the engine asked for.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let host = MockHost::new(photo());
//! // ... render ...
//! assert!(host.get_calls().iter().any(|c| matches!(c, HostCall::Srcset(_))));
//! ```

use std::sync::Mutex;

use crate::source::{ImageHost, ImageSource, ResolvedImage};
use crate::thumbs::{ImageFormat, PlaceholderRequest, SrcsetRequest, ThumbOptions};

// =========================================================================
// Fixtures
// =========================================================================

/// A 16:9 landscape JPEG with a focus point right of center.
pub fn photo() -> ResolvedImage {
    ResolvedImage {
        id: String::new(),
        width: 1600,
        height: 900,
        extension: "jpg".to_string(),
        focus: Some("0.75;0.5".to_string()),
        alt: Some("Harbour at dusk".to_string()),
        url: "/media/photo.jpg".to_string(),
    }
}

/// A square SVG logo.
pub fn logo() -> ResolvedImage {
    ResolvedImage {
        id: String::new(),
        width: 512,
        height: 512,
        extension: "svg".to_string(),
        focus: None,
        alt: None,
        url: "/media/logo.svg".to_string(),
    }
}

// =========================================================================
// Mock host
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Resolve(ImageSource),
    Thumb(ThumbOptions),
    Srcset(SrcsetRequest),
    Placeholder(PlaceholderRequest),
}

pub struct MockHost {
    pub image: Option<ResolvedImage>,
    pub placeholder: Option<String>,
    pub calls: Mutex<Vec<HostCall>>,
}

impl MockHost {
    pub fn new(image: ResolvedImage) -> Self {
        Self {
            image: Some(image),
            placeholder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A host where nothing resolves.
    pub fn empty() -> Self {
        Self {
            image: None,
            placeholder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_placeholder(mut self, uri: &str) -> Self {
        self.placeholder = Some(uri.to_string());
        self
    }

    pub fn get_calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// `/thumbs/photo-800x450.webp`; unknown edges print as `auto`.
pub fn thumb_path(image: &ResolvedImage, options: &ThumbOptions) -> String {
    let edge = |d: Option<u32>| d.map_or_else(|| "auto".to_string(), |d| d.to_string());
    let ext = match options.format {
        Some(ImageFormat::Jpeg) => "jpg".to_string(),
        Some(ImageFormat::Png) => "png".to_string(),
        Some(ImageFormat::Webp) => "webp".to_string(),
        Some(ImageFormat::Avif) => "avif".to_string(),
        None => image.extension.clone(),
    };
    format!(
        "/thumbs/photo-{}x{}.{}",
        edge(options.width),
        edge(options.height),
        ext
    )
}

impl ImageHost for MockHost {
    fn resolve(&self, source: &ImageSource) -> Option<ResolvedImage> {
        self.record(HostCall::Resolve(source.clone()));
        self.image.clone()
    }

    fn thumb_url(&self, image: &ResolvedImage, options: &ThumbOptions) -> Option<String> {
        self.record(HostCall::Thumb(options.clone()));
        Some(thumb_path(image, options))
    }

    fn srcset(&self, image: &ResolvedImage, request: &SrcsetRequest) -> Option<String> {
        self.record(HostCall::Srcset(request.clone()));
        let entries: Vec<String> = request
            .candidates
            .iter()
            .map(|c| format!("{} {}w", thumb_path(image, c), c.width.unwrap_or(0)))
            .collect();
        Some(entries.join(", "))
    }

    fn placeholder(&self, _image: &ResolvedImage, request: &PlaceholderRequest) -> Option<String> {
        self.record(HostCall::Placeholder(request.clone()));
        self.placeholder.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_calls_in_order() {
        let host = MockHost::new(photo());
        let image = host.resolve(&ImageSource::File("photo.jpg".into())).unwrap();
        host.thumb_url(&image, &ThumbOptions::width(400));

        let calls = host.get_calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], HostCall::Resolve(ImageSource::File(f)) if f == "photo.jpg"));
        assert!(matches!(&calls[1], HostCall::Thumb(o) if o.width == Some(400)));
    }

    #[test]
    fn mock_srcset_lists_every_candidate() {
        let host = MockHost::new(photo());
        let srcset = host
            .srcset(&photo(), &SrcsetRequest::new(&[400, 800], Some(2.0)))
            .unwrap();
        assert_eq!(
            srcset,
            "/thumbs/photo-400x200.jpg 400w, /thumbs/photo-800x400.jpg 800w"
        );
    }
}
