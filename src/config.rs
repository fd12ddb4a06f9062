//! Engine configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The resulting
//! [`Config`] is built once at startup and passed by reference into every
//! component that needs it; nothing in the engine reads ambient settings.
//!
//! ## Keys
//!
//! ```toml
//! # Defaults
//!
//! legacy_aspect_ratio = true   # `--aspect-ratio: N%;` instead of `aspect-ratio: N`
//!
//! [grid]
//! container = true             # Constrain images to a fixed-width container
//! container_width = 1180       # Or a table of named widths: { default = 1180, wide = 1440 }
//! columns = 12                 # Grid columns used by "lg:6"-style span tokens
//! mobile_first = false         # min-width (true) or max-width (false) media queries
//!
//! [grid.breakpoints]
//! xl = 1400
//! lg = 1280
//! md = 992
//! sm = 768
//! xs = 576
//!
//! [placeholder]
//! enabled = false              # Request a blurred LQIP for lazy images
//! max_size = 16                # Long edge of the placeholder thumbnail
//! blur_radius = 1
//! quality = 40
//!
//! [thumbs]
//! quality_webp = 85            # Quality for WebP variants
//!
//! [thumbs.presets.card]        # Named thumbnail presets
//! width = 600
//! height = 400
//! crop = true
//!
//! [thumbs.srcsets]
//! default = [400, 800, 1200, 1600, 2000]
//! ```
//!
//! ## Overrides
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [grid]
//! mobile_first = true
//! ```
//!
//! A misspelled key fails to load instead of being ignored.

use crate::thumbs::ThumbOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("breakpoint '{0}' is not defined in grid.breakpoints")]
    UnknownBreakpoint(String),
    #[error("container width '{0}' is not defined in grid.container_width")]
    UnknownContainerWidth(String),
    #[error("share {share} for breakpoint '{breakpoint}' must be greater than 0 and at most 1.0")]
    ShareOutOfRange { breakpoint: String, share: f64 },
    #[error("width and height are required to derive the aspect ratio (got {width}x{height})")]
    MissingDimensions { width: u32, height: u32 },
    #[error("thumbnail preset '{0}' is not defined in thumbs.presets")]
    UnknownThumbPreset(String),
    #[error("srcset preset '{0}' is not defined in thumbs.srcsets")]
    UnknownSrcsetPreset(String),
}

/// Engine configuration loaded from `config.toml`.
///
/// Every field has a default, so a user file only lists what it changes.
/// Unknown keys are an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Express the wrapper's aspect ratio as a `--aspect-ratio: N%;` custom
    /// property (padding-top hack) instead of the standard `aspect-ratio`.
    pub legacy_aspect_ratio: bool,
    /// Grid and breakpoint settings used by the `sizes` ladder.
    pub grid: GridConfig,
    /// Low-quality placeholder settings for lazy images.
    pub placeholder: PlaceholderConfig,
    /// Thumbnail presets and WebP quality.
    pub thumbs: ThumbsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            legacy_aspect_ratio: true,
            grid: GridConfig::default(),
            placeholder: PlaceholderConfig::default(),
            thumbs: ThumbsConfig::default(),
        }
    }
}

impl Config {
    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.columns == 0 {
            return Err(ConfigError::Validation(
                "grid.columns must be greater than 0".into(),
            ));
        }
        if let Some((name, _)) = self.grid.breakpoints.iter().find(|(_, px)| **px == 0) {
            return Err(ConfigError::Validation(format!(
                "grid.breakpoints.{name} must be greater than 0"
            )));
        }
        if let ContainerWidth::Named(widths) = &self.grid.container_width {
            if !widths.contains_key(DEFAULT_KEY) {
                return Err(ConfigError::Validation(
                    "grid.container_width table must define 'default'".into(),
                ));
            }
        }
        if self.placeholder.max_size == 0 {
            return Err(ConfigError::Validation(
                "placeholder.max_size must be greater than 0".into(),
            ));
        }
        if self.placeholder.quality > 100 {
            return Err(ConfigError::Validation(
                "placeholder.quality must be 0-100".into(),
            ));
        }
        if self.thumbs.quality_webp > 100 {
            return Err(ConfigError::Validation(
                "thumbs.quality_webp must be 0-100".into(),
            ));
        }
        Ok(())
    }
}

/// Name of the catch-all breakpoint and of the default container width.
pub const DEFAULT_KEY: &str = "default";

/// Named breakpoint tiers, narrowest first. Mobile-first mode shifts every
/// tier up one slot along this ladder.
const TIERS: [&str; 6] = ["xs", "sm", "md", "lg", "xl", "xxl"];

/// Grid settings shared by every render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Whether images are constrained by a fixed-width container by default.
    pub container: bool,
    /// Container width in pixels, or a table of named widths.
    pub container_width: ContainerWidth,
    /// Number of grid columns.
    pub columns: u32,
    /// Use `min-width` media queries, evaluated widest first.
    pub mobile_first: bool,
    /// Named breakpoint pixel widths.
    pub breakpoints: BTreeMap<String, u32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            container: true,
            container_width: ContainerWidth::Fixed(1180),
            columns: 12,
            mobile_first: false,
            breakpoints: BTreeMap::from([
                ("xl".to_string(), 1400),
                ("lg".to_string(), 1280),
                ("md".to_string(), 992),
                ("sm".to_string(), 768),
                ("xs".to_string(), 576),
            ]),
        }
    }
}

impl GridConfig {
    /// Pixel width of the synthetic `default` breakpoint.
    pub fn default_breakpoint(&self) -> u32 {
        if self.mobile_first { 0 } else { u32::MAX }
    }

    /// Breakpoint table as seen by the `sizes` ladder.
    ///
    /// In mobile-first mode each tier takes the width of the tier below it
    /// (`xxl` ← `xl`, `xl` ← `lg`, …, `sm` ← `xs`): a `min-width` query at the
    /// lower tier's width is where the named tier becomes active. Names
    /// outside the `xs`…`xxl` ladder are kept as configured. The `default`
    /// entry is always synthetic.
    pub fn breakpoint_table(&self) -> BTreeMap<String, u32> {
        let mut table = self.breakpoints.clone();
        if self.mobile_first {
            for pair in TIERS.windows(2) {
                if let Some(px) = self.breakpoints.get(pair[0]) {
                    table.insert(pair[1].to_string(), *px);
                }
            }
        }
        table.insert(DEFAULT_KEY.to_string(), self.default_breakpoint());
        table
    }
}

/// Container width: one value for every image, or a table of named widths
/// selected per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerWidth {
    Fixed(u32),
    Named(BTreeMap<String, u32>),
}

impl ContainerWidth {
    /// Resolve the container width for an optional named size.
    ///
    /// A fixed width only answers to `None` or `"default"`; any other name is
    /// a configuration error, as is a name missing from the table.
    pub fn resolve(&self, name: Option<&str>) -> Result<u32, ConfigError> {
        let key = name.unwrap_or(DEFAULT_KEY);
        match self {
            ContainerWidth::Fixed(px) if key == DEFAULT_KEY => Ok(*px),
            ContainerWidth::Fixed(_) => Err(ConfigError::UnknownContainerWidth(key.to_string())),
            ContainerWidth::Named(widths) => widths
                .get(key)
                .copied()
                .ok_or_else(|| ConfigError::UnknownContainerWidth(key.to_string())),
        }
    }
}

/// Low-quality image placeholder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    /// Request a placeholder for lazy, non-vector images.
    pub enabled: bool,
    /// Long edge of the placeholder thumbnail in pixels.
    pub max_size: u32,
    /// SVG blur radius applied by the placeholder generator.
    pub blur_radius: u32,
    /// Encoding quality of the placeholder thumbnail.
    pub quality: u32,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size: 16,
            blur_radius: 1,
            quality: 40,
        }
    }
}

/// Thumbnail presets and WebP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbsConfig {
    /// Quality for WebP variants (`<source type="image/webp">`).
    pub quality_webp: u32,
    /// Named thumbnail presets.
    pub presets: BTreeMap<String, ThumbOptions>,
    /// Named srcset width lists.
    pub srcsets: BTreeMap<String, Vec<u32>>,
}

impl Default for ThumbsConfig {
    fn default() -> Self {
        Self {
            quality_webp: 85,
            presets: BTreeMap::new(),
            srcsets: BTreeMap::from([(
                DEFAULT_KEY.to_string(),
                vec![400, 800, 1200, 1600, 2000],
            )]),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// [`Config::default()`] as a TOML table: the bottom layer every user file
/// is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Deep-merge two TOML values. Tables combine key by key; any other value
/// in `overlay` replaces whatever `base` had at that key. A
/// `container_width` table therefore replaces a fixed width outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `<dir>/config.toml` without interpreting it. A missing file is
/// `Ok(None)`; unparseable TOML is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply an optional user layer, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults overlaid with `<root>/config.toml`, if present.
pub fn load_config(root: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// The documented default `config.toml` printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Responsive Picture Configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Express the wrapper aspect ratio as `--aspect-ratio: 56.25%;` (padding-top
# technique) instead of the standard `aspect-ratio: 1.7778`.
legacy_aspect_ratio = true

# ---------------------------------------------------------------------------
# Grid
# ---------------------------------------------------------------------------
[grid]
# Constrain images to a fixed-width container unless a render says otherwise.
container = true

# Container width in pixels. May also be a table of named widths, e.g.
#   container_width = { default = 1180, wide = 1440 }
# in which case renders pick one by name.
container_width = 1180

# Grid columns; a span token like "lg:6" means 6 of these columns.
columns = 12

# false: desktop-first `(max-width: ...)` queries, narrowest first.
# true:  mobile-first `(min-width: ...)` queries, widest first.
mobile_first = false

# Named breakpoint widths in pixels.
[grid.breakpoints]
xl = 1400
lg = 1280
md = 992
sm = 768
xs = 576

# ---------------------------------------------------------------------------
# Placeholder (LQIP) for lazy images
# ---------------------------------------------------------------------------
[placeholder]
enabled = false
# Long edge of the placeholder thumbnail in pixels.
max_size = 16
blur_radius = 1
quality = 40

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbs]
# Encoding quality of WebP variants.
quality_webp = 85

# Named thumbnail presets, selected with `thumb = "name"`.
[thumbs.presets]
# card = { width = 600, height = 400, crop = true }

# Named srcset width lists, selected with `srcset = "name"`.
[thumbs.srcsets]
default = [400, 800, 1200, 1600, 2000]
"##
}
