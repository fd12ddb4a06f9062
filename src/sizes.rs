//! Breakpoint ladder and the `sizes` attribute.
//!
//! Converts "this image takes share `s` of its slot from breakpoint `b`"
//! into the media-query list a browser uses to pick a `srcset` candidate.
//!
//! ## Algorithm
//!
//! 1. **Ratio correction**: `(width / height) / (100 / ratio)` for the
//!    resolved display ratio. Shares are scaled by it only when it is at
//!    least 1.
//! 2. **Container width**: explicit pixels, a named width, or the grid
//!    default.
//! 3. **Shares**: explicit `{breakpoint → share}` entries first, then
//!    column-span tokens (`"lg:6"` → 6 / columns), then `default = 1.0`.
//! 4. **Sort** in browser evaluation order: ascending `max-width` for
//!    desktop-first, descending `min-width` for mobile-first.
//! 5. **Collapse** adjacent entries that would render the same width.
//! 6. **Container entry**: register the share active at the container
//!    width *at* the container width, so narrower viewports get `vw` and
//!    wider ones a fixed pixel width. Re-sort and collapse.
//! 7. **Render** `"<media-query><width>"` joined by `", "`.
//!
//! ```text
//! grid: lg = 1280, container = 1180, desktop-first
//! shares: lg = 0.5, default = 1.0
//! ladder: 1180 → 0.5 (vw), 1280 → 0.5 (px), default → 1.0 (px)
//! sizes:  (max-width: 1179.98px) 50vw, (max-width: 1279.98px) 590px, 1180px
//! ```

use crate::config::{ConfigError, DEFAULT_KEY, GridConfig};
use crate::error::{InputError, PictureError};
use crate::ratio;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Offset subtracted from `max-width` thresholds so adjacent queries never
/// both match at the exact boundary pixel.
const MAX_WIDTH_OFFSET: f64 = 0.02;

// ============================================================================
// Request types
// ============================================================================

/// A breakpoint referenced by name (`"lg"`) or directly in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BreakpointKey {
    Named(String),
    Pixels(u32),
}

impl BreakpointKey {
    pub fn default_key() -> Self {
        BreakpointKey::Named(DEFAULT_KEY.to_string())
    }

    fn resolve(&self, table: &BTreeMap<String, u32>) -> Result<u32, ConfigError> {
        match self {
            BreakpointKey::Pixels(px) => Ok(*px),
            BreakpointKey::Named(name) => table
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownBreakpoint(name.clone())),
        }
    }
}

impl FromStr for BreakpointKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u32>() {
            Ok(px) => BreakpointKey::Pixels(px),
            Err(_) => BreakpointKey::Named(s.to_string()),
        })
    }
}

impl fmt::Display for BreakpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointKey::Named(name) => write!(f, "{name}"),
            BreakpointKey::Pixels(px) => write!(f, "{px}"),
        }
    }
}

/// A grid column-span token such as `"lg:6"`, `"lg:col-6"` or `"6"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpan {
    pub breakpoint: String,
    pub columns: u32,
}

impl FromStr for ColumnSpan {
    type Err = InputError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidColumnSpan(token.to_string());

        let (breakpoint, span) = match token.split_once(':') {
            Some((bp, span)) if !bp.is_empty() => (bp, span),
            Some(_) => return Err(invalid()),
            None => (DEFAULT_KEY, token),
        };
        let columns = span
            .rsplit_once('-')
            .map_or(span, |(_, n)| n)
            .parse::<u32>()
            .map_err(|_| invalid())?;

        Ok(ColumnSpan {
            breakpoint: breakpoint.to_string(),
            columns,
        })
    }
}

/// Parse a space-separated list of column-span tokens.
pub fn parse_column_spans(classes: &str) -> Result<Vec<ColumnSpan>, InputError> {
    classes.split_whitespace().map(str::parse).collect()
}

/// How the caller described the image's share of each breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum SizesSpec {
    /// Column-span tokens, e.g. `"md:6 lg:4"`.
    Classes(Vec<ColumnSpan>),
    /// Explicit shares in `(0, 1]`.
    Shares(Vec<(BreakpointKey, f64)>),
}

impl<'de> Deserialize<'de> for SizesSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Classes(String),
            Shares(BTreeMap<String, f64>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Classes(s) => parse_column_spans(&s)
                .map(SizesSpec::Classes)
                .map_err(serde::de::Error::custom),
            Raw::Shares(map) => Ok(SizesSpec::Shares(
                map.into_iter()
                    .map(|(k, v)| {
                        let key = match k.parse::<BreakpointKey>() {
                            Ok(key) => key,
                            Err(never) => match never {},
                        };
                        (key, v)
                    })
                    .collect(),
            )),
        }
    }
}

/// Whether the image sits in a fixed-width container, and how wide it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ContainerSpec {
    /// Use the grid's `container` flag and default width.
    #[default]
    Inherit,
    /// No container; widths are always viewport-relative.
    Off,
    /// Container of the grid's default width.
    On,
    /// Container of an explicit pixel width.
    Width(u32),
    /// Container of a named width from `grid.container_width`.
    Named(String),
}

impl ContainerSpec {
    /// The container width in pixels, or `None` when no container applies.
    pub fn resolve(&self, grid: &GridConfig) -> Result<Option<u32>, ConfigError> {
        match self {
            ContainerSpec::Off => Ok(None),
            ContainerSpec::Inherit if !grid.container => Ok(None),
            ContainerSpec::Inherit | ContainerSpec::On => {
                grid.container_width.resolve(None).map(Some)
            }
            ContainerSpec::Width(px) => Ok(Some(*px)),
            ContainerSpec::Named(name) => grid.container_width.resolve(Some(name)).map(Some),
        }
    }

    /// Whether the caller asked for a container explicitly.
    pub fn is_requested(&self) -> bool {
        !matches!(self, ContainerSpec::Inherit | ContainerSpec::Off)
    }
}

impl<'de> Deserialize<'de> for ContainerSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Width(u32),
            Name(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => ContainerSpec::Inherit,
            Some(Raw::Flag(true)) => ContainerSpec::On,
            Some(Raw::Flag(false)) => ContainerSpec::Off,
            Some(Raw::Width(px)) => ContainerSpec::Width(px),
            Some(Raw::Name(name)) => ContainerSpec::Named(name),
        })
    }
}

/// Everything needed to build one `sizes` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizesRequest {
    /// Intrinsic image width (0 if unknown).
    pub width: u32,
    /// Intrinsic image height (0 if unknown).
    pub height: u32,
    /// Resolved display ratio.
    pub ratio: Option<f64>,
    pub container: ContainerSpec,
    /// Explicit shares; take precedence over span-derived ones.
    pub shares: Vec<(BreakpointKey, f64)>,
    pub spans: Vec<ColumnSpan>,
}

impl SizesRequest {
    pub fn with_spec(mut self, spec: SizesSpec) -> Self {
        match spec {
            SizesSpec::Classes(spans) => self.spans = spans,
            SizesSpec::Shares(shares) => self.shares = shares,
        }
        self
    }
}

// ============================================================================
// Ladder
// ============================================================================

/// One step of the ladder: from this breakpoint the image takes `share`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderEntry {
    pub breakpoint: u32,
    pub share: f64,
}

/// Sorted, collapsed breakpoint → share sequence, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    mobile_first: bool,
    default_breakpoint: u32,
    container_width: Option<u32>,
    correction: f64,
    entries: Vec<LadderEntry>,
}

impl Ladder {
    pub fn entries(&self) -> &[LadderEntry] {
        &self.entries
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Whether a breakpoint lies past the container threshold and so renders
    /// as a fixed pixel width.
    fn is_fixed(&self, breakpoint: u32) -> bool {
        match self.container_width {
            None => false,
            Some(cw) if self.mobile_first => breakpoint >= cw,
            Some(cw) => breakpoint > cw,
        }
    }

    fn sort(&mut self) {
        if self.mobile_first {
            self.entries.sort_by(|a, b| b.breakpoint.cmp(&a.breakpoint));
        } else {
            self.entries.sort_by_key(|e| e.breakpoint);
        }
    }

    /// Drop the earlier entry of every adjacent pair that renders the same
    /// width: its query is covered by the later, wider-reaching one.
    fn collapse(&mut self) {
        let mut kept: Vec<LadderEntry> = Vec::with_capacity(self.entries.len());
        for entry in std::mem::take(&mut self.entries) {
            if let Some(last) = kept.last() {
                if last.share == entry.share
                    && self.is_fixed(last.breakpoint) == self.is_fixed(entry.breakpoint)
                {
                    kept.pop();
                }
            }
            kept.push(entry);
        }
        self.entries = kept;
    }

    /// Share in effect at the container width: the first entry, in
    /// evaluation order, at or past it. Ties resolve to the first one
    /// encountered.
    fn container_share(&self, container_width: u32) -> f64 {
        self.entries
            .iter()
            .find(|e| {
                if self.mobile_first {
                    e.breakpoint <= container_width
                } else {
                    e.breakpoint >= container_width
                }
            })
            .map_or(1.0, |e| e.share)
    }

    fn insert(&mut self, entry: LadderEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.breakpoint == entry.breakpoint)
        {
            Some(existing) => existing.share = entry.share,
            None => self.entries.push(entry),
        }
    }

    fn media_query(&self, breakpoint: u32) -> String {
        if breakpoint == self.default_breakpoint {
            String::new()
        } else if self.mobile_first {
            format!("(min-width: {breakpoint}px) ")
        } else {
            let threshold = f64::from(breakpoint) - MAX_WIDTH_OFFSET;
            format!("(max-width: {}px) ", format_number(threshold, 2))
        }
    }

    fn image_width(&self, entry: &LadderEntry) -> String {
        match self.container_width {
            Some(cw) if self.is_fixed(entry.breakpoint) => {
                let px = (f64::from(cw) * entry.share * self.correction).round();
                format!("{}px", format_number(px, 0))
            }
            _ => format!(
                "{}vw",
                format_number(100.0 * entry.share * self.correction, 2)
            ),
        }
    }
}

impl fmt::Display for Ladder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}{}",
                self.media_query(entry.breakpoint),
                self.image_width(entry)
            )?;
        }
        Ok(())
    }
}

/// Scale factor compensating for a crop that makes the rendered image wider
/// than its slot. Never below 1.
pub fn ratio_correction(width: u32, height: u32, display_ratio: Option<f64>) -> f64 {
    let Some(display_ratio) = display_ratio else {
        return 1.0;
    };
    if width == 0 || height == 0 {
        return 1.0;
    }
    let correction = ratio::intrinsic(width, height) / (100.0 / display_ratio);
    if correction >= 1.0 { correction } else { 1.0 }
}

/// Build the ladder for a request.
pub fn build_ladder(grid: &GridConfig, request: &SizesRequest) -> Result<Ladder, PictureError> {
    let correction = ratio_correction(request.width, request.height, request.ratio);
    let container_width = request.container.resolve(grid)?;
    let table = grid.breakpoint_table();

    let mut shares: Vec<(BreakpointKey, f64)> = request.shares.clone();
    for span in &request.spans {
        let key = BreakpointKey::Named(span.breakpoint.clone());
        let share = f64::from(span.columns) / f64::from(grid.columns);
        match shares.iter_mut().position(|(k, _)| *k == key) {
            // Explicit shares win over span-derived ones
            Some(i) if i < request.shares.len() => {}
            Some(i) => shares[i].1 = share,
            None => shares.push((key, share)),
        }
    }
    let default_key = BreakpointKey::default_key();
    if !shares.iter().any(|(k, _)| *k == default_key) {
        shares.push((default_key, 1.0));
    }

    let mut ladder = Ladder {
        mobile_first: grid.mobile_first,
        default_breakpoint: grid.default_breakpoint(),
        container_width,
        correction,
        entries: Vec::with_capacity(shares.len() + 1),
    };
    for (key, share) in &shares {
        if !share.is_finite() || *share <= 0.0 || *share > 1.0 {
            return Err(ConfigError::ShareOutOfRange {
                breakpoint: key.to_string(),
                share: *share,
            }
            .into());
        }
        ladder.insert(LadderEntry {
            breakpoint: key.resolve(&table)?,
            share: *share,
        });
    }

    ladder.sort();
    ladder.collapse();

    if let Some(cw) = container_width {
        let share = ladder.container_share(cw);
        ladder.insert(LadderEntry {
            breakpoint: cw,
            share,
        });
        ladder.sort();
        ladder.collapse();
    }

    Ok(ladder)
}

/// Render the `sizes` attribute for a request.
pub fn render(grid: &GridConfig, request: &SizesRequest) -> Result<String, PictureError> {
    let ladder = build_ladder(grid, request)?;
    tracing::trace!(entries = ladder.entries.len(), "built sizes ladder");
    Ok(ladder.to_string())
}

/// Round half away from zero to `decimals` places and print without
/// trailing zeros (`50`, `33.33`, `1279.98`).
pub fn format_number(value: f64, decimals: i32) -> String {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}
