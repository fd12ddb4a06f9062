//! Error taxonomy shared by the geometry engine and the assembler.
//!
//! Two kinds of failure exist, and both propagate to the caller:
//!
//! - [`InputError`]: bad content data (a malformed `"x/y"` ratio, an
//!   unparseable focus string, a request asking for two things that
//!   cannot both hold). Fixable by whoever edits the content.
//! - [`ConfigError`](crate::config::ConfigError): a broken grid setup
//!   (unknown breakpoint name, share above 1.0, unresolvable container
//!   width). Fixable by whoever deploys the configuration.
//!
//! Expected absence (no focus point, no dimensions, no source URL) is not an
//! error anywhere in this crate; it resolves to `None`.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("invalid ratio '{0}': expected \"auto\", \"intrinsic\" or \"x/y\"")]
    InvalidRatio(String),
    #[error("invalid ratio '{0}': x and y must be greater than 0")]
    ZeroRatioComponent(String),
    #[error("invalid ratio {0}: must be a finite, non-negative number")]
    InvalidDecimalRatio(f64),
    #[error("invalid focus point '{0}': expected two coordinates like \"0.5;0.5\"")]
    InvalidFocus(String),
    #[error("invalid column span '{0}': expected \"[breakpoint:]columns\" like \"lg:6\"")]
    InvalidColumnSpan(String),
    #[error("invalid element tag '{0}': expected a letter followed by letters, digits or '-'")]
    InvalidTag(String),
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),
}

/// Anything that aborts the render of a single element.
#[derive(Error, Debug)]
pub enum PictureError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
