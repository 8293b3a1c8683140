//! Text interchange codecs for LifeWorld grids.
//!
//! Two lossless encodings are provided:
//!
//! - [`compact`] packs the whole grid six cells per character into a dense
//!   single-line string with a `width:height:` prefix.
//! - [`pattern`] is a human-editable run-length notation with `#WW`/`#WH`
//!   world-size headers and a `x = .., y = .., rule = ..` metadata line,
//!   in the style of plaintext Life pattern files.
//!
//! Both decoders build a fresh [`lifeworld_core::CellGrid`] and report
//! failures as typed errors, so a malformed input never touches an existing
//! world; callers swap the result in via `World::install` on success.

use lifeworld_core::{GridError, RuleError};
use thiserror::Error;

pub mod compact;
pub mod pattern;

/// Failures shared by both codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A data character outside the packed-grid alphabet.
    #[error("character {0:?} is not in the packed-grid alphabet")]
    InvalidCharacter(char),
    /// The packed data ran out before the grid was filled.
    #[error("packed data supplies {got} cell bits, grid needs {needed}")]
    TruncatedData { needed: usize, got: usize },
    /// A dimension or metadata field failed to parse.
    #[error("malformed header: {0}")]
    InvalidHeader(String),
    /// The pattern's bounding rectangle exceeds the world it targets.
    #[error(
        "{pattern_width}x{pattern_height} pattern does not fit the \
         {world_width}x{world_height} world"
    )]
    PatternTooLarge {
        pattern_width: u32,
        pattern_height: u32,
        world_width: u32,
        world_height: u32,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}
