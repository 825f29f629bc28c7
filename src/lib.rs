//! Decoder and PNG renderer for Blu-ray interactive graphics stream (IGS) menus.
//!
//! An IGS menu is a segment-oriented binary stream carrying palettes,
//! run-length-encoded bitmap objects and a hierarchy of pages, button groups
//! and buttons. This crate ingests either a raw IGS stream (starting with the
//! `IG` magic) or a Blu-ray transport stream containing one, builds a fully
//! cross-referenced [`model::Menu`], and rasterizes each interactive state to
//! 16-bit RGBA suitable for PNG export.
//!
//! # Usage
//!
//! ```no_run
//! use igs_menu::model::Menu;
//! use igs_menu::render::{FramePhase, RenderOptions, SelectionState};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("00000.menu")?;
//! let menu = Menu::from_bytes(&data)?;
//! let opts = RenderOptions::for_menu(&menu);
//! for page_index in 0..menu.pages.len() {
//!     let image = igs_menu::render::render_page(
//!         &menu,
//!         page_index,
//!         &opts,
//!         SelectionState::Selected,
//!         FramePhase::Start,
//!     )?;
//!     let file = std::fs::File::create(format!("page_{}.png", page_index))?;
//!     igs_menu::render::write_png(file, menu.width, menu.height, &image)?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs, unsafe_code)]

use std::fmt::{Display, Formatter};
use std::result;

use thiserror::Error as ThisError;

mod slice_reader;
pub use slice_reader::SliceReader;

pub mod assemble;
pub mod model;
pub mod render;
pub mod rle;
pub mod segment;
#[cfg(test)]
pub(crate) mod testutil;
pub mod ts;

/// The closed set of failures the decoding pipeline can produce.
///
/// Errors propagate to the top of the per-file pipeline; nothing is retried
/// or recovered locally.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ErrorDetails {
    /// An IGS segment header did not start with the `IG` magic.
    #[error("invalid segment header")]
    InvalidSegmentHeader,
    /// The stream ended where more data was expected.
    #[error("unexpected end of stream")]
    UnexpectedEof,
    /// The transport-stream probe budget was exhausted without finding an
    /// IGS elementary stream.
    #[error("no interactive graphics stream found")]
    NoIgsStream,
    /// A run-length end-of-line marker occurred away from a line boundary.
    #[error("incorrect number of decoded pixels at line break")]
    IncorrectPixelCount,
    /// A decoded bitmap exceeded its declared size, or accumulated picture
    /// fragments exceeded the advertised length.
    #[error("picture data is too long")]
    PictureTooLong,
    /// A button reference did not resolve within its page.
    #[error("button {0:#06x} not found")]
    ButtonNotFound(u16),
    /// A picture reference did not resolve within the menu.
    #[error("picture {0:#06x} not found")]
    PictureNotFound(u16),
    /// A structural invariant of the stream or model was violated.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

/// Error type carrying an optional byte offset into the parsed buffer.
///
/// Parsing layers attach the offset of the offending read via
/// [`SliceReader::make_error`]; resolution and rendering failures have no
/// meaningful offset and leave it unset.
#[derive(Debug)]
pub struct Error {
    /// Byte offset within the parsed buffer, when known.
    pub location: Option<usize>,
    /// Information about the error.
    pub details: ErrorDetails,
}

impl Error {
    /// Creates an error with no associated byte offset.
    pub fn new(details: ErrorDetails) -> Self {
        Self {
            location: None,
            details,
        }
    }

    /// Creates an error located at `location` bytes into the parsed buffer.
    pub fn at(location: usize, details: ErrorDetails) -> Self {
        Self {
            location: Some(location),
            details,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} (at byte offset {})", self.details, location),
            None => self.details.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorDetails> for Error {
    fn from(details: ErrorDetails) -> Self {
        Error::new(details)
    }
}

/// [`std::result::Result`] alias that uses [`Error`].
pub type Result<T> = result::Result<T, Error>;
