//! Reassembly of fragmented picture segments into decoded bitmaps.
//!
//! A picture's RLE data may span one head segment (which advertises the
//! total RLE length and the bitmap dimensions) and any number of
//! continuation segments. Fragments are buffered in arrival order until the
//! advertised length is reached, then concatenated and run through the
//! [`crate::rle`] decoder.

use crate::rle::decode_rle;
use crate::segment::PictureSegment;
use crate::{Error, ErrorDetails, Result};
use std::fmt::{Debug, Formatter};

/// A fully decoded indexed-color bitmap.
pub struct Picture {
    /// Picture object id.
    pub id: u16,
    /// Format version from the head segment.
    pub version: u8,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Palette indices, one byte per pixel, `width * height` long.
    pub picture_data: Vec<u8>,
}

impl Debug for Picture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Picture")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("picture_data.len()", &self.picture_data.len())
            .finish()
    }
}

/// Buffers picture fragments and emits a [`Picture`] once a sequence is
/// complete.
///
/// Completion is driven by the head segment's advertised RLE length; callers
/// must [`flush`](PictureAssembler::flush) when a non-picture segment
/// arrives and once more at stream end, so truncated sequences surface as
/// errors instead of being dropped.
#[derive(Debug, Default)]
pub struct PictureAssembler {
    pending: Vec<PictureSegment>,
}

impl PictureAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one picture fragment, returning a decoded picture when the
    /// fragment completes its sequence.
    pub fn push(&mut self, segment: PictureSegment) -> Result<Option<Picture>> {
        self.pending.push(segment);
        let advertised = match self.pending[0].dimensions {
            Some(dimensions) => dimensions.rle_length,
            None => {
                return Err(Error::new(ErrorDetails::InvariantViolation(
                    "picture continuation without an opening segment",
                )))
            }
        };
        let accumulated: usize = self.pending.iter().map(|s| s.rle_data.len()).sum();
        if accumulated < advertised {
            return Ok(None);
        }
        if accumulated > advertised {
            return Err(Error::new(ErrorDetails::PictureTooLong));
        }
        self.finish().map(Some)
    }

    /// Finalizes any pending sequence.
    ///
    /// Returns [`None`] when nothing is pending. A pending sequence shorter
    /// than its advertised length decodes short and therefore fails with
    /// [`ErrorDetails::UnexpectedEof`].
    pub fn flush(&mut self) -> Result<Option<Picture>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        self.finish().map(Some)
    }

    fn finish(&mut self) -> Result<Picture> {
        let pending = std::mem::take(&mut self.pending);
        let head = &pending[0];
        let dimensions = match head.dimensions {
            Some(dimensions) => dimensions,
            None => {
                return Err(Error::new(ErrorDetails::InvariantViolation(
                    "picture continuation without an opening segment",
                )))
            }
        };
        let mut rle = Vec::with_capacity(dimensions.rle_length);
        for segment in &pending {
            rle.extend_from_slice(&segment.rle_data);
        }
        let picture_data = decode_rle(&rle, dimensions.width, dimensions.height)?;
        Ok(Picture {
            id: head.id,
            version: head.version,
            width: dimensions.width,
            height: dimensions.height,
            picture_data,
        })
    }
}
