//! Raw segment framing and typed parsers for the IGS segment types.
//!
//! An IGS stream is a concatenation of segments, each framed by a 13-byte
//! header: the `IG` magic, 32-bit PTS and DTS, a type code and a 16-bit
//! payload length. Payloads decode into [`SegmentData`] variants; picture
//! payloads may span several segments and are stitched back together by
//! [`crate::assemble`].

use crate::{read_bitfield, ErrorDetails, Result, SliceReader};
use log::warn;
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Magic bytes opening every segment header.
pub const SEGMENT_MAGIC: &[u8; 2] = b"IG";

/// Segment type codes carried in the segment header.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum SegmentType {
    /// Palette definition.
    Palette = 0x14,
    /// Picture object (possibly one fragment of many).
    Picture = 0x15,
    /// Interactive composition: pages, button groups, buttons.
    Button = 0x18,
    /// End-of-display marker; carries no parsed payload.
    Display = 0x80,
}

/// One palette entry as stored on disk.
///
/// Note the on-disk channel order is Y, Cr, Cb, alpha; the canonical
/// in-memory order used by [`crate::model::Palette`] swaps Cb and Cr. The
/// disk order stays confined to this struct.
#[derive(Debug, Copy, Clone)]
pub struct PaletteEntry {
    /// Palette index this entry defines.
    pub color_id: u8,
    /// Luminance.
    pub y: u8,
    /// Red chrominance.
    pub cr: u8,
    /// Blue chrominance.
    pub cb: u8,
    /// Alpha, 255 = opaque.
    pub alpha: u8,
}

/// Payload of a palette segment.
#[derive(Debug)]
pub struct PaletteSegment {
    /// Entries in segment order; indices may be sparse and duplicated
    /// entries are rejected during palette normalization.
    pub entries: Vec<PaletteEntry>,
}

impl PaletteSegment {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        // Two unknown bytes, not an id.
        reader.skip(2)?;
        let mut entries = Vec::with_capacity(reader.remaining_len() / 5);
        while let Some(bytes) = reader.read_opt_array_ref::<5>()? {
            entries.push(PaletteEntry {
                color_id: bytes[0],
                y: bytes[1],
                cr: bytes[2],
                cb: bytes[3],
                alpha: bytes[4],
            });
        }
        Ok(Self { entries })
    }
}

/// Size fields present on the first segment of a picture sequence.
#[derive(Debug, Copy, Clone)]
pub struct PictureDimensions {
    /// Total RLE byte length across all fragments. The on-disk field
    /// includes the four width/height bytes; this value has them removed.
    pub rle_length: usize,
    /// Bitmap width in pixels.
    pub width: u16,
    /// Bitmap height in pixels.
    pub height: u16,
}

/// Payload of a picture segment: one fragment of an RLE-compressed
/// indexed-color bitmap.
#[derive(Debug)]
pub struct PictureSegment {
    /// Picture object id.
    pub id: u16,
    /// Format version.
    pub version: u8,
    /// Set on the first (or only) fragment of a sequence.
    pub first_in_sequence: bool,
    /// Set on the last (or only) fragment of a sequence. Carried for
    /// diagnostics; reassembly is driven by accumulated length.
    pub last_in_sequence: bool,
    /// Declared size information, present only on first fragments.
    pub dimensions: Option<PictureDimensions>,
    /// RLE bytes carried by this fragment.
    pub rle_data: Vec<u8>,
}

impl PictureSegment {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let id = reader.read_be_u16()?;
        let version = reader.read_u8()?;
        let seq_desc = reader.read_u8()?;
        let first_in_sequence = seq_desc & 0x80 != 0;
        let last_in_sequence = seq_desc & 0x40 != 0;
        let dimensions = if first_in_sequence {
            let declared = reader.read_be_u24()? as usize;
            let width = reader.read_be_u16()?;
            let height = reader.read_be_u16()?;
            // The declared length covers the width/height fields just read.
            let rle_length = declared.checked_sub(4).ok_or_else(|| {
                reader.make_error(ErrorDetails::InvariantViolation(
                    "picture length shorter than its size fields",
                ))
            })?;
            Some(PictureDimensions {
                rle_length,
                width,
                height,
            })
        } else {
            None
        };
        Ok(Self {
            id,
            version,
            first_in_sequence,
            last_in_sequence,
            dimensions,
            rle_data: reader.read_to_end()?.to_vec(),
        })
    }
}

/// User operations mask attached to every page.
#[bitfield]
#[derive(Debug)]
pub struct UoMask {
    /// Menu call permitted.
    pub menu_call: bool,
    /// Title search permitted.
    pub title_search: bool,
    /// Chapter search permitted.
    pub chapter_search: bool,
    /// Time search permitted.
    pub time_search: bool,
    /// Skip to next point permitted.
    pub skip_to_next_point: bool,
    /// Skip to previous point permitted.
    pub skip_to_prev_point: bool,
    /// First-play playback permitted.
    pub play_firstplay: bool,
    /// Stop permitted.
    pub stop: bool,
    /// Pause on permitted.
    pub pause_on: bool,
    /// Pause off permitted.
    pub pause_off: bool,
    /// Still off permitted.
    pub still_off: bool,
    /// Forward play permitted.
    pub forward: bool,
    /// Backward play permitted.
    pub backward: bool,
    /// Resume permitted.
    pub resume: bool,
    /// Move up selection permitted.
    pub move_up: bool,
    /// Move down selection permitted.
    pub move_down: bool,
    /// Move left selection permitted.
    pub move_left: bool,
    /// Move right selection permitted.
    pub move_right: bool,
    /// Select permitted.
    pub select: bool,
    /// Activate permitted.
    pub activate: bool,
    /// Select-and-activate permitted.
    pub select_and_activate: bool,
    /// Primary audio change permitted.
    pub primary_audio_change: bool,
    #[skip]
    unused: bool,
    /// Angle change permitted.
    pub angle_change: bool,
    /// Popup on permitted.
    pub popup_on: bool,
    /// Popup off permitted.
    pub popup_off: bool,
    /// PG enable/disable permitted.
    pub pg_enable_disable: bool,
    /// PG change permitted.
    pub pg_change: bool,
    /// Secondary video enable/disable permitted.
    pub secondary_video_enable_disable: bool,
    /// Secondary video change permitted.
    pub secondary_video_change: bool,
    /// Secondary audio enable/disable permitted.
    pub secondary_audio_enable_disable: bool,
    /// Secondary audio change permitted.
    pub secondary_audio_change: bool,
    #[skip]
    unused2: bool,
    /// PiP PG change permitted.
    pub pip_pg_change: bool,
    #[skip]
    unused3: B30,
}

/// Sub-rectangle positioning effect objects within a page transition.
#[derive(Debug)]
pub struct EffectWindow {
    /// Window id, unique within its effect sequence.
    pub id: u8,
    /// X position on the canvas.
    pub x: u16,
    /// Y position on the canvas.
    pub y: u16,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

impl EffectWindow {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(Self {
            id: reader.read_u8()?,
            x: reader.read_be_u16()?,
            y: reader.read_be_u16()?,
            width: reader.read_be_u16()?,
            height: reader.read_be_u16()?,
        })
    }
}

/// A positioned graphical element of one effect.
#[derive(Debug)]
pub struct EffectObject {
    /// Referenced picture object id.
    pub picture: u16,
    /// Referenced window id within the owning effect sequence.
    pub window: u16,
    /// X position.
    pub x: u16,
    /// Y position.
    pub y: u16,
}

impl EffectObject {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(Self {
            picture: reader.read_be_u16()?,
            window: reader.read_be_u16()?,
            x: reader.read_be_u16()?,
            y: reader.read_be_u16()?,
        })
    }
}

/// A set of effect objects displayed for a fixed duration.
#[derive(Debug)]
pub struct Effect {
    /// Display duration in 90kHz ticks.
    pub duration: u32,
    /// Referenced palette index.
    pub palette: u8,
    /// Contained objects.
    pub objects: Vec<EffectObject>,
}

impl Effect {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let duration = reader.read_be_u24()?;
        let palette = reader.read_u8()?;
        let object_count = reader.read_u8()?;
        let mut objects = Vec::with_capacity(object_count as usize);
        for _ in 0..object_count {
            objects.push(EffectObject::parse(reader)?);
        }
        Ok(Self {
            duration,
            palette,
            objects,
        })
    }
}

/// Windows and timed effects animating a page's show or hide transition.
///
/// Carried through to the model but never played back.
#[derive(Debug)]
pub struct EffectSequence {
    /// Windows addressable by the effects of this sequence.
    pub windows: Vec<EffectWindow>,
    /// Timed effects.
    pub effects: Vec<Effect>,
}

impl EffectSequence {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let window_count = reader.read_u8()?;
        let mut windows = Vec::with_capacity(window_count as usize);
        for _ in 0..window_count {
            let window = EffectWindow::parse(reader)?;
            if windows.iter().any(|w: &EffectWindow| w.id == window.id) {
                return Err(reader.make_error(ErrorDetails::InvariantViolation(
                    "duplicate effect window id",
                )));
            }
            windows.push(window);
        }
        let effect_count = reader.read_u8()?;
        let mut effects = Vec::with_capacity(effect_count as usize);
        for _ in 0..effect_count {
            effects.push(Effect::parse(reader)?);
        }
        Ok(Self { windows, effects })
    }
}

/// Raw button navigation targets, `0xFFFF` meaning none.
#[derive(Debug, Copy, Clone)]
pub struct NavigationRecord {
    /// Target when moving up.
    pub up: u16,
    /// Target when moving down.
    pub down: u16,
    /// Target when moving left.
    pub left: u16,
    /// Target when moving right.
    pub right: u16,
}

/// Raw per-state picture references, `0xFFFF` meaning none.
#[derive(Debug, Copy, Clone)]
pub struct StateRecord {
    /// Picture shown when the state starts.
    pub start: u16,
    /// Picture shown when the state stops.
    pub stop: u16,
    /// State flags (repeat behavior and the like).
    pub flags: u16,
}

/// One navigation command attached to a button; carried, never executed.
#[derive(Debug, Copy, Clone)]
pub struct ButtonCommand {
    /// Operation word.
    pub opcode: u32,
    /// Destination operand.
    pub destination: u32,
    /// Source operand.
    pub source: u32,
}

/// Complete raw definition of one interactive button.
#[derive(Debug)]
pub struct ButtonRecord {
    /// Button id, unique within its page.
    pub id: u16,
    /// Remote control number pad equivalent.
    pub numeric_select_value: u16,
    /// Flags byte (auto-action and reserved bits).
    pub flags: u8,
    /// X position on the canvas.
    pub x: u16,
    /// Y position on the canvas.
    pub y: u16,
    /// Directional navigation targets.
    pub navigation: NavigationRecord,
    /// Normal-state graphics.
    pub normal: StateRecord,
    /// Selected-state graphics.
    pub selected: StateRecord,
    /// Activated-state start picture, `0xFFFF` meaning none.
    pub activated_start: u16,
    /// Activated-state stop picture as stored on disk; the resolved model
    /// exposes no activated stop graphic.
    pub activated_stop: u16,
    /// Commands executed by a player on activation.
    pub commands: Vec<ButtonCommand>,
}

impl ButtonRecord {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let id = reader.read_be_u16()?;
        let numeric_select_value = reader.read_be_u16()?;
        let flags = reader.read_u8()?;
        let x = reader.read_be_u16()?;
        let y = reader.read_be_u16()?;
        let navigation = NavigationRecord {
            up: reader.read_be_u16()?,
            down: reader.read_be_u16()?,
            left: reader.read_be_u16()?,
            right: reader.read_be_u16()?,
        };
        let normal = StateRecord {
            start: reader.read_be_u16()?,
            stop: reader.read_be_u16()?,
            flags: reader.read_be_u16()?,
        };
        let selected = StateRecord {
            start: reader.read_be_u16()?,
            stop: reader.read_be_u16()?,
            flags: reader.read_be_u16()?,
        };
        let activated_start = reader.read_be_u16()?;
        let activated_stop = reader.read_be_u16()?;
        let command_count = reader.read_be_u16()?;
        let mut commands = Vec::with_capacity(command_count as usize);
        for _ in 0..command_count {
            commands.push(ButtonCommand {
                opcode: reader.read_be_u32()?,
                destination: reader.read_be_u32()?,
                source: reader.read_be_u32()?,
            });
        }
        Ok(Self {
            id,
            numeric_select_value,
            flags,
            x,
            y,
            navigation,
            normal,
            selected,
            activated_start,
            activated_stop,
            commands,
        })
    }
}

/// Raw button group: a set of buttons of which one is visible at a time.
#[derive(Debug)]
pub struct BogRecord {
    /// Default button id within the group.
    pub def_button: u16,
    /// Buttons in group order.
    pub buttons: Vec<ButtonRecord>,
}

impl BogRecord {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let def_button = reader.read_be_u16()?;
        let button_count = reader.read_u8()?;
        let mut buttons = Vec::with_capacity(button_count as usize);
        for _ in 0..button_count {
            buttons.push(ButtonRecord::parse(reader)?);
        }
        Ok(Self {
            def_button,
            buttons,
        })
    }
}

/// Raw page record: one interactive screen.
#[derive(Debug)]
pub struct PageRecord {
    /// Page id.
    pub id: u8,
    /// Format version.
    pub version: u8,
    /// User operations mask.
    pub uo_mask: UoMask,
    /// Animated show effects.
    pub in_effects: EffectSequence,
    /// Animated hide effects.
    pub out_effects: EffectSequence,
    /// Additional frames delaying animated button frames.
    pub framerate_divider: u8,
    /// Default selected button id, `0xFFFF` meaning none.
    pub def_button: u16,
    /// Default activated button id, `0xFFFF` meaning none.
    pub def_activated: u16,
    /// Referenced palette index.
    pub palette: u8,
    /// Button groups in page order.
    pub bogs: Vec<BogRecord>,
}

impl PageRecord {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let id = reader.read_u8()?;
        let version = reader.read_u8()?;
        let uo_mask = read_bitfield!(reader, UoMask);
        let in_effects = EffectSequence::parse(reader)?;
        let out_effects = EffectSequence::parse(reader)?;
        let framerate_divider = reader.read_u8()?;
        let def_button = reader.read_be_u16()?;
        let def_activated = reader.read_be_u16()?;
        let palette = reader.read_u8()?;
        let bog_count = reader.read_u8()?;
        let mut bogs = Vec::with_capacity(bog_count as usize);
        for _ in 0..bog_count {
            bogs.push(BogRecord::parse(reader)?);
        }
        Ok(Self {
            id,
            version,
            uo_mask,
            in_effects,
            out_effects,
            framerate_divider,
            def_button,
            def_activated,
            palette,
            bogs,
        })
    }
}

/// Payload of the button segment: the whole interactive composition.
#[derive(Debug)]
pub struct ButtonSegment {
    /// Canvas width in pixels.
    pub width: u16,
    /// Canvas height in pixels.
    pub height: u16,
    /// Frame rate code.
    pub framerate_id: u8,
    /// Composition number.
    pub composition_number: u16,
    /// Composition state code.
    pub composition_state: u8,
    /// Fragmentation flags of the composition unit.
    pub sequence_descriptor: u8,
    /// Whether graphics are multiplexed into the AV clip rather than
    /// preloaded.
    pub stream_model: bool,
    /// Whether the composition describes a popup menu.
    pub popup_menu: bool,
    /// Time at which the composition expires, when present.
    pub composition_timeout_pts: Option<u64>,
    /// Time at which the selection expires, when present.
    pub selection_timeout_pts: Option<u64>,
    /// Inactivity timeout in 90kHz ticks, when present. Absent is not the
    /// same as zero.
    pub user_timeout_duration: Option<u32>,
    /// Pages in composition order.
    pub pages: Vec<PageRecord>,
}

impl ButtonSegment {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let width = reader.read_be_u16()?;
        let height = reader.read_be_u16()?;
        let framerate_id = reader.read_u8()?;
        let composition_number = reader.read_be_u16()?;
        let composition_state = reader.read_u8()?;
        let sequence_descriptor = reader.read_u8()?;
        let data_len = reader.read_be_u24()? as usize;
        if data_len != reader.remaining_len() {
            warn!(
                "interactive composition declares {} bytes, {} present",
                data_len,
                reader.remaining_len()
            );
        }
        let model_flags = reader.read_u8()?;
        let stream_model = model_flags & 0x80 != 0;
        let popup_menu = model_flags & 0x40 != 0;
        let (composition_timeout_pts, selection_timeout_pts) = if !stream_model {
            (reader.read_opt_be_u33()?, reader.read_opt_be_u33()?)
        } else {
            (None, None)
        };
        let user_timeout_duration = reader.read_opt_be_u24()?;
        let page_count = match reader.read_opt_array_ref::<1>()? {
            Some(bytes) => bytes[0],
            None => 0,
        };
        let mut pages = Vec::with_capacity(page_count as usize);
        for _ in 0..page_count {
            pages.push(PageRecord::parse(reader)?);
        }
        if !reader.is_empty() {
            warn!(
                "entire interactive composition not read ({} bytes left)",
                reader.remaining_len()
            );
            reader.read_to_end()?;
        }
        Ok(Self {
            width,
            height,
            framerate_id,
            composition_number,
            composition_state,
            sequence_descriptor,
            stream_model,
            popup_menu,
            composition_timeout_pts,
            selection_timeout_pts,
            user_timeout_duration,
            pages,
        })
    }
}

/// Typed payload of one segment.
#[derive(Debug)]
pub enum SegmentData {
    /// Palette definition.
    Palette(PaletteSegment),
    /// Picture fragment.
    Picture(PictureSegment),
    /// Interactive composition.
    Button(ButtonSegment),
    /// End-of-display marker.
    Display,
}

/// One framed and parsed segment.
#[derive(Debug)]
pub struct Segment {
    /// Presentation timestamp from the segment header.
    pub pts: u32,
    /// Decoding timestamp from the segment header.
    pub dts: u32,
    /// Parsed payload.
    pub data: SegmentData,
}

/// Iterator framing and parsing segments out of an IGS byte stream.
///
/// Iteration ends cleanly when the stream is exhausted at a header
/// boundary; a partial header or short payload yields
/// [`ErrorDetails::UnexpectedEof`] and a header without the `IG` magic
/// yields [`ErrorDetails::InvalidSegmentHeader`].
#[derive(Debug)]
pub struct SegmentReader<'a> {
    reader: SliceReader<'a>,
}

impl<'a> SegmentReader<'a> {
    /// Creates a segment reader over a complete IGS byte stream.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: SliceReader::new(data),
        }
    }

    fn read_segment(&mut self) -> Result<Segment> {
        let magic = self.reader.read_array_ref::<2>()?;
        if magic != SEGMENT_MAGIC {
            return Err(self.reader.make_error(ErrorDetails::InvalidSegmentHeader));
        }
        let pts = self.reader.read_be_u32()?;
        let dts = self.reader.read_be_u32()?;
        let seg_type = self.reader.read_u8()?;
        let seg_length = self.reader.read_be_u16()?;
        let mut seg_reader = self.reader.new_sub_reader(seg_length as usize)?;

        let data = match SegmentType::from_u8(seg_type) {
            Some(SegmentType::Palette) => {
                SegmentData::Palette(PaletteSegment::parse(&mut seg_reader)?)
            }
            Some(SegmentType::Picture) => {
                SegmentData::Picture(PictureSegment::parse(&mut seg_reader)?)
            }
            Some(SegmentType::Button) => {
                SegmentData::Button(ButtonSegment::parse(&mut seg_reader)?)
            }
            Some(SegmentType::Display) => SegmentData::Display,
            None => {
                return Err(
                    seg_reader.make_error(ErrorDetails::InvariantViolation("unknown segment type"))
                )
            }
        };

        Ok(Segment { pts, dts, data })
    }
}

impl Iterator for SegmentReader<'_> {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_empty() {
            return None;
        }
        Some(self.read_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn frames_and_parses_a_palette_segment() {
        let mut stream = Vec::new();
        push_segment(
            &mut stream,
            SegmentType::Palette,
            &palette_payload(&[(0, 235, 128, 128, 255), (1, 16, 128, 128, 0)]),
        );
        let segments: Vec<_> = SegmentReader::new(&stream)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(segments.len(), 1);
        match &segments[0].data {
            SegmentData::Palette(palette) => {
                assert_eq!(palette.entries.len(), 2);
                assert_eq!(palette.entries[0].color_id, 0);
                assert_eq!(palette.entries[0].y, 235);
                assert_eq!(palette.entries[1].alpha, 0);
            }
            other => panic!("expected palette, got {:?}", other),
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut stream = Vec::new();
        push_segment(&mut stream, SegmentType::Display, &[]);
        stream[0] = b'X';
        let err = SegmentReader::new(&stream).next().unwrap().unwrap_err();
        assert_eq!(err.details, ErrorDetails::InvalidSegmentHeader);
    }

    #[test]
    fn truncated_header_is_an_error_but_clean_eof_is_not() {
        let mut stream = Vec::new();
        push_segment(&mut stream, SegmentType::Display, &[]);
        assert!(SegmentReader::new(&stream).collect::<Result<Vec<_>>>().is_ok());

        stream.extend_from_slice(b"IG\x00\x00");
        let result: Result<Vec<_>> = SegmentReader::new(&stream).collect();
        assert_eq!(result.unwrap_err().details, ErrorDetails::UnexpectedEof);
    }

    #[test]
    fn picture_header_fields_decode() {
        let mut stream = Vec::new();
        let rle = [0x01, 0x02];
        push_segment(
            &mut stream,
            SegmentType::Picture,
            &picture_head_payload(9, 1, 3, 1, &rle),
        );
        let segment = SegmentReader::new(&stream).next().unwrap().unwrap();
        match segment.data {
            SegmentData::Picture(picture) => {
                assert_eq!(picture.id, 9);
                assert!(picture.first_in_sequence);
                let dims = picture.dimensions.unwrap();
                assert_eq!((dims.width, dims.height), (3, 1));
                // Declared length includes the width/height bytes.
                assert_eq!(dims.rle_length, 2 + 4 - 4);
                assert_eq!(picture.rle_data, rle);
            }
            other => panic!("expected picture, got {:?}", other),
        }
    }

    #[test]
    fn continuation_picture_has_no_dimensions() {
        let mut stream = Vec::new();
        push_segment(
            &mut stream,
            SegmentType::Picture,
            &picture_tail_payload(9, 1, &[0xAA, 0xBB]),
        );
        let segment = SegmentReader::new(&stream).next().unwrap().unwrap();
        match segment.data {
            SegmentData::Picture(picture) => {
                assert!(!picture.first_in_sequence);
                assert!(picture.dimensions.is_none());
                assert_eq!(picture.rle_data, [0xAA, 0xBB]);
            }
            other => panic!("expected picture, got {:?}", other),
        }
    }

    #[test]
    fn button_segment_full_layout() {
        let payload = button_segment_payload(&TestComposition {
            width: 1920,
            height: 1080,
            pages: vec![TestPage {
                id: 0,
                palette: 0,
                def_button: 0xFFFF,
                def_activated: 0xFFFF,
                bogs: vec![TestBog {
                    def_button: 1,
                    buttons: vec![TestButton::new(1, 10, 20)],
                }],
            }],
        });
        let mut stream = Vec::new();
        push_segment(&mut stream, SegmentType::Button, &payload);
        let segment = SegmentReader::new(&stream).next().unwrap().unwrap();
        match segment.data {
            SegmentData::Button(button) => {
                assert_eq!((button.width, button.height), (1920, 1080));
                assert!(!button.stream_model);
                assert_eq!(button.composition_timeout_pts, Some(0));
                assert_eq!(button.user_timeout_duration, Some(0));
                assert_eq!(button.pages.len(), 1);
                let page = &button.pages[0];
                assert_eq!(page.def_button, 0xFFFF);
                assert_eq!(page.bogs[0].buttons[0].id, 1);
                assert_eq!(page.bogs[0].buttons[0].x, 10);
                assert_eq!(page.bogs[0].buttons[0].navigation.up, 0xFFFF);
            }
            other => panic!("expected button, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_effect_window_ids_fail() {
        // window count 2, twice the same id
        let mut payload = vec![2_u8];
        for _ in 0..2 {
            payload.extend_from_slice(&[7, 0, 0, 0, 0, 0, 16, 0, 16]);
        }
        let mut reader = SliceReader::new(&payload);
        let err = EffectSequence::parse(&mut reader).unwrap_err();
        assert!(matches!(err.details, ErrorDetails::InvariantViolation(_)));
    }
}
