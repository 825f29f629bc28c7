//! Cross-referenced menu model built from a parsed segment stream.
//!
//! Construction is two-phase: the parse layer leaves raw `u16` ids in
//! place, and resolution replaces them with typed handles ([`PaletteId`]
//! and [`PictureId`] into menu-owned tables, [`ButtonRef`] into the page's
//! button arenas). The `0xFFFF` "none" sentinel never survives past this
//! module; resolved references are plain [`Option`]s. Navigation can form
//! cycles (left/right pairs), which the handle indirection represents
//! without ownership loops.

use crate::assemble::{Picture, PictureAssembler};
use crate::segment::{
    BogRecord, ButtonCommand, ButtonRecord, ButtonSegment, EffectWindow, PageRecord,
    PaletteSegment, Segment, SegmentData, SegmentReader, StateRecord, UoMask,
};
use crate::{ts, Error, ErrorDetails, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// The u16 id value marking an absent button or picture reference.
pub const NONE_SENTINEL: u16 = 0xFFFF;

/// One palette color in canonical channel order.
///
/// The on-disk order is Y, Cr, Cb; only [`crate::segment`] sees that.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    /// Luminance.
    pub y: u8,
    /// Blue chrominance.
    pub cb: u8,
    /// Red chrominance.
    pub cr: u8,
    /// Alpha, 255 = opaque.
    pub alpha: u8,
}

impl Default for PaletteColor {
    /// The fully transparent near-black filled in for undefined entries.
    fn default() -> Self {
        Self {
            y: 16,
            cb: 128,
            cr: 128,
            alpha: 0,
        }
    }
}

/// A normalized palette: every index 0..=255 has a defined color.
#[derive(Debug)]
pub struct Palette {
    colors: Box<[PaletteColor; 256]>,
}

impl Palette {
    pub(crate) fn from_segment(segment: &PaletteSegment) -> Result<Self> {
        info!("Creating palette...");
        let mut colors = Box::new([PaletteColor::default(); 256]);
        let mut defined = [false; 256];
        for entry in &segment.entries {
            let index = entry.color_id as usize;
            if defined[index] {
                return Err(Error::new(ErrorDetails::InvariantViolation(
                    "duplicate palette color id",
                )));
            }
            defined[index] = true;
            colors[index] = PaletteColor {
                y: entry.y,
                cb: entry.cb,
                cr: entry.cr,
                alpha: entry.alpha,
            };
        }
        for (index, defined) in defined.iter().enumerate() {
            // Index 255 never exists in source data; fill it silently.
            if !defined && index < 255 {
                debug!("Color entry #{} does not exist", index);
            }
        }
        Ok(Self { colors })
    }

    /// Returns the color at `index`.
    pub fn color(&self, index: u8) -> &PaletteColor {
        &self.colors[index as usize]
    }

    /// All 256 colors in index order.
    pub fn colors(&self) -> &[PaletteColor; 256] {
        &self.colors
    }
}

/// Handle to a palette owned by the menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PaletteId(pub usize);

/// Handle to a picture owned by the menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PictureId(pub u16);

/// Handle to a button within one page: BOG index, then button index
/// within the BOG's arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ButtonRef {
    /// Index into [`Page::bogs`].
    pub bog: usize,
    /// Index into [`Bog::buttons`].
    pub button: usize,
}

/// Outer key of a button's state table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// Neither selected nor activated.
    Normal,
    /// Highlighted by the user.
    Selected,
    /// Being activated.
    Activated,
}

impl SelectionState {
    /// All states, in rendering enumeration order.
    pub const ALL: [SelectionState; 3] = [
        SelectionState::Normal,
        SelectionState::Selected,
        SelectionState::Activated,
    ];
}

impl Display for SelectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SelectionState::Normal => "normal",
            SelectionState::Selected => "selected",
            SelectionState::Activated => "activated",
        })
    }
}

/// Inner key of a button's state table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    /// First frame of the state's animation range.
    Start,
    /// Last frame of the state's animation range.
    Stop,
}

impl FramePhase {
    /// Both phases, in rendering enumeration order.
    pub const ALL: [FramePhase; 2] = [FramePhase::Start, FramePhase::Stop];
}

impl Display for FramePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FramePhase::Start => "start",
            FramePhase::Stop => "stop",
        })
    }
}

/// Resolved graphics of one button state.
#[derive(Debug, Copy, Clone)]
pub struct ButtonState {
    /// Picture shown when the state starts.
    pub start: Option<PictureId>,
    /// Picture shown when the state stops.
    pub stop: Option<PictureId>,
    /// State flags (repeat behavior and the like).
    pub flags: u16,
}

/// Resolved directional navigation of one button.
#[derive(Debug, Copy, Clone, Default)]
pub struct Navigation {
    /// Target when moving up.
    pub up: Option<ButtonRef>,
    /// Target when moving down.
    pub down: Option<ButtonRef>,
    /// Target when moving left.
    pub left: Option<ButtonRef>,
    /// Target when moving right.
    pub right: Option<ButtonRef>,
}

/// One resolved interactive button.
#[derive(Debug)]
pub struct Button {
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
    /// Directional navigation targets within the same page.
    pub navigation: Navigation,
    /// Normal-state graphics.
    pub normal: ButtonState,
    /// Selected-state graphics.
    pub selected: ButtonState,
    /// Activated-state graphics; this state has no stop picture.
    pub activated: ButtonState,
    /// Commands run by a player on activation; carried, never executed.
    pub commands: Vec<ButtonCommand>,
}

impl Button {
    /// Looks up the picture for one `(state, phase)` cell of the state
    /// table.
    pub fn state_picture(&self, state: SelectionState, phase: FramePhase) -> Option<PictureId> {
        let graphics = match state {
            SelectionState::Normal => &self.normal,
            SelectionState::Selected => &self.selected,
            SelectionState::Activated => &self.activated,
        };
        match phase {
            FramePhase::Start => graphics.start,
            FramePhase::Stop => graphics.stop,
        }
    }
}

/// A resolved button group; exactly one member is the default.
#[derive(Debug)]
pub struct Bog {
    /// Index of the default button in [`Bog::buttons`].
    pub def_button: usize,
    /// Buttons in group order.
    pub buttons: Vec<Button>,
}

/// One placed graphical element of a resolved effect.
#[derive(Debug)]
pub struct PlacedEffectObject {
    /// Raw picture object id; carried through, never rendered.
    pub picture: u16,
    /// Index into the owning sequence's window list.
    pub window: usize,
    /// X position.
    pub x: u16,
    /// Y position.
    pub y: u16,
}

/// A resolved effect: objects shown for a fixed duration.
#[derive(Debug)]
pub struct Effect {
    /// Display duration in 90kHz ticks.
    pub duration: u32,
    /// Palette used while the effect is shown.
    pub palette: PaletteId,
    /// Placed objects.
    pub objects: Vec<PlacedEffectObject>,
}

/// Resolved show/hide transition of a page; carried, never played back.
#[derive(Debug)]
pub struct PageEffects {
    /// Windows addressable by the effects.
    pub windows: Vec<EffectWindow>,
    /// Timed effects.
    pub effects: Vec<Effect>,
}

/// One resolved interactive screen.
#[derive(Debug)]
pub struct Page {
    /// Page id.
    pub id: u8,
    /// Format version.
    pub version: u8,
    /// User operations mask.
    pub uo_mask: UoMask,
    /// Palette the page's buttons are drawn with.
    pub palette: PaletteId,
    /// Default selected button, when any.
    pub def_button: Option<ButtonRef>,
    /// Default activated button, when any.
    pub def_activated: Option<ButtonRef>,
    /// Animated show transition.
    pub in_effects: PageEffects,
    /// Animated hide transition.
    pub out_effects: PageEffects,
    /// Additional frames delaying animated button frames.
    pub framerate_divider: u8,
    /// Button groups in page order.
    pub bogs: Vec<Bog>,
}

impl Page {
    /// Returns the button a [`ButtonRef`] points at.
    pub fn button(&self, button_ref: ButtonRef) -> Option<&Button> {
        self.bogs
            .get(button_ref.bog)
            .and_then(|bog| bog.buttons.get(button_ref.button))
    }

    /// Iterates all buttons of the page across its BOGs.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.bogs.iter().flat_map(|bog| bog.buttons.iter())
    }
}

/// A fully decoded and cross-referenced IGS menu.
///
/// Immutable after construction; the menu exclusively owns its palettes,
/// pictures and pages, and everything else refers to them by handle.
#[derive(Debug)]
pub struct Menu {
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
    /// Whether graphics are multiplexed into the AV clip.
    pub stream_model: bool,
    /// Whether the menu is a popup.
    pub popup_menu: bool,
    /// Time at which the composition expires, when present.
    pub composition_timeout_pts: Option<u64>,
    /// Time at which the selection expires, when present.
    pub selection_timeout_pts: Option<u64>,
    /// Inactivity timeout in 90kHz ticks, when present.
    pub user_timeout_duration: Option<u32>,
    /// Palettes in segment order.
    pub palettes: Vec<Palette>,
    /// Decoded pictures keyed by object id.
    pub pictures: HashMap<u16, Picture>,
    /// Pages in composition order.
    pub pages: Vec<Page>,
}

impl Menu {
    /// Builds a menu from a file image, routing transport-stream input
    /// (anything not starting with the `IG` magic) through the
    /// demultiplexer first.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.starts_with(crate::segment::SEGMENT_MAGIC) {
            Self::from_igs_bytes(data)
        } else {
            Self::from_igs_bytes(&ts::extract_igs(data)?)
        }
    }

    /// Builds a menu from a raw IGS segment stream.
    pub fn from_igs_bytes(data: &[u8]) -> Result<Self> {
        let mut palettes = Vec::new();
        let mut pictures: HashMap<u16, Picture> = HashMap::new();
        let mut button_segment: Option<ButtonSegment> = None;
        let mut assembler = PictureAssembler::new();

        for segment in SegmentReader::new(data) {
            let Segment { data, .. } = segment?;
            match data {
                SegmentData::Picture(fragment) => {
                    if let Some(picture) = assembler.push(fragment)? {
                        pictures.insert(picture.id, picture);
                    }
                }
                other => {
                    if let Some(picture) = assembler.flush()? {
                        pictures.insert(picture.id, picture);
                    }
                    match other {
                        SegmentData::Palette(palette) => {
                            palettes.push(Palette::from_segment(&palette)?)
                        }
                        SegmentData::Button(button) => {
                            if button_segment.is_some() {
                                return Err(Error::new(ErrorDetails::InvariantViolation(
                                    "more than one button segment in stream",
                                )));
                            }
                            button_segment = Some(button);
                        }
                        SegmentData::Display | SegmentData::Picture(_) => {}
                    }
                }
            }
        }
        if let Some(picture) = assembler.flush()? {
            pictures.insert(picture.id, picture);
        }

        let ButtonSegment {
            width,
            height,
            framerate_id,
            composition_number,
            composition_state,
            stream_model,
            popup_menu,
            composition_timeout_pts,
            selection_timeout_pts,
            user_timeout_duration,
            pages: page_records,
            ..
        } = button_segment.ok_or(Error::new(ErrorDetails::InvariantViolation(
            "expected exactly one button segment",
        )))?;

        let mut pages = Vec::with_capacity(page_records.len());
        for record in page_records {
            pages.push(resolve_page(record, palettes.len(), &pictures)?);
        }

        Ok(Self {
            width,
            height,
            framerate_id,
            composition_number,
            composition_state,
            stream_model,
            popup_menu,
            composition_timeout_pts,
            selection_timeout_pts,
            user_timeout_duration,
            palettes,
            pictures,
            pages,
        })
    }

    /// Returns the palette a [`PaletteId`] points at.
    pub fn palette(&self, id: PaletteId) -> Option<&Palette> {
        self.palettes.get(id.0)
    }

    /// Returns the picture a [`PictureId`] points at.
    pub fn picture(&self, id: PictureId) -> Option<&Picture> {
        self.pictures.get(&id.0)
    }
}

fn resolve_palette(index: u8, palette_count: usize) -> Result<PaletteId> {
    if (index as usize) < palette_count {
        Ok(PaletteId(index as usize))
    } else {
        Err(Error::new(ErrorDetails::InvariantViolation(
            "palette index out of range",
        )))
    }
}

fn resolve_picture(id: u16, pictures: &HashMap<u16, Picture>) -> Result<Option<PictureId>> {
    if id == NONE_SENTINEL {
        return Ok(None);
    }
    if pictures.contains_key(&id) {
        Ok(Some(PictureId(id)))
    } else {
        Err(Error::new(ErrorDetails::PictureNotFound(id)))
    }
}

fn resolve_button(id: u16, lookup: &HashMap<u16, ButtonRef>) -> Result<Option<ButtonRef>> {
    if id == NONE_SENTINEL {
        return Ok(None);
    }
    match lookup.get(&id) {
        Some(button_ref) => Ok(Some(*button_ref)),
        None => Err(Error::new(ErrorDetails::ButtonNotFound(id))),
    }
}

fn resolve_state(
    record: &StateRecord,
    pictures: &HashMap<u16, Picture>,
) -> Result<ButtonState> {
    Ok(ButtonState {
        start: resolve_picture(record.start, pictures)?,
        stop: resolve_picture(record.stop, pictures)?,
        flags: record.flags,
    })
}

fn resolve_effects(
    sequence: crate::segment::EffectSequence,
    palette_count: usize,
) -> Result<PageEffects> {
    let crate::segment::EffectSequence { windows, effects } = sequence;
    let mut resolved = Vec::with_capacity(effects.len());
    for effect in effects {
        let mut objects = Vec::with_capacity(effect.objects.len());
        for object in effect.objects {
            let window = windows
                .iter()
                .position(|w| u16::from(w.id) == object.window)
                .ok_or(Error::new(ErrorDetails::InvariantViolation(
                    "effect window not found",
                )))?;
            objects.push(PlacedEffectObject {
                picture: object.picture,
                window,
                x: object.x,
                y: object.y,
            });
        }
        resolved.push(Effect {
            duration: effect.duration,
            palette: resolve_palette(effect.palette, palette_count)?,
            objects,
        });
    }
    Ok(PageEffects {
        windows,
        effects: resolved,
    })
}

fn resolve_bog(
    record: BogRecord,
    lookup: &HashMap<u16, ButtonRef>,
    pictures: &HashMap<u16, Picture>,
) -> Result<Bog> {
    // The default resolves within the BOG's own button table.
    let def_button = record
        .buttons
        .iter()
        .position(|b| b.id == record.def_button)
        .ok_or(Error::new(ErrorDetails::ButtonNotFound(record.def_button)))?;
    let mut buttons = Vec::with_capacity(record.buttons.len());
    for button in record.buttons {
        buttons.push(resolve_button_record(button, lookup, pictures)?);
    }
    Ok(Bog {
        def_button,
        buttons,
    })
}

fn resolve_button_record(
    record: ButtonRecord,
    lookup: &HashMap<u16, ButtonRef>,
    pictures: &HashMap<u16, Picture>,
) -> Result<Button> {
    Ok(Button {
        id: record.id,
        numeric_select_value: record.numeric_select_value,
        flags: record.flags,
        x: record.x,
        y: record.y,
        navigation: Navigation {
            up: resolve_button(record.navigation.up, lookup)?,
            down: resolve_button(record.navigation.down, lookup)?,
            left: resolve_button(record.navigation.left, lookup)?,
            right: resolve_button(record.navigation.right, lookup)?,
        },
        normal: resolve_state(&record.normal, pictures)?,
        selected: resolve_state(&record.selected, pictures)?,
        activated: ButtonState {
            start: resolve_picture(record.activated_start, pictures)?,
            // The activated state has no stop graphic.
            stop: None,
            flags: 0,
        },
        commands: record.commands,
    })
}

fn resolve_page(
    record: PageRecord,
    palette_count: usize,
    pictures: &HashMap<u16, Picture>,
) -> Result<Page> {
    // Button ids are page-unique, not BOG-unique: the lookup spans every
    // BOG of the page.
    let mut lookup: HashMap<u16, ButtonRef> = HashMap::new();
    for (bog_index, bog) in record.bogs.iter().enumerate() {
        for (button_index, button) in bog.buttons.iter().enumerate() {
            lookup.entry(button.id).or_insert(ButtonRef {
                bog: bog_index,
                button: button_index,
            });
        }
    }

    let def_button = resolve_button(record.def_button, &lookup)?;
    let def_activated = resolve_button(record.def_activated, &lookup)?;
    let palette = resolve_palette(record.palette, palette_count)?;

    let mut bogs = Vec::with_capacity(record.bogs.len());
    for bog in record.bogs {
        bogs.push(resolve_bog(bog, &lookup, pictures)?);
    }

    Ok(Page {
        id: record.id,
        version: record.version,
        uo_mask: record.uo_mask,
        palette,
        def_button,
        def_activated,
        in_effects: resolve_effects(record.in_effects, palette_count)?,
        out_effects: resolve_effects(record.out_effects, palette_count)?,
        framerate_divider: record.framerate_divider,
        bogs,
    })
}
