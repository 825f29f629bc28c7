//! Color conversion and page rasterization.
//!
//! Palette entries are YCbCr with alpha; rendering converts them to 16-bit
//! RGBA through a per-page lookup table and composites one picture per
//! button onto a transparent canvas. Blitting is opaque overwrite, not
//! alpha compositing, matching how a player presents a fully drawn page.

use crate::model::{Button, Menu, PaletteColor};
use crate::{Error, ErrorDetails, Result};
use std::io::Write;

pub use crate::model::{FramePhase, SelectionState};

/// YCbCr coefficient set used for conversion to RGB.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorMatrix {
    /// ITU-R BT.601, standard definition.
    Bt601,
    /// ITU-R BT.709, high definition.
    Bt709,
}

impl ColorMatrix {
    /// Picks the conventional matrix for a menu of the given height:
    /// BT.709 for 600 lines and up, BT.601 below.
    pub fn for_height(height: u16) -> Self {
        if height >= 600 {
            ColorMatrix::Bt709
        } else {
            ColorMatrix::Bt601
        }
    }

    fn coefficients(self) -> (f64, f64, f64) {
        match self {
            ColorMatrix::Bt601 => (0.299, 0.587, 0.114),
            ColorMatrix::Bt709 => (0.2126, 0.7152, 0.0722),
        }
    }
}

/// Quantization range of the menu's YCbCr samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorRange {
    /// TV range: Y in [16, 235], Cb/Cr in [16, 240]. The default.
    Tv,
    /// Full range: all channels in [0, 255].
    Full,
}

/// Conversion parameters for one render pass.
#[derive(Debug, Copy, Clone)]
pub struct RenderOptions {
    /// Coefficient set.
    pub matrix: ColorMatrix,
    /// Quantization range.
    pub range: ColorRange,
}

impl RenderOptions {
    /// TV-range options with the matrix auto-detected from the menu
    /// height.
    pub fn for_menu(menu: &Menu) -> Self {
        Self {
            matrix: ColorMatrix::for_height(menu.height),
            range: ColorRange::Tv,
        }
    }
}

/// One 16-bit RGBA sample group.
pub type Rgba64 = [u16; 4];

/// Expands an 8-bit channel value to 16 bits by byte replication, so 0xAB
/// becomes 0xABAB and 0xFF stays full scale.
fn expand16(value: f64) -> u16 {
    (value * 256.0 + value).round() as u16
}

/// Converts one palette color to a 16-bit RGBA sample group.
pub fn ycbcr_to_rgb48(color: &PaletteColor, matrix: ColorMatrix, range: ColorRange) -> Rgba64 {
    let (kr, kg, kb) = matrix.coefficients();
    let (offset_y, scale_y, scale_uv) = match range {
        ColorRange::Tv => (16.0, 255.0 / 219.0, 255.0 / 112.0),
        ColorRange::Full => (0.0, 1.0, 2.0),
    };

    let sy = scale_y * (f64::from(color.y) - offset_y);
    let scb = scale_uv * (f64::from(color.cb) - 128.0);
    let scr = scale_uv * (f64::from(color.cr) - 128.0);

    let r = sy + scr * (1.0 - kr);
    let g = sy - scb * (1.0 - kb) * kb / kg - scr * (1.0 - kr) * kr / kg;
    let b = sy + scb * (1.0 - kb);

    [
        expand16(r.clamp(0.0, 255.0)),
        expand16(g.clamp(0.0, 255.0)),
        expand16(b.clamp(0.0, 255.0)),
        u16::from(color.alpha) * 257,
    ]
}

fn build_rgb_palette(
    palette: &crate::model::Palette,
    options: &RenderOptions,
) -> Box<[Rgba64; 256]> {
    let mut table = Box::new([[0_u16; 4]; 256]);
    for (entry, color) in table.iter_mut().zip(palette.colors().iter()) {
        *entry = ycbcr_to_rgb48(color, options.matrix, options.range);
    }
    table
}

/// Picks the `(state, phase)` cell to draw for one button, preferring the
/// requested combination and falling back through the requested state's
/// start frame and the normal state.
pub fn select_state(
    button: &Button,
    state: SelectionState,
    phase: FramePhase,
) -> (SelectionState, FramePhase) {
    let preferences = [
        (state, phase),
        (state, FramePhase::Start),
        (SelectionState::Normal, phase),
    ];
    for (s1, s2) in preferences {
        if button.state_picture(s1, s2).is_some() {
            return (s1, s2);
        }
    }
    (SelectionState::Normal, FramePhase::Start)
}

/// Rasterizes one page for the given state combination into a
/// `width * height * 4` buffer of 16-bit RGBA samples.
///
/// Pixels no button covers stay fully transparent black, which is exactly
/// the converted value of the default palette entry. A button graphic that
/// does not fit the canvas fails with an invariant violation.
pub fn render_page(
    menu: &Menu,
    page_index: usize,
    options: &RenderOptions,
    state: SelectionState,
    phase: FramePhase,
) -> Result<Vec<u16>> {
    let page = menu
        .pages
        .get(page_index)
        .ok_or(Error::new(ErrorDetails::InvariantViolation(
            "page index out of range",
        )))?;
    let palette = menu
        .palette(page.palette)
        .ok_or(Error::new(ErrorDetails::InvariantViolation(
            "page palette handle out of range",
        )))?;
    let rgb_palette = build_rgb_palette(palette, options);

    let width = menu.width as usize;
    let height = menu.height as usize;
    let mut buffer = vec![0_u16; width * height * 4];

    for bog in &page.bogs {
        for button in &bog.buttons {
            let (s1, s2) = select_state(button, state, phase);
            let picture_id = match button.state_picture(s1, s2) {
                Some(picture_id) => picture_id,
                None => continue,
            };
            let picture = menu
                .picture(picture_id)
                .ok_or(Error::new(ErrorDetails::PictureNotFound(picture_id.0)))?;

            let x0 = button.x as usize;
            let y0 = button.y as usize;
            let pic_width = picture.width as usize;
            let pic_height = picture.height as usize;
            if x0 + pic_width > width || y0 + pic_height > height {
                return Err(Error::new(ErrorDetails::InvariantViolation(
                    "button graphic exceeds canvas bounds",
                )));
            }

            for y in 0..pic_height {
                let line_start = (y0 + y) * width + x0;
                for x in 0..pic_width {
                    let index = picture.picture_data[y * pic_width + x];
                    let color = &rgb_palette[index as usize];
                    let offset = (line_start + x) * 4;
                    buffer[offset..offset + 4].copy_from_slice(color);
                }
            }
        }
    }

    Ok(buffer)
}

/// Hands a rendered scanline buffer to the PNG encoder: 16-bit RGBA,
/// big-endian samples.
pub fn write_png<W: Write>(
    writer: W,
    width: u16,
    height: u16,
    pixels: &[u16],
) -> std::result::Result<(), png::EncodingError> {
    assert_eq!(pixels.len(), width as usize * height as usize * 4);
    let mut encoder = png::Encoder::new(writer, u32::from(width), u32::from(height));
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut png_writer = encoder.write_header()?;

    let mut bytes = Vec::with_capacity(pixels.len() * 2);
    for sample in pixels {
        bytes.extend_from_slice(&sample.to_be_bytes());
    }
    png_writer.write_image_data(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Menu;
    use crate::segment::SegmentType;
    use crate::testutil::*;

    #[test]
    fn tv_range_white_point_clamps_to_full_scale() {
        let white = PaletteColor {
            y: 235,
            cb: 128,
            cr: 128,
            alpha: 255,
        };
        assert_eq!(
            ycbcr_to_rgb48(&white, ColorMatrix::Bt709, ColorRange::Tv),
            [0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]
        );
    }

    #[test]
    fn tv_range_black_point_is_zero() {
        let black = PaletteColor {
            y: 16,
            cb: 128,
            cr: 128,
            alpha: 0,
        };
        assert_eq!(
            ycbcr_to_rgb48(&black, ColorMatrix::Bt601, ColorRange::Tv),
            [0, 0, 0, 0]
        );
    }

    #[test]
    fn full_range_gray_is_not_rescaled() {
        let gray = PaletteColor {
            y: 128,
            cb: 128,
            cr: 128,
            alpha: 255,
        };
        let [r, g, b, _] = ycbcr_to_rgb48(&gray, ColorMatrix::Bt709, ColorRange::Full);
        assert_eq!((r, g, b), (0x8080, 0x8080, 0x8080));
    }

    #[test]
    fn expansion_replicates_bytes() {
        for value in 0..=255_u32 {
            let expanded = expand16(value as f64);
            assert_eq!(expanded, ((value << 8) | value) as u16);
        }
    }

    #[test]
    fn matrix_auto_selection_follows_height() {
        assert_eq!(ColorMatrix::for_height(1080), ColorMatrix::Bt709);
        assert_eq!(ColorMatrix::for_height(600), ColorMatrix::Bt709);
        assert_eq!(ColorMatrix::for_height(480), ColorMatrix::Bt601);
    }

    fn test_menu() -> Menu {
        let comp = TestComposition {
            width: 8,
            height: 2,
            pages: vec![TestPage {
                id: 0,
                palette: 0,
                def_button: 0xFFFF,
                def_activated: 0xFFFF,
                bogs: vec![TestBog {
                    def_button: 1,
                    buttons: vec![TestButton::new(1, 1, 0)
                        .with_normal(10, 0xFFFF)
                        .with_selected(11, 0xFFFF)],
                }],
            }],
        };
        let mut stream = Vec::new();
        push_segment(
            &mut stream,
            SegmentType::Palette,
            // entry 1 white, entry 2 black, both opaque
            &palette_payload(&[(1, 235, 128, 128, 255), (2, 16, 128, 128, 255)]),
        );
        push_picture(&mut stream, 10, 2, 1, &[1, 1]);
        push_picture(&mut stream, 11, 2, 1, &[2, 2]);
        push_segment(&mut stream, SegmentType::Button, &button_segment_payload(&comp));
        Menu::from_igs_bytes(&stream).unwrap()
    }

    #[test]
    fn renders_button_graphic_at_its_position() {
        let menu = test_menu();
        let options = RenderOptions::for_menu(&menu);
        assert_eq!(options.matrix, ColorMatrix::Bt601);

        let image = render_page(
            &menu,
            0,
            &options,
            SelectionState::Normal,
            FramePhase::Start,
        )
        .unwrap();
        assert_eq!(image.len(), 8 * 2 * 4);

        // Uncovered pixel: transparent black.
        assert_eq!(&image[0..4], &[0, 0, 0, 0]);
        // Button pixels at (1,0) and (2,0): opaque white.
        assert_eq!(&image[4..8], &[0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]);
        assert_eq!(&image[8..12], &[0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]);
        // Next pixel uncovered again.
        assert_eq!(&image[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn selected_state_renders_its_own_graphic() {
        let menu = test_menu();
        let options = RenderOptions::for_menu(&menu);
        let image = render_page(
            &menu,
            0,
            &options,
            SelectionState::Selected,
            FramePhase::Start,
        )
        .unwrap();
        // Opaque black from palette entry 2.
        assert_eq!(&image[4..8], &[0, 0, 0, 0xFFFF]);
    }

    #[test]
    fn stop_phase_falls_back_to_start_frame() {
        let menu = test_menu();
        let button = &menu.pages[0].bogs[0].buttons[0];
        assert_eq!(
            select_state(button, SelectionState::Selected, FramePhase::Stop),
            (SelectionState::Selected, FramePhase::Start)
        );
        assert_eq!(
            select_state(button, SelectionState::Activated, FramePhase::Start),
            (SelectionState::Normal, FramePhase::Start)
        );
    }

    #[test]
    fn oversized_button_fails_bounds_check() {
        let comp = TestComposition {
            width: 2,
            height: 1,
            pages: vec![TestPage {
                id: 0,
                palette: 0,
                def_button: 0xFFFF,
                def_activated: 0xFFFF,
                bogs: vec![TestBog {
                    def_button: 1,
                    buttons: vec![TestButton::new(1, 1, 0).with_normal(10, 0xFFFF)],
                }],
            }],
        };
        let mut stream = Vec::new();
        push_segment(
            &mut stream,
            SegmentType::Palette,
            &palette_payload(&[(1, 235, 128, 128, 255)]),
        );
        push_picture(&mut stream, 10, 2, 1, &[1, 1]);
        push_segment(&mut stream, SegmentType::Button, &button_segment_payload(&comp));
        let menu = Menu::from_igs_bytes(&stream).unwrap();

        let err = render_page(
            &menu,
            0,
            &RenderOptions::for_menu(&menu),
            SelectionState::Normal,
            FramePhase::Start,
        )
        .unwrap_err();
        assert!(matches!(err.details, ErrorDetails::InvariantViolation(_)));
    }

    #[test]
    fn png_writer_produces_a_signed_file() {
        let pixels = vec![0_u16; 2 * 2 * 4];
        let mut out = Vec::new();
        write_png(&mut out, 2, 2, &pixels).unwrap();
        assert_eq!(&out[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
