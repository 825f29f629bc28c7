//! Shared builders for synthesizing IGS byte streams in unit tests.

use crate::segment::SegmentType;

pub(crate) fn push_be16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn push_be24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes()[1..]);
}

pub(crate) fn push_segment(stream: &mut Vec<u8>, seg_type: SegmentType, payload: &[u8]) {
    stream.extend_from_slice(b"IG");
    stream.extend_from_slice(&0_u32.to_be_bytes());
    stream.extend_from_slice(&0_u32.to_be_bytes());
    stream.push(seg_type as u8);
    push_be16(stream, payload.len() as u16);
    stream.extend_from_slice(payload);
}

pub(crate) fn palette_payload(entries: &[(u8, u8, u8, u8, u8)]) -> Vec<u8> {
    let mut payload = vec![0, 0];
    for &(color_id, y, cr, cb, alpha) in entries {
        payload.extend_from_slice(&[color_id, y, cr, cb, alpha]);
    }
    payload
}

/// First (or only) fragment of a picture whose total RLE length equals the
/// fragment's length.
pub(crate) fn picture_head_payload(
    id: u16,
    version: u8,
    width: u16,
    height: u16,
    rle: &[u8],
) -> Vec<u8> {
    picture_head_payload_spanning(id, version, width, height, rle.len(), rle)
}

/// First fragment of a picture advertising `total_rle_len` bytes across all
/// fragments.
pub(crate) fn picture_head_payload_spanning(
    id: u16,
    version: u8,
    width: u16,
    height: u16,
    total_rle_len: usize,
    rle: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::new();
    push_be16(&mut payload, id);
    payload.push(version);
    let mut seq_desc = 0x80_u8;
    if total_rle_len == rle.len() {
        seq_desc |= 0x40;
    }
    payload.push(seq_desc);
    push_be24(&mut payload, (total_rle_len + 4) as u32);
    push_be16(&mut payload, width);
    push_be16(&mut payload, height);
    payload.extend_from_slice(rle);
    payload
}

/// Continuation fragment of a picture.
pub(crate) fn picture_tail_payload(id: u16, version: u8, rle: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    push_be16(&mut payload, id);
    payload.push(version);
    payload.push(0x40);
    payload.extend_from_slice(rle);
    payload
}

/// Emits one complete picture whose pixels are all non-zero palette
/// indices, stored as raw (unescaped) RLE bytes.
pub(crate) fn push_picture(stream: &mut Vec<u8>, id: u16, width: u16, height: u16, pixels: &[u8]) {
    assert_eq!(pixels.len(), width as usize * height as usize);
    assert!(pixels.iter().all(|&p| p != 0));
    push_segment(
        stream,
        SegmentType::Picture,
        &picture_head_payload(id, 0, width, height, pixels),
    );
}

pub(crate) struct TestButton {
    pub id: u16,
    pub x: u16,
    pub y: u16,
    /// up, down, left, right
    pub nav: [u16; 4],
    /// (start, stop) picture ids
    pub normal: (u16, u16),
    pub selected: (u16, u16),
    pub activated: (u16, u16),
}

impl TestButton {
    pub fn new(id: u16, x: u16, y: u16) -> Self {
        Self {
            id,
            x,
            y,
            nav: [0xFFFF; 4],
            normal: (0xFFFF, 0xFFFF),
            selected: (0xFFFF, 0xFFFF),
            activated: (0xFFFF, 0xFFFF),
        }
    }

    pub fn with_nav(mut self, up: u16, down: u16, left: u16, right: u16) -> Self {
        self.nav = [up, down, left, right];
        self
    }

    pub fn with_normal(mut self, start: u16, stop: u16) -> Self {
        self.normal = (start, stop);
        self
    }

    pub fn with_selected(mut self, start: u16, stop: u16) -> Self {
        self.selected = (start, stop);
        self
    }

    pub fn with_activated_start(mut self, start: u16) -> Self {
        self.activated.0 = start;
        self
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        push_be16(out, self.id);
        push_be16(out, 0); // numeric select value
        out.push(0); // flags
        push_be16(out, self.x);
        push_be16(out, self.y);
        for target in self.nav {
            push_be16(out, target);
        }
        push_be16(out, self.normal.0);
        push_be16(out, self.normal.1);
        push_be16(out, 0); // normal flags
        push_be16(out, self.selected.0);
        push_be16(out, self.selected.1);
        push_be16(out, 0); // selected flags
        push_be16(out, self.activated.0);
        push_be16(out, self.activated.1);
        push_be16(out, 0); // command count
    }
}

pub(crate) struct TestBog {
    pub def_button: u16,
    pub buttons: Vec<TestButton>,
}

pub(crate) struct TestPage {
    pub id: u8,
    pub palette: u8,
    pub def_button: u16,
    pub def_activated: u16,
    pub bogs: Vec<TestBog>,
}

pub(crate) struct TestComposition {
    pub width: u16,
    pub height: u16,
    pub pages: Vec<TestPage>,
}

pub(crate) fn button_segment_payload(comp: &TestComposition) -> Vec<u8> {
    let mut body = vec![0_u8]; // model flags: preloaded, always-on
    body.extend_from_slice(&[0; 5]); // composition timeout pts
    body.extend_from_slice(&[0; 5]); // selection timeout pts
    body.extend_from_slice(&[0; 3]); // user timeout duration
    body.push(comp.pages.len() as u8);
    for page in &comp.pages {
        body.push(page.id);
        body.push(0); // version
        body.extend_from_slice(&[0; 8]); // uo mask
        body.extend_from_slice(&[0, 0]); // in effects: no windows, no effects
        body.extend_from_slice(&[0, 0]); // out effects
        body.push(0); // framerate divider
        push_be16(&mut body, page.def_button);
        push_be16(&mut body, page.def_activated);
        body.push(page.palette);
        body.push(page.bogs.len() as u8);
        for bog in &page.bogs {
            push_be16(&mut body, bog.def_button);
            body.push(bog.buttons.len() as u8);
            for button in &bog.buttons {
                button.serialize(&mut body);
            }
        }
    }

    let mut payload = Vec::new();
    push_be16(&mut payload, comp.width);
    push_be16(&mut payload, comp.height);
    payload.push(1); // framerate id
    push_be16(&mut payload, 0); // composition number
    payload.push(0x80); // composition state: epoch start
    payload.push(0xC0); // sequence descriptor: first and last
    push_be24(&mut payload, body.len() as u32);
    payload.extend_from_slice(&body);
    payload
}
