//! Transport-stream demultiplexer extracting IGS elementary-stream bytes.
//!
//! Blu-ray menu files usually arrive wrapped in an MPEG-2 transport stream
//! where every 188-byte packet is preceded by a 4-byte Blu-ray timestamp
//! header. This module walks PAT → PMT → elementary stream to find the IGS
//! stream (stream type `0x91`) and concatenates its PES payload bytes into
//! the raw segment stream consumed by [`crate::segment`].

use crate::{read_bitfield, Error, ErrorDetails, Result, SliceReader};
use crc::{Crc, CRC_32_MPEG_2};
use log::{debug, warn};
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Length of an MPEG-TS packet, without the Blu-ray timestamp header.
pub const TS_PACKET_SIZE: usize = 188;
/// Widest window to scan for a sync byte before giving up on the stream.
pub const TS_MAX_PACKET_SIZE: usize = 204;
/// Number of routed packets to inspect before concluding there is no IGS
/// stream in the input.
pub const PROBE_PACKETS: usize = 2048;
/// MPEG-TS packet sync byte.
pub const SYNC_BYTE: u8 = 0x47;
/// PMT stream type assigned to interactive graphics streams.
pub const STREAM_TYPE_IGS: u8 = 0x91;

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Link-layer header found at the start of every 188-byte MPEG-TS packet.
#[bitfield]
#[derive(Debug)]
pub struct PacketHeader {
    /// Always [`SYNC_BYTE`].
    pub sync_byte: B8,
    /// Transport error indicator.
    pub tei: bool,
    /// Payload unit start indicator.
    pub pusi: bool,
    /// Transport priority.
    pub priority: bool,
    /// Packet identifier.
    pub pid: B13,
    /// Transport scrambling control.
    pub scrambling_control: B2,
    /// Whether an adaptation field precedes the payload.
    pub has_adaptation_field: bool,
    /// Whether the packet carries payload bytes.
    pub has_payload: bool,
    /// Per-PID continuity counter.
    pub continuity_counter: B4,
}

/// Flag byte at the start of a non-empty adaptation field.
#[bitfield]
#[derive(Debug)]
pub struct AdaptationFlags {
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator.
    pub random_access: bool,
    /// Elementary stream priority indicator.
    pub priority: bool,
    /// Whether a PCR follows.
    pub has_pcr: bool,
    /// Whether an OPCR follows.
    pub has_opcr: bool,
    /// Whether a splice countdown follows.
    pub has_splice_countdown: bool,
    /// Whether transport private data follows.
    pub has_private_data: bool,
    /// Whether an adaptation field extension follows.
    pub has_extension: bool,
}

/// Header of a program-specific-information section.
#[bitfield]
#[derive(Debug)]
pub struct PsiHeader {
    /// Table identifier.
    pub table_id: B8,
    /// Section syntax indicator.
    pub section_syntax_indicator: bool,
    /// Private bit.
    pub private_bit: bool,
    /// Reserved bits.
    pub reserved: B2,
    /// Length of the section body following this header.
    pub section_length: B12,
}

/// One program entry of the program association table.
#[bitfield]
#[derive(Debug)]
pub struct PatEntry {
    /// Program number; zero designates the network PID.
    pub program_num: B16,
    /// Reserved bits.
    pub reserved: B3,
    /// PID carrying the program's map table.
    pub program_map_pid: B13,
}

/// Fixed part of the program map table following the table syntax bytes.
#[bitfield]
#[derive(Debug)]
pub struct PmtHeader {
    /// Reserved bits.
    pub reserved: B3,
    /// PID carrying the program clock reference.
    pub pcr_pid: B13,
    /// Reserved bits.
    pub reserved2: B4,
    /// Length of the program descriptor loop.
    pub program_info_length: B12,
}

/// Header of one entry in the PMT stream-info loop.
#[bitfield]
#[derive(Debug)]
pub struct EsInfoHeader {
    /// Stream type code; [`STREAM_TYPE_IGS`] marks IGS.
    pub stream_type: B8,
    /// Reserved bits.
    pub reserved: B3,
    /// PID the elementary stream is carried on.
    pub elementary_pid: B13,
    /// Reserved bits.
    pub reserved2: B4,
    /// Length of the descriptor bytes that follow.
    pub es_info_length: B12,
}

/// One elementary stream declared by a PMT.
#[derive(Debug)]
pub struct EsInfo {
    /// Stream type code.
    pub stream_type: u8,
    /// PID the stream is carried on.
    pub pid: u16,
    /// Raw descriptor bytes.
    pub descriptors: SmallVec<[u8; 8]>,
}

/// One framed transport-stream packet.
#[derive(Debug)]
pub struct TsPacket<'a> {
    /// Link-layer header.
    pub header: PacketHeader,
    /// Adaptation flag byte, when a non-empty adaptation field is present.
    pub adaptation: Option<AdaptationFlags>,
    /// Payload bytes following the headers.
    pub payload: &'a [u8],
}

/// Locates and returns the next 188-byte packet, tolerating up to
/// [`TS_MAX_PACKET_SIZE`] bytes of garbage before the sync byte.
///
/// Returns [`None`] when the stream ends cleanly at a packet boundary or
/// mid-scan.
fn next_raw_packet<'a>(reader: &mut SliceReader<'a>) -> Result<Option<&'a [u8; TS_PACKET_SIZE]>> {
    // Blu-ray timestamp header precedes each packet.
    let header_skip = reader.remaining_len().min(4);
    reader.skip(header_skip)?;

    let mut skipped_bytes = 0;
    loop {
        if reader.is_empty() {
            if skipped_bytes > 0 {
                debug!("Skipped {} bytes", skipped_bytes);
            }
            return Ok(None);
        }
        if reader.peek_array_ref::<1>()?[0] == SYNC_BYTE {
            break;
        }
        reader.skip(1)?;
        skipped_bytes += 1;
        if skipped_bytes >= TS_MAX_PACKET_SIZE {
            debug!("Skipped {} bytes", skipped_bytes);
            return Err(reader.make_error(ErrorDetails::InvariantViolation(
                "sync byte not found in the stream",
            )));
        }
    }
    if skipped_bytes > 0 {
        debug!("Skipped {} bytes", skipped_bytes);
    }

    Ok(Some(reader.read_array_ref::<TS_PACKET_SIZE>()?))
}

/// Splits one raw packet into header, adaptation flags and payload.
fn parse_packet(raw: &[u8; TS_PACKET_SIZE]) -> Result<TsPacket<'_>> {
    let mut reader = SliceReader::new(raw);
    let header = read_bitfield!(reader, PacketHeader);
    let adaptation = if header.has_adaptation_field() {
        let field_length = reader.read_u8()? as usize;
        let mut field_reader = reader.new_sub_reader(field_length)?;
        if field_length > 0 {
            Some(read_bitfield!(field_reader, AdaptationFlags))
        } else {
            None
        }
    } else {
        None
    };
    Ok(TsPacket {
        header,
        adaptation,
        payload: reader.read_to_end()?,
    })
}

/// Extracts `(table_id, section body)` from a PSI-carrying packet,
/// validating the trailing CRC32 (mismatches are logged, not fatal).
fn parse_psi_table<'a>(packet: &TsPacket<'a>) -> Result<(u8, &'a [u8])> {
    let mut reader = SliceReader::new(packet.payload);
    if packet.header.pusi() {
        let pointer_field = reader.read_u8()? as usize;
        reader.skip(pointer_field)?;
    }
    let header_bytes = *reader.peek_array_ref::<3>()?;
    let header = read_bitfield!(reader, PsiHeader);
    let body = reader.read(header.section_length() as usize)?;

    if body.len() >= 4 {
        let (hashed, crc_bytes) = body.split_at(body.len() - 4);
        let mut digest = CRC.digest();
        digest.update(&header_bytes);
        digest.update(hashed);
        let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        if digest.finalize() != expected {
            warn!(
                "PSI CRC mismatch on PID {:#x} (table {:#x})",
                packet.header.pid(),
                header.table_id()
            );
        }
    }

    Ok((header.table_id(), body))
}

/// Parses the program entries of a PAT section body.
fn pat_programs(body: &[u8]) -> Result<Vec<PatEntry>> {
    if body.len() < 9 {
        return Err(Error::new(ErrorDetails::UnexpectedEof));
    }
    let mut reader = SliceReader::new(body);
    reader.skip(5)?;
    // Entries sit between the table syntax bytes and the trailing CRC.
    let mut entries_reader = reader.new_sub_reader(body.len() - 5 - 4)?;
    if entries_reader.remaining_len() % 4 != 0 {
        return Err(entries_reader.make_error(ErrorDetails::InvariantViolation(
            "PAT program entries misaligned",
        )));
    }
    let mut entries = Vec::with_capacity(entries_reader.remaining_len() / 4);
    while !entries_reader.is_empty() {
        entries.push(read_bitfield!(entries_reader, PatEntry));
    }
    Ok(entries)
}

/// Parses the stream-info loop of a PMT section body.
fn pmt_streams(body: &[u8]) -> Result<Vec<EsInfo>> {
    if body.len() < 13 {
        return Err(Error::new(ErrorDetails::UnexpectedEof));
    }
    let mut reader = SliceReader::new(body);
    reader.skip(5)?;
    let header = read_bitfield!(reader, PmtHeader);
    reader.skip(header.program_info_length() as usize)?;
    if reader.remaining_len() < 4 {
        return Err(reader.make_error(ErrorDetails::UnexpectedEof));
    }
    let info_length = reader.remaining_len() - 4;
    let mut info_reader = reader.new_sub_reader(info_length)?;
    let mut streams = Vec::new();
    while !info_reader.is_empty() {
        let es_header = read_bitfield!(info_reader, EsInfoHeader);
        let mut descriptors = SmallVec::new();
        descriptors.extend_from_slice(info_reader.read(es_header.es_info_length() as usize)?);
        streams.push(EsInfo {
            stream_type: es_header.stream_type(),
            pid: es_header.elementary_pid(),
            descriptors,
        });
    }
    Ok(streams)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PidKind {
    Pat,
    Pmt,
    Igs,
    Other,
    Unknown,
}

/// Demultiplexes a Blu-ray transport stream and returns the IGS
/// elementary-stream bytes it carries.
///
/// For every payload-unit start on the IGS PID a synthetic
/// `"IG" + 8×00` header is emitted in front of the PES payload so the
/// downstream segment framer sees a well-formed segment header prefix.
///
/// Fails with [`ErrorDetails::NoIgsStream`] when [`PROBE_PACKETS`] routed
/// packets pass without the IGS stream yielding any bytes.
pub fn extract_igs(data: &[u8]) -> Result<Vec<u8>> {
    let mut pid_kinds: HashMap<u16, PidKind> = HashMap::new();
    pid_kinds.insert(0, PidKind::Pat);

    let mut reader = SliceReader::new(data);
    let mut out = Vec::new();
    let mut routed_packets = 0_usize;
    let mut have_igs = false;

    while let Some(raw) = next_raw_packet(&mut reader)? {
        let packet = parse_packet(raw)?;
        let pid = packet.header.pid();

        let kind = match pid_kinds.get(&pid) {
            Some(kind) => *kind,
            None => {
                debug!("Unknown PID: {}", pid);
                pid_kinds.insert(pid, PidKind::Unknown);
                continue;
            }
        };

        match kind {
            PidKind::Pat if packet.header.has_payload() => {
                for entry in pat_programs(parse_psi_table(&packet)?.1)? {
                    if entry.program_num() != 0 {
                        debug!(
                            "Program {} mapped to PID {}",
                            entry.program_num(),
                            entry.program_map_pid()
                        );
                        pid_kinds.insert(entry.program_map_pid(), PidKind::Pmt);
                    }
                }
            }
            PidKind::Pmt if packet.header.has_payload() => {
                for stream in pmt_streams(parse_psi_table(&packet)?.1)? {
                    debug!("Stream type {:#x} on PID {}", stream.stream_type, stream.pid);
                    let stream_kind = if stream.stream_type == STREAM_TYPE_IGS {
                        PidKind::Igs
                    } else {
                        PidKind::Other
                    };
                    pid_kinds.insert(stream.pid, stream_kind);
                }
            }
            PidKind::Igs if packet.header.has_payload() => {
                let mut payload = packet.payload;
                if packet.header.pusi() {
                    // Prime the segment framer's header prefix; the PES
                    // payload itself starts at the segment type byte.
                    out.extend_from_slice(b"IG\x00\x00\x00\x00\x00\x00\x00\x00");
                    if payload.len() < 3 || payload[..3] != [0, 0, 1] {
                        return Err(Error::new(ErrorDetails::InvariantViolation(
                            "missing PES start code on IGS stream",
                        )));
                    }
                    if payload.len() < 9 {
                        return Err(Error::new(ErrorDetails::UnexpectedEof));
                    }
                    let pes_header_length = payload[8] as usize + 9;
                    if pes_header_length > payload.len() {
                        return Err(Error::new(ErrorDetails::UnexpectedEof));
                    }
                    payload = &payload[pes_header_length..];
                }
                out.extend_from_slice(payload);
                have_igs = true;
            }
            _ => {}
        }

        routed_packets += 1;
        if !have_igs && routed_packets > PROBE_PACKETS {
            return Err(Error::new(ErrorDetails::NoIgsStream));
        }
    }

    Ok(out)
}
