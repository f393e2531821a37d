// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunk handlers: decode each payload into the audio metadata model, and serialize the
//! model back into chunks in a legal order on write (component D, spec §4.2).

use std::io::{Read, Seek, Write};

use crate::chunks::framer::{finish_chunk, write_chunk_header, FormType, ReservedHeader};
use crate::error::{bad_comm_error, bad_ssnd_error, decode_error, unsupported_error, Result};
use crate::format::{AudioFormat, ByteOrder, CompressionType, SampleFormat};
use crate::instrument::{Instrument, Loop, LoopId};
use crate::io::ByteStream;
use crate::track::{Marker, MiscKind, Miscellaneous};

pub const COMM_TAG: [u8; 4] = *b"COMM";
pub const SSND_TAG: [u8; 4] = *b"SSND";
pub const FVER_TAG: [u8; 4] = *b"FVER";
pub const MARK_TAG: [u8; 4] = *b"MARK";
pub const INST_TAG: [u8; 4] = *b"INST";
pub const AESD_TAG: [u8; 4] = *b"AESD";

/// AIFF-C version constant emitted in `FVER` (spec §6): May 23, 1990 00:00 GMT.
pub const AIFC_VERSION_1: u32 = 0xA280_5140;

/// The parsed `COMM` chunk: channel count, frame count, and the derived stored format.
pub struct CommonChunk {
    pub n_channels: u16,
    pub n_sample_frames: u32,
    pub format: AudioFormat,
}

/// Decode `COMM` into a `CommonChunk`, applying the compressionID table (spec §4.2).
pub fn parse_comm<S: Read + Seek>(stream: &mut ByteStream<S>, form_type: FormType) -> Result<CommonChunk> {
    let n_channels = stream.read_be_u16()?;
    let n_sample_frames = stream.read_be_u32()?;
    let sample_size = stream.read_be_u16()?;
    let sample_rate = stream.read_extended80()?;

    if n_channels == 0 {
        return bad_comm_error("aiff: COMM channel count must be at least 1");
    }

    let mut format = AudioFormat::pcm(sample_rate, u32::from(n_channels), u32::from(sample_size));

    if form_type == FormType::AiffC {
        let compression_id = stream.read_quad_bytes()?;
        ignore_pascal_string(stream)?;

        match &compression_id {
            b"NONE" | b"twos" => {}
            b"sowt" => {
                format.byte_order = ByteOrder::Little;
            }
            b"in24" => {
                format.sample_width = 24;
            }
            b"in32" => {
                format.sample_width = 32;
            }
            b"fl32" | b"FL32" => {
                format.sample_format = SampleFormat::Float32;
                format.sample_width = 32;
            }
            b"fl64" | b"FL64" => {
                format.sample_format = SampleFormat::Float64;
                format.sample_width = 64;
            }
            b"ulaw" | b"ULAW" => {
                format.compression_type = CompressionType::G711MuLaw;
            }
            b"alaw" | b"ALAW" => {
                format.compression_type = CompressionType::G711ALaw;
            }
            b"ACE2" | b"ACE8" | b"MAC3" | b"MAC6" => {
                return unsupported_error(format!(
                    "aifc: Apple's proprietary {} compression format is not supported",
                    String::from_utf8_lossy(&compression_id)
                ));
            }
            other => {
                return unsupported_error(format!(
                    "aifc: compression type '{}' not supported",
                    String::from_utf8_lossy(other)
                ));
            }
        }
    }

    format.normalize();

    Ok(CommonChunk { n_channels, n_sample_frames, format })
}

/// Write `COMM` (and, for AIFF-C, the compressionID + Pascal name) for `format`.
pub fn write_comm<S: Write + Seek>(
    stream: &mut ByteStream<S>,
    form_type: FormType,
    format: &AudioFormat,
    n_sample_frames: u32,
) -> Result<ReservedHeader> {
    let reserved = write_chunk_header(stream, &COMM_TAG)?;

    stream.write_be_u16(format.channel_count as u16)?;
    stream.write_be_u32(n_sample_frames)?;
    stream.write_be_u16(format.sample_width as u16)?;
    stream.write_extended80(format.sample_rate)?;

    if form_type == FormType::AiffC {
        let (id, name): (&[u8; 4], &[u8]) = compression_id_for(format);
        stream.write_quad_bytes(id)?;
        write_pascal_string(stream, name)?;
    }

    finish_chunk(stream, &reserved)?;
    Ok(reserved)
}

fn compression_id_for(format: &AudioFormat) -> (&'static [u8; 4], &'static [u8]) {
    match format.compression_type {
        CompressionType::G711MuLaw => (b"ulaw", b"mu-law"),
        CompressionType::G711ALaw => (b"alaw", b"alaw"),
        CompressionType::None => match (format.sample_format, format.sample_width, format.byte_order) {
            (SampleFormat::Float32, _, _) => (b"fl32", b"32-bit float"),
            (SampleFormat::Float64, _, _) => (b"fl64", b"64-bit float"),
            (_, _, ByteOrder::Little) => (b"sowt", b"little-endian"),
            (_, 24, ByteOrder::Big) => (b"in24", b"24-bit integer"),
            (_, 32, ByteOrder::Big) => (b"in32", b"32-bit integer"),
            _ => (b"NONE", b"not compressed"),
        },
    }
}

/// The parsed `SSND` chunk header; payload position/length only (spec §4.2).
pub struct SoundChunk {
    pub data_start_pos: u64,
    pub data_size_bytes: u64,
}

/// Decode the `SSND` header. `chunk_len` is the chunk's declared payload size.
pub fn parse_ssnd<S: Read + Seek>(stream: &mut ByteStream<S>, chunk_len: u32) -> Result<SoundChunk> {
    if chunk_len < 8 {
        return decode_error("aiff: SSND chunk shorter than its fixed header");
    }

    let offset = stream.read_be_u32()?;
    let _block_size = stream.read_be_u32()?;

    let data_start_pos = stream.tell()? + u64::from(offset);
    let data_size_bytes = u64::from(chunk_len) - 8 - u64::from(offset);

    Ok(SoundChunk { data_start_pos, data_size_bytes })
}

/// Reserve `SSND`'s header and fixed `offset`/`blockSize` fields, returning the position
/// data begins at so the caller can stream frame bytes directly after.
pub fn write_ssnd_header<S: Write + Seek>(stream: &mut ByteStream<S>) -> Result<ReservedHeader> {
    let reserved = write_chunk_header(stream, &SSND_TAG)?;
    stream.write_be_u32(0)?; // offset
    stream.write_be_u32(0)?; // blockSize
    Ok(reserved)
}

/// Decode `FVER`'s opaque 4-byte timestamp (AIFF-C only, spec §4.2).
pub fn parse_fver<S: Read>(stream: &mut ByteStream<S>) -> Result<u32> {
    stream.read_be_u32()
}

/// Write `FVER` with the canonical version constant (spec §6).
pub fn write_fver<S: Write + Seek>(stream: &mut ByteStream<S>) -> Result<()> {
    let reserved = write_chunk_header(stream, &FVER_TAG)?;
    stream.write_be_u32(AIFC_VERSION_1)?;
    finish_chunk(stream, &reserved)
}

/// Decode `MARK`'s marker table (spec §4.2): `u16 count` then `count` Pascal-named records.
pub fn parse_mark<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<Vec<Marker>> {
    let count = stream.read_be_u16()?;
    let mut markers = Vec::with_capacity(usize::from(count));

    for _ in 0..count {
        let id = stream.read_be_u16()?;
        let position = stream.read_be_u32()?;
        let name = read_pascal_string(stream)?;
        markers.push(Marker { id, position, name, comment: String::new() });
    }

    Ok(markers)
}

/// Write `MARK` from `markers`.
pub fn write_mark<S: Write + Seek>(stream: &mut ByteStream<S>, markers: &[Marker]) -> Result<()> {
    if markers.is_empty() {
        return Ok(());
    }

    let reserved = write_chunk_header(stream, &MARK_TAG)?;
    stream.write_be_u16(markers.len() as u16)?;

    for marker in markers {
        stream.write_be_u16(marker.id)?;
        stream.write_be_u32(marker.position)?;
        write_pascal_string(stream, marker.name.as_bytes())?;
    }

    finish_chunk(stream, &reserved)
}

/// Decode `INST` (spec §4.2): the two loops are always assigned ids 1 and 2 regardless of
/// payload order.
pub fn parse_inst<S: Read>(stream: &mut ByteStream<S>) -> Result<Instrument> {
    let base_note = stream.read_u8()?;
    let detune = stream.read_i8()?;
    let low_note = stream.read_u8()?;
    let high_note = stream.read_u8()?;
    let low_velocity = stream.read_u8()?;
    let high_velocity = stream.read_u8()?;
    let gain = stream.read_be_i16()?;

    let sustain_mode = stream.read_be_u16()?;
    let sustain_begin = stream.read_be_u16()?;
    let sustain_end = stream.read_be_u16()?;

    let release_mode = stream.read_be_u16()?;
    let release_begin = stream.read_be_u16()?;
    let release_end = stream.read_be_u16()?;

    Ok(Instrument {
        base_note: i64::from(base_note),
        detune: i64::from(detune),
        low_velocity: i64::from(low_velocity),
        high_velocity: i64::from(high_velocity),
        low_note: i64::from(low_note),
        high_note: i64::from(high_note),
        gain: i64::from(gain),
        sustain_loop: Loop { id: LoopId::Sustain, mode: sustain_mode, begin_marker: sustain_begin, end_marker: sustain_end },
        release_loop: Loop { id: LoopId::Release, mode: release_mode, begin_marker: release_begin, end_marker: release_end },
    })
}

/// Write `INST` from `instrument`.
pub fn write_inst<S: Write + Seek>(stream: &mut ByteStream<S>, instrument: &Instrument) -> Result<()> {
    let reserved = write_chunk_header(stream, &INST_TAG)?;

    stream.write_u8(instrument.base_note as u8)?;
    stream.write_i8(instrument.detune as i8)?;
    stream.write_u8(instrument.low_note as u8)?;
    stream.write_u8(instrument.high_note as u8)?;
    stream.write_u8(instrument.low_velocity as u8)?;
    stream.write_u8(instrument.high_velocity as u8)?;
    stream.write_be_i16(instrument.gain as i16)?;

    stream.write_be_u16(instrument.sustain_loop.mode)?;
    stream.write_be_u16(instrument.sustain_loop.begin_marker)?;
    stream.write_be_u16(instrument.sustain_loop.end_marker)?;

    stream.write_be_u16(instrument.release_loop.mode)?;
    stream.write_be_u16(instrument.release_loop.begin_marker)?;
    stream.write_be_u16(instrument.release_loop.end_marker)?;

    finish_chunk(stream, &reserved)
}

/// Decode `AESD`: exactly 24 bytes of AES channel-status; a short read is fatal (spec §4.2).
pub fn parse_aesd<S: Read>(stream: &mut ByteStream<S>) -> Result<[u8; 24]> {
    let mut buf = [0u8; 24];
    stream.read_buf_exact(&mut buf)?;
    Ok(buf)
}

/// Write `AESD` from `data`.
pub fn write_aesd<S: Write + Seek>(stream: &mut ByteStream<S>, data: &[u8; 24]) -> Result<()> {
    let reserved = write_chunk_header(stream, &AESD_TAG)?;
    stream.write_buf(data)?;
    finish_chunk(stream, &reserved)
}

/// Decode a miscellaneous chunk's payload. Returns `None` for zero-length chunks, which
/// spec §4.2 says are ignored (not recorded).
pub fn parse_misc<S: Read>(stream: &mut ByteStream<S>, kind: MiscKind, len: u32, id: u32) -> Result<Option<Miscellaneous>> {
    if len == 0 {
        return Ok(None);
    }
    let buffer = stream.read_boxed_slice_exact(len as usize)?.into_vec();
    Ok(Some(Miscellaneous { id, kind, buffer }))
}

/// Write a miscellaneous chunk.
pub fn write_misc<S: Write + Seek>(stream: &mut ByteStream<S>, misc: &Miscellaneous) -> Result<()> {
    let reserved = write_chunk_header(stream, &misc.kind.tag())?;
    stream.write_buf(&misc.buffer)?;
    finish_chunk(stream, &reserved)
}

/// `SSND` is fatal if duplicated (spec §4.1, `BAD_AIFF_SSND`).
pub fn reject_duplicate_ssnd<T>() -> Result<T> {
    bad_ssnd_error("aiff: file has more than one SSND chunk")
}

fn ignore_pascal_string<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<()> {
    let len = stream.read_u8()?;
    let mut total = u64::from(len);
    if len & 1 == 0 {
        total += 1;
    }
    stream.ignore_bytes(total)?;
    Ok(())
}

fn read_pascal_string<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<String> {
    let len = stream.read_u8()?;
    let buf = stream.read_boxed_slice_exact(usize::from(len))?;

    // If length is even, 1 + length (the total pstring length) is odd; skip a pad byte.
    if len & 1 == 0 {
        stream.read_u8()?;
    }

    Ok(decode_pascal_text(&buf))
}

fn write_pascal_string<S: Write + Seek>(stream: &mut ByteStream<S>, text: &[u8]) -> Result<()> {
    let len = text.len().min(255) as u8;
    stream.write_u8(len)?;
    stream.write_buf(&text[..usize::from(len)])?;

    if len & 1 == 0 {
        stream.write_u8(0)?;
    }

    Ok(())
}

fn decode_pascal_text(buf: &[u8]) -> String {
    buf.iter().take_while(|&&b| b != 0).map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream_of(bytes: Vec<u8>) -> ByteStream<Cursor<Vec<u8>>> {
        ByteStream::new(Cursor::new(bytes))
    }

    #[test]
    fn parse_comm_aiff_is_big_endian_twos_complement() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes()); // channels
        bytes.extend_from_slice(&0u32.to_be_bytes()); // frames
        bytes.extend_from_slice(&16u16.to_be_bytes()); // sample size
        bytes.extend_from_slice(&crate::io::encode_extended80(44100.0));

        let mut stream = stream_of(bytes);
        let comm = parse_comm(&mut stream, FormType::Aiff).unwrap();
        assert_eq!(comm.format.sample_width, 16);
        assert_eq!(comm.format.byte_order, ByteOrder::Big);
        assert_eq!(comm.format.sample_format, SampleFormat::TwosComplement);
    }

    #[test]
    fn parse_comm_aifc_sowt_is_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&16u16.to_be_bytes());
        bytes.extend_from_slice(&crate::io::encode_extended80(48000.0));
        bytes.extend_from_slice(b"sowt");
        bytes.push(0); // pascal string length 0
        bytes.push(0); // pad byte (0 is even)

        let mut stream = stream_of(bytes);
        let comm = parse_comm(&mut stream, FormType::AiffC).unwrap();
        assert_eq!(comm.format.byte_order, ByteOrder::Little);
    }

    #[test]
    fn parse_comm_unknown_compression_is_unsupported() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&8u16.to_be_bytes());
        bytes.extend_from_slice(&crate::io::encode_extended80(22050.0));
        bytes.extend_from_slice(b"ACE2");
        bytes.push(0);
        bytes.push(0);

        let mut stream = stream_of(bytes);
        assert!(parse_comm(&mut stream, FormType::AiffC).is_err());
    }

    #[test]
    fn marker_pstring_padding_matches_spec_examples() {
        // "foo" (len 3, odd) => no pad byte; consumed = 2 + 4 + 1 + 3 = 10.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&7u16.to_be_bytes());
        bytes.extend_from_slice(&42u32.to_be_bytes());
        bytes.push(3);
        bytes.extend_from_slice(b"foo");

        let mut stream = stream_of(bytes);
        let before = stream.tell().unwrap();
        let markers = parse_mark(&mut stream).unwrap();
        let after = stream.tell().unwrap();
        assert_eq!(after - before, 2 + 2 + 4 + 1 + 3);
        assert_eq!(markers[0].name, "foo");
    }

    #[test]
    fn marker_pstring_padding_even_length_name() {
        // "food" (len 4, even) => 1 pad byte; consumed = 2 + 4 + 1 + 4 + 1 = 12.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&7u16.to_be_bytes());
        bytes.extend_from_slice(&42u32.to_be_bytes());
        bytes.push(4);
        bytes.extend_from_slice(b"food");
        bytes.push(0);

        let mut stream = stream_of(bytes);
        let before = stream.tell().unwrap();
        let _ = parse_mark(&mut stream).unwrap();
        let after = stream.tell().unwrap();
        assert_eq!(after - before, 2 + 2 + 4 + 1 + 4 + 1);
    }

    #[test]
    fn inst_loops_always_get_ids_1_and_2() {
        let mut bytes = vec![60u8, 0u8, 0u8, 127u8, 1u8, 127u8];
        bytes.extend_from_slice(&0i16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(&20u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&30u16.to_be_bytes());
        bytes.extend_from_slice(&40u16.to_be_bytes());

        let mut stream = stream_of(bytes);
        let inst = parse_inst(&mut stream).unwrap();
        assert_eq!(inst.sustain_loop.id, LoopId::Sustain);
        assert_eq!(inst.release_loop.id, LoopId::Release);
    }

    #[test]
    fn zero_length_misc_is_ignored() {
        let mut stream = stream_of(Vec::new());
        let result = parse_misc(&mut stream, MiscKind::Name, 0, 1).unwrap();
        assert!(result.is_none());
    }
}
