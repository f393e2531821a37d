// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The outer `FORM` envelope and inner `(id, size, payload)` chunk iteration (component C).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{decode_error, unsupported_error, Result};
use crate::io::ByteStream;

pub const FORM_MARKER: [u8; 4] = *b"FORM";
pub const AIFF_FORM_TYPE: [u8; 4] = *b"AIFF";
pub const AIFC_FORM_TYPE: [u8; 4] = *b"AIFC";

/// Which of the two RIFF-AIFF form types a file declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormType {
    Aiff,
    AiffC,
}

impl FormType {
    pub fn tag(self) -> [u8; 4] {
        match self {
            FormType::Aiff => AIFF_FORM_TYPE,
            FormType::AiffC => AIFC_FORM_TYPE,
        }
    }
}

/// Maps a 4-byte chunk tag to the enum variant capable of parsing it, or `None` for chunks
/// that should be tolerated and skipped (spec §4.1: "unknown ids are tolerated and skipped").
pub trait ParseChunkTag: Sized {
    fn parse_tag(tag: [u8; 4], len: u32) -> Option<Self>;
}

/// A lazily-parsed chunk: `ChunksIter::next` identifies the tag and length but defers
/// reading the payload until the caller calls `ChunkHeader::parse`.
pub struct ChunkHeader {
    pub tag: [u8; 4],
    pub len: u32,
}

/// Iterates the chunks nested directly inside the outer `FORM` chunk, enforcing even-byte
/// alignment padding between chunks (spec §4.1).
pub struct ChunksIter {
    end: u64,
}

impl ChunksIter {
    /// `form_len` is the `FORM` chunk's declared size (payload only, i.e. includes the
    /// 4-byte form type but not the 8-byte `FORM` header itself).
    pub fn new(start: u64, form_len: u32) -> Self {
        ChunksIter { end: start + u64::from(form_len) }
    }

    /// Read the next chunk header, if any remain before the end of the `FORM` chunk.
    /// Returns `Ok(None)` at a clean end of the envelope.
    pub fn next_header<S: Read + Seek>(&mut self, stream: &mut ByteStream<S>) -> Result<Option<ChunkHeader>> {
        let pos = stream.tell()?;

        if pos & 1 == 1 {
            // Pad byte from the previous chunk.
            stream.ignore_bytes(1)?;
        }

        let pos = stream.tell()?;
        if pos + 8 > self.end {
            return Ok(None);
        }

        let tag = stream.read_quad_bytes()?;
        let len = stream.read_be_u32()?;

        Ok(Some(ChunkHeader { tag, len }))
    }

    /// Skip over `header`'s payload without interpreting it (unknown-chunk tolerance).
    pub fn skip<S: Read + Seek>(&self, stream: &mut ByteStream<S>, header: &ChunkHeader) -> Result<()> {
        log::debug!("aiff: skipping unknown chunk {:?} ({} bytes)", String::from_utf8_lossy(&header.tag), header.len);
        stream.ignore_bytes(u64::from(header.len))?;
        Ok(())
    }
}

/// Read and validate the outer `FORM` envelope, positioning the stream just past the form
/// type so the caller can begin iterating inner chunks (spec §4.1).
pub fn read_form_header<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<(FormType, u32)> {
    stream.seek(SeekFrom::Start(0))?;

    let marker = stream.read_quad_bytes()?;
    if marker != FORM_MARKER {
        return unsupported_error("aiff: missing FORM stream marker");
    }

    let form_len = stream.read_be_u32()?;
    if form_len < 4 {
        return decode_error("aiff: invalid FORM length");
    }

    let form_tag = stream.read_quad_bytes()?;
    let form_type = if form_tag == AIFF_FORM_TYPE {
        FormType::Aiff
    }
    else if form_tag == AIFC_FORM_TYPE {
        FormType::AiffC
    }
    else {
        return unsupported_error("aiff: form type is not AIFF or AIFC");
    };

    Ok((form_type, form_len))
}

/// Recognize a `FORM`/`AIFF` header without consuming more than the 12-byte check (spec §4.5).
pub fn recognize_aiff<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<bool> {
    recognize(stream, AIFF_FORM_TYPE)
}

/// Recognize a `FORM`/`AIFC` header without consuming more than the 12-byte check (spec §4.5).
pub fn recognize_aiffc<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<bool> {
    recognize(stream, AIFC_FORM_TYPE)
}

fn recognize<S: Read + Seek>(stream: &mut ByteStream<S>, want_form: [u8; 4]) -> Result<bool> {
    stream.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; 12];
    if stream.read_buf_exact(&mut buf).is_err() {
        return Ok(false);
    }
    Ok(&buf[0..4] == FORM_MARKER.as_slice() && &buf[8..12] == want_form.as_slice())
}

/// Tracks the byte offset of a reserved chunk header so its size field can be patched once
/// the payload has been fully written (spec §4.1 write protocol, Design Notes back-patching).
pub struct ReservedHeader {
    pub header_pos: u64,
    pub payload_start: u64,
}

/// Reserve a chunk header (`tag` + placeholder size) at the stream's current position.
pub fn write_chunk_header<S: Write + Seek>(stream: &mut ByteStream<S>, tag: &[u8; 4]) -> Result<ReservedHeader> {
    let header_pos = stream.tell()?;
    stream.write_quad_bytes(tag)?;
    stream.write_be_u32(0xFFFF_FFFF)?;
    let payload_start = stream.tell()?;
    Ok(ReservedHeader { header_pos, payload_start })
}

/// Patch a chunk's size field now that its payload has been written, and pad to an even
/// byte boundary if the payload length was odd.
pub fn finish_chunk<S: Write + Seek>(stream: &mut ByteStream<S>, reserved: &ReservedHeader) -> Result<()> {
    let end = stream.tell()?;
    let payload_len = end - reserved.payload_start;
    stream.patch_u32_at(reserved.header_pos + 4, payload_len as u32)?;

    if payload_len & 1 == 1 {
        stream.write_u8(0)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reserve_and_finish_chunk_patches_size() {
        let mut bs = ByteStream::new(Cursor::new(Vec::<u8>::new()));
        let reserved = write_chunk_header(&mut bs, b"TEST").unwrap();
        bs.write_buf(&[1, 2, 3]).unwrap();
        finish_chunk(&mut bs, &reserved).unwrap();

        let buf = bs.into_inner().into_inner();
        assert_eq!(&buf[0..4], b"TEST");
        assert_eq!(u32::from_be_bytes(buf[4..8].try_into().unwrap()), 3);
        assert_eq!(&buf[8..11], &[1, 2, 3]);
        assert_eq!(buf.len(), 12); // padded to even
    }

    #[test]
    fn recognize_distinguishes_aiff_and_aifc() {
        let mut aiff = ByteStream::new(Cursor::new(b"FORM\x00\x00\x00\x04AIFF".to_vec()));
        assert!(recognize_aiff(&mut aiff).unwrap());
        assert!(!recognize_aiffc(&mut aiff).unwrap());

        let mut aifc = ByteStream::new(Cursor::new(b"FORM\x00\x00\x00\x04AIFC".to_vec()));
        assert!(recognize_aiffc(&mut aifc).unwrap());
        assert!(!recognize_aiff(&mut aifc).unwrap());
    }
}
