// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ByteStream`: a seek/read/write/tell adapter over a file or memory buffer (component A).
//!
//! This plays the role the spec calls an external collaborator; it is kept deliberately
//! thin; the chunk framer and handlers are the only callers.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use extended::Extended;

use crate::error::Result;

/// A seekable byte stream with endian-aware primitive reads and writes.
///
/// Wraps any `Read + Write + Seek` source (a `File`, a `Cursor<Vec<u8>>`, ...) the same way
/// the teacher's `MediaSourceStream` wraps a `MediaSource`, but symmetric over both read and
/// write since this crate's handles support both directions.
pub struct ByteStream<S> {
    inner: S,
}

impl<S> ByteStream<S> {
    pub fn new(inner: S) -> Self {
        ByteStream { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: Seek> ByteStream<S> {
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }
}

impl<S: Read> ByteStream<S> {
    pub fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8()?)
    }

    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16::<BigEndian>()?)
    }

    pub fn read_be_i16(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16::<BigEndian>()?)
    }

    pub fn read_be_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    pub fn read_be_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<BigEndian>()?)
    }

    pub fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    pub fn read_boxed_slice_exact(&mut self, len: usize) -> Result<Box<[u8]>> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf.into_boxed_slice())
    }

    pub fn ignore_bytes(&mut self, len: u64) -> Result<()>
    where
        S: Seek,
    {
        self.inner.seek(SeekFrom::Current(len as i64))?;
        Ok(())
    }

    /// Read a 10-byte IEEE 754 extended-precision value (component B) used only for the
    /// sample-rate field (spec §6).
    pub fn read_extended80(&mut self) -> Result<f64> {
        let mut buf = [0u8; 10];
        self.inner.read_exact(&mut buf)?;
        Ok(decode_extended80(&buf))
    }
}

impl<S: Write> ByteStream<S> {
    pub fn write_quad_bytes(&mut self, tag: &[u8; 4]) -> Result<()> {
        self.inner.write_all(tag)?;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        Ok(self.inner.write_u8(v)?)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        Ok(self.inner.write_i8(v)?)
    }

    pub fn write_be_u16(&mut self, v: u16) -> Result<()> {
        Ok(self.inner.write_u16::<BigEndian>(v)?)
    }

    pub fn write_be_i16(&mut self, v: i16) -> Result<()> {
        Ok(self.inner.write_i16::<BigEndian>(v)?)
    }

    pub fn write_be_u32(&mut self, v: u32) -> Result<()> {
        Ok(self.inner.write_u32::<BigEndian>(v)?)
    }

    pub fn write_be_i32(&mut self, v: i32) -> Result<()> {
        Ok(self.inner.write_i32::<BigEndian>(v)?)
    }

    pub fn write_buf(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// Write a 10-byte IEEE 754 extended-precision value (component B).
    pub fn write_extended80(&mut self, value: f64) -> Result<()> {
        self.inner.write_all(&encode_extended80(value))?;
        Ok(())
    }
}

impl<S: Write + Seek> ByteStream<S> {
    /// Patch a previously-reserved `u32` size field at `pos` with `value`, restoring the
    /// stream's prior position afterwards (spec §4.1 back-patching protocol).
    pub fn patch_u32_at(&mut self, pos: u64, value: u32) -> Result<()> {
        let current = self.tell()?;
        self.seek(SeekFrom::Start(pos))?;
        self.write_be_u32(value)?;
        self.seek(SeekFrom::Start(current))?;
        Ok(())
    }
}

/// Decode a 10-byte IEEE 754 double-extended value into an `f64` (component B).
///
/// Delegates to the `extended` crate, but special-cases the historical zero-exponent
/// convention explicitly (spec Design Notes): exponent 0 is treated as 0.0 regardless of
/// the mantissa, matching the behavior `_af_convert_from_ieee_extended` relies on.
pub fn decode_extended80(buf: &[u8; 10]) -> f64 {
    let exponent = u16::from_be_bytes([buf[0], buf[1]]) & 0x7fff;
    if exponent == 0 {
        return 0.0;
    }
    Extended::from_be_bytes(*buf).to_f64()
}

/// Encode an `f64` into a 10-byte IEEE 754 double-extended value (component B).
pub fn encode_extended80(value: f64) -> [u8; 10] {
    if value == 0.0 {
        return [0u8; 10];
    }
    Extended::from(value).to_be_bytes()
}
