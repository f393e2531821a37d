// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The description of one frame's encoding (spec §3, `AudioFormat`).

use std::collections::HashMap;

/// A typed value in a compression parameter bag.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Long(i64),
    Double(f64),
    String(String),
}

/// Endianness of the samples as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// The representation of one sample, independent of its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    TwosComplement,
    Unsigned,
    Float32,
    Float64,
}

/// The compression (companding) scheme applied to stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    G711MuLaw,
    G711ALaw,
}

impl CompressionType {
    /// `true` for the two companders, which always normalize to 16-bit two's complement
    /// downstream of decompanding (spec §3 AIFF-C invariants).
    pub fn is_compander(self) -> bool {
        matches!(self, CompressionType::G711MuLaw | CompressionType::G711ALaw)
    }
}

/// The description of one frame's encoding, shared by the stored (file) format and the
/// caller-chosen virtual format (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFormat {
    pub sample_rate: f64,
    pub channel_count: u32,
    pub sample_width: u32,
    pub sample_format: SampleFormat,
    pub byte_order: ByteOrder,
    pub compression_type: CompressionType,
    pub compression_params: HashMap<String, ParamValue>,
}

impl AudioFormat {
    /// A plain two's-complement PCM format at the given rate/channels/width, big-endian,
    /// uncompressed — the common case for both AIFF and a caller's virtual format.
    pub fn pcm(sample_rate: f64, channel_count: u32, sample_width: u32) -> Self {
        AudioFormat {
            sample_rate,
            channel_count,
            sample_width,
            sample_format: SampleFormat::TwosComplement,
            byte_order: ByteOrder::Big,
            compression_type: CompressionType::None,
            compression_params: HashMap::new(),
        }
    }

    /// Bytes per frame (all channels) at the logical sample width, i.e. the width a caller
    /// sees after decompanding. Not the on-disk stride for companded formats; see
    /// `stored_frame_size`.
    pub fn frame_size(&self) -> u32 {
        self.channel_count * ((self.sample_width + 7) / 8)
    }

    /// Bytes per sample as actually laid out on disk: one byte for either compander (the
    /// compressed code, before decompanding), otherwise the logical width rounded to a byte.
    pub fn stored_bytes_per_sample(&self) -> u32 {
        if self.compression_type.is_compander() {
            1
        }
        else {
            (self.sample_width + 7) / 8
        }
    }

    /// Bytes per frame as actually laid out on disk (all channels).
    pub fn stored_frame_size(&self) -> u32 {
        self.channel_count * self.stored_bytes_per_sample()
    }

    /// Derive `sample_format`/`sample_width` consistency the way `_af_set_sample_format`
    /// does in the original implementation: companded formats always normalize to 16-bit
    /// two's complement once decompanded.
    pub fn normalize(&mut self) {
        if self.compression_type.is_compander() {
            self.sample_format = SampleFormat::TwosComplement;
            self.sample_width = 16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_rounds_up_to_byte() {
        let fmt = AudioFormat::pcm(44100.0, 2, 24);
        assert_eq!(fmt.frame_size(), 6);
        let fmt = AudioFormat::pcm(44100.0, 1, 1);
        assert_eq!(fmt.frame_size(), 1);
    }

    #[test]
    fn normalize_forces_compander_to_16_bit_twos_complement() {
        let mut fmt = AudioFormat::pcm(8000.0, 1, 8);
        fmt.compression_type = CompressionType::G711MuLaw;
        fmt.normalize();
        assert_eq!(fmt.sample_width, 16);
        assert_eq!(fmt.sample_format, SampleFormat::TwosComplement);
    }
}
