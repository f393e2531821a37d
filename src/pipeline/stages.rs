// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-sample conversion primitives: the numeric half of each stage in the pipeline's
//! fixed read order (source → decompand → byte-swap → signed/unsigned → width → int/float).

use crate::format::{AudioFormat, ByteOrder, CompressionType, SampleFormat};

/// Scale factor for the int↔float conversion table (spec §4.3): full scale is
/// `2^(width-1) - 1`, symmetric about zero, so `+1.0`/`-1.0` map to `±(2^(width-1)-1)`.
fn scale(width: u32) -> f64 {
    ((1i64 << (width - 1)) - 1) as f64
}

/// The representable signed range of a canonical integer sample at `width` bits.
fn width_range(width: u32) -> (i64, i64) {
    let half = 1i64 << (width - 1);
    (-half, half - 1)
}

/// Convert a canonical two's-complement integer sample to `[-1.0, 1.0]` amplitude.
pub fn int_to_float(value: i64, width: u32) -> f64 {
    value as f64 / scale(width)
}

/// Convert amplitude back to a canonical integer sample, truncating toward zero (matches
/// the float→int24 table in spec §8: `0.5 → 4194303`, not `4194304`), clamped to `width`'s
/// representable range so an out-of-range amplitude cannot wrap on write.
pub fn float_to_int(value: f64, width: u32) -> i64 {
    let (min, max) = width_range(width);
    ((value * scale(width)) as i64).clamp(min, max)
}

/// Convert a canonical integer sample between two logical widths by shifting the bit
/// pattern, never by rescaling through float amplitude (spec §4.3 width stage): widening
/// shifts left, narrowing shifts right (arithmetic, sign-preserving), then clamps to the
/// target width's representable range.
pub fn convert_int_width(value: i64, from_width: u32, to_width: u32) -> i64 {
    let shifted = if to_width >= from_width {
        value << (to_width - from_width)
    }
    else {
        value >> (from_width - to_width)
    };
    let (min, max) = width_range(to_width);
    shifted.clamp(min, max)
}

/// Read `width` bits (rounded up to a byte count) from `bytes` in `order`, as an unsigned
/// bit pattern.
fn read_bits(bytes: &[u8], order: ByteOrder) -> u64 {
    let mut acc: u64 = 0;
    match order {
        ByteOrder::Big => {
            for &b in bytes {
                acc = (acc << 8) | u64::from(b);
            }
        }
        ByteOrder::Little => {
            for &b in bytes.iter().rev() {
                acc = (acc << 8) | u64::from(b);
            }
        }
    }
    acc
}

fn write_bits(bits: u64, n_bytes: usize, order: ByteOrder, out: &mut Vec<u8>) {
    let all_bytes = bits.to_be_bytes();
    let be_bytes = &all_bytes[8 - n_bytes..];
    match order {
        ByteOrder::Big => out.extend_from_slice(be_bytes),
        ByteOrder::Little => out.extend(be_bytes.iter().rev()),
    }
}

/// Sign-extend an unsigned bit pattern of `width` bits to a full `i64`.
fn sign_extend(bits: u64, width: u32) -> i64 {
    let shift = 64 - width;
    ((bits << shift) as i64) >> shift
}

/// Mask a signed value down to its low `width` bits, for packing into storage (lossy if
/// the value does not fit — matches the "width contract" stage's truncation semantics).
fn truncate_to_width(value: i64, width: u32) -> u64 {
    let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
    (value as u64) & mask
}

const MU_LAW_MU: f64 = 255.0;
const A_LAW_A: f64 = 87.6;

fn clamp_to_i16(value: f64) -> i16 {
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// µ-law decode (ITU-T G.711 logarithmic companding law): 8-bit compressed code to 16-bit
/// linear PCM.
pub fn decompand_mu_law(code: u8) -> i16 {
    let compressed = f64::from(code) / 127.5 - 1.0;
    let sign = if compressed < 0.0 { -1.0 } else { 1.0 };
    let linear = sign * ((1.0 + MU_LAW_MU).powf(compressed.abs()) - 1.0) / MU_LAW_MU;
    clamp_to_i16(linear * 32768.0)
}

/// µ-law encode: 16-bit linear PCM to an 8-bit compressed code.
pub fn compand_mu_law(sample: i16) -> u8 {
    let x = f64::from(sample) / 32768.0;
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let compressed = sign * (1.0 + MU_LAW_MU * x.abs()).ln() / (1.0 + MU_LAW_MU).ln();
    ((compressed + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
}

/// A-law decode (ITU-T G.711 logarithmic companding law): 8-bit compressed code to 16-bit
/// linear PCM.
pub fn decompand_a_law(code: u8) -> i16 {
    let y = f64::from(code) / 127.5 - 1.0;
    let sign = if y < 0.0 { -1.0 } else { 1.0 };
    let ay = y.abs();
    let ln_a = A_LAW_A.ln();
    let threshold = 1.0 / (1.0 + ln_a);
    let x = if ay < threshold {
        sign * ay * (1.0 + ln_a) / A_LAW_A
    }
    else {
        sign * (ay * (1.0 + ln_a) - 1.0).exp() / A_LAW_A
    };
    clamp_to_i16(x * 32768.0)
}

/// A-law encode: 16-bit linear PCM to an 8-bit compressed code.
pub fn compand_a_law(sample: i16) -> u8 {
    let x = f64::from(sample) / 32768.0;
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let ax = x.abs();
    let ln_a = A_LAW_A.ln();
    let y = if ax < 1.0 / A_LAW_A {
        sign * A_LAW_A * ax / (1.0 + ln_a)
    }
    else {
        sign * (1.0 + (A_LAW_A * ax).ln()) / (1.0 + ln_a)
    };
    ((y + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
}

/// Either side of a sample moving through the pipeline: a canonical two's-complement
/// integer at some format's `sample_width`, or a `[-1.0, 1.0]` float amplitude. Used both
/// by the identity fast path (literal stored bit pattern) and by the per-stage conversion
/// chain (canonical value, width-matched to whichever format is current at that point).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    Int(i64),
    Float(f64),
}

/// Read one sample's raw bytes as its literal stored value — no decompand, no int/float
/// scaling. Used by the identity fast path so a read-then-write round trip of a file whose
/// virtual format equals its stored format reproduces the input bytes exactly (spec §8).
pub fn read_raw_sample(bytes: &[u8], format: &AudioFormat) -> RawSample {
    if format.compression_type.is_compander() {
        return RawSample::Int(i64::from(bytes[0]));
    }
    match format.sample_format {
        SampleFormat::Float32 => RawSample::Float(f64::from(f32::from_bits(read_bits(bytes, format.byte_order) as u32))),
        SampleFormat::Float64 => RawSample::Float(f64::from_bits(read_bits(bytes, format.byte_order))),
        SampleFormat::TwosComplement => RawSample::Int(sign_extend(read_bits(bytes, format.byte_order), format.sample_width)),
        SampleFormat::Unsigned => RawSample::Int(read_bits(bytes, format.byte_order) as i64),
    }
}

/// Write one literal stored value back to raw bytes; the exact inverse of `read_raw_sample`.
pub fn write_raw_sample(sample: RawSample, format: &AudioFormat, out: &mut Vec<u8>) {
    if format.compression_type.is_compander() {
        if let RawSample::Int(code) = sample {
            out.push(code as u8);
        }
        return;
    }
    match (sample, format.sample_format) {
        (RawSample::Float(v), SampleFormat::Float32) => write_bits(u64::from((v as f32).to_bits()), 4, format.byte_order, out),
        (RawSample::Float(v), SampleFormat::Float64) => write_bits(v.to_bits(), 8, format.byte_order, out),
        (RawSample::Int(v), _) => {
            let bits = truncate_to_width(v, format.sample_width);
            write_bits(bits, format.stored_bytes_per_sample() as usize, format.byte_order, out);
        }
        (RawSample::Float(_), _) => unreachable!("raw sample kind must match format's sample_format"),
    }
}

/// Decode one sample's raw bytes (stored format) to a canonical `RawSample`: decompand,
/// byte-swap, and signed/unsigned debias collapse into this one read, since they are only
/// ever observed together at the byte boundary (spec §4.3 source/decompand/byte-swap/
/// signed-unsigned stages). The result is `Int` at `format.sample_width` for every
/// integer-typed format — including a decompanded compander, which `AudioFormat::normalize`
/// already pins to 16 bits — or `Float` amplitude for a floating-point format. Width and
/// int/float conversion are left to the stage chain downstream, strictly on this value.
pub fn decode_canonical(bytes: &[u8], format: &AudioFormat) -> RawSample {
    if format.compression_type.is_compander() {
        let code = bytes[0];
        let linear = match format.compression_type {
            CompressionType::G711MuLaw => decompand_mu_law(code),
            CompressionType::G711ALaw => decompand_a_law(code),
            CompressionType::None => unreachable!(),
        };
        return RawSample::Int(i64::from(linear));
    }

    match format.sample_format {
        SampleFormat::Float32 => RawSample::Float(f64::from(f32::from_bits(read_bits(bytes, format.byte_order) as u32))),
        SampleFormat::Float64 => RawSample::Float(f64::from_bits(read_bits(bytes, format.byte_order))),
        SampleFormat::TwosComplement => RawSample::Int(sign_extend(read_bits(bytes, format.byte_order), format.sample_width)),
        SampleFormat::Unsigned => {
            let bits = read_bits(bytes, format.byte_order);
            let half = 1i64 << (format.sample_width - 1);
            RawSample::Int(bits as i64 - half)
        }
    }
}

/// Encode a canonical `RawSample` — already width/format-matched to `format` by the stage
/// chain — into raw bytes: the inverse of `decode_canonical` (signed/unsigned bias add,
/// compand, bit pack).
pub fn encode_canonical(sample: RawSample, format: &AudioFormat, out: &mut Vec<u8>) {
    if format.compression_type.is_compander() {
        let linear = match sample {
            RawSample::Int(v) => v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16,
            RawSample::Float(v) => float_to_int(v, 16) as i16,
        };
        let code = match format.compression_type {
            CompressionType::G711MuLaw => compand_mu_law(linear),
            CompressionType::G711ALaw => compand_a_law(linear),
            CompressionType::None => unreachable!(),
        };
        out.push(code);
        return;
    }

    match (sample, format.sample_format) {
        (RawSample::Float(v), SampleFormat::Float32) => write_bits(u64::from((v as f32).to_bits()), 4, format.byte_order, out),
        (RawSample::Float(v), SampleFormat::Float64) => write_bits(v.to_bits(), 8, format.byte_order, out),
        (RawSample::Int(v), SampleFormat::TwosComplement) => {
            let bits = truncate_to_width(v, format.sample_width);
            write_bits(bits, format.stored_bytes_per_sample() as usize, format.byte_order, out);
        }
        (RawSample::Int(v), SampleFormat::Unsigned) => {
            let half = 1i64 << (format.sample_width - 1);
            let bits = truncate_to_width(v + half, format.sample_width);
            write_bits(bits, format.stored_bytes_per_sample() as usize, format.byte_order, out);
        }
        (RawSample::Int(_), SampleFormat::Float32 | SampleFormat::Float64)
        | (RawSample::Float(_), SampleFormat::TwosComplement | SampleFormat::Unsigned) => {
            unreachable!("canonical sample kind must match target format's sample_format by the time it reaches encode")
        }
    }
}

/// Mix one frame's samples from `from_channels` to `to_channels` (spec §4.3 channel-matrix
/// stage): duplicate mono to every output channel, average down to mono, or copy the
/// overlapping channels 1:1 otherwise. Operates directly on whichever `RawSample` kind the
/// frame already carries, so a pure channel-count change never detours through float.
pub fn remix(input: &[RawSample], from_channels: u32, to_channels: u32) -> Vec<RawSample> {
    if from_channels == to_channels {
        return input.to_vec();
    }

    if from_channels == 1 {
        return (0..to_channels).map(|_| input[0]).collect();
    }

    if to_channels == 1 {
        return vec![average(input, from_channels)];
    }

    let n = from_channels.min(to_channels) as usize;
    let fill = if matches!(input.first(), Some(RawSample::Float(_))) { RawSample::Float(0.0) } else { RawSample::Int(0) };
    let mut out = vec![fill; to_channels as usize];
    out[..n].copy_from_slice(&input[..n]);
    out
}

fn average(input: &[RawSample], from_channels: u32) -> RawSample {
    if matches!(input.first(), Some(RawSample::Float(_))) {
        let sum: f64 = input
            .iter()
            .map(|s| match s {
                RawSample::Float(v) => *v,
                RawSample::Int(v) => *v as f64,
            })
            .sum();
        RawSample::Float(sum / f64::from(from_channels))
    }
    else {
        let sum: i64 = input
            .iter()
            .map(|s| match s {
                RawSample::Int(v) => *v,
                RawSample::Float(v) => *v as i64,
            })
            .sum();
        RawSample::Int(sum / i64::from(from_channels))
    }
}
