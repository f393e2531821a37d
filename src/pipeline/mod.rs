// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample-format conversion pipeline bridging a file's stored format to the caller's
//! chosen virtual format (component G, spec §4.3).

mod stages;

pub use stages::{compand_a_law, compand_mu_law, decompand_a_law, decompand_mu_law, RawSample};

use crate::format::{AudioFormat, SampleFormat};

fn is_integer_format(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::TwosComplement | SampleFormat::Unsigned)
}

/// One stage in the assembled chain, transforming one frame of canonical samples as they
/// move `stored` → `virtual_format` (`apply`, the decode direction) or the reverse
/// (`unapply`, the encode direction). Every stage here is stateless (no adaptive filters, no
/// dithering), so `reset`/`max_pull` are trivial by default; kept as real methods so a
/// future stateful stage has somewhere to plug in. Stages whose work is inseparable from
/// the byte boundary (decompand, byte-swap, signed/unsigned debias) fold into
/// `stages::decode_canonical`/`encode_canonical` instead and leave `apply` at its identity
/// default — they still appear in `stage_names()` so the assembled chain is fully named.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn apply(&self, frame: Vec<RawSample>, _stored: &AudioFormat, _virtual_format: &AudioFormat) -> Vec<RawSample> {
        frame
    }

    /// The encode-direction transform. Every stage here is its own inverse under a swap of
    /// which format is "from" and which is "to", so the default just calls `apply` with the
    /// two formats exchanged.
    fn unapply(&self, frame: Vec<RawSample>, stored: &AudioFormat, virtual_format: &AudioFormat) -> Vec<RawSample> {
        self.apply(frame, virtual_format, stored)
    }

    fn max_pull(&self, n_out: usize) -> usize {
        n_out
    }

    fn reset(&mut self) {}
}

macro_rules! stage {
    ($name:ident, $label:literal) => {
        struct $name;
        impl Stage for $name {
            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

stage!(SourceStage, "source");
stage!(DecompandStage, "decompand");
stage!(ByteSwapStage, "byte-swap");
stage!(SignedUnsignedStage, "signed/unsigned");
stage!(SinkStage, "sink");

struct WidthStage;

impl Stage for WidthStage {
    fn name(&self) -> &'static str {
        "width"
    }

    fn apply(&self, frame: Vec<RawSample>, stored: &AudioFormat, virtual_format: &AudioFormat) -> Vec<RawSample> {
        frame
            .into_iter()
            .map(|sample| match sample {
                RawSample::Int(v) => RawSample::Int(stages::convert_int_width(v, stored.sample_width, virtual_format.sample_width)),
                RawSample::Float(v) => RawSample::Float(v),
            })
            .collect()
    }
}

struct IntFloatStage;

impl Stage for IntFloatStage {
    fn name(&self) -> &'static str {
        "int/float"
    }

    /// Dispatches on which variant the incoming sample actually carries, not on the
    /// direction of travel: a canonical `Int` is always converted using the width of
    /// whichever format it came from (`stored` in `apply`'s parameter position, `virtual_format`
    /// under the `unapply` swap), a canonical `Float` converted using the width of whichever
    /// format it is going to.
    fn apply(&self, frame: Vec<RawSample>, stored: &AudioFormat, virtual_format: &AudioFormat) -> Vec<RawSample> {
        frame
            .into_iter()
            .map(|sample| match sample {
                RawSample::Int(v) => RawSample::Float(stages::int_to_float(v, stored.sample_width)),
                RawSample::Float(v) => RawSample::Int(stages::float_to_int(v, virtual_format.sample_width)),
            })
            .collect()
    }
}

struct ChannelMatrixStage;

impl Stage for ChannelMatrixStage {
    fn name(&self) -> &'static str {
        "channel-matrix"
    }

    fn apply(&self, frame: Vec<RawSample>, stored: &AudioFormat, virtual_format: &AudioFormat) -> Vec<RawSample> {
        stages::remix(&frame, stored.channel_count, virtual_format.channel_count)
    }
}

/// Decoded (read path) or pre-encode (write path) samples in the virtual format's native
/// representation: integer formats (two's-complement or unsigned) decode to `Int`, float
/// formats decode to `Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::Int(v) => v.len(),
            SampleBuffer::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An assembled read/write conversion chain between a stored and a virtual `AudioFormat`.
///
/// Assembly policy (spec §4.3): only the stages the two formats actually disagree on are
/// inserted, in the fixed named order (source → decompand → byte-swap → signed/unsigned →
/// width → int/float → channel-matrix → sink); `decode_frames`/`encode_frames` parse/pack
/// bytes at the source/sink boundary and then literally fold the assembled stages over each
/// frame via `Stage::apply`/`unapply`, so the reported `stage_names()` are what actually
/// runs, not just diagnostic labels. `decode_frames`/`encode_frames` take the byte-identical
/// fast path instead whenever the two formats and channel counts are identical, guaranteeing
/// the round-trip invariant (spec §8) is exact rather than subject to floating-point
/// rounding or, for an integer width change, to the shift chain's own clamping.
pub struct Pipeline {
    stored: AudioFormat,
    virtual_format: AudioFormat,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Assemble a pipeline for `stored` (the file's on-disk format) reading into/writing
    /// from `virtual_format` (what the caller sees).
    pub fn new(stored: AudioFormat, virtual_format: AudioFormat) -> Self {
        let stored_is_int = is_integer_format(stored.sample_format);
        let virtual_is_int = is_integer_format(virtual_format.sample_format);

        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(SourceStage)];

        if stored.compression_type.is_compander() {
            stages.push(Box::new(DecompandStage));
        }
        if stored.byte_order != virtual_format.byte_order {
            stages.push(Box::new(ByteSwapStage));
        }
        if stored_is_int && virtual_is_int && stored.sample_format != virtual_format.sample_format {
            stages.push(Box::new(SignedUnsignedStage));
        }
        if stored_is_int && virtual_is_int && stored.sample_width != virtual_format.sample_width {
            stages.push(Box::new(WidthStage));
        }
        if stored_is_int != virtual_is_int {
            stages.push(Box::new(IntFloatStage));
        }
        if stored.channel_count != virtual_format.channel_count {
            stages.push(Box::new(ChannelMatrixStage));
        }
        stages.push(Box::new(SinkStage));

        Pipeline { stored, virtual_format, stages }
    }

    /// The assembled stage names, in read order, for diagnostics/tests.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// `true` when stored and virtual formats are identical: the fast byte-copy path applies.
    pub fn is_identity(&self) -> bool {
        self.stored == self.virtual_format
    }

    pub fn stored_format(&self) -> &AudioFormat {
        &self.stored
    }

    pub fn virtual_format(&self) -> &AudioFormat {
        &self.virtual_format
    }

    /// Decode `n_frames` of stored-format raw bytes into the virtual format's native
    /// sample representation.
    pub fn decode_frames(&self, raw: &[u8], n_frames: u64) -> SampleBuffer {
        if self.is_identity() {
            return identity_decode(raw, &self.virtual_format, n_frames);
        }

        let stored_stride = self.stored.stored_bytes_per_sample() as usize;
        let stored_channels = self.stored.channel_count as usize;
        let virtual_channels = self.virtual_format.channel_count as usize;

        let mut out = Vec::with_capacity(n_frames as usize * virtual_channels);
        let mut offset = 0usize;

        for _ in 0..n_frames {
            let mut frame = Vec::with_capacity(stored_channels);
            for _ in 0..stored_channels {
                frame.push(stages::decode_canonical(&raw[offset..offset + stored_stride], &self.stored));
                offset += stored_stride;
            }
            for stage in &self.stages {
                frame = stage.apply(frame, &self.stored, &self.virtual_format);
            }
            out.extend(frame);
        }

        bucket(out, &self.virtual_format)
    }

    /// Encode `samples` (in the virtual format's native representation) to stored-format
    /// raw bytes.
    pub fn encode_frames(&self, samples: &SampleBuffer, n_frames: u64) -> Vec<u8> {
        if self.is_identity() {
            return identity_encode(samples, &self.stored);
        }

        let virtual_samples = unbucket(samples);
        let virtual_channels = self.virtual_format.channel_count as usize;
        let mut out = Vec::new();

        for i in 0..n_frames as usize {
            let mut frame = virtual_samples[i * virtual_channels..(i + 1) * virtual_channels].to_vec();
            for stage in self.stages.iter().rev() {
                frame = stage.unapply(frame, &self.stored, &self.virtual_format);
            }
            for sample in frame {
                stages::encode_canonical(sample, &self.stored, &mut out);
            }
        }

        out
    }
}

/// Collect a flat run of post-stage `RawSample`s into `format`'s native buffer kind. Every
/// sample in `samples` already carries the variant matching `format.sample_format` — the
/// `int/float` stage (or its absence) settled that for the whole frame — `format` only
/// decides the empty case, where there is no sample to read a variant from.
fn bucket(samples: Vec<RawSample>, format: &AudioFormat) -> SampleBuffer {
    if is_integer_format(format.sample_format) {
        SampleBuffer::Int(samples.into_iter().map(|s| match s { RawSample::Int(v) => v, RawSample::Float(v) => v as i64 }).collect())
    }
    else {
        SampleBuffer::Float(samples.into_iter().map(|s| match s { RawSample::Float(v) => v, RawSample::Int(v) => v as f64 }).collect())
    }
}

fn unbucket(samples: &SampleBuffer) -> Vec<RawSample> {
    match samples {
        SampleBuffer::Int(v) => v.iter().map(|&x| RawSample::Int(x)).collect(),
        SampleBuffer::Float(v) => v.iter().map(|&x| RawSample::Float(x)).collect(),
    }
}

fn identity_decode(raw: &[u8], format: &AudioFormat, n_frames: u64) -> SampleBuffer {
    let stride = format.stored_bytes_per_sample() as usize;
    let channels = format.channel_count as usize;
    let total = n_frames as usize * channels;
    let mut offset = 0usize;
    let mut samples = Vec::with_capacity(total);

    for _ in 0..total {
        samples.push(stages::read_raw_sample(&raw[offset..offset + stride], format));
        offset += stride;
    }

    bucket(samples, format)
}

fn identity_encode(samples: &SampleBuffer, format: &AudioFormat) -> Vec<u8> {
    let mut out = Vec::new();
    for sample in unbucket(samples) {
        stages::write_raw_sample(sample, format, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ByteOrder, CompressionType};

    #[test]
    fn identity_pipeline_round_trips_byte_identical() {
        let format = AudioFormat::pcm(44100.0, 1, 16);
        let pipeline = Pipeline::new(format.clone(), format);
        assert!(pipeline.is_identity());

        let raw: Vec<u8> = vec![0x12, 0x34, 0xFF, 0x00, 0x00, 0x01];
        let decoded = pipeline.decode_frames(&raw, 3);
        let encoded = pipeline.encode_frames(&decoded, 3);
        assert_eq!(decoded.len(), 3);
        assert_eq!(encoded, raw);
    }

    #[test]
    fn sowt_little_endian_decodes_same_value_as_twos_big_endian() {
        let big = AudioFormat::pcm(44100.0, 1, 16);
        let mut little = big.clone();
        little.byte_order = ByteOrder::Little;

        let pipeline = Pipeline::new(little, big);
        let raw = [0x34, 0x12]; // little-endian 0x1234
        let decoded = pipeline.decode_frames(&raw, 1);
        match decoded {
            SampleBuffer::Int(v) => assert_eq!(v[0], 0x1234),
            _ => panic!("expected int buffer"),
        }
    }

    #[test]
    fn mu_law_stored_decodes_to_16_bit_virtual() {
        let mut stored = AudioFormat::pcm(8000.0, 1, 8);
        stored.compression_type = CompressionType::G711MuLaw;
        stored.normalize();
        let virtual_format = AudioFormat::pcm(8000.0, 1, 16);

        let pipeline = Pipeline::new(stored, virtual_format);
        assert!(pipeline.stage_names().contains(&"decompand"));

        let raw = [0xFFu8]; // silence-ish code
        let decoded = pipeline.decode_frames(&raw, 1);
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn mono_to_stereo_channel_matrix_duplicates() {
        let mono = AudioFormat::pcm(44100.0, 1, 16);
        let mut stereo = mono.clone();
        stereo.channel_count = 2;

        let pipeline = Pipeline::new(mono, stereo);
        let raw = 1000i16.to_be_bytes();
        let decoded = pipeline.decode_frames(&raw, 1);
        match decoded {
            SampleBuffer::Int(v) => assert_eq!(v, vec![v[0], v[0]]),
            _ => panic!("expected int buffer"),
        }
    }

    #[test]
    fn float32_virtual_reads_as_amplitude() {
        let stored = AudioFormat::pcm(44100.0, 1, 16);
        let mut virtual_format = stored.clone();
        virtual_format.sample_format = SampleFormat::Float32;
        virtual_format.sample_width = 32;

        let pipeline = Pipeline::new(stored, virtual_format);
        let raw = 16384i16.to_be_bytes(); // 0.5 full-scale (approximately)
        let decoded = pipeline.decode_frames(&raw, 1);
        match decoded {
            SampleBuffer::Float(v) => assert!((v[0] - 0.5).abs() < 0.01),
            _ => panic!("expected float buffer"),
        }
    }

    #[test]
    fn int_width_expansion_is_bit_shift_not_amplitude_rescale() {
        let stored = AudioFormat::pcm(44100.0, 1, 16);
        let virtual_format = AudioFormat::pcm(44100.0, 1, 24);

        let pipeline = Pipeline::new(stored, virtual_format);
        assert!(pipeline.stage_names().contains(&"width"));
        assert!(!pipeline.stage_names().contains(&"int/float"));

        let raw = (-32768i16).to_be_bytes();
        let decoded = pipeline.decode_frames(&raw, 1);
        match decoded {
            SampleBuffer::Int(v) => {
                assert_eq!(v[0], -8388608);
                assert!((-(1i64 << 23)..(1i64 << 23)).contains(&v[0]));
            }
            _ => panic!("expected int buffer"),
        }
    }

    #[test]
    fn int_width_expansion_matches_shift_for_nonextreme_value() {
        let stored = AudioFormat::pcm(44100.0, 1, 16);
        let virtual_format = AudioFormat::pcm(44100.0, 1, 24);
        let pipeline = Pipeline::new(stored, virtual_format);

        let raw = 1000i16.to_be_bytes();
        let decoded = pipeline.decode_frames(&raw, 1);
        match decoded {
            SampleBuffer::Int(v) => assert_eq!(v[0], 256000),
            _ => panic!("expected int buffer"),
        }
    }

    #[test]
    fn int_width_narrowing_round_trips_through_encode() {
        let stored = AudioFormat::pcm(44100.0, 1, 24);
        let virtual_format = AudioFormat::pcm(44100.0, 1, 16);
        let pipeline = Pipeline::new(stored, virtual_format);

        let samples = SampleBuffer::Int(vec![1000, -1000]);
        let raw = pipeline.encode_frames(&samples, 2);
        let decoded = pipeline.decode_frames(&raw, 2);
        assert_eq!(decoded, samples);
    }
}
