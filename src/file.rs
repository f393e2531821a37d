// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `AiffFile`: the per-file handle tying the chunk framer, chunk handlers, track model,
//! and conversion pipeline together (component F, spec §3, §4.5).

use std::io::{Read, Seek, SeekFrom, Write};

use crate::chunks::aiff::{
    self, parse_aesd, parse_comm, parse_fver, parse_inst, parse_mark, parse_misc, parse_ssnd, reject_duplicate_ssnd,
    write_aesd, write_comm, write_fver, write_inst, write_mark, write_misc, write_ssnd_header, AIFC_VERSION_1,
};
use crate::chunks::framer::{self, finish_chunk, read_form_header, ChunksIter, FormType, ReservedHeader};
use crate::error::{bad_comm_error, decode_error, Result};
use crate::format::AudioFormat;
use crate::io::ByteStream;
use crate::pipeline::{Pipeline, SampleBuffer};
use crate::setup::CanonicalSetup;
use crate::track::{MiscKind, Track};

/// State only present while a handle is open for writing: byte offsets recorded for
/// back-patching at `close` (spec §4.1 write protocol, Design Notes back-patching).
struct WriteState {
    form_reserved: ReservedHeader,
    comm_frames_pos: u64,
    ssnd_reserved: ReservedHeader,
}

/// A single-track AIFF/AIFF-C handle. Read and write are both supported over the same
/// `S: Read + Write + Seek` byte stream, unlike the read-only demuxer this crate's chunk
/// framing idiom is grounded on.
pub struct AiffFile<S> {
    form_type: FormType,
    track: Track,
    stream: ByteStream<S>,
    write_state: Option<WriteState>,
    pipeline: Option<Pipeline>,
}

impl<S> AiffFile<S> {
    pub fn form_type(&self) -> FormType {
        self.form_type
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }

    /// Change the format the caller reads/writes frames in; invalidates the cached pipeline
    /// so the next frame operation rebuilds it against the new virtual format.
    pub fn set_virtual_format(&mut self, format: AudioFormat) {
        self.track.virtual_format = format;
        self.pipeline = None;
    }

    fn pipeline(&mut self) -> &Pipeline {
        if self.pipeline.is_none() {
            self.pipeline = Some(Pipeline::new(self.track.file_format.clone(), self.track.virtual_format.clone()));
        }
        self.pipeline.as_ref().unwrap()
    }
}

impl<S: Read + Seek> AiffFile<S> {
    /// Open an existing AIFF/AIFF-C stream for reading: parse the header, dispatch every
    /// chunk, and build the `Track` (spec §4.1, §4.2).
    pub fn open_read(inner: S) -> Result<Self> {
        let mut stream = ByteStream::new(inner);
        let (form_type, form_len) = read_form_header(&mut stream)?;
        let mut iter = ChunksIter::new(stream.tell()?, form_len - 4);

        let mut file_format: Option<AudioFormat> = None;
        let mut n_sample_frames: u32 = 0;
        let mut ssnd: Option<aiff::SoundChunk> = None;
        let mut track = Track::new(AudioFormat::pcm(0.0, 1, 8));
        let mut format_version = None;
        let mut saw_comm = false;

        while let Some(header) = iter.next_header(&mut stream)? {
            let payload_start = stream.tell()?;

            match header.tag {
                aiff::COMM_TAG => {
                    let comm = parse_comm(&mut stream, form_type)?;
                    file_format = Some(comm.format);
                    n_sample_frames = comm.n_sample_frames;
                    saw_comm = true;
                }
                aiff::SSND_TAG => {
                    if ssnd.is_some() {
                        return reject_duplicate_ssnd();
                    }
                    ssnd = Some(parse_ssnd(&mut stream, header.len)?);
                }
                aiff::FVER_TAG => {
                    format_version = Some(parse_fver(&mut stream)?);
                }
                aiff::MARK_TAG => {
                    track.markers = parse_mark(&mut stream)?;
                }
                aiff::INST_TAG => {
                    track.instrument = Some(parse_inst(&mut stream)?);
                }
                aiff::AESD_TAG => {
                    track.aes_data = Some(parse_aesd(&mut stream)?);
                }
                other => {
                    if let Some(kind) = MiscKind::from_tag(&other) {
                        let id = track.next_misc_id();
                        if let Some(misc) = parse_misc(&mut stream, kind, header.len, id)? {
                            track.miscellaneous.push(misc);
                        }
                    }
                    else {
                        iter.skip(&mut stream, &header)?;
                    }
                }
            }

            // Advance to the declared end of this chunk's payload regardless of how many
            // bytes the handler actually consumed (spec §4.1 read protocol).
            stream.seek(SeekFrom::Start(payload_start + u64::from(header.len)))?;
        }

        if !saw_comm {
            return bad_comm_error("aiff: file has no COMM chunk");
        }
        let file_format = file_format.unwrap();

        let ssnd = match ssnd {
            Some(s) => s,
            None => return decode_error("aiff: file has no SSND chunk"),
        };

        let frame_size = file_format.stored_frame_size() as u64;
        let frames_by_size = ssnd.data_size_bytes.checked_div(frame_size).unwrap_or(0);
        let total_frames = u64::from(n_sample_frames).min(frames_by_size);

        track.virtual_format = file_format.clone();
        track.file_format = file_format;
        track.total_frames = total_frames;
        track.total_virtual_frames = total_frames;
        track.first_frame_pos = ssnd.data_start_pos;
        track.data_size_bytes = ssnd.data_size_bytes;
        track.after_data_pos = ssnd.data_start_pos + ssnd.data_size_bytes;
        track.format_version = format_version;

        Ok(AiffFile { form_type, track, stream, write_state: None, pipeline: None })
    }

    /// Read up to `n_frames` frames in the current virtual format. Returns fewer than
    /// requested at end of data (spec §4.3 cursor semantics).
    pub fn read_frames(&mut self, n_frames: u64) -> Result<SampleBuffer> {
        let remaining = self.track.total_frames - self.track.next_frame;
        let n = n_frames.min(remaining);

        if n == 0 {
            return Ok(match self.track.virtual_format.sample_format {
                crate::format::SampleFormat::Float32 | crate::format::SampleFormat::Float64 => SampleBuffer::Float(Vec::new()),
                _ => SampleBuffer::Int(Vec::new()),
            });
        }

        let frame_size = self.track.file_format.stored_frame_size() as u64;
        let offset = self.track.first_frame_pos + self.track.next_frame * frame_size;
        self.stream.seek(SeekFrom::Start(offset))?;

        let raw = self.stream.read_boxed_slice_exact((n * frame_size) as usize)?;
        let buffer = self.pipeline().decode_frames(&raw, n);

        self.track.next_frame += n;
        Ok(buffer)
    }

    /// Seek the frame cursor to `frame_index` (virtual and file frame counts are 1:1,
    /// spec §4.3).
    pub fn seek_frame(&mut self, frame_index: u64) -> Result<()> {
        self.track.next_frame = frame_index.min(self.track.total_frames);
        Ok(())
    }
}

impl<S: Read + Seek> AiffFile<S> {
    /// Recognize a `FORM`/`AIFF` header without fully opening (spec §4.5).
    pub fn recognize_aiff(inner: &mut S) -> Result<bool> {
        let mut stream = ByteStream::new(&mut *inner);
        framer::recognize_aiff(&mut stream)
    }

    /// Recognize a `FORM`/`AIFC` header without fully opening (spec §4.5).
    pub fn recognize_aiffc(inner: &mut S) -> Result<bool> {
        let mut stream = ByteStream::new(&mut *inner);
        framer::recognize_aiffc(&mut stream)
    }
}

impl<S: Write + Seek> AiffFile<S> {
    /// Open a fresh stream for writing from a validated setup: reserves the `FORM`, `COMM`,
    /// and `SSND` headers and writes any markers/instrument/AES/miscellaneous chunks that
    /// are fully known up front (spec §4.1 write protocol, §4.4).
    pub fn create(inner: S, setup: &CanonicalSetup) -> Result<Self> {
        let mut stream = ByteStream::new(inner);

        let form_reserved = framer::write_chunk_header(&mut stream, &framer::FORM_MARKER)?;
        stream.write_quad_bytes(&setup.form_type.tag())?;

        if setup.form_type == FormType::AiffC {
            write_fver(&mut stream)?;
        }

        let comm_reserved = write_comm(&mut stream, setup.form_type, &setup.format, 0)?;
        let comm_frames_pos = comm_reserved.payload_start + 2;

        if !setup.markers.is_empty() {
            write_mark(&mut stream, &setup.markers)?;
        }
        if let Some(instrument) = &setup.instrument {
            write_inst(&mut stream, instrument)?;
        }
        if let Some(aes_data) = &setup.aes_data {
            write_aesd(&mut stream, aes_data)?;
        }
        for misc in &setup.miscellaneous {
            write_misc(&mut stream, misc)?;
        }

        let ssnd_reserved = write_ssnd_header(&mut stream)?;

        let mut track = Track::new(setup.format.clone());
        track.markers = setup.markers.clone();
        track.instrument = setup.instrument;
        track.miscellaneous = setup.miscellaneous.clone();
        track.aes_data = setup.aes_data;
        if setup.form_type == FormType::AiffC {
            track.format_version = Some(AIFC_VERSION_1);
        }
        track.first_frame_pos = stream.tell()?;

        Ok(AiffFile {
            form_type: setup.form_type,
            track,
            stream,
            write_state: Some(WriteState { form_reserved, comm_frames_pos, ssnd_reserved }),
            pipeline: None,
        })
    }

    /// Append frames (in the current virtual format) to the data region.
    pub fn write_frames(&mut self, samples: &SampleBuffer) -> Result<u64> {
        let virtual_channels = self.track.virtual_format.channel_count as u64;
        let n_frames = samples.len() as u64 / virtual_channels.max(1);

        let raw = self.pipeline().encode_frames(samples, n_frames);
        self.stream.write_buf(&raw)?;

        self.track.total_frames += n_frames;
        self.track.next_frame += n_frames;
        Ok(n_frames)
    }

    /// Back-patch `SSND`'s size, `COMM`'s sample-frame count, and the outer `FORM` size,
    /// then return the underlying stream (spec §4.1, §3 lifecycle).
    pub fn close(mut self) -> Result<S> {
        let state = self.write_state.take().expect("close called on a read handle");

        finish_chunk(&mut self.stream, &state.ssnd_reserved)?;
        self.stream.patch_u32_at(state.comm_frames_pos, self.track.total_frames as u32)?;

        let end = self.stream.tell()?;
        let form_payload_len = end - state.form_reserved.payload_start;
        self.stream.patch_u32_at(state.form_reserved.header_pos + 4, form_payload_len as u32)?;

        Ok(self.stream.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::framer::FormType;
    use crate::format::CompressionType;
    use crate::setup::{validate, FileSetup};
    use std::io::Cursor;

    fn pcm_setup(form_type: FormType, sample_rate: f64, channels: u32, width: u32) -> CanonicalSetup {
        let format = AudioFormat::pcm(sample_rate, channels, width);
        validate(&FileSetup::new(form_type, format)).unwrap()
    }

    #[test]
    fn minimal_aiff_round_trip_zero_frames() {
        let setup = pcm_setup(FormType::Aiff, 44100.0, 1, 16);
        let file = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();
        let bytes = file.close().unwrap().into_inner();

        let mut reader = AiffFile::open_read(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.track().total_frames, 0);
        let buffer = reader.read_frames(1).unwrap();
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn write_then_read_back_pcm_is_byte_identical() {
        let setup = pcm_setup(FormType::Aiff, 44100.0, 1, 16);
        let mut writer = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();

        let samples = SampleBuffer::Int(vec![100, -100, 32767, -32768]);
        writer.write_frames(&samples).unwrap();
        let bytes = writer.close().unwrap().into_inner();

        let mut reader = AiffFile::open_read(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.track().total_frames, 4);
        let back = reader.read_frames(4).unwrap();
        assert_eq!(back, samples);
    }

    #[test]
    fn mu_law_write_then_read_back_with_matching_virtual_format_is_byte_identical() {
        // Virtual format == stored compander format, so this is the identity byte-copy path
        // (raw 8-bit codes moved verbatim); see `mu_law_write_then_read_back_through_companded_decode`
        // for the path that actually exercises compand/decompand.
        let mut format = AudioFormat::pcm(8000.0, 1, 8);
        format.compression_type = CompressionType::G711MuLaw;
        format.normalize();
        let setup = validate(&FileSetup::new(FormType::AiffC, format)).unwrap();

        let mut writer = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();
        writer.set_virtual_format(writer.track().file_format.clone());
        let samples = SampleBuffer::Int(vec![10, 20, 30]);
        writer.write_frames(&samples).unwrap();
        let bytes = writer.close().unwrap().into_inner();

        let mut reader = AiffFile::open_read(Cursor::new(bytes)).unwrap();
        reader.set_virtual_format(reader.track().file_format.clone());
        let back = reader.read_frames(3).unwrap();
        assert_eq!(back, samples);
    }

    /// Reads µ-law codes as a 16-bit two's-complement virtual format (so decode/encode
    /// actually run the companded path, not the identity byte-copy), and asserts the codes
    /// written back out are byte-identical to the input (spec §8 scenario 2:
    /// `compand(decompand(code)) == code`).
    #[test]
    fn mu_law_write_then_read_back_through_companded_decode_reproduces_input_codes() {
        let mut format = AudioFormat::pcm(8000.0, 1, 8);
        format.compression_type = CompressionType::G711MuLaw;
        format.normalize();
        let setup = validate(&FileSetup::new(FormType::AiffC, format)).unwrap();

        let input_codes: Vec<u8> = (0..=255).collect();

        let linear: Vec<i64> = input_codes.iter().map(|&code| i64::from(crate::pipeline::decompand_mu_law(code))).collect();

        let mut writer = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();
        writer.set_virtual_format(AudioFormat::pcm(8000.0, 1, 16));
        writer.write_frames(&SampleBuffer::Int(linear.clone())).unwrap();
        let bytes = writer.close().unwrap().into_inner();

        let ssnd_pos = bytes.windows(4).position(|w| w == b"SSND").unwrap();
        let data_start = ssnd_pos + 8 + 8;
        let written_codes = &bytes[data_start..data_start + input_codes.len()];
        assert_eq!(written_codes, input_codes.as_slice());

        let mut reader = AiffFile::open_read(Cursor::new(bytes)).unwrap();
        reader.set_virtual_format(AudioFormat::pcm(8000.0, 1, 16));
        let back = reader.read_frames(input_codes.len() as u64).unwrap();
        assert_eq!(back, SampleBuffer::Int(linear));
    }

    #[test]
    fn duplicate_ssnd_is_fatal() {
        let setup = pcm_setup(FormType::Aiff, 44100.0, 1, 16);
        let mut writer = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();
        writer.write_frames(&SampleBuffer::Int(vec![1, 2])).unwrap();
        let mut bytes = writer.close().unwrap().into_inner();

        // Duplicate the SSND chunk bytes and grow the FORM size to match.
        let ssnd_pos = bytes.windows(4).position(|w| w == b"SSND").unwrap();
        let ssnd_len = u32::from_be_bytes(bytes[ssnd_pos + 4..ssnd_pos + 8].try_into().unwrap()) as usize;
        let chunk_bytes = bytes[ssnd_pos..ssnd_pos + 8 + ssnd_len].to_vec();
        bytes.extend_from_slice(&chunk_bytes);
        let new_form_len = (bytes.len() - 8) as u32;
        bytes[4..8].copy_from_slice(&new_form_len.to_be_bytes());

        assert!(AiffFile::open_read(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn sample_rate_and_channels_round_trip_through_comm() {
        let setup = pcm_setup(FormType::Aiff, 48000.0, 2, 16);
        let file = AiffFile::create(Cursor::new(Vec::<u8>::new()), &setup).unwrap();
        let bytes = file.close().unwrap().into_inner();

        let reader = AiffFile::open_read(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.track().file_format.sample_rate, 48000.0);
        assert_eq!(reader.track().file_format.channel_count, 2);
    }
}
