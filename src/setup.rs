// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The write-path file-setup validator (component E, spec §4.4).

use crate::chunks::framer::FormType;
use crate::format::{AudioFormat, ByteOrder, CompressionType, SampleFormat};
use crate::instrument::Instrument;
use crate::error::{validation_error, ErrorKind, Result};
use crate::track::{Marker, MiscKind, Miscellaneous};

/// A caller-assembled description of the file to write, before validation (spec §4.4).
#[derive(Debug, Clone)]
pub struct FileSetup {
    pub form_type: FormType,
    pub format: AudioFormat,
    pub track_count: Option<u32>,
    pub markers: Vec<Marker>,
    pub instruments: Vec<Instrument>,
    pub miscellaneous: Vec<Miscellaneous>,
    pub aes_data: Option<[u8; 24]>,
}

impl FileSetup {
    pub fn new(form_type: FormType, format: AudioFormat) -> Self {
        FileSetup {
            form_type,
            format,
            track_count: None,
            markers: Vec::new(),
            instruments: Vec::new(),
            miscellaneous: Vec::new(),
            aes_data: None,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    pub fn with_miscellaneous(mut self, misc: Miscellaneous) -> Self {
        self.miscellaneous.push(misc);
        self
    }
}

/// A setup that has passed every rule in spec §4.4, merged with its format's defaults.
#[derive(Debug, Clone)]
pub struct CanonicalSetup {
    pub form_type: FormType,
    pub format: AudioFormat,
    pub markers: Vec<Marker>,
    pub instrument: Option<Instrument>,
    pub miscellaneous: Vec<Miscellaneous>,
    pub aes_data: Option<[u8; 24]>,
}

/// Run all 8 setup rules from spec §4.4 and return the canonical, defaulted setup.
///
/// A caller-supplied little-endian byte order on a ≥9-bit two's-complement setup is not
/// fatal: `BAD_BYTEORDER` is reported but the setup proceeds coerced to big-endian, matching
/// `completeSetup`'s leniency in the original implementation.
pub fn validate(setup: &FileSetup) -> Result<CanonicalSetup> {
    if let Some(count) = setup.track_count {
        if count != 1 {
            return validation_error(ErrorKind::BadNumTracks, format!("track count must be 1, got {count}"));
        }
    }

    if setup.format.sample_format == SampleFormat::Unsigned {
        return validation_error(ErrorKind::BadFileFmt, "unsigned sample format is not supported");
    }

    if setup.form_type == FormType::Aiff && setup.format.sample_format != SampleFormat::TwosComplement {
        return validation_error(ErrorKind::BadFileFmt, "AIFF permits only two's-complement samples; use AIFF-C for float");
    }

    let mut format = setup.format.clone();

    if format.sample_format == SampleFormat::TwosComplement && !(1..=32).contains(&format.sample_width) {
        return validation_error(ErrorKind::BadWidth, format!("sample width {} out of range 1..32", format.sample_width));
    }

    if setup.form_type == FormType::Aiff && format.compression_type != CompressionType::None {
        return validation_error(ErrorKind::BadFileSetup, "AIFF does not support compression; use AIFF-C");
    }

    if format.byte_order == ByteOrder::Little && format.sample_width >= 9 {
        crate::error::report(ErrorKind::BadByteOrder, "little-endian byte order coerced to big-endian for this sample width");
        format.byte_order = ByteOrder::Big;
    }

    if setup.instruments.len() > 1 {
        return validation_error(ErrorKind::BadNumInsts, format!("instrument count must be 0 or 1, got {}", setup.instruments.len()));
    }

    let instrument = setup.instruments.first().cloned();
    if instrument.is_some() {
        // Exactly two loops (sustain, release) is a compile-time invariant of `Instrument`;
        // this rule only has force when a future writer constructs setups from raw counts.
        let loop_count = 2;
        if loop_count != 2 {
            return validation_error(ErrorKind::BadNumLoops, "instrument loop count must be 2");
        }
    }

    for misc in &setup.miscellaneous {
        if MiscKind::from_tag(&misc.kind.tag()).is_none() {
            return validation_error(ErrorKind::BadMiscType, "miscellaneous kind is not in the enumerated set");
        }
    }

    Ok(CanonicalSetup {
        form_type: setup.form_type,
        format,
        markers: setup.markers.clone(),
        instrument,
        miscellaneous: setup.miscellaneous.clone(),
        aes_data: setup.aes_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsigned_format() {
        let mut format = AudioFormat::pcm(44100.0, 1, 16);
        format.sample_format = SampleFormat::Unsigned;
        let setup = FileSetup::new(FormType::Aiff, format);
        assert!(matches!(validate(&setup), Err(crate::error::Error::Validation(ErrorKind::BadFileFmt, _))));
    }

    #[test]
    fn aiff_rejects_compression() {
        let mut format = AudioFormat::pcm(44100.0, 1, 16);
        format.compression_type = CompressionType::G711MuLaw;
        let setup = FileSetup::new(FormType::Aiff, format);
        assert!(matches!(validate(&setup), Err(crate::error::Error::Validation(ErrorKind::BadFileSetup, _))));
    }

    #[test]
    fn aiffc_allows_mulaw_compression() {
        let mut format = AudioFormat::pcm(8000.0, 1, 8);
        format.compression_type = CompressionType::G711MuLaw;
        format.normalize();
        let setup = FileSetup::new(FormType::AiffC, format);
        assert!(validate(&setup).is_ok());
    }

    #[test]
    fn little_endian_wide_sample_is_coerced_not_fatal() {
        let mut format = AudioFormat::pcm(44100.0, 1, 16);
        format.byte_order = ByteOrder::Little;
        let setup = FileSetup::new(FormType::Aiff, format);
        let canonical = validate(&setup).unwrap();
        assert_eq!(canonical.format.byte_order, ByteOrder::Big);
    }

    #[test]
    fn track_count_other_than_one_is_rejected() {
        let format = AudioFormat::pcm(44100.0, 1, 16);
        let mut setup = FileSetup::new(FormType::Aiff, format);
        setup.track_count = Some(2);
        assert!(matches!(validate(&setup), Err(crate::error::Error::Validation(ErrorKind::BadNumTracks, _))));
    }

    #[test]
    fn width_out_of_range_is_rejected() {
        let format = AudioFormat::pcm(44100.0, 1, 40);
        let setup = FileSetup::new(FormType::Aiff, format);
        assert!(matches!(validate(&setup), Err(crate::error::Error::Validation(ErrorKind::BadWidth, _))));
    }
}
