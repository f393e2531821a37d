// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single per-file `Track`: parsed metadata, I/O cursors, data-region bounds
//! (spec §3). AIFF permits exactly one track (Non-goal: no multi-track).

use crate::format::AudioFormat;
use crate::instrument::Instrument;

/// `{id, position, name, comment}` as read from `MARK` (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: u16,
    pub position: u32,
    pub name: String,
    pub comment: String,
}

/// Which kind of text a miscellaneous chunk carries (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscKind {
    Name,
    Author,
    Copyright,
    Annotation,
    Application,
    Midi,
}

impl MiscKind {
    pub fn tag(self) -> [u8; 4] {
        match self {
            MiscKind::Name => *b"NAME",
            MiscKind::Author => *b"AUTH",
            MiscKind::Copyright => *b"(c) ",
            MiscKind::Annotation => *b"ANNO",
            MiscKind::Application => *b"APPL",
            MiscKind::Midi => *b"MIDI",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"NAME" => Some(MiscKind::Name),
            b"AUTH" => Some(MiscKind::Author),
            b"(c) " => Some(MiscKind::Copyright),
            b"ANNO" => Some(MiscKind::Annotation),
            b"APPL" => Some(MiscKind::Application),
            b"MIDI" => Some(MiscKind::Midi),
            _ => None,
        }
    }
}

/// A typed miscellaneous blob; `id` is assigned in 1-based insertion order (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Miscellaneous {
    pub id: u32,
    pub kind: MiscKind,
    pub buffer: Vec<u8>,
}

/// Exactly one per AIFF file: the stored and virtual formats, cursor state, the data
/// region, and optional markers/instrument/AES data/miscellaneous (spec §3).
#[derive(Debug, Clone)]
pub struct Track {
    /// The format as stored on disk.
    pub file_format: AudioFormat,
    /// The format the caller reads/writes; bridged to `file_format` by the conversion
    /// pipeline (spec §4.3).
    pub virtual_format: AudioFormat,

    pub total_frames: u64,
    pub total_virtual_frames: u64,

    pub next_frame: u64,
    pub next_file_pos: u64,
    pub frames_to_ignore: u64,

    pub first_frame_pos: u64,
    pub data_size_bytes: u64,
    pub after_data_pos: u64,

    pub markers: Vec<Marker>,
    pub instrument: Option<Instrument>,
    pub aes_data: Option<[u8; 24]>,
    pub miscellaneous: Vec<Miscellaneous>,

    /// Raw FVER timestamp, if the file carried one (AIFF-C only). Recorded but not
    /// validated against `AIFC_VERSION_1` on read (see DESIGN.md Open Questions).
    pub format_version: Option<u32>,
}

impl Track {
    pub fn new(file_format: AudioFormat) -> Self {
        let virtual_format = file_format.clone();
        Track {
            file_format,
            virtual_format,
            total_frames: 0,
            total_virtual_frames: 0,
            next_frame: 0,
            next_file_pos: 0,
            frames_to_ignore: 0,
            first_frame_pos: 0,
            data_size_bytes: 0,
            after_data_pos: 0,
            markers: Vec::new(),
            instrument: None,
            aes_data: None,
            miscellaneous: Vec::new(),
            format_version: None,
        }
    }

    /// The next 1-based miscellaneous id to assign (spec §3: "id is 1-based assignment
    /// order").
    pub fn next_misc_id(&self) -> u32 {
        self.miscellaneous.len() as u32 + 1
    }
}
