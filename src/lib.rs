// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pure Rust reader and writer for AIFF and AIFF-C sound files.
//!
//! Opens a stream for reading (`AiffFile::open_read`) or writing (`AiffFile::create` from a
//! validated [`setup::FileSetup`]), and moves frames between the file's stored format and a
//! caller-chosen virtual format through [`pipeline::Pipeline`]. A single track per file, no
//! resampling or mixing: see each module's doc comment for exactly what it covers.

pub mod chunks;
pub mod error;
pub mod file;
pub mod format;
pub mod instrument;
pub mod io;
pub mod pipeline;
pub mod setup;
pub mod track;

pub use chunks::aiff::AIFC_VERSION_1;
pub use chunks::framer::FormType;
pub use error::{set_error_reporter, Error, ErrorKind, Result};
pub use file::AiffFile;
pub use format::{AudioFormat, ByteOrder, CompressionType, SampleFormat};
pub use instrument::{Instrument, Loop, LoopId};
pub use pipeline::{Pipeline, SampleBuffer};
pub use setup::{validate, CanonicalSetup, FileSetup};
pub use track::{Marker, MiscKind, Miscellaneous, Track};
