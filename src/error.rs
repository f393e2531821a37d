// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and the process-wide error reporter.

use std::fmt;
use std::io;
use std::sync::OnceLock;

/// The taxonomy of named error conditions the container and setup layers can raise.
///
/// These correspond one-to-one with the error identifiers a caller would recognize from
/// the on-wire format's historical C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadAiffSsnd,
    BadAiffComm,
    NotImplemented,
    BadNumTracks,
    BadFileFmt,
    BadWidth,
    BadByteOrder,
    BadNumInsts,
    BadNumLoops,
    BadMiscType,
    BadFileSetup,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadAiffSsnd => "BAD_AIFF_SSND",
            ErrorKind::BadAiffComm => "BAD_AIFF_COMM",
            ErrorKind::NotImplemented => "BAD_NOT_IMPLEMENTED",
            ErrorKind::BadNumTracks => "BAD_NUMTRACKS",
            ErrorKind::BadFileFmt => "BAD_FILEFMT",
            ErrorKind::BadWidth => "BAD_WIDTH",
            ErrorKind::BadByteOrder => "BAD_BYTEORDER",
            ErrorKind::BadNumInsts => "BAD_NUMINSTS",
            ErrorKind::BadNumLoops => "BAD_NUMLOOPS",
            ErrorKind::BadMiscType => "BAD_MISCTYPE",
            ErrorKind::BadFileSetup => "BAD_FILESETUP",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Error` enumerates all possible failures raised while parsing, validating, or writing
/// an AIFF/AIFF-C file.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred on the underlying byte stream.
    Io(io::Error),
    /// The stream contained malformed or self-inconsistent data.
    Decode(String),
    /// A recognized but unsupported feature was encountered (e.g. Apple ACE/MAC compression).
    Unsupported(String),
    /// A caller-supplied write configuration violated a per-format rule.
    Validation(ErrorKind, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Decode(msg) => write!(f, "malformed stream: {msg}"),
            Error::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Error::Validation(kind, msg) => write!(f, "{kind}: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Report a generic framing/malformed-data error and return it as a `Result`. Not tied to
/// any single named `ErrorKind`; logged through the default sink rather than the reporter,
/// since it carries no caller-recognizable identifier (see `bad_comm_error`/`bad_ssnd_error`
/// for the two chunks whose failures do carry one, per spec §7).
pub fn decode_error<T>(msg: impl Into<String>) -> Result<T> {
    let msg = msg.into();
    log::error!("{msg}");
    Err(Error::Decode(msg))
}

/// Report a malformed/missing `COMM` error (spec §7, `BAD_AIFF_COMM`) and return it.
pub fn bad_comm_error<T>(msg: impl Into<String>) -> Result<T> {
    let msg = msg.into();
    report(ErrorKind::BadAiffComm, &msg);
    Err(Error::Decode(msg))
}

/// Report a fatal `SSND`-duplication error (spec §4.1) and return it as a `Result`.
pub fn bad_ssnd_error<T>(msg: impl Into<String>) -> Result<T> {
    let msg = msg.into();
    report(ErrorKind::BadAiffSsnd, &msg);
    Err(Error::Decode(msg))
}

/// Report an unsupported-feature error and return it as a `Result`.
pub fn unsupported_error<T>(msg: impl Into<String>) -> Result<T> {
    let msg = msg.into();
    report(ErrorKind::NotImplemented, &msg);
    Err(Error::Unsupported(msg))
}

/// Report a write-setup validation error and return it as a `Result`.
pub fn validation_error<T>(kind: ErrorKind, msg: impl Into<String>) -> Result<T> {
    let msg = msg.into();
    report(kind, &msg);
    Err(Error::Validation(kind, msg))
}

type ReporterFn = dyn Fn(ErrorKind, &str) + Send + Sync;

static REPORTER: OnceLock<Box<ReporterFn>> = OnceLock::new();

/// Install a process-wide error reporter. Must be called before the first reported error;
/// subsequent calls are ignored, matching the once-only semantics of a process-wide sink.
pub fn set_error_reporter<F>(reporter: F)
where
    F: Fn(ErrorKind, &str) + Send + Sync + 'static,
{
    let _ = REPORTER.set(Box::new(reporter));
}

/// Report an error condition through the installed sink, or the default `log::error!` sink
/// if none was installed.
pub fn report(kind: ErrorKind, msg: &str) {
    match REPORTER.get() {
        Some(f) => f(kind, msg),
        None => log::error!("{kind}: {msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_names_match_historical_identifiers() {
        assert_eq!(ErrorKind::BadAiffSsnd.as_str(), "BAD_AIFF_SSND");
        assert_eq!(ErrorKind::BadFileSetup.as_str(), "BAD_FILESETUP");
    }

    #[test]
    fn decode_error_round_trips_message() {
        let err: Result<()> = decode_error("aiff: bad chunk");
        assert_eq!(err.unwrap_err().to_string(), "malformed stream: aiff: bad chunk");
    }
}
