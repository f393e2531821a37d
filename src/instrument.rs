// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instrument metadata: always exactly two loops, nine typed parameters (spec §3, §6).

/// Which of the two fixed loops a `Loop` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopId {
    Sustain = 1,
    Release = 2,
}

/// A loop's play mode and marker endpoints, as stored in `INST` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loop {
    pub id: LoopId,
    pub mode: u16,
    pub begin_marker: u16,
    pub end_marker: u16,
}

/// The nine typed instrument parameters (spec §6), each with a default and a valid range
/// enforced by `Instrument::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub base_note: i64,
    pub detune: i64,
    pub low_velocity: i64,
    pub high_velocity: i64,
    pub low_note: i64,
    pub high_note: i64,
    pub gain: i64,
    pub sustain_loop: Loop,
    pub release_loop: Loop,
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument {
            base_note: 60,
            detune: 0,
            low_velocity: 1,
            high_velocity: 127,
            low_note: 0,
            high_note: 127,
            gain: 0,
            sustain_loop: Loop { id: LoopId::Sustain, mode: 0, begin_marker: 0, end_marker: 0 },
            release_loop: Loop { id: LoopId::Release, mode: 0, begin_marker: 0, end_marker: 0 },
        }
    }
}

/// A single out-of-range parameter found by `Instrument::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentParamError {
    BaseNote(i64),
    Detune(i64),
    LowVelocity(i64),
    HighVelocity(i64),
    LowNote(i64),
    HighNote(i64),
}

impl Instrument {
    /// Domain-range checks on MIDI note/velocity/detune values (component H, spec §6).
    /// Gain and the loop ids are unconstrained, matching `isInstrumentParameterValid`.
    pub fn validate(&self) -> Result<(), InstrumentParamError> {
        if !(0..=127).contains(&self.base_note) {
            return Err(InstrumentParamError::BaseNote(self.base_note));
        }
        if !(-50..=50).contains(&self.detune) {
            return Err(InstrumentParamError::Detune(self.detune));
        }
        if !(1..=127).contains(&self.low_velocity) {
            return Err(InstrumentParamError::LowVelocity(self.low_velocity));
        }
        if !(1..=127).contains(&self.high_velocity) {
            return Err(InstrumentParamError::HighVelocity(self.high_velocity));
        }
        if !(0..=127).contains(&self.low_note) {
            return Err(InstrumentParamError::LowNote(self.low_note));
        }
        if !(0..=127).contains(&self.high_note) {
            return Err(InstrumentParamError::HighNote(self.high_note));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instrument_is_valid() {
        assert!(Instrument::default().validate().is_ok());
    }

    #[test]
    fn detune_out_of_range_is_rejected() {
        let inst = Instrument { detune: 51, ..Instrument::default() };
        assert_eq!(inst.validate(), Err(InstrumentParamError::Detune(51)));
    }

    #[test]
    fn gain_is_unconstrained() {
        let inst = Instrument { gain: i64::MIN, ..Instrument::default() };
        assert!(inst.validate().is_ok());
    }
}
