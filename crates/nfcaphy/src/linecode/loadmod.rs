//! Manchester load modulation (card to reader)
//!
//! The card answers by switching its load at a subcarrier of
//! fc/16. In a logic analyzer capture, each modulated half bit
//! appears as a burst of about eight transitions. Each bit
//! period holds one of three sequences:
//!
//! | sequence | modulated half |
//! |----------|----------------|
//! | D        | first          |
//! | E        | second         |
//! | F        | neither        |
//!
//! D is a one and E is a zero. A frame begins with D and ends
//! with F.

#[cfg(not(test))]
use log::trace;

#[cfg(test)]
use std::println as trace;

use super::{LineCode, Step};
use crate::cursor::{BitLevel, EndOfInput, SampleCursor};
use crate::output::Direction;
use crate::waveform::BitTiming;

/// Fewest transitions in a modulated half bit
const MODULATED_MIN_TRANSITIONS: u32 = 6;

/// Most transitions in a modulated half bit
const MODULATED_MAX_TRANSITIONS: u32 = 9;

/// Most transitions in an unmodulated half bit
const UNMODULATED_MAX_TRANSITIONS: u32 = 2;

/// Load modulation sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::AsRefStr)]
pub enum LoadmodSeq {
    /// First half modulated (code `0b10`)
    D,

    /// Second half modulated (code `0b01`)
    E,

    /// No modulation (code `0b00`)
    F,

    /// Not a valid sequence
    #[strum(serialize = "ERR")]
    Error,
}

impl LoadmodSeq {
    /// Symbol from a two-bit code
    ///
    /// The high bit is the first half. Modulation in both halves
    /// (`0b11`) is an error.
    pub fn from_code(code: u8) -> Self {
        match code {
            0b10 => LoadmodSeq::D,
            0b01 => LoadmodSeq::E,
            0b00 => LoadmodSeq::F,
            _ => LoadmodSeq::Error,
        }
    }

    /// Two-bit code
    ///
    /// Errors return the out-of-band code `0b100`.
    pub fn code(&self) -> u8 {
        match self {
            LoadmodSeq::D => 0b10,
            LoadmodSeq::E => 0b01,
            LoadmodSeq::F => 0b00,
            LoadmodSeq::Error => 0b100,
        }
    }
}

/// Classification of one half bit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HalfBit {
    /// Subcarrier present
    Modulated,

    /// Subcarrier absent and channel idle
    Unmodulated,

    /// Neither
    Ambiguous,
}

/// Classify a half bit
///
/// `transitions` is the number of transitions seen in the half
/// bit, and `level` is the channel level at its midpoint.
pub fn classify_half(transitions: u32, level: BitLevel, idle: BitLevel) -> HalfBit {
    if (MODULATED_MIN_TRANSITIONS..=MODULATED_MAX_TRANSITIONS).contains(&transitions) {
        HalfBit::Modulated
    } else if level == idle && transitions <= UNMODULATED_MAX_TRANSITIONS {
        HalfBit::Unmodulated
    } else {
        HalfBit::Ambiguous
    }
}

/// Manchester load modulation line code
#[derive(Clone, Debug, PartialEq)]
pub struct Loadmod {
    timing: BitTiming,
    idle: BitLevel,
}

impl Loadmod {
    // sample the half bit which begins at `offset` (0 or 1/2)
    fn receive_half<C>(&self, cursor: &mut C, seq_start: u64, offset: f64) -> Result<HalfBit, EndOfInput>
    where
        C: SampleCursor + ?Sized,
    {
        let quarter = self.timing.at(seq_start, offset + 0.25);
        let end = self.timing.at(seq_start, offset + 0.5);

        let mut transitions = cursor.advance_to(quarter)?;
        let level = cursor.bit_level();
        transitions += cursor.advance_to(end)?;
        Ok(classify_half(transitions, level, self.idle))
    }
}

impl LineCode for Loadmod {
    type Seq = LoadmodSeq;
    type State = ();

    const DIRECTION: Direction = Direction::CardToReader;
    const START_OF_COMMUNICATION: LoadmodSeq = LoadmodSeq::D;
    const EOC_HOLDBACK: usize = 0;

    fn new(timing: BitTiming, idle: BitLevel) -> Self {
        Self { timing, idle }
    }

    fn timing(&self) -> &BitTiming {
        &self.timing
    }

    fn idle_level(&self) -> BitLevel {
        self.idle
    }

    fn receive_seq<C>(&self, cursor: &mut C, seq_start: u64) -> Result<LoadmodSeq, EndOfInput>
    where
        C: SampleCursor + ?Sized,
    {
        let first = self.receive_half(cursor, seq_start, 0.0)?;
        let second = self.receive_half(cursor, seq_start, 0.5)?;

        let seq = match (first, second) {
            (HalfBit::Ambiguous, _) | (_, HalfBit::Ambiguous) => LoadmodSeq::Error,
            (first, second) => LoadmodSeq::from_code(
                (((first == HalfBit::Modulated) as u8) << 1) | (second == HalfBit::Modulated) as u8,
            ),
        };

        trace!("loadmod: {} at {}", seq.as_ref(), seq_start);
        Ok(seq)
    }

    fn initial_state() {}

    fn step(_state: &mut (), seq: LoadmodSeq) -> Step {
        match seq {
            LoadmodSeq::D => Step::Data(true),
            LoadmodSeq::E => Step::Data(false),
            LoadmodSeq::F => Step::EndOfCommunication,
            LoadmodSeq::Error => Step::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::waveform::SyntheticCapture;

    use BitLevel::{High, Low};

    #[test]
    fn test_classify_half() {
        assert_eq!(classify_half(7, High, Low), HalfBit::Modulated);
        assert_eq!(classify_half(8, Low, Low), HalfBit::Modulated);
        assert_eq!(classify_half(1, Low, Low), HalfBit::Unmodulated);
        assert_eq!(classify_half(0, Low, Low), HalfBit::Unmodulated);
        assert_eq!(classify_half(4, Low, Low), HalfBit::Ambiguous);
        assert_eq!(classify_half(10, Low, Low), HalfBit::Ambiguous);

        // quiet, but stuck away from idle
        assert_eq!(classify_half(1, High, Low), HalfBit::Ambiguous);
    }

    #[test]
    fn test_codes() {
        for seq in [LoadmodSeq::D, LoadmodSeq::E, LoadmodSeq::F] {
            assert_eq!(LoadmodSeq::from_code(seq.code()), seq);
        }
        assert_eq!(LoadmodSeq::from_code(0b11), LoadmodSeq::Error);
    }

    #[test]
    fn test_step() {
        assert_eq!(Loadmod::step(&mut (), LoadmodSeq::D), Step::Data(true));
        assert_eq!(Loadmod::step(&mut (), LoadmodSeq::E), Step::Data(false));
        assert_eq!(
            Loadmod::step(&mut (), LoadmodSeq::F),
            Step::EndOfCommunication
        );
        assert_eq!(Loadmod::step(&mut (), LoadmodSeq::Error), Step::Invalid);
    }

    #[test]
    fn test_receive_seq() {
        use LoadmodSeq::{Error, D, E, F};

        let expect = [D, E, E, D, D, Error, F, F];
        for rate in [108_480_000, 50_000_000] {
            for idle in [Low, High] {
                let mut capture = SyntheticCapture::new(rate, idle);
                capture.idle_bits(2.0).loadmod(&expect).idle_bits(2.0);
                let mut cursor = capture.build();

                let loadmod = Loadmod::new(BitTiming::new(rate), idle);
                let timing = *loadmod.timing();
                let base = timing.seq_start(0, 2);

                let got: Vec<LoadmodSeq> = (0..expect.len())
                    .map(|i| {
                        loadmod
                            .receive_seq(&mut cursor, timing.seq_start(base, i as u32))
                            .expect("in range")
                    })
                    .collect();
                assert_eq!(&got, &expect);
            }
        }
    }
}
