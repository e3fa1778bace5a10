//! Modified Miller code (reader to card)
//!
//! The reader modulates its field with short 100% ASK *pauses*.
//! Each bit period holds one of three sequences:
//!
//! | sequence | pause               |
//! |----------|---------------------|
//! | X        | in the middle       |
//! | Y        | none                |
//! | Z        | at the start        |
//!
//! A one is always X. A zero is Y when it follows a one and Z
//! otherwise. The frame starts with Z and ends with a logic zero
//! followed by Y. A zero-Y pair is the only place two pause-free
//! halves can follow one another.
//!
//! We sample each bit period twice: at 1/6 and at 2/3 of the
//! bit. Each sample reports whether the channel is away from its
//! idle level. A pause which is truly present will be seen by
//! exactly one sample. More than one transition between samples
//! is a glitch.

#[cfg(not(test))]
use log::trace;

#[cfg(test)]
use std::println as trace;

use super::{LineCode, Step};
use crate::cursor::{BitLevel, EndOfInput, SampleCursor};
use crate::output::Direction;
use crate::waveform::BitTiming;

/// Modified Miller sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::AsRefStr)]
pub enum MillerSeq {
    /// Pause in the middle of the bit (code `0b01`)
    X,

    /// No pause (code `0b00`)
    Y,

    /// Pause at the start of the bit (code `0b10`)
    Z,

    /// Not a valid sequence
    #[strum(serialize = "ERR")]
    Error,
}

impl MillerSeq {
    /// Symbol from a two-bit sample code
    ///
    /// The high bit is the first sample. Pauses in both samples
    /// (`0b11`) are an error.
    pub fn from_code(code: u8) -> Self {
        match code {
            0b01 => MillerSeq::X,
            0b00 => MillerSeq::Y,
            0b10 => MillerSeq::Z,
            _ => MillerSeq::Error,
        }
    }

    /// Two-bit sample code
    ///
    /// Errors return the out-of-band code `0b100`.
    pub fn code(&self) -> u8 {
        match self {
            MillerSeq::X => 0b01,
            MillerSeq::Y => 0b00,
            MillerSeq::Z => 0b10,
            MillerSeq::Error => 0b100,
        }
    }

    // column in TRANSITIONS
    fn index(self) -> usize {
        match self {
            MillerSeq::X => 0,
            MillerSeq::Y => 1,
            MillerSeq::Z => 2,
            MillerSeq::Error => 3,
        }
    }
}

/// The most recent logical bit
///
/// The start of communication counts as a zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LastBit {
    /// Last bit was zero, or no bit yet
    Zero,

    /// Last bit was one
    One,
}

impl LastBit {
    // row in TRANSITIONS
    fn index(self) -> usize {
        match self {
            LastBit::Zero => 0,
            LastBit::One => 1,
        }
    }
}

impl From<bool> for LastBit {
    fn from(bit: bool) -> Self {
        if bit {
            LastBit::One
        } else {
            LastBit::Zero
        }
    }
}

// rows: LastBit, columns: X Y Z Error
const TRANSITIONS: [[Step; 4]; 2] = [
    [
        Step::Data(true),
        Step::EndOfCommunication,
        Step::Data(false),
        Step::Invalid,
    ],
    [
        Step::Data(true),
        Step::Data(false),
        Step::Invalid,
        Step::Invalid,
    ],
];

/// Modified Miller line code
#[derive(Clone, Debug, PartialEq)]
pub struct Miller {
    timing: BitTiming,
    idle: BitLevel,
}

impl Miller {
    // take one sample at `target`
    //
    // Returns `None` if the channel glitched since the last one.
    fn observe<C>(&self, cursor: &mut C, target: u64) -> Result<Option<bool>, EndOfInput>
    where
        C: SampleCursor + ?Sized,
    {
        let transitions = cursor.advance_to(target)?;
        if transitions > 1 {
            Ok(None)
        } else {
            Ok(Some(cursor.bit_level() != self.idle))
        }
    }
}

impl LineCode for Miller {
    type Seq = MillerSeq;
    type State = LastBit;

    const DIRECTION: Direction = Direction::ReaderToCard;
    const START_OF_COMMUNICATION: MillerSeq = MillerSeq::Z;
    const EOC_HOLDBACK: usize = 1;

    fn new(timing: BitTiming, idle: BitLevel) -> Self {
        Self { timing, idle }
    }

    fn timing(&self) -> &BitTiming {
        &self.timing
    }

    fn idle_level(&self) -> BitLevel {
        self.idle
    }

    fn receive_seq<C>(&self, cursor: &mut C, seq_start: u64) -> Result<MillerSeq, EndOfInput>
    where
        C: SampleCursor + ?Sized,
    {
        let first = self.timing.at(seq_start, 1.0 / 6.0);
        let second = self.timing.at(seq_start, 2.0 / 3.0);

        let hi = match self.observe(cursor, first)? {
            Some(paused) => paused,
            None => return Ok(MillerSeq::Error),
        };
        let lo = match self.observe(cursor, second)? {
            Some(paused) => paused,
            None => return Ok(MillerSeq::Error),
        };

        let seq = MillerSeq::from_code(((hi as u8) << 1) | lo as u8);
        trace!("miller: {} at {}", seq.as_ref(), seq_start);
        Ok(seq)
    }

    fn initial_state() -> LastBit {
        LastBit::Zero
    }

    fn step(state: &mut LastBit, seq: MillerSeq) -> Step {
        let step = TRANSITIONS[state.index()][seq.index()];
        if let Step::Data(bit) = step {
            *state = LastBit::from(bit);
        }
        step
    }
}
