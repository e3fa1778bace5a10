//! Line codes
//!
//! ISO 14443-A uses a different line code in each direction:
//!
//! * [`Miller`]: the reader sends modified Miller code with
//!   100% ASK pauses. Bit history matters, so decoding needs
//!   a two-state machine.
//!
//! * [`Loadmod`]: the card answers in Manchester code, by
//!   switching a subcarrier on and off in each half bit.
//!
//! A [`LineCode`] turns the cursor's view of a channel into
//! symbols and symbols into bits. Everything else (byte
//! assembly, framing, and reporting) is shared by both
//! directions in the [`Decoder`](crate::Decoder).

mod loadmod;
mod miller;

pub use loadmod::{classify_half, HalfBit, Loadmod, LoadmodSeq};
pub use miller::{LastBit, Miller, MillerSeq};

use crate::cursor::{BitLevel, EndOfInput, SampleCursor};
use crate::output::{Direction, Sequence};
use crate::waveform::BitTiming;

/// Meaning of one symbol within a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// One data bit
    Data(bool),

    /// End of communication
    EndOfCommunication,

    /// The symbol cannot occur here
    Invalid,
}

/// A line code
///
/// Implementations sample one symbol at a time from a
/// [`SampleCursor`] and interpret the symbols with a small state
/// machine.
pub trait LineCode: Clone + std::fmt::Debug {
    /// Symbol alphabet
    type Seq: Copy + Eq + std::fmt::Debug + Into<Sequence>;

    /// Decoding state carried from one symbol to the next
    type State: Copy + std::fmt::Debug;

    /// Direction this line code is used in
    const DIRECTION: Direction;

    /// The symbol every frame must begin with
    const START_OF_COMMUNICATION: Self::Seq;

    /// Number of trailing data bits the end of communication owns
    ///
    /// These bits are decoded as data before the end of
    /// communication is recognized. The byte assembler holds
    /// them back so they can be reclaimed.
    const EOC_HOLDBACK: usize;

    /// New line code with the given bit clock and idle level
    fn new(timing: BitTiming, idle: BitLevel) -> Self;

    /// Bit clock
    fn timing(&self) -> &BitTiming;

    /// Level of the channel when nothing is transmitted
    fn idle_level(&self) -> BitLevel;

    /// Sample one symbol which begins at `seq_start`
    ///
    /// The cursor must not be past `seq_start`. On return, the
    /// cursor is somewhere inside the symbol.
    fn receive_seq<C>(&self, cursor: &mut C, seq_start: u64) -> Result<Self::Seq, EndOfInput>
    where
        C: SampleCursor + ?Sized;

    /// State at the start of the frame, after the start of
    /// communication
    fn initial_state() -> Self::State;

    /// Interpret one symbol and update the state
    fn step(state: &mut Self::State, seq: Self::Seq) -> Step;
}
