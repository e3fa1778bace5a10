//! Frame assembly

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::assembler::DataByte;
use crate::output::Direction;

/// Outcome of a frame
///
/// The string forms match the names used by common logic
/// analyzer tooling: `OK`, `SOC_ERROR`, `SEQUENCE_ERROR`, and
/// `PARITY_ERROR`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::AsRefStr)]
pub enum FrameStatus {
    /// Frame received without fault
    #[strum(serialize = "OK")]
    Ok,

    /// The first symbol was not a start of communication
    ///
    /// The frame carries no bytes.
    #[strum(serialize = "SOC_ERROR")]
    SocError,

    /// A symbol was invalid in its context
    ///
    /// Reception stopped at the offending symbol. Bytes already
    /// assembled are kept.
    #[strum(serialize = "SEQUENCE_ERROR")]
    SequenceError,

    /// At least one byte failed its parity check
    ///
    /// The frame was received in full.
    #[strum(serialize = "PARITY_ERROR")]
    ParityError,
}

impl FrameStatus {
    /// True for [`FrameStatus::Ok`]
    pub fn is_ok(&self) -> bool {
        *self == FrameStatus::Ok
    }
}

impl std::fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A received frame
///
/// Frames run from the start of communication to the end of
/// communication, inclusive. A frame which ended on a fault
/// ends with the last sample of the offending symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Direction of travel
    pub direction: Direction,

    /// First sample of the start of communication
    pub start: u64,

    /// Last sample of the frame, inclusive
    pub end: u64,

    /// Frame bytes
    pub data: Vec<u8>,

    /// Valid bits in the last byte of `data` (1 – 8)
    ///
    /// Zero if `data` is empty.
    pub valid_bits_in_last_byte: u8,

    /// Number of bytes with a parity error
    pub parity_errors: u32,

    /// Outcome
    pub status: FrameStatus,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {}: [", self.status)?;
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")?;
        if !self.data.is_empty() && self.valid_bits_in_last_byte < 8 {
            write!(f, " ({} bits in last byte)", self.valid_bits_in_last_byte)?;
        }
        Ok(())
    }
}

/// Accumulates one frame
///
/// The first fault reported with [`fault()`](FrameBuilder::fault)
/// becomes the frame status. Later faults are ignored.
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    direction: Direction,
    start: u64,
    data: Vec<u8>,
    valid_bits_in_last_byte: u8,
    parity_errors: u32,
    status: FrameStatus,
}

impl FrameBuilder {
    /// Begin a frame at sample `start`
    pub fn new(direction: Direction, start: u64) -> Self {
        Self {
            direction,
            start,
            data: Vec::with_capacity(32),
            valid_bits_in_last_byte: 0,
            parity_errors: 0,
            status: FrameStatus::Ok,
        }
    }

    /// First sample of the frame
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Current status
    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Report a fault
    ///
    /// Has no effect if a fault was already reported.
    pub fn fault(&mut self, status: FrameStatus) {
        if self.status.is_ok() {
            debug!(
                "frame: {} fault in frame starting at {}",
                status, self.start
            );
            self.status = status;
        }
    }

    /// Append an assembled byte
    ///
    /// A byte with a parity error marks the frame with
    /// [`FrameStatus::ParityError`], unless it is already
    /// faulted, but it is kept.
    pub fn push_byte(&mut self, byte: &DataByte) {
        self.data.push(byte.value);
        self.valid_bits_in_last_byte = byte.valid_bits;
        if byte.parity_error {
            self.parity_errors += 1;
            self.fault(FrameStatus::ParityError);
        }
    }

    /// Seal the frame, ending at sample `end` (inclusive)
    ///
    /// A frame with a bad start of communication carries no
    /// data.
    pub fn seal(mut self, end: u64) -> Frame {
        if self.status == FrameStatus::SocError {
            self.data.clear();
            self.valid_bits_in_last_byte = 0;
            self.parity_errors = 0;
        }

        Frame {
            direction: self.direction,
            start: self.start,
            end,
            data: self.data,
            valid_bits_in_last_byte: self.valid_bits_in_last_byte,
            parity_errors: self.parity_errors,
            status: self.status,
        }
    }
}
