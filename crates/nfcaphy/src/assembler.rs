//! Byte assembly with odd parity
//!
//! Frames carry bytes least-significant bit first. Every complete
//! byte is followed by an odd parity bit: the nine bits together
//! always hold an odd number of ones.
//!
//! The [`BitQueue`] collects decoded bits and drains them into
//! [`DataByte`]s nine at a time. Some line codes decide only
//! *later* that the most recent bit was not data at all. The
//! reader's end of communication is a logic zero followed by a Y
//! sequence, and that zero has already been pushed by the time
//! the Y arrives. The queue therefore holds back a few bits
//! before it drains a byte, so they can still be reclaimed.

use arraydeque::{ArrayDeque, Wrapping};

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::output::Span;
use crate::waveform::BitTiming;

// nine bits per byte, plus the largest holdback of any line code
const QUEUE_CAPACITY: usize = 10;

/// Odd parity bit for `byte`
///
/// True if `byte` has an even number of ones.
pub fn odd_parity_bit(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}

/// True if `parity` is the correct odd parity bit for `byte`
pub fn parity_ok(byte: u8, parity: bool) -> bool {
    (byte.count_ones() + parity as u32) % 2 == 1
}

/// An assembled byte
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataByte {
    /// Byte value
    ///
    /// Bits above `valid_bits` are zero.
    pub value: u8,

    /// Number of valid bits, from the LSB (1 – 8)
    ///
    /// Only the last byte of a frame may have fewer than 8.
    pub valid_bits: u8,

    /// True if the parity bit was wrong
    ///
    /// Partial bytes have no parity bit and never report a
    /// parity error.
    pub parity_error: bool,

    /// Samples covered by the byte and its parity bit
    pub span: Span,
}

impl std::fmt::Display for DataByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.value)?;
        if self.valid_bits < 8 {
            write!(f, " ({} bits)", self.valid_bits)?;
        }
        if self.parity_error {
            write!(f, " (parity error)")?;
        }
        Ok(())
    }
}

/// A decoded bit and the start of its symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedBit {
    /// Bit value
    pub bit: bool,

    /// Start sample of the symbol which produced it
    pub sample: u64,
}

/// Bit queue with holdback
///
/// Bytes are drained as soon as `9 + holdback` bits are queued.
/// The newest `holdback` bits stay in the queue until the next
/// push or the end of the frame.
#[derive(Clone, Debug)]
pub struct BitQueue {
    bits: ArrayDeque<QueuedBit, QUEUE_CAPACITY, Wrapping>,
    holdback: usize,
    timing: BitTiming,
}

impl BitQueue {
    /// New, empty queue
    ///
    /// `holdback` is the number of trailing bits which the end of
    /// communication may claim. It must be at most 1.
    pub fn new(holdback: usize, timing: BitTiming) -> Self {
        debug_assert!(holdback + 9 <= QUEUE_CAPACITY);
        Self {
            bits: ArrayDeque::new(),
            holdback,
            timing,
        }
    }

    /// Number of queued bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True if no bits are queued
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Discard all queued bits
    pub fn reset(&mut self) {
        self.bits.clear();
    }

    /// Queue one bit
    ///
    /// `sample` is the start of the bit's symbol. If this push
    /// completes a byte beyond the holdback, the byte is returned.
    pub fn push(&mut self, bit: bool, sample: u64) -> Option<DataByte> {
        self.bits.push_back(QueuedBit { bit, sample });
        if self.bits.len() >= 9 + self.holdback {
            self.drain(9)
        } else {
            None
        }
    }

    /// Remove the newest bit
    ///
    /// Used by the end of communication to claim the bit it owns.
    pub fn pop_back(&mut self) -> Option<QueuedBit> {
        self.bits.pop_back()
    }

    /// Drain every remaining bit as the final byte of the frame
    ///
    /// Nine bits produce a full byte with a parity check. One to
    /// eight bits produce a partial byte. An empty queue produces
    /// nothing.
    pub fn drain_final(&mut self) -> Option<DataByte> {
        let len = self.bits.len().min(9);
        let out = self.drain(len);
        self.bits.clear();
        out
    }

    // drain the oldest `count` bits (≤ 9) into a byte
    fn drain(&mut self, count: usize) -> Option<DataByte> {
        let first = *self.bits.front()?;
        let mut value = 0u8;
        let mut parity = None;
        let mut last_sample = first.sample;

        for i in 0..count {
            let qb = self.bits.pop_front()?;
            last_sample = qb.sample;
            if i < 8 {
                value |= (qb.bit as u8) << i;
            } else {
                parity = Some(qb.bit);
            }
        }

        let valid_bits = count.min(8) as u8;
        let parity_error = match parity {
            Some(parity) => !parity_ok(value, parity),
            None => false,
        };

        let span = Span::new(first.sample, self.timing.span(last_sample, 1).end);
        if parity_error {
            debug!(
                "assembler: parity error on byte 0x{:02X} at sample {}",
                value, first.sample
            );
        } else {
            debug!(
                "assembler: byte 0x{:02X} ({} bits) at sample {}",
                value, valid_bits, first.sample
            );
        }

        Some(DataByte {
            value,
            valid_bits,
            parity_error,
            span,
        })
    }
}
