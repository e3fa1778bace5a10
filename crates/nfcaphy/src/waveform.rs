//! Waveform parameters and synthetic captures for ISO 14443-A
//!
//! Both directions share one bit clock: a bit lasts 128 periods of
//! the 13.56 MHz carrier, or about 9.44 µs (106 kbit/s). The
//! [`BitTiming`] converts this bit clock into sample positions for a
//! given capture sampling rate.
//!
//! The rest of this module builds *synthetic* captures. These are
//! noiseless, deterministic [`EdgeCursor`]s that contain
//! well-formed reader or card frames. They exist to exercise the
//! decoders without any acquisition hardware.

use crate::assembler::odd_parity_bit;
use crate::cursor::{BitLevel, EdgeCursor};
use crate::linecode::{LoadmodSeq, MillerSeq};
use crate::output::Span;

/// Carrier frequency (Hz)
pub const FREQ_CARRIER_HZ: u32 = 13_560_000;

/// Length of one bit, in carrier periods
pub const CARRIER_CYCLES_PER_BIT: u32 = 128;

/// Subcarrier frequency, as a carrier divisor
///
/// The card modulates its load with a subcarrier of fc/16,
/// about 847.5 kHz.
pub const SUBCARRIER_DIVISOR: u32 = 16;

/// Minimum usable sampling rate (Hz)
///
/// Four samples per subcarrier period, about 3.39 MHz. Below
/// this rate, the subcarrier bursts of the card cannot be
/// counted reliably.
pub const MIN_SAMPLE_RATE_HZ: u32 = FREQ_CARRIER_HZ * 4 / SUBCARRIER_DIVISOR;

/// Bit length at the given sampling frequency, in fractional samples
pub fn samples_per_bit(fs: u32) -> f64 {
    fs as f64 * (CARRIER_CYCLES_PER_BIT as f64 / FREQ_CARRIER_HZ as f64)
}

/// Bit clock, in samples
///
/// All positions are derived from the start of the frame and the
/// fractional bit length, so rounding errors never accumulate from
/// one symbol to the next.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct BitTiming {
    samples_per_bit: f64,
}

impl BitTiming {
    /// Bit clock for the given sampling rate (Hz)
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples_per_bit: samples_per_bit(sample_rate),
        }
    }

    /// Bit length, in fractional samples
    pub fn samples_per_bit(&self) -> f64 {
        self.samples_per_bit
    }

    /// Start of the `seq_num`-th symbol of a frame
    pub fn seq_start(&self, frame_start: u64, seq_num: u32) -> u64 {
        frame_start + (seq_num as f64 * self.samples_per_bit) as u64
    }

    /// Sample position at `fraction` of a bit after `start`
    pub fn at(&self, start: u64, fraction: f64) -> u64 {
        start + (fraction * self.samples_per_bit) as u64
    }

    /// Inclusive span of `bits` bit periods beginning at `start`
    pub fn span(&self, start: u64, bits: u32) -> Span {
        let len = (bits as f64 * self.samples_per_bit) as u64;
        Span::new(start, start + len.saturating_sub(1))
    }
}

/// Convert bytes to a frame's bit sequence
///
/// Bytes are sent least-significant bit first. Every complete
/// byte is followed by its odd parity bit. If `last_byte_bits`
/// is less than 8, only that many bits of the final byte are
/// sent, with no parity bit. This is how short frames like
/// REQA (7 bits) are built.
pub fn frame_bits(bytes: &[u8], last_byte_bits: u8) -> Vec<bool> {
    let mut out = Vec::with_capacity(bytes.len() * 9);
    for (i, byte) in bytes.iter().enumerate() {
        let partial = i + 1 == bytes.len() && last_byte_bits < 8;
        let nbits = if partial { last_byte_bits } else { 8 };
        for bit in 0..nbits {
            out.push(byte & (1 << bit) != 0);
        }
        if !partial {
            out.push(odd_parity_bit(*byte));
        }
    }
    out
}

/// Encode frame bits as modified Miller sequences
///
/// The output begins with the start of communication (Z). A one
/// is always X. A zero is Z, unless it follows a one, in which
/// case it is Y. The frame is closed with a logic zero followed
/// by Y.
pub fn miller_sequences(bits: &[bool]) -> Vec<MillerSeq> {
    let mut out = Vec::with_capacity(bits.len() + 3);
    out.push(MillerSeq::Z);

    let mut last = false;
    for &bit in bits.iter().chain(std::iter::once(&false)) {
        out.push(match (last, bit) {
            (_, true) => MillerSeq::X,
            (true, false) => MillerSeq::Y,
            (false, false) => MillerSeq::Z,
        });
        last = bit;
    }

    out.push(MillerSeq::Y);
    out
}

/// Encode frame bits as Manchester load modulation sequences
///
/// The output begins with the start of communication (D), maps
/// ones to D and zeros to E, and ends with F.
pub fn loadmod_sequences(bits: &[bool]) -> Vec<LoadmodSeq> {
    let mut out = Vec::with_capacity(bits.len() + 2);
    out.push(LoadmodSeq::D);
    out.extend(
        bits.iter()
            .map(|&bit| if bit { LoadmodSeq::D } else { LoadmodSeq::E }),
    );
    out.push(LoadmodSeq::F);
    out
}

/// Synthetic capture builder
///
/// Appends idle gaps and modulated sequences to one channel,
/// then [builds](SyntheticCapture::build) an [`EdgeCursor`] for
/// it.
///
/// * The reader's 100% ASK pauses last a quarter bit. Z pauses
///   at the start of the bit and X at the middle.
///
/// * The card's load modulation is a subcarrier at fc/16: eight
///   transitions for every modulated half bit.
///
/// Error sequences are synthesized as short glitch trains which
/// cannot be read as any valid sequence. They need at least 50
/// samples per bit to resolve.
///
/// Remember to end the capture with some idle time. The decoders
/// need to sample the final sequence in full.
#[derive(Clone, Debug)]
pub struct SyntheticCapture {
    timing: BitTiming,
    idle: BitLevel,
    edges: Vec<u64>,
    position: u64,
}

impl SyntheticCapture {
    /// New, empty capture at `sample_rate`
    ///
    /// The channel rests at the `idle` level.
    pub fn new(sample_rate: u32, idle: BitLevel) -> Self {
        Self {
            timing: BitTiming::new(sample_rate),
            idle,
            edges: vec![],
            position: 0,
        }
    }

    /// Bit clock of this capture
    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    /// Current end of the capture, in samples
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append `bits` bit periods of idle channel
    pub fn idle_bits(&mut self, bits: f64) -> &mut Self {
        self.position += (bits * self.timing.samples_per_bit()) as u64;
        self
    }

    /// Append a reader frame containing `bytes`
    ///
    /// See [`frame_bits()`] for `last_byte_bits`.
    pub fn reader_frame(&mut self, bytes: &[u8], last_byte_bits: u8) -> &mut Self {
        let seqs = miller_sequences(&frame_bits(bytes, last_byte_bits));
        self.miller(&seqs)
    }

    /// Append a card frame containing `bytes`
    ///
    /// See [`frame_bits()`] for `last_byte_bits`.
    pub fn card_frame(&mut self, bytes: &[u8], last_byte_bits: u8) -> &mut Self {
        let seqs = loadmod_sequences(&frame_bits(bytes, last_byte_bits));
        self.loadmod(&seqs)
    }

    /// Append raw modified Miller sequences
    pub fn miller(&mut self, seqs: &[MillerSeq]) -> &mut Self {
        let base = self.position;
        for (i, seq) in seqs.iter().enumerate() {
            let start = self.timing.seq_start(base, i as u32);
            match seq {
                MillerSeq::Z => self.pulse_at(start, 0.0, 0.25),
                MillerSeq::X => self.pulse_at(start, 0.5, 0.75),
                MillerSeq::Y => {}
                MillerSeq::Error => self.glitch(start),
            }
        }
        self.position = self.timing.seq_start(base, seqs.len() as u32);
        self
    }

    /// Append raw load modulation sequences
    pub fn loadmod(&mut self, seqs: &[LoadmodSeq]) -> &mut Self {
        let base = self.position;
        for (i, seq) in seqs.iter().enumerate() {
            let start = self.timing.seq_start(base, i as u32);
            match seq {
                LoadmodSeq::D => self.subcarrier(start, 0.0, 4),
                LoadmodSeq::E => self.subcarrier(start, 0.5, 4),
                LoadmodSeq::F => {}
                LoadmodSeq::Error => self.subcarrier(start, 0.0, 2),
            }
        }
        self.position = self.timing.seq_start(base, seqs.len() as u32);
        self
    }

    /// Build the capture
    pub fn build(&self) -> EdgeCursor {
        // a pulse at sample zero changes the initial level instead
        match self.edges.split_first() {
            Some((0, rest)) => EdgeCursor::new(self.idle.toggled(), rest.to_vec(), self.position),
            _ => EdgeCursor::new(self.idle, self.edges.clone(), self.position),
        }
    }

    // `periods` subcarrier periods beginning at `half` of the bit
    fn subcarrier(&mut self, start: u64, half: f64, periods: u32) {
        // half a subcarrier period is 1/16 of a bit
        let step = 1.0 / SUBCARRIER_DIVISOR as f64;
        for k in 0..periods {
            let on = half + (2 * k) as f64 * step;
            self.pulse_at(start, on, on + step);
        }
    }

    // two back-to-back pulses inside the first sampling window
    fn glitch(&mut self, start: u64) {
        self.pulse_at(start, 0.02, 0.05);
        self.pulse_at(start, 0.08, 0.11);
    }

    // drive the channel active between two fractions of the bit
    //
    // Degenerate pulses are dropped whole, which keeps the level
    // after the pulse correct.
    fn pulse_at(&mut self, start: u64, on: f64, off: f64) {
        let on = self.timing.at(start, on);
        let off = self.timing.at(start, off);
        let after_last = self.edges.last().map_or(true, |&last| on > last);
        if on < off && after_last {
            self.edges.push(on);
            self.edges.push(off);
        }
    }
}
