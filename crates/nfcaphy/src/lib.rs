//! # nfcaphy: ISO 14443-A physical layer decoder
//!
//! This crate decodes the air interface of ISO 14443 Type A
//! ("NFC-A") contactless cards from *logic captures*. A capture
//! is one or more binary channels, sampled at a fixed rate by a
//! logic analyzer behind a suitable RF front end.
//!
//! Traffic in each direction uses its own line code:
//!
//! * **Reader → card**: modified Miller code, transmitted as
//!   short 100% ASK pauses in the reader's field. Decoded by a
//!   [`ReaderDecoder`].
//!
//! * **Card → reader**: Manchester code, transmitted as bursts
//!   of a 847.5 kHz subcarrier by load modulation. Decoded by a
//!   [`CardDecoder`].
//!
//! Both directions run at 106 kbit/s and share the same byte
//! format: eight data bits, least-significant bit first, plus an
//! odd parity bit. The last byte of a frame may be short.
//!
//! The decoders report [`Record`]s: individual symbols or bytes,
//! depending on the [`OutputFormat`], followed by a complete
//! [`Frame`] at the end of each frame. Frames carry a
//! [`FrameStatus`] which reports start-of-communication,
//! sequence, and parity faults.
//!
//! ## Example
//!
//! ```
//! use nfcaphy::{BitLevel, DecoderBuilder, FrameStatus, Record, SyntheticCapture};
//!
//! // 108.48 MHz is exactly 1024 samples per bit
//! const RATE: u32 = 108_480_000;
//!
//! // build a capture with one reader frame: REQA
//! let mut capture = SyntheticCapture::new(RATE, BitLevel::High);
//! capture.idle_bits(4.0).reader_frame(&[0x26], 7).idle_bits(4.0);
//!
//! let mut builder = DecoderBuilder::new(RATE);
//! builder.with_idle_level(BitLevel::High);
//! let mut decoder = builder.build_reader(capture.build());
//!
//! // decode until the end of input
//! let mut records: Vec<Record> = vec![];
//! let eoi = decoder.run(&mut records);
//! println!("{}", eoi);
//!
//! for rec in &records {
//!     println!("{}", rec);
//! }
//!
//! let frame = records.last().and_then(|r| r.frame()).unwrap();
//! assert_eq!(frame.status, FrameStatus::Ok);
//! assert_eq!(frame.data, vec![0x26]);
//! assert_eq!(frame.valid_bits_in_last_byte, 7);
//! ```
//!
//! ## Capture input
//!
//! The decoders read captures through the [`SampleCursor`]
//! trait. A cursor only moves forward: it reports how many
//! transitions lie between its position and a later one, and it
//! can skip ahead to the next transition. The in-memory
//! [`EdgeCursor`] is built from a list of transitions or from
//! raw samples.
//!
//! Sampling rates must be at least [`MIN_SAMPLE_RATE_HZ`]
//! (about 3.39 MHz) to resolve the card's subcarrier. Rates of
//! 20 MHz or more are recommended.
//!
//! ## Synthetic captures
//!
//! The [`SyntheticCapture`] generates noiseless captures of
//! well-formed frames in either direction. It is used to test
//! this crate and may be used to test your own tooling.
//!
//! ## Crate features
//!
//! * There are no optional features.
//! * Logging is provided by the `log` crate. Frames are logged
//!   at the `info` level; faults and bytes at `debug`; symbols
//!   at `trace`.

mod assembler;
mod builder;
mod cursor;
mod decoder;
mod framing;
mod linecode;
mod output;
mod waveform;

pub use assembler::{odd_parity_bit, parity_ok, BitQueue, DataByte, QueuedBit};
pub use builder::{DecoderBuilder, SettingsError, MAX_CHANNEL};
pub use cursor::{BitLevel, EdgeCursor, EndOfInput, SampleCursor};
pub use decoder::{CardDecoder, Decoder, Frames, ReaderDecoder};
pub use framing::{Frame, FrameBuilder, FrameStatus};
pub use linecode::{
    classify_half, HalfBit, LastBit, LineCode, Loadmod, LoadmodSeq, Miller, MillerSeq, Step,
};
pub use output::{Direction, OutputFormat, Record, RecordKind, RecordSink, Sequence, Span};
pub use waveform::{
    frame_bits, loadmod_sequences, miller_sequences, samples_per_bit, BitTiming,
    SyntheticCapture, CARRIER_CYCLES_PER_BIT, FREQ_CARRIER_HZ, MIN_SAMPLE_RATE_HZ,
    SUBCARRIER_DIVISOR,
};
