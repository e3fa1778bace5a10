//! Decoder output records

use crate::assembler::DataByte;
use crate::framing::Frame;
use crate::linecode::{LoadmodSeq, MillerSeq};

/// Direction of travel
///
/// ISO 14443 calls the reader the *proximity coupling device*
/// (PCD) and the card the *proximity integrated circuit card*
/// (PICC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::AsRefStr)]
pub enum Direction {
    /// Reader to card, modified Miller over 100% ASK
    #[strum(serialize = "PCD->PICC")]
    ReaderToCard,

    /// Card to reader, Manchester load modulation
    #[strum(serialize = "PICC->PCD")]
    CardToReader,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A received symbol, in either alphabet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sequence {
    /// Reader direction symbol
    Miller(MillerSeq),

    /// Card direction symbol
    Loadmod(LoadmodSeq),
}

impl Sequence {
    /// Two-bit symbol code
    ///
    /// Error symbols have the out-of-band code `0b100`.
    pub fn code(&self) -> u8 {
        match self {
            Sequence::Miller(seq) => seq.code(),
            Sequence::Loadmod(seq) => seq.code(),
        }
    }

    /// True if this is an error symbol
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Sequence::Miller(MillerSeq::Error) | Sequence::Loadmod(LoadmodSeq::Error)
        )
    }
}

impl From<MillerSeq> for Sequence {
    fn from(seq: MillerSeq) -> Self {
        Sequence::Miller(seq)
    }
}

impl From<LoadmodSeq> for Sequence {
    fn from(seq: LoadmodSeq) -> Self {
        Sequence::Loadmod(seq)
    }
}

impl AsRef<str> for Sequence {
    fn as_ref(&self) -> &str {
        match self {
            Sequence::Miller(seq) => seq.as_ref(),
            Sequence::Loadmod(seq) => seq.as_ref(),
        }
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Inclusive range of sample positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// First sample
    pub start: u64,

    /// Last sample, inclusive
    pub end: u64,
}

impl Span {
    /// New inclusive span
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>12}..{:<12}", self.start, self.end)
    }
}

/// Presentation mode of a decoder
///
/// Each decoder reports exactly one view of the traffic. Frame
/// records are reported in both.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum_macros::AsRefStr,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    /// Every decoded symbol, errors included
    #[strum(serialize = "sequences")]
    Sequences,

    /// Start of communication, bytes, and end of communication
    #[default]
    #[strum(serialize = "bytes")]
    Bytes,
}

impl OutputFormat {
    /// Persisted representation (`Sequences` = 0, `Bytes` = 1)
    pub fn as_number(self) -> u32 {
        match self {
            OutputFormat::Sequences => 0,
            OutputFormat::Bytes => 1,
        }
    }

    /// Convert from persisted representation
    pub fn from_number(num: u32) -> Option<Self> {
        match num {
            0 => Some(OutputFormat::Sequences),
            1 => Some(OutputFormat::Bytes),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// What a [`Record`] reports
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// One decoded symbol
    ///
    /// Only reported in the [sequences](OutputFormat::Sequences)
    /// view.
    Sequence {
        /// The symbol
        seq: Sequence,

        /// Samples covered by the symbol
        span: Span,
    },

    /// Start of communication
    StartOfCommunication(Span),

    /// One assembled byte
    Byte(DataByte),

    /// End of communication
    EndOfCommunication(Span),

    /// A complete frame, which may carry a fault
    ///
    /// Always the last record of a frame attempt.
    Frame(Frame),
}

impl RecordKind {
    /// Samples covered by this record
    pub fn span(&self) -> Span {
        match self {
            RecordKind::Sequence { span, .. } => *span,
            RecordKind::StartOfCommunication(span) => *span,
            RecordKind::Byte(byte) => byte.span,
            RecordKind::EndOfCommunication(span) => *span,
            RecordKind::Frame(frame) => Span::new(frame.start, frame.end),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Sequence { seq, .. } => write!(f, "{}", seq),
            RecordKind::StartOfCommunication(_) => write!(f, "SOC"),
            RecordKind::Byte(byte) => write!(f, "{}", byte),
            RecordKind::EndOfCommunication(_) => write!(f, "EOC"),
            RecordKind::Frame(frame) => write!(f, "{}", frame),
        }
    }
}

/// Decoder output record
///
/// Every record is tagged with the [direction](Direction) of the
/// decoder which produced it. Its [`span()`](Record::span) gives
/// the inclusive range of samples it covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    direction: Direction,
    kind: RecordKind,
}

impl Record {
    /// New record
    pub fn new(direction: Direction, kind: RecordKind) -> Self {
        Self { direction, kind }
    }

    /// Direction of travel
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// What happened
    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Samples covered
    pub fn span(&self) -> Span {
        self.kind.span()
    }

    /// Assembled byte, if this is a byte record
    pub fn byte(&self) -> Option<&DataByte> {
        match &self.kind {
            RecordKind::Byte(byte) => Some(byte),
            _ => None,
        }
    }

    /// Frame, if this is a frame record
    pub fn frame(&self) -> Option<&Frame> {
        match &self.kind {
            RecordKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Symbol, if this is a sequence record
    pub fn sequence(&self) -> Option<Sequence> {
        match &self.kind {
            RecordKind::Sequence { seq, .. } => Some(*seq),
            _ => None,
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.span(), self.direction, self.kind)
    }
}

/// Destination for decoder records
pub trait RecordSink {
    /// Accept one record
    fn emit(&mut self, record: Record);
}

impl RecordSink for Vec<Record> {
    fn emit(&mut self, record: Record) {
        self.push(record)
    }
}

impl<S> RecordSink for &mut S
where
    S: RecordSink + ?Sized,
{
    fn emit(&mut self, record: Record) {
        (**self).emit(record)
    }
}
