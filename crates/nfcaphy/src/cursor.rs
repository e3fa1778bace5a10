//! Sample cursors
//!
//! A [`SampleCursor`] walks forward through one binary channel of
//! a logic capture. It is the only thing the decoders know about
//! the acquisition hardware. Everything the decoders learn about
//! the signal comes from two operations:
//!
//! 1. advance to an absolute sample position, counting how many
//!    level transitions were crossed on the way; and
//! 2. advance to the next transition.
//!
//! The [`EdgeCursor`] implements this contract over an in-memory
//! list of edges.

use thiserror::Error;

/// Logic level of a binary channel
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::AsRefStr,
    strum_macros::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum BitLevel {
    /// Logic low
    #[strum(serialize = "low")]
    Low,

    /// Logic high
    #[strum(serialize = "high")]
    High,
}

impl BitLevel {
    /// The opposite level
    pub fn toggled(self) -> Self {
        match self {
            BitLevel::Low => BitLevel::High,
            BitLevel::High => BitLevel::Low,
        }
    }

    /// Persisted representation (`Low` = 0, `High` = 1)
    pub fn as_number(self) -> u32 {
        match self {
            BitLevel::Low => 0,
            BitLevel::High => 1,
        }
    }

    /// Convert from persisted representation
    pub fn from_number(num: u32) -> Option<Self> {
        match num {
            0 => Some(BitLevel::Low),
            1 => Some(BitLevel::High),
            _ => None,
        }
    }
}

impl From<bool> for BitLevel {
    fn from(high: bool) -> Self {
        if high {
            BitLevel::High
        } else {
            BitLevel::Low
        }
    }
}

impl std::fmt::Display for BitLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// The capture has no more samples
///
/// Reports the length of the capture, in samples. Running out of
/// input is the only way a decoding loop ends.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[error("end of input after {0} samples")]
pub struct EndOfInput(pub u64);

/// Forward-only cursor over one binary channel
pub trait SampleCursor {
    /// Current sample position
    fn sample_number(&self) -> u64;

    /// Level at the current sample position
    fn bit_level(&self) -> BitLevel;

    /// Advance to absolute position `target`
    ///
    /// Returns the number of level transitions in the interval
    /// `(current, target]`. If `target` is not ahead of the
    /// current position, nothing moves and zero is returned.
    fn advance_to(&mut self, target: u64) -> Result<u32, EndOfInput>;

    /// Advance to the next level transition
    ///
    /// On success, the cursor sits exactly on the first sample
    /// with the new level.
    fn advance_to_next_edge(&mut self) -> Result<(), EndOfInput>;
}

impl<C> SampleCursor for &mut C
where
    C: SampleCursor + ?Sized,
{
    fn sample_number(&self) -> u64 {
        (**self).sample_number()
    }

    fn bit_level(&self) -> BitLevel {
        (**self).bit_level()
    }

    fn advance_to(&mut self, target: u64) -> Result<u32, EndOfInput> {
        (**self).advance_to(target)
    }

    fn advance_to_next_edge(&mut self) -> Result<(), EndOfInput> {
        (**self).advance_to_next_edge()
    }
}

/// In-memory cursor over a list of edges
///
/// The channel is described by its level at sample zero, the
/// sorted positions of every transition, and the total number of
/// samples. An edge at position `n` means that sample `n` is
/// the first sample with the new level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeCursor {
    initial: BitLevel,
    edges: Vec<u64>,
    len: u64,
    position: u64,

    // index of the first edge after `position`
    next_edge: usize,
}

impl EdgeCursor {
    /// New cursor from explicit edges
    ///
    /// `edges` must be strictly increasing. Edges at or beyond
    /// `len` are discarded, as is an edge at sample zero: the
    /// `initial` level already describes sample zero.
    pub fn new(initial: BitLevel, mut edges: Vec<u64>, len: u64) -> Self {
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]));
        edges.retain(|&e| e > 0 && e < len);
        Self {
            initial,
            edges,
            len,
            position: 0,
            next_edge: 0,
        }
    }

    /// New cursor from a sequence of sampled levels
    ///
    /// Each item of `levels` is one sample.
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = BitLevel>,
    {
        let mut levels = levels.into_iter();
        let initial = match levels.next() {
            Some(level) => level,
            None => return Self::new(BitLevel::Low, vec![], 0),
        };

        let mut edges = vec![];
        let mut last = initial;
        let mut len = 1u64;
        for level in levels {
            if level != last {
                edges.push(len);
                last = level;
            }
            len += 1;
        }

        Self::new(initial, edges, len)
    }

    /// Total number of samples
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the capture holds no samples
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Level at sample zero
    pub fn initial_level(&self) -> BitLevel {
        self.initial
    }

    /// Positions of every level transition
    pub fn edges(&self) -> &[u64] {
        &self.edges
    }
}

impl SampleCursor for EdgeCursor {
    fn sample_number(&self) -> u64 {
        self.position
    }

    fn bit_level(&self) -> BitLevel {
        if self.next_edge % 2 == 0 {
            self.initial
        } else {
            self.initial.toggled()
        }
    }

    fn advance_to(&mut self, target: u64) -> Result<u32, EndOfInput> {
        if target >= self.len {
            return Err(EndOfInput(self.len));
        }
        if target <= self.position {
            return Ok(0);
        }

        let crossed = self.edges[self.next_edge..]
            .iter()
            .take_while(|&&edge| edge <= target)
            .count();
        self.next_edge += crossed;
        self.position = target;
        Ok(crossed as u32)
    }

    fn advance_to_next_edge(&mut self) -> Result<(), EndOfInput> {
        match self.edges.get(self.next_edge) {
            Some(&edge) => {
                self.position = edge;
                self.next_edge += 1;
                Ok(())
            }
            None => {
                // park at the end so the caller cannot spin
                self.position = self.len;
                Err(EndOfInput(self.len))
            }
        }
    }
}
