//! Raw logic capture input

use std::io;

use byteorder::{NativeEndian, ReadBytesExt};

use nfcaphy::{BitLevel, EdgeCursor};

use crate::cli::SampleWidth;

/// Read every sample word from `input`
///
/// Reads until the end of input. A trailing partial word is
/// discarded.
pub fn read_samples<R>(mut input: R, width: SampleWidth) -> Vec<u16>
where
    R: io::Read,
{
    match width {
        SampleWidth::Eight => std::iter::from_fn(|| Some(input.read_u8().ok()? as u16)).collect(),
        SampleWidth::Sixteen => {
            std::iter::from_fn(|| Some(input.read_u16::<NativeEndian>().ok()?)).collect()
        }
    }
}

/// Extract one channel of `samples` as a cursor
pub fn channel_cursor(samples: &[u16], channel: u8) -> EdgeCursor {
    let mask = 1u16 << channel;
    EdgeCursor::from_levels(samples.iter().map(|word| BitLevel::from(word & mask != 0)))
}
