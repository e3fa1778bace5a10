use thiserror::Error;

use crate::cursor::{BitLevel, SampleCursor};
use crate::decoder::{CardDecoder, Decoder, ReaderDecoder};
use crate::linecode::LineCode;
use crate::output::OutputFormat;
use crate::waveform::{BitTiming, MIN_SAMPLE_RATE_HZ};

/// Highest channel number of a capture
pub const MAX_CHANNEL: u8 = 15;

/// Error restoring persisted settings
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// A setting is missing
    #[error("missing setting \"{0}\"")]
    Missing(&'static str),

    /// A setting is not a number
    #[error("setting \"{field}\" is not a number: \"{value}\"")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// A setting is out of range
    #[error("setting \"{field}\" is out of range: {value}")]
    OutOfRange {
        /// Setting name
        field: &'static str,
        /// Offending value
        value: u32,
    },

    /// Extra text follows the last setting
    #[error("unexpected trailing settings: \"{0}\"")]
    Trailing(String),
}

/// Builds ISO 14443-A decoders
///
/// The only mandatory parameter is the capture's sampling rate.
/// The defaults are channel 0, idle level high, and the
/// [bytes](OutputFormat::Bytes) view.
///
/// One builder describes one channel. Use it to build either a
/// [reader](DecoderBuilder::build_reader) or a
/// [card](DecoderBuilder::build_card) decoder for that channel.
///
/// Settings may be persisted as text with
/// [`save_settings()`](DecoderBuilder::save_settings)
/// and restored with
/// [`load_settings()`](DecoderBuilder::load_settings).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecoderBuilder {
    sample_rate: u32,
    channel: u8,
    idle: BitLevel,
    format: OutputFormat,
}

impl DecoderBuilder {
    /// New decoder settings at `sample_rate` (Hz)
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channel: 0,
            idle: BitLevel::High,
            format: OutputFormat::Bytes,
        }
    }

    /// Build a reader-direction decoder
    pub fn build_reader<C>(&self, cursor: C) -> ReaderDecoder<C>
    where
        C: SampleCursor,
    {
        self.build(cursor)
    }

    /// Build a card-direction decoder
    pub fn build_card<C>(&self, cursor: C) -> CardDecoder<C>
    where
        C: SampleCursor,
    {
        self.build(cursor)
    }

    /// Build a decoder for any line code
    pub fn build<L, C>(&self, cursor: C) -> Decoder<L, C>
    where
        L: LineCode,
        C: SampleCursor,
    {
        let line = L::new(self.timing(), self.idle);
        Decoder::new(line, cursor, self.format)
    }

    /// Capture channel (0 – 15)
    ///
    /// The decoders do not read the channel themselves. It is
    /// kept here so that it persists with the other settings.
    pub fn with_channel(&mut self, channel: u8) -> &mut Self {
        self.channel = u8::min(channel, MAX_CHANNEL);
        self
    }

    /// Level of the channel when nothing is transmitted
    ///
    /// Depends on the front end. Reader pauses and card
    /// subcarrier bursts are detected as departures from this
    /// level.
    pub fn with_idle_level(&mut self, idle: BitLevel) -> &mut Self {
        self.idle = idle;
        self
    }

    /// Output view
    pub fn with_output_format(&mut self, format: OutputFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Capture channel
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Idle level
    pub fn idle_level(&self) -> BitLevel {
        self.idle
    }

    /// Output view
    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Bit clock at the configured sampling rate
    pub fn timing(&self) -> BitTiming {
        BitTiming::new(self.sample_rate)
    }

    /// True if the sampling rate is high enough to decode
    ///
    /// Card subcarrier bursts need at least four samples per
    /// subcarrier period.
    pub fn is_sample_rate_sufficient(&self) -> bool {
        self.sample_rate >= MIN_SAMPLE_RATE_HZ
    }

    /// Persist settings as text
    ///
    /// The output is `channel idle format`, separated by spaces.
    /// The idle level is `0` for low and `1` for high. The format
    /// is `0` for sequences and `1` for bytes.
    pub fn save_settings(&self) -> String {
        format!(
            "{} {} {}",
            self.channel,
            self.idle.as_number(),
            self.format.as_number()
        )
    }

    /// Restore settings saved by [`save_settings()`](DecoderBuilder::save_settings)
    ///
    /// The sampling rate is not part of the settings. On error,
    /// the builder is unchanged.
    pub fn load_settings(&mut self, settings: &str) -> Result<(), SettingsError> {
        let mut fields = settings.split_whitespace();

        let channel = next_number(&mut fields, "channel")?;
        if channel > MAX_CHANNEL as u32 {
            return Err(SettingsError::OutOfRange {
                field: "channel",
                value: channel,
            });
        }

        let idle = next_number(&mut fields, "idle")?;
        let idle = BitLevel::from_number(idle).ok_or(SettingsError::OutOfRange {
            field: "idle",
            value: idle,
        })?;

        let format = next_number(&mut fields, "format")?;
        let format = OutputFormat::from_number(format).ok_or(SettingsError::OutOfRange {
            field: "format",
            value: format,
        })?;

        let rest: Vec<&str> = fields.collect();
        if !rest.is_empty() {
            return Err(SettingsError::Trailing(rest.join(" ")));
        }

        self.channel = channel as u8;
        self.idle = idle;
        self.format = format;
        Ok(())
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new(MIN_SAMPLE_RATE_HZ * 8)
    }
}

fn next_number<'a, I>(fields: &mut I, field: &'static str) -> Result<u32, SettingsError>
where
    I: Iterator<Item = &'a str>,
{
    let text = fields.next().ok_or(SettingsError::Missing(field))?;
    text.parse().map_err(|_| SettingsError::Invalid {
        field,
        value: text.to_owned(),
    })
}
