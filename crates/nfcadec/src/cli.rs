use std::fmt::Display;

use clap::{error::ErrorKind, value_parser, ArgGroup, CommandFactory, Parser, ValueEnum};

use nfcaphy::{BitLevel, OutputFormat};

/// Standard input filename
const STDIN_FILE: &str = "-";

const USAGE_SHORT: &str = r#"
This program accepts raw logic analyzer samples, one 8-bit or 16-bit word per sample, at the given sampling --rate. Each bit of a word is one channel. Give the channel that carries the reader's field with --reader-channel and the channel that carries the card's load modulation with --card-channel.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program accepts raw logic analyzer samples, one 8-bit or 16-bit word per sample, at the given sampling --rate. Each bit of a word is one channel. Give the channel that carries the reader's field with --reader-channel and the channel that carries the card's load modulation with --card-channel.

Reader frames are decoded as modified Miller code. Card frames are decoded as Manchester-coded subcarrier bursts. One or both directions may be decoded. Each channel is decoded in parallel, and the results are printed in order of time.

Every record is printed on its own line:

    [        4096..5119        ] PCD->PICC: SOC
    [        5120..14335       ] PCD->PICC: 0x4B
    [       14336..16383       ] PCD->PICC: EOC
    [        4096..16383       ] PCD->PICC: frame OK: [4B]

The range is the first and last sample of the record, inclusive. Frames report one of OK, SOC_ERROR, SEQUENCE_ERROR, or PARITY_ERROR.

Use "--format sequences" to print the individual line code symbols (X Y Z for the reader, D E F for the card) instead of bytes.

Sample at 20 MHz or more. The card's subcarrier cannot be resolved below 3.39 MHz.
"#;

const ADVANCED: &str = "Advanced Capture Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
#[command(group(
    ArgGroup::new("channels")
        .required(true)
        .multiple(true)
        .args(["reader_channel", "card_channel"])
))]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even decoded frames
    #[arg(short, long)]
    pub quiet: bool,

    /// Sampling rate (Hz)
    ///
    /// Set to the sampling rate of your logic analyzer.
    #[arg(short, long, default_value_t = 50_000_000)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    pub rate: u32,

    /// Input file (or "-" for stdin)
    ///
    /// The input must be raw samples at --rate, one word of
    /// --sample-width bits per sample.
    #[arg(long, default_value_t = STDIN_FILE.to_string())]
    pub file: String,

    /// Channel with reader-to-card traffic
    #[arg(long, value_name = "CHANNEL")]
    #[arg(value_parser = value_parser!(u8).range(0..16))]
    pub reader_channel: Option<u8>,

    /// Channel with card-to-reader traffic
    #[arg(long, value_name = "CHANNEL")]
    #[arg(value_parser = value_parser!(u8).range(0..16))]
    pub card_channel: Option<u8>,

    /// Output view (bytes or sequences)
    #[arg(long, default_value_t = OutputFormat::Bytes)]
    pub format: OutputFormat,

    /// Write decoded bytes to a CSV file
    #[arg(long, value_name = "FILE")]
    pub export: Option<String>,

    /// Bits per sample word
    ///
    /// 16-bit words are read in native byte order.
    #[arg(long, value_enum, default_value = "8")]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub sample_width: SampleWidth,

    /// Idle level of the reader channel (low or high)
    #[arg(long, default_value_t = BitLevel::High)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub reader_idle: BitLevel,

    /// Idle level of the card channel (low or high)
    #[arg(long, default_value_t = BitLevel::High)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub card_idle: BitLevel,
}

/// Size of one sample word
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SampleWidth {
    /// One byte per sample
    #[value(name = "8")]
    Eight,

    /// Two bytes per sample, native-endian
    #[value(name = "16")]
    Sixteen,
}

impl SampleWidth {
    /// Number of channels in a sample word
    pub fn channels(&self) -> u8 {
        match self {
            SampleWidth::Eight => 8,
            SampleWidth::Sixteen => 16,
        }
    }
}

impl Args {
    /// Return true if the user requests input from stdin
    pub fn input_is_stdin(&self) -> bool {
        self.file == STDIN_FILE
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
