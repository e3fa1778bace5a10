//! CSV export
//!
//! One row per decoded byte or symbol:
//!
//! ```txt
//! Time [s],Direction,Value
//! 0.000047198,PCD->PICC,0x93
//! ```

use std::io;

use anyhow::Context;

use nfcaphy::{Record, RecordKind};

const HEADER: [&str; 3] = ["Time [s]", "Direction", "Value"];

/// Write export rows for `records` to `out`
///
/// The time of each row is the first sample of the record,
/// divided by the `sample_rate`. Records other than bytes and
/// symbols are skipped. Returns the number of rows written.
pub fn write_csv<W>(out: W, records: &[Record], sample_rate: u32) -> Result<usize, anyhow::Error>
where
    W: io::Write,
{
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(HEADER)?;

    let mut rows = 0;
    for rec in records {
        let value = match rec.kind() {
            RecordKind::Byte(byte) => format!("0x{:02X}", byte.value),
            RecordKind::Sequence { seq, .. } => seq.to_string(),
            _ => continue,
        };

        let time = rec.span().start as f64 / sample_rate as f64;
        wtr.write_record([format!("{:.9}", time), rec.direction().to_string(), value])?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

/// Write export rows for `records` to the file at `path`
pub fn write_file(path: &str, records: &[Record], sample_rate: u32) -> Result<usize, anyhow::Error> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Unable to create --export file \"{}\"", path))?;
    write_csv(io::BufWriter::new(file), records, sample_rate)
        .with_context(|| format!("Unable to write --export file \"{}\"", path))
}
