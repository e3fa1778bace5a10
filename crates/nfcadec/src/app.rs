//! Channel decoding
//!
//! Every enabled channel becomes a [`Job`]. Each job runs on its
//! own scoped thread with its own decoder and cursor, and the
//! jobs share nothing but the (read-only) capture. When every
//! job has finished, their records are merged into one list in
//! order of time.
//!
//! ```txt
//!                    +--> reader job --> records --+
//!   capture samples -|                             |--> merge --> print / export
//!                    +--> card job ----> records --+
//! ```

use anyhow::{anyhow, bail};
#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use nfcaphy::{DecoderBuilder, Direction, Record};

use crate::capture;
use crate::cli::Args;

/// One channel to decode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// Traffic direction of the channel
    pub direction: Direction,

    /// Decoder settings, including the channel number
    pub builder: DecoderBuilder,
}

impl Job {
    /// Decode this job's channel of `samples`
    pub fn decode(&self, samples: &[u16]) -> Vec<Record> {
        let cursor = capture::channel_cursor(samples, self.builder.channel());
        let mut records: Vec<Record> = vec![];
        let eoi = match self.direction {
            Direction::ReaderToCard => self.builder.build_reader(cursor).run(&mut records),
            Direction::CardToReader => self.builder.build_card(cursor).run(&mut records),
        };

        debug!(
            "{} channel {}: {} ({} records)",
            self.direction,
            self.builder.channel(),
            eoi,
            records.len()
        );
        records
    }
}

/// Create jobs for every channel requested by `args`
pub fn jobs(args: &Args) -> Result<Vec<Job>, anyhow::Error> {
    let requested = [
        (Direction::ReaderToCard, args.reader_channel, args.reader_idle),
        (Direction::CardToReader, args.card_channel, args.card_idle),
    ];

    let mut out = vec![];
    for (direction, channel, idle) in requested {
        let channel = match channel {
            Some(channel) => channel,
            None => continue,
        };
        if channel >= args.sample_width.channels() {
            bail!(
                "{} channel {} does not exist in {}-channel samples (see --sample-width)",
                direction,
                channel,
                args.sample_width.channels()
            );
        }

        let mut builder = DecoderBuilder::new(args.rate);
        builder
            .with_channel(channel)
            .with_idle_level(idle)
            .with_output_format(args.format);
        info!(
            "{}: channel {}, idle {}, settings \"{}\"",
            direction,
            channel,
            idle,
            builder.save_settings()
        );
        out.push(Job { direction, builder });
    }

    Ok(out)
}

/// Run every job in parallel and merge the results
pub fn run(jobs: &[Job], samples: &[u16]) -> Result<Vec<Record>, anyhow::Error> {
    let streams = std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| scope.spawn(move || job.decode(samples)))
            .collect();

        handles
            .into_iter()
            .zip(jobs)
            .map(|(handle, job)| {
                handle.join().map_err(|_| {
                    anyhow!(
                        "{} decoder for channel {} panicked",
                        job.direction,
                        job.builder.channel()
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    Ok(merge(streams))
}

/// Merge record streams in order of time
///
/// Each stream is cut into frame attempts, which end with a
/// frame record. Attempts are ordered by their first sample and
/// are never interleaved. Records of an unfinished attempt at
/// the end of a stream are kept.
pub fn merge(streams: Vec<Vec<Record>>) -> Vec<Record> {
    let mut attempts: Vec<Vec<Record>> = vec![];
    for stream in streams {
        let mut attempt = vec![];
        for rec in stream {
            let last = rec.frame().is_some();
            attempt.push(rec);
            if last {
                attempts.push(std::mem::take(&mut attempt));
            }
        }
        if !attempt.is_empty() {
            attempts.push(attempt);
        }
    }

    attempts.sort_by_key(|attempt| attempt.first().map(|rec| rec.span().start));
    attempts.into_iter().flatten().collect()
}
