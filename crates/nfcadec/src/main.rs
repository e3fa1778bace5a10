use std::io;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{info, warn, LevelFilter};

use nfcaphy::{DecoderBuilder, MIN_SAMPLE_RATE_HZ};

mod app;
mod capture;
mod cli;
mod export;

use cli::{Args, CliError};

fn main() {
    match nfcadec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn nfcadec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    if !DecoderBuilder::new(args.rate).is_sample_rate_sufficient() {
        warn!(
            "sampling --rate {} Hz is below the minimum of {} Hz: card frames will not decode",
            args.rate, MIN_SAMPLE_RATE_HZ
        );
    }

    let jobs = app::jobs(&args)?;

    // file setup: locks stdin in case we need it
    let stdin = io::stdin();
    let stdin_handle = stdin.lock();
    let inbuf = file_setup(&args, stdin_handle)?;

    let samples = capture::read_samples(inbuf, args.sample_width);
    info!(
        "read {} samples ({:.6} s)",
        samples.len(),
        samples.len() as f64 / args.rate as f64
    );

    let records = app::run(&jobs, &samples)?;
    if !args.quiet {
        for rec in &records {
            println!("{}", rec);
        }
    }

    if let Some(path) = &args.export {
        let rows = export::write_file(path, &records, args.rate)?;
        info!("exported {} rows to \"{}\"", rows, path);
    }

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("nfcaphy", log_filter)
            .filter_module("nfcadec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup<'stdin>(
    args: &Args,
    stdin: std::io::StdinLock<'stdin>,
) -> Result<Box<dyn io::BufRead + 'stdin>, anyhow::Error> {
    if args.input_is_stdin() {
        info!("NFC-A decoder reading standard input");
        if !is_terminal(&std::io::stdin()) {
            Ok(Box::new(io::BufReader::new(stdin)))
        } else {
            Err(anyhow!(
                "cowardly refusing to read logic samples from a terminal.

Pipe raw samples from your logic analyzer's capture tool into
this program, or give a capture with --file."
            ))
        }
    } else {
        info!("NFC-A decoder reading file: \"{}\"", &args.file);
        Ok(Box::new(io::BufReader::new(
            std::fs::File::open(&args.file)
                .with_context(|| format!("Unable to open --file \"{}\"", args.file))?,
        )))
    }
}

#[cfg(not(target_os = "windows"))]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::fd::AsRawFd,
{
    terminal_size::terminal_size_using_fd(stream.as_raw_fd()).is_some()
}

#[cfg(target_os = "windows")]
fn is_terminal<S>(stream: &S) -> bool
where
    S: std::os::windows::io::AsRawHandle,
{
    terminal_size::terminal_size_using_handle(stream.as_raw_handle()).is_some()
}
