use clap::{AppSettings, Parser};
use hifitime::Duration;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;

use radiospec::{join_many, Error, Input, JoinOptions, Loader, Spectrogram};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The spectrogram files to read: paths, directories or glob patterns.
    inputs: Vec<String>,

    /// Skip inputs that fail to decode instead of aborting.
    #[clap(short, long)]
    lenient: bool,

    /// Join the loaded spectrograms of each instrument kind into one.
    #[clap(short, long)]
    join: bool,

    /// The largest gap, in seconds, allowed between joined spectrograms.
    #[clap(long, requires = "join")]
    max_gap: Option<f64>,

    /// Pad gaps between joined spectrograms by repeating the last column
    /// before the gap.
    #[clap(long, requires = "join")]
    fill_gaps: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    if args.inputs.is_empty() {
        return Err(Error::NoRecords);
    }
    reject_urls(&args.inputs)?;
    let loader = Loader::new().lenient(args.lenient);

    let progress = ProgressBar::new(args.inputs.len() as _)
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:8}: [{wide_bar:.blue}] {pos:2}/{len:2} inputs ({elapsed_precise}<{eta_precise})")
                .expect("valid template")
                .progress_chars("=> "),
        )
        .with_message("Reading");
    if args.no_progress_bars {
        progress.set_draw_target(ProgressDrawTarget::hidden());
    }

    // Inputs are independent; decode them in parallel, in order.
    let batches: Vec<Result<Vec<Spectrogram>, Error>> = args
        .inputs
        .par_iter()
        .progress_with(progress)
        .map(|input| {
            debug!("Working on {input}");
            loader.load(vec![Input::parse(input)]).map(|v| v.into_vec())
        })
        .collect();

    let mut specs = vec![];
    for (input, batch) in args.inputs.iter().zip(batches) {
        match batch {
            Ok(mut loaded) => specs.append(&mut loaded),
            Err(e) if args.lenient => warn!("skipping {input}: {e}"),
            Err(e) => return Err(e),
        }
    }
    if specs.is_empty() {
        return Err(Error::NoRecords);
    }
    info!("Loaded {} spectrogram(s)", specs.len());
    for spec in &specs {
        println!("{spec}");
    }

    if args.join {
        let options = JoinOptions {
            max_gap: args.max_gap.map(Duration::from_seconds),
            fill_gaps: args.fill_gaps,
        };
        specs.sort_by(|a, b| a.kind().cmp(b.kind()));
        for (kind, group) in &specs.into_iter().group_by(|s| s.kind().to_string()) {
            let joined = join_many(group.collect(), &options)?;
            info!("Joined {kind} spectrograms");
            println!("{joined}");
        }
    }
    Ok(())
}

/// The binary wires in no remote cache, so URL inputs can never succeed;
/// fail them before any work starts.
fn reject_urls(inputs: &[String]) -> Result<(), Error> {
    for input in inputs {
        if matches!(Input::parse(input), Input::Url(_)) {
            return Err(Error::NoRemoteCache(input.clone()));
        }
    }
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
