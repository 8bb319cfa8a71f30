//! smartzone: SmartZone control channel monitor.
//!
//! Supports:
//! - Decoding recorded control channel symbol streams into an event log,
//!   with channel grants handed to the recording scheduler
//! - Encoding `id g cmd` word lists into symbol files for testing
//! - Band plan lookups in both directions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use smartzone_core::bandplan::{channel_for, frequency_mhz};
use smartzone_core::config::{self, Config};
use smartzone_core::{symbols_for, ControlChannelDecoder, EventLog, GroupTable, Result, Symbol};

mod capture;
mod logwriter;
mod scheduler;

use capture::{parse_osw_line, write_symbols, SymbolFormat, SymbolReader};
use logwriter::LogWriter;

#[derive(Parser)]
#[command(
    name = "smartzone",
    version,
    about = "Motorola SmartZone control channel monitor"
)]
struct Cli {
    /// Config file (default ~/.smartzone/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level diagnostics on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recorded symbol stream
    Decode {
        /// Symbol file (.txt for digit text, anything else one byte per symbol)
        file: PathBuf,

        /// Override the format guessed from the file extension
        #[arg(long, value_enum)]
        format: Option<SymbolFormat>,

        /// Symbols per second, for stream timestamps
        #[arg(long)]
        symbol_rate: Option<u32>,

        /// Talkgroup name CSV
        #[arg(short, long)]
        groups: Option<PathBuf>,

        /// Append event lines to a file rather than stdout
        #[arg(short, long)]
        log_file: Option<PathBuf>,

        /// Leave the date off event lines
        #[arg(long)]
        no_date: bool,

        /// Write events as JSON lines instead of the column log
        #[arg(long)]
        json: bool,
    },
    /// Encode `id g cmd` lines (hex, 0/1, hex) into a symbol file
    Encode {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, value_enum)]
        format: Option<SymbolFormat>,

        /// Unflagged filler symbols before each word
        #[arg(long, default_value = "0")]
        gap: usize,
    },
    /// Channel number for a frequency (MHz or Hz)
    Channel { freq: f64 },
    /// Frequency of a channel number
    Freq { channel: u16 },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Decode {
            file,
            format,
            symbol_rate,
            groups,
            log_file,
            no_date,
            json,
        } => load_config(cli.config.as_deref()).and_then(|mut config| {
            if let Some(rate) = symbol_rate {
                config.control_channel.symbol_rate = rate;
            }
            if let Some(csv) = groups {
                config.groups.csv = Some(csv);
            }
            if let Some(path) = log_file {
                config.log.file = Some(path);
            }
            if no_date {
                config.log.include_date = false;
            }
            cmd_decode(&file, format, json, &config)
        }),
        Commands::Encode {
            input,
            output,
            format,
            gap,
        } => cmd_encode(&input, &output, format, gap),
        Commands::Channel { freq } => {
            cmd_channel(freq);
            Ok(())
        }
        Commands::Freq { channel } => {
            cmd_freq(channel);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => config::load_config(p),
        None => config::load_default_config(),
    }
}

fn cmd_decode(
    file: &Path,
    format: Option<SymbolFormat>,
    json: bool,
    config: &Config,
) -> Result<()> {
    if let Some(mhz) = config.control_channel.frequency_mhz {
        match channel_for(mhz) {
            Some(chan) => info!(freq = mhz, chan, "control channel"),
            None => warn!(freq = mhz, "control channel frequency is outside the band plan"),
        }
    }

    let groups = match &config.groups.csv {
        Some(path) => match GroupTable::load(path) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("{e}; showing numeric talkgroups");
                None
            }
        },
        None => None,
    };

    let mut reader = SymbolReader::new(file, config.control_channel.symbol_rate);
    if let Some(f) = format {
        reader = reader.with_format(f);
    }
    let symbols = reader.read_all()?;
    info!(
        file = %file.display(),
        symbols = symbols.len(),
        seconds = reader.timestamp(symbols.len()),
        "decoding"
    );

    let mut writer = match &config.log.file {
        Some(path) => LogWriter::append(path, config.log.include_date, config.log.suppress_repeats)?,
        None => LogWriter::stdout(config.log.include_date, config.log.suppress_repeats),
    };
    let mut log = EventLog::new(groups);
    let mut decoder = ControlChannelDecoder::new(config.session.window_secs);
    let (tx, handle) = scheduler::spawn()?;
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();

    for (i, sym) in symbols.into_iter().enumerate() {
        let now = reader.timestamp(i);
        let Some(event) = decoder.push_symbol(sym, now) else {
            continue;
        };
        *counts.entry(event.kind()).or_default() += 1;
        if let Some(a) = event.assignment() {
            if tx.send((*a, now)).is_err() {
                warn!("recording scheduler has stopped");
            }
        }
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    writer.write_line(&line, now)?;
                }
                Err(e) => warn!(kind = event.kind(), "cannot serialize event: {e}"),
            }
            continue;
        }
        for line in log.lines(&event) {
            writer.write_line(&line, now)?;
        }
    }
    drop(tx);

    let schedule = handle
        .join()
        .map_err(|_| std::io::Error::other("recording scheduler thread panicked"))?;

    info!(
        valid = decoder.valid_words(),
        crc_errors = decoder.crc_errors(),
        error_rate = %format!("{:.1}%", 100.0 * decoder.error_rate()),
        "decode finished"
    );
    for (kind, n) in &counts {
        info!(kind, n, "events");
    }
    for line in schedule.summary() {
        info!("{line}");
    }
    Ok(())
}

fn cmd_encode(input: &Path, output: &Path, format: Option<SymbolFormat>, gap: usize) -> Result<()> {
    let text = std::fs::read_to_string(input)?;
    let mut symbols = Vec::new();
    let mut words = 0usize;

    for (lineno, line) in text.lines().enumerate() {
        match parse_osw_line(line) {
            Some(osw) => {
                symbols.extend(std::iter::repeat(Symbol::new(0, false)).take(gap));
                symbols.extend(symbols_for(&osw));
                words += 1;
            }
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    warn!(line = lineno + 1, text = trimmed, "skipping malformed word");
                }
            }
        }
    }

    let format = format.unwrap_or_else(|| SymbolFormat::from_path(output));
    write_symbols(output, &symbols, format)?;
    info!(
        words,
        symbols = symbols.len(),
        output = %output.display(),
        "encoded"
    );
    Ok(())
}

fn cmd_channel(freq: f64) {
    match channel_for(freq) {
        Some(chan) => println!("{chan}"),
        None => {
            error!(freq, "frequency is not in the band plan");
            std::process::exit(1);
        }
    }
}

fn cmd_freq(channel: u16) {
    match frequency_mhz(channel) {
        Some(mhz) => println!("{mhz:.4}"),
        None => {
            error!(channel, "channel is not in the band plan");
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
