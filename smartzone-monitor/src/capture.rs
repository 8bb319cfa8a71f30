//! Symbol file I/O for SmartZone control channel captures.
//!
//! Input modes:
//! - `SymbolFormat::Binary`: one byte per symbol, bit 0 polarity, bit 1 the
//!   sync flag (the layout a correlator sink writes)
//! - `SymbolFormat::Text`:   the same values written as digits `0`–`3`,
//!   whitespace ignored, `#` starts a comment line
//!
//! Also reads the `id g cmd` word lists used by the `encode` subcommand.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use smartzone_core::{Osw, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SymbolFormat {
    Binary,
    Text,
}

impl SymbolFormat {
    /// `.txt` files are text, anything else binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => SymbolFormat::Text,
            _ => SymbolFormat::Binary,
        }
    }
}

// ---------------------------------------------------------------------------
// Symbol Reader
// ---------------------------------------------------------------------------

/// Reads a recorded symbol stream.
pub struct SymbolReader {
    path: PathBuf,
    format: SymbolFormat,
    symbol_rate: u32,
}

impl SymbolReader {
    pub fn new(path: impl Into<PathBuf>, symbol_rate: u32) -> Self {
        let path = path.into();
        let format = SymbolFormat::from_path(&path);
        SymbolReader {
            path,
            format,
            symbol_rate,
        }
    }

    pub fn with_format(mut self, format: SymbolFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> SymbolFormat {
        self.format
    }

    /// Read every symbol in the file.
    pub fn read_all(&self) -> io::Result<Vec<Symbol>> {
        match self.format {
            SymbolFormat::Binary => Ok(fs::read(&self.path)?.into_iter().map(Symbol::from).collect()),
            SymbolFormat::Text => Ok(parse_text_symbols(&fs::read_to_string(&self.path)?)),
        }
    }

    /// Stream time of symbol `index`, in seconds from the start of the file.
    pub fn timestamp(&self, index: usize) -> f64 {
        index as f64 / self.symbol_rate.max(1) as f64
    }
}

/// Parse digit text into symbols. Characters other than `0`–`3` are skipped.
pub fn parse_text_symbols(text: &str) -> Vec<Symbol> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .flat_map(|l| l.chars())
        .filter_map(|c| match c {
            '0'..='3' => Some(Symbol::from(c as u8 - b'0')),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write symbols in the given format. Text output wraps at 76 digits.
pub fn write_symbols(path: &Path, symbols: &[Symbol], format: SymbolFormat) -> io::Result<()> {
    match format {
        SymbolFormat::Binary => {
            let bytes: Vec<u8> = symbols.iter().map(|s| s.to_byte()).collect();
            fs::write(path, bytes)
        }
        SymbolFormat::Text => {
            let mut text = String::with_capacity(symbols.len() + symbols.len() / 76 + 1);
            for chunk in symbols.chunks(76) {
                text.extend(chunk.iter().map(|s| char::from(b'0' + s.to_byte())));
                text.push('\n');
            }
            fs::write(path, text)
        }
    }
}

/// Parse an `id g cmd` line: hex id, group flag 0/1, hex command.
///
/// Blank lines and `#` comments give `None`, as do malformed lines.
pub fn parse_osw_line(line: &str) -> Option<Osw> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut fields = line.split_whitespace();
    let id = u16::from_str_radix(strip_hex(fields.next()?), 16).ok()?;
    let group = match fields.next()? {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    let cmd = u16::from_str_radix(strip_hex(fields.next()?), 16).ok()?;
    if cmd > 0x3ff || fields.next().is_some() {
        return None;
    }
    Some(Osw::new(id, group, cmd))
}

fn strip_hex(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
