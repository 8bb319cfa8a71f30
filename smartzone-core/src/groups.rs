//! Talkgroup name table.
//!
//! Loaded from comma-separated text with a header row. Column 1 holds the
//! talkgroup key in hex, column 3 the display name; other columns are kept
//! but unused. Rows that cannot be keyed are skipped.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::types::{Result, SmartZoneError};

const KEY_COLUMN: usize = 1;
const NAME_COLUMN: usize = 3;

/// Talkgroup display records keyed by 12-bit talkgroup number.
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    records: HashMap<u16, Vec<String>>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SmartZoneError::GroupTable(format!("{}: {e}", path.display()))
        })?;
        let table = Self::parse(&text);
        debug!(path = %path.display(), groups = table.len(), "loaded group table");
        Ok(table)
    }

    /// Parse CSV text. The first line is a header and is skipped.
    pub fn parse(text: &str) -> Self {
        let mut records = HashMap::new();
        for (lineno, line) in text.lines().enumerate().skip(1) {
            let fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
            if fields.len() <= KEY_COLUMN {
                continue;
            }
            match u16::from_str_radix(&fields[KEY_COLUMN], 16) {
                Ok(key) => {
                    records.insert(key, fields);
                }
                Err(_) => warn!(
                    line = lineno + 1,
                    key = %fields[KEY_COLUMN],
                    "group table row with unparseable key"
                ),
            }
        }
        GroupTable { records }
    }

    /// Display name for a talkgroup number, when the row has one.
    pub fn name(&self, group: u16) -> Option<&str> {
        self.records
            .get(&group)
            .and_then(|r| r.get(NAME_COLUMN))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Name for a group address as sent over the air: the low nibble holds
    /// the group type, the talkgroup number sits above it.
    pub fn alpha_tag(&self, address: u16) -> Option<&str> {
        self.name((address & 0xfff0) >> 4)
    }

    pub fn record(&self, group: u16) -> Option<&[String]> {
        self.records.get(&group).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Decimal,Hex,Mode,Alpha Tag,Description,Tag
291,123,D,FIRE DISP,Fire Dispatch,Fire
1110,456,A,PD MAIN,Police Main,Law
4095,fff,A
bogus,zz,A,BAD,Bad row,x
";

    #[test]
    fn test_parse_skips_header() {
        let t = GroupTable::parse(SAMPLE);
        assert_eq!(t.len(), 3);
        assert_eq!(t.name(0x123), Some("FIRE DISP"));
        assert_eq!(t.name(0x456), Some("PD MAIN"));
    }

    #[test]
    fn test_short_row_has_no_name() {
        let t = GroupTable::parse(SAMPLE);
        assert!(t.record(0xfff).is_some());
        assert_eq!(t.name(0xfff), None);
    }

    #[test]
    fn test_alpha_tag_uses_upper_bits() {
        let t = GroupTable::parse(SAMPLE);
        assert_eq!(t.alpha_tag(0x1230), Some("FIRE DISP"));
        assert_eq!(t.alpha_tag(0x1237), Some("FIRE DISP"));
        assert_eq!(t.alpha_tag(0x9990), None);
    }

    #[test]
    fn test_load_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let t = GroupTable::load(f.path()).unwrap();
        assert_eq!(t.name(0x456), Some("PD MAIN"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GroupTable::load("/nonexistent/groups.csv").unwrap_err();
        assert!(matches!(err, SmartZoneError::GroupTable(_)));
    }
}
