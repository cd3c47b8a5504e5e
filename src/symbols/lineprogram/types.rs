//! Type definitions for line-number programs.
//!
//! See the parent module [`crate::symbols::lineprogram`] for the opcode format.
//!
//! # Types
//!
//! - [`LineNumberEntry`] - One observation mapping a method-body offset to a source position
//! - [`LineNumberTable`] - The decoded, offset-ordered list of entries for a method
//! - [`LineProgramOptions`] - The header-stored parameters of the special-opcode encoding

use crate::{Error, Result};

/// Default `LineBase` stored in newly authored symbol files.
pub const DEFAULT_LINE_BASE: i32 = -1;
/// Default `LineRange` stored in newly authored symbol files.
pub const DEFAULT_LINE_RANGE: u8 = 8;
/// Default `OpcodeBase` stored in newly authored symbol files.
pub const DEFAULT_OPCODE_BASE: u8 = 9;

/// A single sequence point: the source position a method-body offset maps to.
///
/// `column`, `end_row` and `end_column` use `-1` for "unknown". An entry with every field zero
/// is the reserved [`LineNumberEntry::NULL`] sentinel and is rejected when a method is defined.
///
/// On disk an end line is stored as its distance from `row`, and a distance of `0xFFFFFF` marks
/// an entry without end information. Entries whose `end_row - row` equals that value cannot be
/// stored and are rejected when a method is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    /// 1-based index of the source file.
    pub file: u32,
    /// Start line.
    pub row: i32,
    /// Start column, `-1` if unknown.
    pub column: i32,
    /// End line, `-1` if unknown.
    pub end_row: i32,
    /// End column, `-1` if unknown.
    pub end_column: i32,
    /// Offset into the method body.
    pub offset: u32,
    /// Compiler-generated code that a debugger should step over.
    pub is_hidden: bool,
}

impl LineNumberEntry {
    /// The reserved all-zero sentinel.
    pub const NULL: LineNumberEntry = LineNumberEntry {
        file: 0,
        row: 0,
        column: 0,
        end_row: 0,
        end_column: 0,
        offset: 0,
        is_hidden: false,
    };

    /// Create an entry without column or end information.
    #[must_use]
    pub fn new(file: u32, row: i32, offset: u32, is_hidden: bool) -> Self {
        LineNumberEntry {
            file,
            row,
            column: -1,
            end_row: -1,
            end_column: -1,
            offset,
            is_hidden,
        }
    }

    /// Set the start column.
    #[must_use]
    pub fn with_column(mut self, column: i32) -> Self {
        self.column = column;
        self
    }

    /// Set the end position.
    #[must_use]
    pub fn with_end(mut self, end_row: i32, end_column: i32) -> Self {
        self.end_row = end_row;
        self.end_column = end_column;
        self
    }

    /// Returns `true` for the reserved all-zero sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Returns `true` if this entry carries column information.
    #[must_use]
    pub fn has_column(&self) -> bool {
        self.column != -1
    }

    /// Returns `true` if this entry carries any end-position information.
    #[must_use]
    pub fn has_end(&self) -> bool {
        self.end_row != -1 || self.end_column != -1
    }
}

/// The decoded line-number program of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberTable {
    entries: Vec<LineNumberEntry>,
}

impl LineNumberTable {
    /// Wrap a list of entries.
    #[must_use]
    pub fn new(entries: Vec<LineNumberEntry>) -> Self {
        LineNumberTable { entries }
    }

    /// All entries, in program order.
    #[must_use]
    pub fn entries(&self) -> &[LineNumberEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the program records no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, LineNumberEntry> {
        self.entries.iter()
    }

    /// Find the source position covering `offset`.
    ///
    /// Returns the last visible entry whose offset is at or before `offset`. Hidden entries are
    /// skipped, so an offset inside compiler-generated code resolves to the user statement that
    /// precedes it.
    #[must_use]
    pub fn find(&self, offset: u32) -> Option<&LineNumberEntry> {
        self.entries
            .iter()
            .take_while(|entry| entry.offset <= offset)
            .filter(|entry| !entry.is_hidden)
            .last()
    }

    /// The visible entries with the lowest and highest row, if any.
    #[must_use]
    pub fn method_bounds(&self) -> Option<(&LineNumberEntry, &LineNumberEntry)> {
        let visible = || self.entries.iter().filter(|entry| !entry.is_hidden);
        let start = visible().min_by_key(|entry| entry.row)?;
        let end = visible().max_by_key(|entry| entry.row)?;
        Some((start, end))
    }

    /// Consume the table and return its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<LineNumberEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a LineNumberTable {
    type Item = &'a LineNumberEntry;
    type IntoIter = std::slice::Iter<'a, LineNumberEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parameters of the special-opcode encoding, stored in the symbol file header.
///
/// A special opcode packs a line delta in `[line_base, line_base + line_range)` and an offset
/// delta below [`LineProgramOptions::max_address_increment`] into one byte at or above
/// `opcode_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineProgramOptions {
    line_base: i32,
    line_range: u8,
    opcode_base: u8,
}

impl LineProgramOptions {
    /// Create validated options.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if `line_range` is zero, if `opcode_base` is
    /// below 9 (the standard opcodes must all sit below it), or if `opcode_base + line_range`
    /// exceeds 255 so that no special opcode can carry an offset delta.
    pub fn new(line_base: i32, line_range: u8, opcode_base: u8) -> Result<Self> {
        if line_range == 0 {
            return Err(Error::InvalidConfig("line range must be at least 1".into()));
        }
        if opcode_base < DEFAULT_OPCODE_BASE {
            return Err(Error::InvalidConfig(format!(
                "opcode base {opcode_base} overlaps the standard opcodes"
            )));
        }
        if u32::from(opcode_base) + u32::from(line_range) > 255 {
            return Err(Error::InvalidConfig(format!(
                "opcode base {opcode_base} with line range {line_range} leaves no special opcodes"
            )));
        }
        Ok(LineProgramOptions {
            line_base,
            line_range,
            opcode_base,
        })
    }

    /// Create options from the raw header fields of a symbol file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the values are out of range.
    pub fn from_header(line_base: i32, line_range: i32, opcode_base: i32) -> Result<Self> {
        let (Ok(range), Ok(base)) = (u8::try_from(line_range), u8::try_from(opcode_base)) else {
            return Err(malformed_error!(
                "Invalid line program parameters: range {}, opcode base {}",
                line_range,
                opcode_base
            ));
        };
        Self::new(line_base, range, base)
            .map_err(|e| malformed_error!("Invalid line program parameters: {}", e))
    }

    /// Smallest line delta a special opcode can express.
    #[must_use]
    pub fn line_base(&self) -> i32 {
        self.line_base
    }

    /// Number of line deltas a special opcode can express.
    #[must_use]
    pub fn line_range(&self) -> u8 {
        self.line_range
    }

    /// First byte value used for special opcodes.
    #[must_use]
    pub fn opcode_base(&self) -> u8 {
        self.opcode_base
    }

    /// Offset delta added by the `const-add-pc` opcode; special opcodes cover offset deltas
    /// strictly below it.
    #[must_use]
    pub fn max_address_increment(&self) -> u32 {
        (255 - u32::from(self.opcode_base)) / u32::from(self.line_range)
    }
}

impl Default for LineProgramOptions {
    fn default() -> Self {
        LineProgramOptions {
            line_base: DEFAULT_LINE_BASE,
            line_range: DEFAULT_LINE_RANGE,
            opcode_base: DEFAULT_OPCODE_BASE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = LineProgramOptions::default();
        assert_eq!(options.line_base(), -1);
        assert_eq!(options.line_range(), 8);
        assert_eq!(options.opcode_base(), 9);
        assert_eq!(options.max_address_increment(), 30);
    }

    #[test]
    fn invalid_options() {
        assert!(LineProgramOptions::new(-1, 0, 9).is_err());
        assert!(LineProgramOptions::new(-1, 8, 8).is_err());
        assert!(LineProgramOptions::new(-3, 12, 13).is_ok());
        assert!(matches!(
            LineProgramOptions::from_header(-1, 300, 9),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn special_opcodes_must_fit_a_byte() {
        let widest = LineProgramOptions::new(-1, 8, 247).unwrap();
        assert_eq!(widest.max_address_increment(), 1);
        let entries = [LineNumberEntry::new(1, 6, 0, false)];
        assert!(crate::symbols::lineprogram::encode(&entries, &widest, false, false).is_ok());

        assert!(matches!(
            LineProgramOptions::new(-1, 8, 248),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LineProgramOptions::new(-1, 8, 250),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LineProgramOptions::from_header(-1, 8, 250),
            Err(Error::Malformed { .. })
        ));
        assert!(LineProgramOptions::from_header(-1, 8, 247).is_ok());
    }

    #[test]
    fn null_sentinel() {
        assert!(LineNumberEntry::NULL.is_null());
        assert!(!LineNumberEntry::new(1, 1, 0, false).is_null());
        assert!(!LineNumberEntry::new(0, 0, 0, false).is_null());
    }

    #[test]
    fn find_skips_hidden_entries() {
        let table = LineNumberTable::new(vec![
            LineNumberEntry::new(1, 10, 0, false),
            LineNumberEntry::new(1, 11, 4, false),
            LineNumberEntry::new(1, 0xFEEFEE, 8, true),
            LineNumberEntry::new(1, 14, 12, false),
        ]);

        assert_eq!(table.find(0).map(|e| e.row), Some(10));
        assert_eq!(table.find(5).map(|e| e.row), Some(11));
        assert_eq!(table.find(9).map(|e| e.row), Some(11));
        assert_eq!(table.find(100).map(|e| e.row), Some(14));
    }

    #[test]
    fn find_before_first_entry() {
        let table = LineNumberTable::new(vec![LineNumberEntry::new(1, 3, 2, false)]);
        assert!(table.find(1).is_none());
        assert!(LineNumberTable::default().find(0).is_none());
    }

    #[test]
    fn method_bounds() {
        let table = LineNumberTable::new(vec![
            LineNumberEntry::new(1, 12, 0, false),
            LineNumberEntry::new(1, 9, 2, false),
            LineNumberEntry::new(1, 500, 3, true),
            LineNumberEntry::new(1, 20, 6, false),
        ]);
        let (start, end) = table.method_bounds().unwrap();
        assert_eq!(start.row, 9);
        assert_eq!(end.row, 20);
    }
}
