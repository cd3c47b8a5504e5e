//! Line-number programs: compact encoding of a method's sequence points.
//!
//! A method's sequence points map body offsets to source positions. Offsets and rows mostly
//! grow by small steps, so the list is stored as a small state machine program in the style of
//! DWARF `.debug_line`: most entries collapse into a single "special opcode" byte that advances
//! both the offset and the row and records an entry.
//!
//! # Key Components
//!
//! - **Types**: [`LineNumberEntry`], [`LineNumberTable`], [`LineProgramOptions`]
//! - **Encoder**: [`encode`]
//! - **Decoder**: [`decode`]
//!
//! # Format Specification
//!
//! The state machine starts at `line = 1, offset = 0, file = 1, hidden = false`.
//!
//! | Byte                      | Meaning                                                       |
//! |---------------------------|---------------------------------------------------------------|
//! | `0x00 len sub ...`        | Extended opcode; `len` counts `sub` and its operands          |
//! | `0x01`                    | Copy: record an entry from the current state                  |
//! | `0x02 uleb`               | Advance offset                                                |
//! | `0x03 sleb`               | Advance line (signed, as 32-bit pattern)                      |
//! | `0x04 uleb`               | Set file                                                      |
//! | `0x08`                    | Advance offset by `(255 - opcode_base) / line_range`          |
//! | `>= opcode_base`          | Special opcode: advance offset and line, then record an entry |
//!
//! Extended sub-opcodes: `0x01` end of sequence, `0x04` set file, `0x40` toggle hidden;
//! `0x41..=0x7F` are reserved and skipped by their declared length.
//!
//! After the end-of-sequence marker, a method flagged with column information stores one column
//! per entry, and a method flagged with end information stores per entry either `0xFFFFFF`
//! (no end) or the end-row delta followed by the end column.
//!
//! # Examples
//!
//! ```rust
//! use std::io::Cursor;
//! use symstore::{
//!     symbols::lineprogram::{decode, encode, LineNumberEntry, LineProgramOptions},
//!     Parser,
//! };
//!
//! let options = LineProgramOptions::default();
//! let entries = vec![
//!     LineNumberEntry::new(1, 12, 0, false).with_column(9),
//!     LineNumberEntry::new(1, 13, 6, false).with_column(13),
//! ];
//!
//! let program = encode(&entries, &options, true, false)?;
//! let table = decode(&mut Parser::new(Cursor::new(program)), &options, true, false)?;
//! assert_eq!(table.entries(), entries.as_slice());
//! # Ok::<(), symstore::Error>(())
//! ```

mod decoder;
mod encoder;
mod types;

pub use decoder::decode;
pub use encoder::encode;
pub use types::{
    LineNumberEntry, LineNumberTable, LineProgramOptions, DEFAULT_LINE_BASE, DEFAULT_LINE_RANGE,
    DEFAULT_OPCODE_BASE,
};

pub(crate) const DW_LNS_COPY: u8 = 1;
pub(crate) const DW_LNS_ADVANCE_PC: u8 = 2;
pub(crate) const DW_LNS_ADVANCE_LINE: u8 = 3;
pub(crate) const DW_LNS_SET_FILE: u8 = 4;
pub(crate) const DW_LNS_CONST_ADD_PC: u8 = 8;

pub(crate) const DW_LNE_END_SEQUENCE: u8 = 1;
pub(crate) const DW_LNE_MONO_SET_SOURCE_FILE: u8 = 4;
pub(crate) const DW_LNE_MONO_NEGATE_IS_HIDDEN: u8 = 0x40;
pub(crate) const DW_LNE_MONO_EXTENSIONS_START: u8 = 0x41;
pub(crate) const DW_LNE_MONO_EXTENSIONS_END: u8 = 0x7F;

/// End-row marker meaning "this entry has no end position".
pub(crate) const NO_END_INFO: u32 = 0x00FF_FFFF;
