//! Line-number program decoder.

use std::io::{Read, Seek};

use crate::{
    file::parser::Parser,
    symbols::lineprogram::{
        LineNumberEntry, LineNumberTable, LineProgramOptions, DW_LNE_END_SEQUENCE,
        DW_LNE_MONO_EXTENSIONS_END, DW_LNE_MONO_EXTENSIONS_START, DW_LNE_MONO_NEGATE_IS_HIDDEN,
        DW_LNE_MONO_SET_SOURCE_FILE, DW_LNS_ADVANCE_LINE, DW_LNS_ADVANCE_PC, DW_LNS_CONST_ADD_PC,
        DW_LNS_COPY, DW_LNS_SET_FILE, NO_END_INFO,
    },
    Result,
};

/// Decode a line-number program starting at the parser's current position.
///
/// Column and end information are read back only when the corresponding flag is set; otherwise
/// the decoded entries carry `-1` for them. On success the parser is left directly after the
/// program.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for an unknown standard or extended opcode, and
/// [`crate::Error::OutOfBounds`] if the stream ends before the end-of-sequence marker.
///
/// # Examples
///
/// ```rust
/// use std::io::Cursor;
/// use symstore::{symbols::lineprogram::{decode, LineProgramOptions}, Parser};
///
/// let mut parser = Parser::new(Cursor::new(vec![0x0A, 0x23, 0x00, 0x01, 0x01]));
/// let table = decode(&mut parser, &LineProgramOptions::default(), false, false)?;
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.entries()[1].row, 2);
/// assert_eq!(table.entries()[1].offset, 3);
/// # Ok::<(), symstore::Error>(())
/// ```
pub fn decode<R: Read + Seek>(
    parser: &mut Parser<R>,
    options: &LineProgramOptions,
    include_columns: bool,
    include_ends: bool,
) -> Result<LineNumberTable> {
    let mut entries = read_program(parser, options)?;

    if include_columns {
        for entry in &mut entries {
            entry.column = parser.read_7bit_encoded_i32()?;
        }
    }

    if include_ends {
        for entry in &mut entries {
            let row_delta = parser.read_7bit_encoded_int()?;
            if row_delta == NO_END_INFO {
                entry.end_row = -1;
                entry.end_column = -1;
            } else {
                #[allow(clippy::cast_possible_wrap)]
                let row_delta = row_delta as i32;
                entry.end_row = entry.row.wrapping_add(row_delta);
                entry.end_column = parser.read_7bit_encoded_i32()?;
            }
        }
    }

    Ok(LineNumberTable::new(entries))
}

fn read_program<R: Read + Seek>(
    parser: &mut Parser<R>,
    options: &LineProgramOptions,
) -> Result<Vec<LineNumberEntry>> {
    let mut entries = Vec::new();
    let mut line: i32 = 1;
    let mut offset: u32 = 0;
    let mut file: u32 = 1;
    let mut is_hidden = false;

    loop {
        let opcode = parser.read_le::<u8>()?;

        if opcode == 0 {
            let size = parser.read_le::<u8>()?;
            let end_pos = parser.pos()? + u64::from(size);
            let extended = parser.read_le::<u8>()?;

            match extended {
                DW_LNE_END_SEQUENCE => break,
                DW_LNE_MONO_SET_SOURCE_FILE => file = parser.read_7bit_encoded_int()?,
                DW_LNE_MONO_NEGATE_IS_HIDDEN => is_hidden = !is_hidden,
                DW_LNE_MONO_EXTENSIONS_START..=DW_LNE_MONO_EXTENSIONS_END => {
                    log::trace!("skipping reserved extended opcode {extended:#04x}");
                }
                _ => {
                    return Err(malformed_error!(
                        "Unknown extended opcode {:#04x} in line number program",
                        extended
                    ))
                }
            }

            parser.seek(end_pos)?;
        } else if opcode < options.opcode_base() {
            match opcode {
                DW_LNS_COPY => entries.push(LineNumberEntry::new(file, line, offset, is_hidden)),
                DW_LNS_ADVANCE_PC => {
                    offset = offset.wrapping_add(parser.read_7bit_encoded_int()?);
                }
                DW_LNS_ADVANCE_LINE => {
                    line = line.wrapping_add(parser.read_7bit_encoded_i32()?);
                }
                DW_LNS_SET_FILE => file = parser.read_7bit_encoded_int()?,
                DW_LNS_CONST_ADD_PC => {
                    offset = offset.wrapping_add(options.max_address_increment());
                }
                _ => {
                    return Err(malformed_error!(
                        "Unknown standard opcode {:#04x} in line number program",
                        opcode
                    ))
                }
            }
        } else {
            let adjusted = opcode - options.opcode_base();
            let range = options.line_range();
            offset = offset.wrapping_add(u32::from(adjusted / range));
            line = line.wrapping_add(options.line_base() + i32::from(adjusted % range));
            entries.push(LineNumberEntry::new(file, line, offset, is_hidden));
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{symbols::lineprogram::encode, Error};

    fn decode_bytes(bytes: &[u8], columns: bool, ends: bool) -> Result<LineNumberTable> {
        let mut parser = Parser::new(Cursor::new(bytes.to_vec()));
        decode(&mut parser, &LineProgramOptions::default(), columns, ends)
    }

    fn sample() -> Vec<LineNumberEntry> {
        vec![
            LineNumberEntry::new(1, 10, 0, false).with_column(5).with_end(10, 20),
            LineNumberEntry::new(1, 10, 3, false).with_column(9).with_end(10, 14),
            LineNumberEntry::new(1, 0xFEEFEE, 7, true),
            LineNumberEntry::new(2, 3, 7, false).with_column(1),
            LineNumberEntry::new(2, 2, 45, false).with_column(13).with_end(4, 2),
            LineNumberEntry::new(1, 500, 4000, false).with_column(2),
            LineNumberEntry::new(1, 498, 4001, false),
        ]
    }

    fn without_columns(entries: &[LineNumberEntry]) -> Vec<LineNumberEntry> {
        entries
            .iter()
            .map(|e| LineNumberEntry::new(e.file, e.row, e.offset, e.is_hidden))
            .collect()
    }

    #[test]
    fn decode_roundtrip_without_extras() {
        let options = LineProgramOptions::default();
        let entries = sample();
        let program = encode(&entries, &options, false, false).unwrap();
        let table = decode_bytes(&program, false, false).unwrap();
        assert_eq!(table.entries(), without_columns(&entries).as_slice());
    }

    #[test]
    fn decode_roundtrip_with_columns_and_ends() {
        let options = LineProgramOptions::default();
        let entries = sample();
        let program = encode(&entries, &options, true, true).unwrap();
        let table = decode_bytes(&program, true, true).unwrap();
        assert_eq!(table.entries(), entries.as_slice());
    }

    #[test]
    fn decode_columns_only() {
        let options = LineProgramOptions::default();
        let entries = sample();
        let program = encode(&entries, &options, true, false).unwrap();
        let table = decode_bytes(&program, true, false).unwrap();
        for (decoded, original) in table.iter().zip(&entries) {
            assert_eq!(decoded.column, original.column);
            assert_eq!(decoded.end_row, -1);
            assert_eq!(decoded.end_column, -1);
        }
    }

    #[test]
    fn reencode_is_idempotent() {
        let options = LineProgramOptions::default();
        for (columns, ends) in [(false, false), (true, false), (false, true), (true, true)] {
            let program = encode(&sample(), &options, columns, ends).unwrap();
            let table = decode_bytes(&program, columns, ends).unwrap();
            let again = encode(table.entries(), &options, columns, ends).unwrap();
            assert_eq!(program, again);
        }
    }

    #[test]
    fn custom_options_roundtrip() {
        let options = LineProgramOptions::new(-3, 12, 13).unwrap();
        let entries = without_columns(&sample());
        let program = encode(&entries, &options, false, false).unwrap();
        let mut parser = Parser::new(Cursor::new(program));
        let table = decode(&mut parser, &options, false, false).unwrap();
        assert_eq!(table.entries(), entries.as_slice());
    }

    #[test]
    fn leaves_parser_after_program() {
        let mut bytes = encode(&sample(), &LineProgramOptions::default(), true, true).unwrap();
        let length = bytes.len() as u64;
        bytes.extend_from_slice(&[0xAB, 0xCD]);

        let mut parser = Parser::new(Cursor::new(bytes));
        decode(&mut parser, &LineProgramOptions::default(), true, true).unwrap();
        assert_eq!(parser.pos().unwrap(), length);
    }

    #[test]
    fn skips_reserved_extended_opcodes() {
        // extension 0x41 carrying two payload bytes, then one special opcode
        let bytes = [0x00, 0x03, 0x41, 0xAA, 0xBB, 10, 0x00, 0x01, 0x01];
        let table = decode_bytes(&bytes, false, false).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].row, 1);
    }

    #[test]
    fn standard_set_file() {
        let bytes = [DW_LNS_SET_FILE, 0x05, 10, 0x00, 0x01, 0x01];
        let table = decode_bytes(&bytes, false, false).unwrap();
        assert_eq!(table.entries()[0].file, 5);
    }

    #[test]
    fn unknown_opcodes_rejected() {
        assert!(matches!(
            decode_bytes(&[0x05, 0x00, 0x01, 0x01], false, false),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            decode_bytes(&[0x00, 0x01, 0x02], false, false),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            decode_bytes(&[0x00, 0x01, 0x80], false, false),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn truncated_program() {
        assert!(matches!(
            decode_bytes(&[10, 35], false, false),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
