//! Line-number program encoder.

use crate::{
    file::io::{size_7bit_encoded_int, write_7bit_encoded_i32, write_7bit_encoded_int},
    symbols::lineprogram::{
        LineNumberEntry, LineProgramOptions, DW_LNE_END_SEQUENCE, DW_LNE_MONO_NEGATE_IS_HIDDEN,
        DW_LNE_MONO_SET_SOURCE_FILE, DW_LNS_ADVANCE_LINE, DW_LNS_ADVANCE_PC, DW_LNS_CONST_ADD_PC,
        DW_LNS_COPY, NO_END_INFO,
    },
    Result,
};

/// Encode `entries` into a line-number program.
///
/// Column information is appended after the end-of-sequence marker when `include_columns` is
/// set, end positions when `include_ends` is set; otherwise they are dropped.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if an offset decreases between consecutive entries.
///
/// # Examples
///
/// ```rust
/// use symstore::symbols::lineprogram::{encode, LineNumberEntry, LineProgramOptions};
///
/// let entries = [
///     LineNumberEntry::new(1, 1, 0, false),
///     LineNumberEntry::new(1, 2, 3, false),
/// ];
/// let program = encode(&entries, &LineProgramOptions::default(), false, false)?;
/// // two special opcodes followed by end-of-sequence
/// assert_eq!(program, [0x0A, 0x23, 0x00, 0x01, 0x01]);
/// # Ok::<(), symstore::Error>(())
/// ```
pub fn encode(
    entries: &[LineNumberEntry],
    options: &LineProgramOptions,
    include_columns: bool,
    include_ends: bool,
) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(options);
    for entry in entries {
        encoder.push(entry)?;
    }
    let mut program = encoder.finish();

    if include_columns {
        for entry in entries {
            write_7bit_encoded_i32(entry.column, &mut program);
        }
    }

    if include_ends {
        for entry in entries {
            if entry.end_row == -1 && entry.end_column == -1 {
                write_7bit_encoded_int(NO_END_INFO, &mut program);
            } else {
                write_7bit_encoded_i32(entry.end_row.wrapping_sub(entry.row), &mut program);
                write_7bit_encoded_i32(entry.end_column, &mut program);
            }
        }
    }

    Ok(program)
}

struct Encoder<'a> {
    options: &'a LineProgramOptions,
    buffer: Vec<u8>,
    last_line: i32,
    last_offset: u32,
    last_file: u32,
    last_hidden: bool,
}

impl<'a> Encoder<'a> {
    fn new(options: &'a LineProgramOptions) -> Self {
        Encoder {
            options,
            buffer: Vec::new(),
            last_line: 1,
            last_offset: 0,
            last_file: 1,
            last_hidden: false,
        }
    }

    fn push(&mut self, entry: &LineNumberEntry) -> Result<()> {
        if entry.file != self.last_file {
            self.set_file(entry.file)?;
            self.last_file = entry.file;
        }

        if entry.is_hidden != self.last_hidden {
            self.buffer
                .extend_from_slice(&[0, 1, DW_LNE_MONO_NEGATE_IS_HIDDEN]);
            self.last_hidden = entry.is_hidden;
        }

        let Some(mut offset_delta) = entry.offset.checked_sub(self.last_offset) else {
            return Err(malformed_error!(
                "Line number entry offset {} precedes previous offset {}",
                entry.offset,
                self.last_offset
            ));
        };

        let max_increment = self.options.max_address_increment();
        if offset_delta >= max_increment {
            if offset_delta < 2 * max_increment {
                self.buffer.push(DW_LNS_CONST_ADD_PC);
                offset_delta -= max_increment;
            } else {
                self.buffer.push(DW_LNS_ADVANCE_PC);
                write_7bit_encoded_int(offset_delta, &mut self.buffer);
                offset_delta = 0;
            }
        }

        let line_delta = entry.row.wrapping_sub(self.last_line);
        let line_base = self.options.line_base();
        let line_range = i32::from(self.options.line_range());
        if line_delta < line_base || line_delta >= line_base + line_range {
            self.buffer.push(DW_LNS_ADVANCE_LINE);
            write_7bit_encoded_i32(line_delta, &mut self.buffer);
            if offset_delta != 0 {
                self.buffer.push(DW_LNS_ADVANCE_PC);
                write_7bit_encoded_int(offset_delta, &mut self.buffer);
            }
            self.buffer.push(DW_LNS_COPY);
        } else {
            // line_delta - line_base < line_range and offset_delta < max_increment keep this
            // below 256.
            #[allow(clippy::cast_sign_loss)]
            let special = u32::from(self.options.opcode_base())
                + (line_delta - line_base) as u32
                + u32::from(self.options.line_range()) * offset_delta;
            let special = u8::try_from(special)
                .map_err(|_| malformed_error!("Special opcode {} overflows a byte", special))?;
            self.buffer.push(special);
        }

        self.last_line = entry.row;
        self.last_offset = entry.offset;
        Ok(())
    }

    fn set_file(&mut self, file: u32) -> Result<()> {
        let length = u8::try_from(1 + size_7bit_encoded_int(file))
            .map_err(|_| malformed_error!("Extended opcode too long"))?;
        self.buffer
            .extend_from_slice(&[0, length, DW_LNE_MONO_SET_SOURCE_FILE]);
        write_7bit_encoded_int(file, &mut self.buffer);
        Ok(())
    }

    fn finish(mut self) -> Vec<u8> {
        self.buffer.extend_from_slice(&[0, 1, DW_LNE_END_SEQUENCE]);
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> LineProgramOptions {
        LineProgramOptions::default()
    }

    #[test]
    fn empty_program() {
        assert_eq!(encode(&[], &options(), true, true).unwrap(), [0, 1, 1]);
    }

    #[test]
    fn special_opcodes() {
        // (row 1, offset 0): line delta 0, offset delta 0 -> 9 + 1 = 10
        // (row 2, offset 3): line delta 1, offset delta 3 -> 9 + 2 + 24 = 35
        // (row 1, offset 3): line delta -1, offset delta 0 -> 9 + 0 = 9
        let entries = [
            LineNumberEntry::new(1, 1, 0, false),
            LineNumberEntry::new(1, 2, 3, false),
            LineNumberEntry::new(1, 1, 3, false),
        ];
        assert_eq!(
            encode(&entries, &options(), false, false).unwrap(),
            [10, 35, 9, 0, 1, 1]
        );
    }

    #[test]
    fn advance_line_and_pc() {
        // line delta 99 is out of range, offset delta 5 stays below the max increment
        let entries = [LineNumberEntry::new(1, 100, 5, false)];
        assert_eq!(
            encode(&entries, &options(), false, false).unwrap(),
            [
                DW_LNS_ADVANCE_LINE,
                99,
                DW_LNS_ADVANCE_PC,
                5,
                DW_LNS_COPY,
                0,
                1,
                1
            ]
        );
    }

    #[test]
    fn const_add_pc() {
        // offset delta 40 is in [30, 60): const-add-pc then special with offset delta 10
        let entries = [LineNumberEntry::new(1, 1, 40, false)];
        assert_eq!(
            encode(&entries, &options(), false, false).unwrap(),
            [DW_LNS_CONST_ADD_PC, 9 + 1 + 80, 0, 1, 1]
        );
    }

    #[test]
    fn large_offset_uses_advance_pc() {
        let entries = [LineNumberEntry::new(1, 1, 200, false)];
        assert_eq!(
            encode(&entries, &options(), false, false).unwrap(),
            [DW_LNS_ADVANCE_PC, 0xC8, 0x01, 10, 0, 1, 1]
        );
    }

    #[test]
    fn file_change_and_hidden_toggle() {
        let entries = [LineNumberEntry::new(3, 1, 0, true)];
        assert_eq!(
            encode(&entries, &options(), false, false).unwrap(),
            [0, 2, DW_LNE_MONO_SET_SOURCE_FILE, 3, 0, 1, DW_LNE_MONO_NEGATE_IS_HIDDEN, 10, 0, 1, 1]
        );
    }

    #[test]
    fn columns_and_ends() {
        let entries = [
            LineNumberEntry::new(1, 1, 0, false)
                .with_column(5)
                .with_end(2, 7),
            LineNumberEntry::new(1, 2, 1, false).with_column(-1),
        ];
        let program = encode(&entries, &options(), true, true).unwrap();
        assert_eq!(
            program,
            [
                10,
                9 + 2 + 8,
                0,
                1,
                1,
                // columns
                5,
                0xFF,
                0xFF,
                0xFF,
                0xFF,
                0x0F,
                // ends
                1,
                7,
                0xFF,
                0xFF,
                0xFF,
                0x07
            ]
        );
    }

    #[test]
    fn decreasing_offset_rejected() {
        let entries = [
            LineNumberEntry::new(1, 1, 10, false),
            LineNumberEntry::new(1, 2, 4, false),
        ];
        assert!(matches!(
            encode(&entries, &options(), false, false),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
