//! Single-pass writer for authoring stores.
//!
//! The preamble and a zeroed header go out first. Every variable-length payload follows in the
//! data section, recording its own offset from the write position; the fixed-size tables come
//! next; finally the writer seeks back, patches the header once, and returns to the end.

use std::io::{Seek, Write};

use crate::{
    file::{io::len_u32, output::Output},
    symbols::{
        entries::{CodeBlock, LocalVariable, Method, MethodFlags, MethodTrailer, ScopeVariable},
        lineprogram::{encode, LineProgramOptions},
        store::{
            header::{
                Header, Preamble, COMPILE_UNIT_RECORD_SIZE, HEADER_SIZE, METHOD_RECORD_SIZE,
                PREAMBLE_SIZE, SOURCE_RECORD_SIZE,
            },
            Authoring,
        },
        token::Token,
    },
    Result,
};

struct MethodRecord {
    token: Token,
    data_offset: u32,
    line_table_offset: u32,
}

/// Write `authoring` to `output` and return the header that was patched in.
///
/// Methods are sorted by token and numbered from 1 before anything is written.
pub(crate) fn write_symbol_file<W: Write + Seek>(
    authoring: &mut Authoring,
    output: &mut Output<W>,
    guid: uguid::Guid,
) -> Result<Header> {
    authoring.methods.sort_by_key(Method::token);
    for (index, method) in (1u32..).zip(authoring.methods.iter_mut()) {
        method.set_index(index);
    }

    let line_program = authoring.options.line_program();
    let mut header = Header {
        type_count: authoring.last_type_index,
        line_base: line_program.line_base(),
        line_range: i32::from(line_program.line_range()),
        opcode_base: i32::from(line_program.opcode_base()),
        file_flags: authoring.options.file_flags().bits(),
        ..Header::default()
    };

    output.seek(0)?;
    output.write_bytes(&Preamble::new(guid).to_bytes()?)?;
    output.write_bytes(&[0u8; HEADER_SIZE])?;

    // data section
    header.data_section_offset = output.pos()?;

    let mut source_offsets = Vec::with_capacity(authoring.sources.len());
    for source in &authoring.sources {
        source_offsets.push((source.index, output.pos()?));
        source.write(output)?;
    }

    let mut unit_offsets = Vec::with_capacity(authoring.compile_units.len());
    for unit in &authoring.compile_units {
        unit_offsets.push((unit.index, output.pos()?));
        unit.write(output)?;
    }

    let mut method_records = Vec::with_capacity(authoring.methods.len());
    for method in &authoring.methods {
        method_records.push(write_method(method, &line_program, output)?);
    }

    header.data_section_size = output.pos()? - header.data_section_offset;

    // method table
    header.method_count = len_u32(method_records.len())?;
    header.method_table_offset = output.pos()?;
    for record in &method_records {
        output.write_le(record.token.value())?;
        output.write_le(record.data_offset)?;
        output.write_le(record.line_table_offset)?;
    }
    header.method_table_size = output.pos()? - header.method_table_offset;
    debug_assert_eq!(header.method_table_size, header.method_count * METHOD_RECORD_SIZE);

    // source table
    header.source_count = len_u32(source_offsets.len())?;
    header.source_table_offset = output.pos()?;
    for (index, offset) in &source_offsets {
        output.write_le(*index)?;
        output.write_le(*offset)?;
    }
    header.source_table_size = output.pos()? - header.source_table_offset;
    debug_assert_eq!(header.source_table_size, header.source_count * SOURCE_RECORD_SIZE);

    // compile unit table
    header.compile_unit_count = len_u32(unit_offsets.len())?;
    header.compile_unit_table_offset = output.pos()?;
    for (index, offset) in &unit_offsets {
        output.write_le(*index)?;
        output.write_le(*offset)?;
    }
    header.compile_unit_table_size = output.pos()? - header.compile_unit_table_offset;
    debug_assert_eq!(
        header.compile_unit_table_size,
        header.compile_unit_count * COMPILE_UNIT_RECORD_SIZE
    );

    // anonymous scope table
    header.anonymous_scope_count = len_u32(authoring.anonymous_scopes.len())?;
    header.anonymous_scope_table_offset = output.pos()?;
    for scope in &authoring.anonymous_scopes {
        scope.write(output)?;
    }
    header.anonymous_scope_table_size = output.pos()? - header.anonymous_scope_table_offset;

    header.total_file_size = output.pos()?;

    #[allow(clippy::cast_possible_truncation)]
    output.seek(PREAMBLE_SIZE as u32)?;
    output.write_bytes(&header.to_bytes()?)?;
    output.seek_end()?;

    log::debug!(
        "sealed symbol file {}: {} sources, {} compile units, {} methods, {} bytes",
        guid,
        header.source_count,
        header.compile_unit_count,
        header.method_count,
        header.total_file_size
    );

    Ok(header)
}

fn write_method<W: Write + Seek>(
    method: &Method,
    options: &LineProgramOptions,
    output: &mut Output<W>,
) -> Result<MethodRecord> {
    let flags = method.flags();

    let local_table_offset = output.pos()?;
    LocalVariable::write_table(&method.locals()?, output)?;

    let code_block_table_offset = output.pos()?;
    CodeBlock::write_table(&method.code_blocks()?, output)?;

    let scope_variable_table_offset = output.pos()?;
    ScopeVariable::write_table(&method.scope_variables()?, output)?;

    let real_name_offset = match method.real_name()? {
        Some(name) => {
            let offset = output.pos()?;
            output.write_prefixed_string_utf8(&name)?;
            offset
        }
        None => 0,
    };

    let line_table_offset = output.pos()?;
    let program = encode(
        method.line_number_table()?.entries(),
        options,
        flags.contains(MethodFlags::COLUMNS_INCLUDED),
        flags.contains(MethodFlags::END_INFO_INCLUDED),
    )?;
    output.write_bytes(&program)?;

    let data_offset = output.pos()?;
    MethodTrailer {
        compile_unit: method.compile_unit(),
        local_table_offset,
        namespace_id: method.namespace_id(),
        code_block_table_offset,
        scope_variable_table_offset,
        real_name_offset,
        flags: flags.bits(),
    }
    .write(output)?;

    log::trace!("wrote method {} at {}", method.token(), data_offset);

    Ok(MethodRecord {
        token: method.token(),
        data_offset,
        line_table_offset,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        file::io::read_le_at,
        symbols::{
            entries::{MethodDefinition, SourceFile},
            lineprogram::LineNumberEntry,
            store::StoreOptions,
        },
    };

    fn seal(authoring: &mut Authoring) -> (Header, Vec<u8>) {
        let mut output = Output::new(Cursor::new(Vec::new()));
        let header = write_symbol_file(authoring, &mut output, uguid::Guid::ZERO).unwrap();
        (header, output.into_inner().into_inner())
    }

    #[test]
    fn empty_store_layout() {
        let mut authoring = Authoring::new(StoreOptions::default());
        let (header, bytes) = seal(&mut authoring);

        let start = u32::try_from(PREAMBLE_SIZE + HEADER_SIZE).unwrap();
        assert_eq!(header.data_section_offset, start);
        assert_eq!(header.data_section_size, 0);
        assert_eq!(header.method_table_offset, start);
        assert_eq!(header.anonymous_scope_table_offset, start);
        assert_eq!(header.total_file_size, start);
        assert_eq!(bytes.len(), PREAMBLE_SIZE + HEADER_SIZE);

        let patched = Header::read(&bytes[PREAMBLE_SIZE..]).unwrap();
        assert_eq!(patched, header);
        assert_eq!(patched.line_range, 8);
    }

    #[test]
    fn tables_follow_data_section() {
        let mut authoring = Authoring::new(StoreOptions::default());
        authoring
            .sources
            .push(SourceFile { index: 1, ..SourceFile::new("a.cs", vec![]) });
        authoring.methods.push(Method::authoring(
            MethodDefinition::new(Token::new(7), 1)
                .with_line_numbers(vec![LineNumberEntry::new(1, 3, 0, false)]),
            LineProgramOptions::default(),
        ));

        let (header, bytes) = seal(&mut authoring);
        assert_eq!(header.method_count, 1);
        assert_eq!(
            header.method_table_offset,
            header.data_section_offset + header.data_section_size
        );
        assert_eq!(
            header.source_table_offset,
            header.method_table_offset + METHOD_RECORD_SIZE
        );
        assert_eq!(header.total_file_size as usize, bytes.len());

        let mut offset = header.method_table_offset as usize;
        assert_eq!(read_le_at::<u32>(&bytes, &mut offset).unwrap(), 7);
        let data_offset = read_le_at::<u32>(&bytes, &mut offset).unwrap();
        let line_table_offset = read_le_at::<u32>(&bytes, &mut offset).unwrap();
        assert!(line_table_offset < data_offset);
        // special opcode for row 3 at offset 0, then end of sequence
        assert_eq!(
            &bytes[line_table_offset as usize..data_offset as usize],
            &[12, 0, 1, 1]
        );
        assert_eq!(authoring.methods[0].index(), 1);
    }
}
