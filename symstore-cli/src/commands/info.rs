use std::path::Path;

use serde::Serialize;

use crate::{app::GlobalOptions, commands::common::load_store, output::print_output};

#[derive(Debug, Serialize)]
pub struct StoreInfo {
    pub guid: String,
    pub version: String,
    pub file_size: u32,
    pub sources: u32,
    pub compile_units: u32,
    pub methods: u32,
    pub types: u32,
    pub anonymous_scopes: u32,
    pub line_base: i32,
    pub line_range: u8,
    pub opcode_base: u8,
    pub flags: String,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;
    let header = store.header()?;
    let options = store.line_program_options();

    let info = StoreInfo {
        guid: store.guid()?.to_string(),
        version: format!(
            "{}.{}",
            symstore::symbols::store::header::MAJOR_VERSION,
            symstore::symbols::store::header::MINOR_VERSION
        ),
        file_size: header.total_file_size,
        sources: store.source_count(),
        compile_units: store.compile_unit_count(),
        methods: store.method_count(),
        types: store.type_count(),
        anonymous_scopes: store.anonymous_scope_count(),
        line_base: options.line_base(),
        line_range: options.line_range(),
        opcode_base: options.opcode_base(),
        flags: format!("{:?}", store.file_flags()),
    };

    print_output(&info, opts, |info| {
        println!("GUID:             {}", info.guid);
        println!("Version:          {}", info.version);
        println!("File size:        {}", info.file_size);
        println!("Sources:          {}", info.sources);
        println!("Compile units:    {}", info.compile_units);
        println!("Methods:          {}", info.methods);
        println!("Types:            {}", info.types);
        println!("Anonymous scopes: {}", info.anonymous_scopes);
        println!(
            "Line program:     base {}, range {}, opcode base {}",
            info.line_base, info.line_range, info.opcode_base
        );
        println!("Flags:            {}", info.flags);
    })
}
