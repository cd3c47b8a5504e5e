use std::{collections::HashMap, path::Path};

use anyhow::bail;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::{
        common::{format_position, load_store, parse_number, parse_token},
        lines::LineEntry,
    },
    output::print_output,
};

#[derive(Debug, Serialize)]
struct LookupOutput {
    token: String,
    offset: u32,
    #[serde(flatten)]
    position: LineEntry,
}

pub fn run(path: &Path, token: &str, offset: &str, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;
    let method = store.method_by_token(parse_token(token)?)?;
    let offset = parse_number(offset)?;

    let table = method.line_number_table()?;
    let Some(entry) = table.find(offset) else {
        bail!(
            "offset 0x{offset:x} lies before the first sequence point of method {}",
            method.token()
        );
    };

    let output = LookupOutput {
        token: method.token().to_string(),
        offset,
        position: LineEntry::resolve(&store, &mut HashMap::new(), entry)?,
    };

    print_output(&output, opts, |output| {
        let position = &output.position;
        let column = if position.column < 0 {
            String::new()
        } else {
            format!(":{}", position.column)
        };
        println!(
            "{}+IL_{:04x} -> {}:{}{}{}",
            output.token,
            output.offset,
            position.file,
            format_position(position.row),
            column,
            if position.hidden { " (hidden)" } else { "" }
        );
    })
}
