use std::{collections::HashMap, path::Path};

use serde::Serialize;
use symstore::{symbols::lineprogram::LineNumberEntry, SymbolStore};

use crate::{
    app::GlobalOptions,
    commands::common::{format_position, load_store, parse_token},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
pub struct LineEntry {
    pub offset: u32,
    pub file: String,
    pub row: i32,
    pub column: i32,
    pub end_row: i32,
    pub end_column: i32,
    pub hidden: bool,
}

impl LineEntry {
    /// Resolve `entry`'s file index through `store`, caching names in `names`.
    pub fn resolve(
        store: &SymbolStore,
        names: &mut HashMap<u32, String>,
        entry: &LineNumberEntry,
    ) -> anyhow::Result<Self> {
        let file = match names.get(&entry.file) {
            Some(name) => name.clone(),
            None => {
                let name = store.source_file(entry.file)?.file_name.clone();
                names.insert(entry.file, name.clone());
                name
            }
        };

        Ok(LineEntry {
            offset: entry.offset,
            file,
            row: entry.row,
            column: entry.column,
            end_row: entry.end_row,
            end_column: entry.end_column,
            hidden: entry.is_hidden,
        })
    }
}

#[derive(Debug, Serialize)]
struct LinesOutput {
    token: String,
    entries: Vec<LineEntry>,
}

pub fn run(path: &Path, token: &str, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;
    let method = store.method_by_token(parse_token(token)?)?;
    let table = method.line_number_table()?;

    let mut names = HashMap::new();
    let entries = table
        .iter()
        .map(|entry| LineEntry::resolve(&store, &mut names, entry))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let output = LinesOutput {
        token: method.token().to_string(),
        entries,
    };

    print_output(&output, opts, |output| {
        println!("Method {}:", output.token);
        let mut tw = TabWriter::new(&[
            ("Offset", Align::Right),
            ("File", Align::Left),
            ("Line", Align::Right),
            ("Col", Align::Right),
            ("End", Align::Left),
            ("", Align::Left),
        ])
        .indent("  ");
        for entry in &output.entries {
            tw.row(vec![
                format!("IL_{:04x}", entry.offset),
                entry.file.clone(),
                entry.row.to_string(),
                format_position(entry.column),
                format!(
                    "{}:{}",
                    format_position(entry.end_row),
                    format_position(entry.end_column)
                ),
                if entry.hidden { "hidden" } else { "" }.to_string(),
            ]);
        }
        tw.print();
    })
}
