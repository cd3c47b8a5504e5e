use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_store,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct CaptureEntry {
    kind: String,
    name: String,
    field: String,
}

#[derive(Debug, Serialize)]
struct ScopeEntry {
    id: u32,
    captures: Vec<CaptureEntry>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;

    let scopes: Vec<ScopeEntry> = store
        .anonymous_scopes()?
        .iter()
        .map(|scope| {
            let variables = scope.captured_variables.iter().map(|variable| CaptureEntry {
                kind: variable.kind.to_string(),
                name: variable.name.clone(),
                field: variable.captured_name.clone(),
            });
            let scopes = scope.captured_scopes.iter().map(|captured| CaptureEntry {
                kind: "Scope".to_string(),
                name: captured.scope.to_string(),
                field: captured.captured_name.clone(),
            });
            ScopeEntry {
                id: scope.id,
                captures: variables.chain(scopes).collect(),
            }
        })
        .collect();

    print_output(&scopes, opts, |scopes| {
        for scope in scopes {
            println!("Scope {} ({} captures):", scope.id, scope.captures.len());
            let mut tw = TabWriter::new(&[
                ("Kind", Align::Left),
                ("Name", Align::Left),
                ("Field", Align::Left),
            ])
            .indent("  ");
            for capture in &scope.captures {
                tw.row(vec![
                    capture.kind.clone(),
                    capture.name.clone(),
                    capture.field.clone(),
                ]);
            }
            tw.print();
        }
    })
}
