use std::{collections::HashMap, path::Path};

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::load_store,
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct MethodEntry {
    index: u32,
    token: String,
    source: String,
    namespace: Option<String>,
    real_name: Option<String>,
    sequence_points: usize,
    flags: String,
}

#[derive(Debug, Serialize)]
struct MethodsOutput {
    methods: Vec<MethodEntry>,
    count: usize,
}

pub fn run(path: &Path, source_filter: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;

    let mut unit_sources = HashMap::new();
    for unit in store.compile_units()? {
        let source = store.source_file(unit.source)?;
        unit_sources.insert(unit.index, (source.file_name.clone(), unit));
    }

    let mut methods = Vec::new();
    for method in store.methods()? {
        let Some((file_name, unit)) = unit_sources.get(&method.compile_unit()) else {
            log::warn!(
                "method {} refers to unknown compile unit {}",
                method.token(),
                method.compile_unit()
            );
            continue;
        };

        if let Some(filter) = source_filter {
            if !file_name.to_lowercase().contains(&filter.to_lowercase()) {
                continue;
            }
        }

        methods.push(MethodEntry {
            index: method.index(),
            token: method.token().to_string(),
            source: file_name.clone(),
            namespace: unit
                .namespace(method.namespace_id())
                .map(|namespace| namespace.name.clone()),
            real_name: method.real_name()?,
            sequence_points: method.line_number_table()?.len(),
            flags: format!("{:?}", method.flags()),
        });
    }

    let output = MethodsOutput {
        count: methods.len(),
        methods,
    };

    print_output(&output, opts, |output| {
        let mut tw = TabWriter::new(&[
            ("#", Align::Right),
            ("Token", Align::Left),
            ("Source", Align::Left),
            ("Namespace", Align::Left),
            ("Name", Align::Left),
            ("Points", Align::Right),
        ]);
        for method in &output.methods {
            tw.row(vec![
                method.index.to_string(),
                method.token.clone(),
                method.source.clone(),
                method.namespace.clone().unwrap_or_default(),
                method.real_name.clone().unwrap_or_default(),
                method.sequence_points.to_string(),
            ]);
        }
        tw.print();
        println!("\n{} methods", output.count);
    })
}
