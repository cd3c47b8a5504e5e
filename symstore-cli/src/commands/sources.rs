use std::path::Path;

use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{format_checksum, load_store},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct SourceEntry {
    index: u32,
    file_name: String,
    checksum: String,
    auto_generated: bool,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let store = load_store(path)?;

    let sources: Vec<SourceEntry> = store
        .sources()?
        .iter()
        .map(|source| SourceEntry {
            index: source.index,
            file_name: source.file_name.clone(),
            checksum: format_checksum(&source.checksum),
            auto_generated: source.auto_generated,
        })
        .collect();

    print_output(&sources, opts, |sources| {
        let mut tw = TabWriter::new(&[
            ("#", Align::Right),
            ("File", Align::Left),
            ("MD5", Align::Left),
            ("Generated", Align::Left),
        ]);
        for source in sources {
            tw.row(vec![
                source.index.to_string(),
                source.file_name.clone(),
                source.checksum.clone(),
                if source.auto_generated { "yes" } else { "" }.to_string(),
            ]);
        }
        tw.print();
    })
}
