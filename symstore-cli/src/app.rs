use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// symstore - inspect debug-symbol files for rewritten .NET method bodies
#[derive(Debug, Parser)]
#[command(name = "symstore", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display the file header: GUID, version, counts and line-program parameters.
    Info {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List source files with their checksums.
    Sources {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// List methods in token order.
    Methods {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Show only methods whose compile unit belongs to a source file containing this text.
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Dump the decoded line-number table of a method.
    Lines {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Method token (hex like 0x06000012 or decimal).
        #[arg(short, long)]
        token: String,
    },

    /// Map a method-body offset back to its source position.
    Lookup {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Method token (hex like 0x06000012 or decimal).
        #[arg(short, long)]
        token: String,

        /// IL offset inside the method body (hex like 0x1a or decimal).
        #[arg(short, long)]
        offset: String,
    },

    /// List anonymous scopes and what they capture.
    Scopes {
        /// Path to the symbol file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
