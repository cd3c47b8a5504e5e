//! Stream access for symbol files.
//!
//! A symbol file is produced in one forward pass over a seekable sink and consumed through
//! random access over a seekable source. This module holds the primitives both directions
//! share.
//!
//! # Key Components
//!
//! - [`crate::file::io`] - Little-endian conversions and base-128 integer encoding
//! - [`crate::file::parser::Parser`] - Cursor-based reader over any `Read + Seek` source
//! - [`crate::file::output::Output`] - Positioned writer over any `Write + Seek` sink
//! - [`crate::file::physical::Physical`] - Memory-mapped symbol file on disk
//! - [`crate::file::SymbolSource`] - The object-safe stream type a bound store owns

pub mod io;
pub mod output;
pub mod parser;
pub mod physical;

use std::io::{Read, Seek};

/// A seekable byte source a bound [`crate::SymbolStore`] can take ownership of.
///
/// Implemented for every `Read + Seek + Send` type, e.g. `std::io::Cursor<Vec<u8>>`,
/// `std::fs::File` or `std::io::Cursor<Physical>`.
pub trait SymbolSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> SymbolSource for T {}
