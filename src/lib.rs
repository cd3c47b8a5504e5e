// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # symstore
//!
//! A standalone store for debug symbols of rewritten or precompiled .NET method bodies.
//!
//! Mod loaders patch method bodies at runtime; the original compiler's symbols no longer line
//! up with the new code. `symstore` records, per method, where each body offset came from in
//! source, along with locals, lexical scopes and closure captures, in a compact single-file
//! format (the Mono MDB layout, version 50.0). Stack traces through patched code can then be
//! mapped back to `(file, line, column)`.
//!
//! ## Features
//!
//! - **📝 Two authoring APIs** - An event-style [`SymbolWriter`] for compilers and IL rewriters,
//!   and the lower-level [`SymbolStore`] for tools that already hold complete tables
//! - **🗜️ Compact line tables** - DWARF-style line-number programs where most sequence points
//!   cost a single byte
//! - **🐢 Lazy reading** - A bound store reads only the header up front; everything else is read
//!   on first access and cached
//! - **🧵 Thread-safe reads** - One bound store can serve any number of reader threads
//! - **📦 Memory-mapped files** - [`SymbolStore::open_path`] maps the file instead of reading it
//!
//! ## Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//! use symstore::prelude::*;
//!
//! // Author
//! let mut writer = SymbolWriter::new();
//! let document = writer.define_document("Assets/Scripts/Player.cs", vec![])?;
//!
//! writer.open_method(Token::new(0x0600_0012), document.compile_unit, 0);
//! writer.mark_sequence_point(0x00, document.source, 41, 9, false);
//! writer.mark_sequence_point(0x07, document.source, 42, 9, false);
//! writer.mark_sequence_point(0x15, document.source, 44, 5, false);
//! writer.close_method()?;
//!
//! let guid = uguid::guid!("6f1c3e0a-2b4d-4c8e-9f10-3a5b7c9d1e2f");
//! let file = writer.write_symbol_file(Cursor::new(Vec::new()), guid)?;
//!
//! // Read back
//! let store = SymbolStore::open_with_guid(Cursor::new(file.into_inner()), guid)?;
//! let method = store.method_by_token(Token::new(0x0600_0012))?;
//! let table = method.line_number_table()?;
//!
//! // offset 0x10 lies in the statement starting at 0x07
//! assert_eq!(table.find(0x10).map(|entry| entry.row), Some(42));
//! # Ok::<(), symstore::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`symbols::builder`] - [`SymbolWriter`] and [`symbols::builder::MethodBuilder`]
//! - [`symbols::store`] - The [`SymbolStore`] container: authoring, sealing and bound reads
//! - [`symbols::entries`] - Source files, compile units, methods and their sub-tables
//! - [`symbols::lineprogram`] - The line-number program encoder and decoder
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## File Layout
//!
//! ```text
//! +----------------------+  0
//! | preamble (32 bytes)  |  magic, version 50.0, module GUID
//! | header   (80 bytes)  |  section offsets, sizes and counts; line-program parameters
//! +----------------------+  data section
//! | source payloads      |
//! | compile unit payloads|
//! | method payloads      |  locals, blocks, scope variables, real name, line program, trailer
//! +----------------------+
//! | method table         |  12-byte records, ascending token order
//! | source table         |  8-byte records
//! | compile unit table   |  8-byte records
//! | anonymous scopes     |
//! +----------------------+
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result<T>`]. Format errors ([`Error::Malformed`],
//! [`Error::UnsupportedVersion`]) are fatal, usage errors ([`Error::ReadOnly`],
//! [`Error::NotBound`], [`Error::AlreadySealed`], [`Error::UnbalancedBlock`]) point at the
//! caller, and lookup errors ([`Error::OutOfBounds`], [`Error::NotFound`]) report a missing key.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use symstore::prelude::*;
///
/// let mut store = SymbolStore::new();
/// let source = store.add_source(SourceFile::new("Enemy.cs", vec![]))?;
/// assert_eq!(source, 1);
/// # Ok::<(), symstore::Error>(())
/// ```
pub mod prelude;

/// Debug symbol entities, the line-number program codec, the store and the authoring façade.
pub mod symbols;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,no_run
/// use symstore::{Result, SymbolStore};
///
/// fn load(path: &str) -> Result<SymbolStore> {
///     SymbolStore::open_path(path)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `symstore` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// The symbol store container.
///
/// See [`symbols::store`] for the authoring, sealed and bound states.
pub use symbols::store::{StoreOptions, SymbolStore};

/// Event-style authoring API.
pub use symbols::builder::SymbolWriter;

/// Caller-supplied method key.
pub use symbols::token::Token;

/// Low-level stream access.
///
/// [`Parser`] reads the primitive encodings of the format from any seekable source, [`Output`]
/// writes them, and [`Physical`] memory-maps a symbol file from disk.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use symstore::Parser;
///
/// let mut parser = Parser::new(Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]));
/// assert_eq!(parser.read_7bit_encoded_i32()?, -1);
/// # Ok::<(), symstore::Error>(())
/// ```
pub use file::{output::Output, parser::Parser, physical::Physical, SymbolSource};
