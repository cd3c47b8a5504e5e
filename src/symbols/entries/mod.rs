//! Entity records stored in a symbol file.
//!
//! Each record knows how to write itself into the data section and read itself back. Fixed-size
//! table records and the file header live in [`crate::symbols::store`]; everything here is
//! variable-length and built from base-128 integers and length-prefixed strings.
//!
//! # Key Components
//!
//! - [`SourceFile`] - A source document and its checksum
//! - [`CompileUnit`] / [`Namespace`] - Compilation inputs and their namespace declarations
//! - [`Method`] / [`MethodDefinition`] - Per-method debug data
//! - [`LocalVariable`], [`CodeBlock`], [`ScopeVariable`] - Method sub-tables
//! - [`AnonymousScope`] - Closure capture metadata

mod anonscope;
mod codeblock;
mod compileunit;
mod local;
mod method;
mod namespace;
mod scopevar;
mod source;

pub use anonscope::{AnonymousScope, CapturedKind, CapturedScope, CapturedVariable};
pub use codeblock::{CodeBlock, CodeBlockKind};
pub use compileunit::CompileUnit;
pub use local::LocalVariable;
pub use method::{Method, MethodDefinition, MethodFlags};
pub(crate) use method::MethodTrailer;
pub use namespace::Namespace;
pub use scopevar::ScopeVariable;
pub use source::SourceFile;
