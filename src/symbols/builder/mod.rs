//! Authoring façade over [`crate::SymbolStore`].
//!
//! Compilers emit debug information as a stream of events: a method starts, sequence points
//! are marked as instructions are emitted, scopes open and close, locals are declared, the
//! method ends. [`SymbolWriter`] accepts that event stream and [`MethodBuilder`] turns one
//! method's events into a [`crate::symbols::entries::MethodDefinition`].
//!
//! # Key Components
//!
//! - [`SymbolWriter`] - Stack of open methods plus forwarding to the store
//! - [`MethodBuilder`] - Sequence-point merging, block stack and normalization for one method
//! - [`Document`] - Source file and compile unit indices returned by
//!   [`SymbolWriter::define_document`]

mod method;
mod writer;

pub use method::MethodBuilder;
pub use writer::{Document, SymbolWriter};
