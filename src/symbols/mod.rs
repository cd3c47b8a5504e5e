//! Debug symbols: entities, line-number programs, the store and its authoring façade.
//!
//! # Architecture
//!
//! ```text
//! builder  (SymbolWriter, MethodBuilder)
//!    |
//! store    (SymbolStore: authoring, seal, bound lazy reads)
//!    |
//! entries + lineprogram  (records and the opcode codec)
//!    |
//! crate::file  (Parser, Output, base-128 integers)
//! ```

pub mod builder;
pub mod entries;
pub mod lineprogram;
pub mod store;
pub mod token;
