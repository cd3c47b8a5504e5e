//! # symstore Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the symstore
//! library. Import this module to get quick access to the types needed to write and read symbol
//! files.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all symstore operations
pub use crate::Error;

/// The result type used throughout symstore
pub use crate::Result;

/// Caller-supplied method key
pub use crate::Token;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The symbol store container and its authoring options
pub use crate::{StoreOptions, SymbolStore};

/// Event-style authoring
pub use crate::symbols::builder::{Document, MethodBuilder, SymbolWriter};

/// Low-level stream access
pub use crate::{Parser, Physical};

// ================================================================================================
// Entities
// ================================================================================================

/// Source files, compile units and namespaces
pub use crate::symbols::entries::{CompileUnit, Namespace, SourceFile};

/// Methods and their sub-tables
pub use crate::symbols::entries::{
    CodeBlock, CodeBlockKind, LocalVariable, Method, MethodDefinition, MethodFlags, ScopeVariable,
};

/// Closure capture metadata
pub use crate::symbols::entries::{AnonymousScope, CapturedKind, CapturedScope, CapturedVariable};

// ================================================================================================
// Line-Number Programs
// ================================================================================================

/// Sequence points and their encoding parameters
pub use crate::symbols::lineprogram::{LineNumberEntry, LineNumberTable, LineProgramOptions};

// ================================================================================================
// File Format
// ================================================================================================

/// Header, preamble and file flags
pub use crate::symbols::store::header::{FileFlags, Header, Preamble};
