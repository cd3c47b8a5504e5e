use thiserror::Error;

use crate::symbols::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three families, and callers are expected to treat each family
/// differently:
///
/// ## Format errors
/// - [`Error::Malformed`] - Corrupted symbol file, unknown line-program opcode, or a method that
///   violates the entry invariants (null sequence point, decreasing offsets)
/// - [`Error::UnsupportedVersion`] - The file was written by an incompatible format version
/// - [`Error::GuidMismatch`] - The symbol file belongs to a different module
///
/// These are fatal; retrying the same operation yields the same error.
///
/// ## Usage errors
/// - [`Error::ReadOnly`] - Attempted to mutate a store that was opened for reading
/// - [`Error::NotBound`] - Attempted to read from a store that is still being authored
/// - [`Error::AlreadySealed`] - Attempted to mutate or seal a store twice
/// - [`Error::UnbalancedBlock`] - Closed a code block that was never opened, or left one open
/// - [`Error::Duplicate`] - Reused a token or identifier
/// - [`Error::InvalidConfig`] - Line-program parameters that cannot encode a valid program
///
/// These indicate a bug in the caller.
///
/// ## Lookup errors
/// - [`Error::OutOfBounds`] - An index outside `1..=count`, or a read past end-of-stream
/// - [`Error::NotFound`] - No entry with the requested key
/// - [`Error::MethodNotFound`] - No method with the requested token
///
/// # Examples
///
/// ```rust,no_run
/// use symstore::{Error, SymbolStore};
///
/// let bytes = std::fs::read("Assembly-CSharp.dll.mdb")?;
/// match SymbolStore::open(std::io::Cursor::new(bytes)) {
///     Ok(store) => println!("{} methods", store.method_count()),
///     Err(Error::UnsupportedVersion { major, minor }) => {
///         eprintln!("unsupported symbol file version {major}.{minor}");
///     }
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged or an entry violates the format invariants.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The symbol file carries a version this library does not read.
    #[error("Unsupported symbol file version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version found in the preamble
        major: i32,
        /// Minor version found in the preamble
        minor: i32,
    },

    /// The symbol file was written for a different module.
    #[error("Symbol file GUID {found} does not match expected {expected}")]
    GuidMismatch {
        /// The GUID the caller asked for
        expected: uguid::Guid,
        /// The GUID stored in the file
        found: uguid::Guid,
    },

    /// An out of bound access was attempted.
    ///
    /// Raised for table indices outside `1..=count` and for reads past the end of the
    /// underlying stream.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// No entry exists for the requested key.
    #[error("Not found - {0}")]
    NotFound(String),

    /// No method was defined with the requested token.
    #[error("No method with token {0}")]
    MethodNotFound(Token),

    /// The store was opened read-only and cannot be modified.
    #[error("The symbol store is bound for reading and cannot be modified")]
    ReadOnly,

    /// The store is still being authored and cannot be read from.
    #[error("The symbol store is not bound to a symbol file")]
    NotBound,

    /// The store was already written out.
    #[error("The symbol store has already been sealed")]
    AlreadySealed,

    /// A code block was closed without being opened, or left open.
    #[error("Unbalanced code block: {0}")]
    UnbalancedBlock(String),

    /// A token or identifier was defined twice.
    #[error("Duplicate definition - {0}")]
    Duplicate(String),

    /// Invalid configuration values.
    #[error("Invalid configuration - {0}")]
    InvalidConfig(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading or writing the symbol stream.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock target.
    ///
    /// This error occurs when the store's lock was poisoned by a panicking reader.
    #[error("Failed to lock target")]
    LockError,
}
