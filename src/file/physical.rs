use crate::{Error, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// Read-only memory mapping of a symbol file on disk.
///
/// The mapping implements [`AsRef<[u8]>`], so `std::io::Cursor<Physical>` is a seekable stream a
/// bound [`crate::SymbolStore`] can own.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(Error::FileError)?;

        // The mapping is read-only and the file stays open for the lifetime of the map.
        let mmap = unsafe { Mmap::map(&file) }.map_err(Error::FileError)?;

        Ok(Physical { data: mmap })
    }

    /// Size of the mapped file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the mapped file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Physical {
    fn as_ref(&self) -> &[u8] {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn maps_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x14, 0xA6, 0x7F, 0xFD]).unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();
        assert_eq!(physical.len(), 4);
        assert!(!physical.is_empty());
        assert_eq!(physical.as_ref(), &[0x14, 0xA6, 0x7F, 0xFD]);
    }

    #[test]
    fn invalid_file_path() {
        let result = Physical::new("/nonexistent/path/to/file.mdb");
        match result.unwrap_err() {
            Error::FileError(io_error) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected FileError, got {other:?}"),
        }
    }
}
