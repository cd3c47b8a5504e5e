//! Low-level byte order and variable-length integer utilities for symbol file parsing.
//!
//! This module provides endian-aware reading and writing of fixed-width primitives in byte
//! buffers, plus the base-128 integer encoding every variable-length field of a symbol file
//! uses.
//!
//! # Key Components
//!
//! - [`crate::file::io::SymIO`] - Trait defining little-endian conversion for primitive types
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::write_le_at`] - Offset-tracking access
//!   into fixed-size buffers such as the file header
//! - [`crate::file::io::write_7bit_encoded_int`] - Base-128 encoding into a growable buffer
//! - [`crate::file::io::size_7bit_encoded_int`] - Encoded length without writing
//!
//! # Base-128 Integers
//!
//! Each byte carries 7 payload bits, least significant group first, and sets its high bit when
//! another byte follows. Signed values are encoded through their two's-complement `u32` bit
//! pattern, so `-1` occupies five bytes and reads back unchanged.
//!
//! ```rust,ignore
//! use symstore::file::io::write_7bit_encoded_int;
//!
//! let mut buffer = Vec::new();
//! write_7bit_encoded_int(300, &mut buffer);
//! assert_eq!(buffer, [0xAC, 0x02]);
//! ```
//!
//! # Thread Safety
//!
//! All functions are pure and can be called concurrently.

use crate::Result;

/// Trait for type-specific little-endian conversion of primitive values.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait SymIO: Sized + Copy {
    /// Byte array representation of this numeric type.
    type Bytes: Sized + Default + AsRef<[u8]> + AsMut<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_sym_io {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl SymIO for $ty {
                type Bytes = [u8; $size];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_sym_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the size of `T`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: SymIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Safely writes a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the size of `T`.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into the buffer.
pub fn write_le_at<T: SymIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Appends the base-128 encoding of `value` to `buffer`.
pub fn write_7bit_encoded_int(mut value: u32, buffer: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Appends the base-128 encoding of a signed value's `u32` bit pattern to `buffer`.
#[allow(clippy::cast_sign_loss)]
pub fn write_7bit_encoded_i32(value: i32, buffer: &mut Vec<u8>) {
    write_7bit_encoded_int(value as u32, buffer);
}

/// Number of bytes [`write_7bit_encoded_int`] emits for `value`.
#[must_use]
pub fn size_7bit_encoded_int(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Convert a collection length into the 32-bit count stored on disk.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `len` does not fit in a `u32`.
pub fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| malformed_error!("Table with {} entries is too large", len))
}
