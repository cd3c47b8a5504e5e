//! Method tokens used as the lookup key of the symbol store.
//!
//! The store never interprets a token: callers hand in whatever 32-bit key identifies a method
//! body in their runtime (for .NET this is the `MethodDef` metadata token), and later look the
//! method up again by the same key. Tokens order methods in the sealed file, so the type derives
//! [`Ord`] on the raw value.

use std::fmt;

/// A caller-supplied opaque method key.
///
/// # Examples
///
/// ```rust
/// use symstore::Token;
///
/// let token = Token::new(0x0600_002A);
/// assert_eq!(token.value(), 0x0600_002A);
/// assert_eq!(token.to_string(), "0x0600002a");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:08x})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_token_conversion() {
        let value = 0x0600_0001_u32;
        let token: Token = value.into();
        assert_eq!(token.value(), value);

        let back_to_u32: u32 = token.into();
        assert_eq!(back_to_u32, value);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token(0x0600_0001)), "0x06000001");
        assert_eq!(format!("{:?}", Token(10)), "Token(0x0000000a)");
    }

    #[test]
    fn test_token_ordering() {
        let mut tokens = vec![Token(50), Token(10), Token(30)];
        tokens.sort();
        assert_eq!(tokens, vec![Token(10), Token(30), Token(50)]);
    }

    #[test]
    fn test_token_hash() {
        let mut map = HashMap::new();
        map.insert(Token(0x0600_0001), "Main");
        map.insert(Token(0x0600_0002), "Update");

        assert_eq!(map.get(&Token(0x0600_0001)), Some(&"Main"));
        assert_eq!(map.get(&Token(0x0600_0002)), Some(&"Update"));
        assert!(Token::default().is_null());
    }
}
