use std::path::Path;

use anyhow::Context;
use symstore::{SymbolStore, Token};

/// Bind a store to the symbol file at `path`.
pub fn load_store(path: &Path) -> anyhow::Result<SymbolStore> {
    SymbolStore::open_path(path)
        .with_context(|| format!("failed to open symbol file: {}", path.display()))
}

/// Parse a number given as hex (`0x...`) or decimal.
pub fn parse_number(s: &str) -> anyhow::Result<u32> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).with_context(|| format!("invalid hex number: {s}"))
    } else {
        trimmed
            .parse::<u32>()
            .with_context(|| format!("invalid number: {s}"))
    }
}

pub fn parse_token(s: &str) -> anyhow::Result<Token> {
    parse_number(s).map(Token::new)
}

/// Lower-case hex of a checksum, `-` when empty.
pub fn format_checksum(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "-".to_string();
    }
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `-1` means unknown in positions; show it as `-`.
pub fn format_position(value: i32) -> String {
    if value < 0 {
        "-".to_string()
    } else {
        value.to_string()
    }
}
