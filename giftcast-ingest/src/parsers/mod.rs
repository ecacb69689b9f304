//! Cell-level parsers for donation exports

pub mod amount;
pub mod date;

pub use amount::{parse_number, AmountParser};
pub use date::DateParser;

/// Decode a latin-1 (ISO-8859-1) byte string; every byte maps to the code
/// point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}
