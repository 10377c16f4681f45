//! Ticket Code
//!
//! Human-presentable unique codes printed on issued tickets.
//! Codes are random enough that collisions are negligible; the database
//! unique index on `tickets.ticket_code` is the backstop, not the generator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet for ticket codes: 32 symbols, ambiguous glyphs (0/O, 1/I)
/// excluded so codes survive being read over the phone.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of random symbols per code. 12 symbols over a 32-symbol alphabet
/// gives 60 bits of entropy.
const CODE_LEN: usize = 12;

/// A unique, human-presentable ticket code such as `TKT-A7KQ-M2XW-9PFR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    /// Generate a fresh random code.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut code = String::with_capacity(4 + CODE_LEN + CODE_LEN / 4 - 1);
        code.push_str("TKT");

        for i in 0..CODE_LEN {
            if i % 4 == 0 {
                code.push('-');
            }
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }

        Self(code)
    }

    /// Wrap a code read back from storage.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TicketCode> for String {
    fn from(code: TicketCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_format() {
        let code = TicketCode::generate();
        let s = code.as_str();

        // TKT prefix plus three hyphen-separated groups of four
        assert_eq!(s.len(), 3 + 3 + CODE_LEN);
        assert!(s.starts_with("TKT-"));

        let parts: Vec<&str> = s.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "TKT");
        for group in &parts[1..] {
            assert_eq!(group.len(), 4);
            for c in group.bytes() {
                assert!(CODE_ALPHABET.contains(&c), "unexpected symbol {}", c as char);
            }
        }
    }

    #[test]
    fn test_codes_do_not_repeat() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(TicketCode::generate()));
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_symbols() {
        assert_eq!(CODE_ALPHABET.len(), 32);
        for c in [b'0', b'O', b'1', b'I'] {
            assert!(!CODE_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn test_round_trip_through_storage() {
        let code = TicketCode::generate();
        let stored: String = code.clone().into();
        assert_eq!(TicketCode::from_stored(stored), code);
    }
}
