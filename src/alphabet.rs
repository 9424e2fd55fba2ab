//! Alphabet module for the bwtstore library
//!
//! The stored BWT is a string over a small closed alphabet: the four nucleotides,
//! the ambiguity letter `N`, and the `$` terminator that ends every sequence of the
//! collection. Symbols are numbered by their position in [`ALPHABET`]; that number
//! is the code every compact encoding stores.

use crate::{error::WriteError, Result};

/// The valid symbols in code order
pub const ALPHABET: &[u8; ALPHABET_SIZE] = b"$ACGNT";

/// Number of valid symbols
pub const ALPHABET_SIZE: usize = 6;

/// Sentinel used to initialise "no symbol seen yet" state. Never written.
pub const NOT_IN_ALPHABET: u8 = b'Z';

/// A single member of the BWT alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Symbol {
    Terminator = 0,
    A = 1,
    C = 2,
    G = 3,
    N = 4,
    T = 5,
}
impl Symbol {
    /// All symbols in code order
    pub const ALL: [Symbol; ALPHABET_SIZE] = [
        Symbol::Terminator,
        Symbol::A,
        Symbol::C,
        Symbol::G,
        Symbol::N,
        Symbol::T,
    ];

    /// Validates an ASCII byte pushed by the caller
    ///
    /// # Errors
    ///
    /// Returns `WriteError::InvalidSymbol` for any byte outside [`ALPHABET`],
    /// including lowercase letters and [`NOT_IN_ALPHABET`].
    pub fn from_ascii(byte: u8) -> Result<Self> {
        match byte {
            b'$' => Ok(Self::Terminator),
            b'A' => Ok(Self::A),
            b'C' => Ok(Self::C),
            b'G' => Ok(Self::G),
            b'N' => Ok(Self::N),
            b'T' => Ok(Self::T),
            _ => Err(WriteError::InvalidSymbol(byte).into()),
        }
    }

    /// Looks up the symbol stored under a code, if the code is valid
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn to_ascii(self) -> u8 {
        ALPHABET[self as usize]
    }
}

/// Checks that every byte of `symbols` is in the alphabet
///
/// Writers validate a whole slice before touching their state so that a
/// rejected call leaves nothing half-written.
pub fn validate(symbols: &[u8]) -> Result<()> {
    symbols.iter().try_for_each(|&b| Symbol::from_ascii(b).map(|_| ()))
}

/// Per-symbol occurrence counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LetterCount {
    counts: [u64; ALPHABET_SIZE],
}
impl LetterCount {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: Symbol, count: u64) {
        self.counts[symbol as usize] += count;
    }

    #[must_use]
    pub fn get(&self, symbol: Symbol) -> u64 {
        self.counts[symbol as usize]
    }

    /// Sum over all symbols
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn clear(&mut self) {
        self.counts = [0; ALPHABET_SIZE];
    }

    /// Iterates over the symbols with a non-zero count, in code order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
        Symbol::ALL
            .iter()
            .map(|&s| (s, self.get(s)))
            .filter(|&(_, c)| c > 0)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    #[test]
    fn test_codes_follow_alphabet() {
        for (code, &byte) in ALPHABET.iter().enumerate() {
            let symbol = Symbol::from_ascii(byte).unwrap();
            assert_eq!(symbol.code() as usize, code);
            assert_eq!(symbol.to_ascii(), byte);
            assert_eq!(Symbol::from_code(code as u8), Some(symbol));
        }
        assert_eq!(Symbol::from_code(ALPHABET_SIZE as u8), None);
    }

    #[test]
    fn test_rejects_outside_alphabet() {
        for byte in [b'a', b'c', b'X', NOT_IN_ALPHABET, b'\n', 0] {
            let err = Symbol::from_ascii(byte).unwrap_err();
            assert!(matches!(
                err,
                Error::WriteError(WriteError::InvalidSymbol(b)) if b == byte
            ));
        }
    }

    #[test]
    fn test_validate_slice() {
        assert!(validate(b"ACGTN$").is_ok());
        assert!(validate(b"").is_ok());
        assert!(validate(b"ACGU").is_err());
    }

    #[test]
    fn test_letter_count() {
        let mut count = LetterCount::new();
        assert!(count.is_empty());
        count.add(Symbol::G, 3);
        count.add(Symbol::A, 2);
        count.add(Symbol::G, 1);
        assert_eq!(count.get(Symbol::G), 4);
        assert_eq!(count.total(), 6);
        let nonzero: Vec<_> = count.iter().collect();
        assert_eq!(nonzero, vec![(Symbol::A, 2), (Symbol::G, 4)]);
        count.clear();
        assert!(count.is_empty());
    }
}
