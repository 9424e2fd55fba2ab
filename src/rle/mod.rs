//! # rle
//!
//! Byte-oriented run-length encoding of a BWT.
//!
//! ## Token format
//!
//! Every byte is one token holding a symbol code and a run length:
//!
//! | Bits | Name   | Description                                  |
//! | ---- | ------ | -------------------------------------------- |
//! | 0-3  | code   | Symbol code (position in `$ACGNT`)           |
//! | 4-7  | length | Run length minus one (1..=16 symbols)        |
//!
//! A run of `n` symbols is written as `(n - 1) / 16` full tokens (`0xF0 | code`)
//! followed by one token holding the remaining `(n - 1) % 16 + 1` symbols.
//! Consecutive tokens with the same code belong to the same run, so a decoder
//! knows a run continues exactly when the next token repeats its code. The
//! writer merges neighbouring runs of the same symbol, so two distinct runs
//! never share a code across a token boundary.
//!
//! There is no header; an empty file is an empty BWT.

mod reader;
mod writer;

pub use reader::Decoder;
pub use writer::RunLengthWriter;

use crate::alphabet::Symbol;

/// Longest run a single token can hold
pub const MAX_TOKEN_RUN: u64 = 16;

/// Mask selecting the symbol code of a token
pub(crate) const CODE_MASK: u8 = 0x0F;

/// Encodes a token for `length` symbols, `length` in `1..=MAX_TOKEN_RUN`
pub(crate) fn token(symbol: Symbol, length: u64) -> u8 {
    debug_assert!((1..=MAX_TOKEN_RUN).contains(&length));
    (((length - 1) as u8) << 4) | symbol.code()
}
