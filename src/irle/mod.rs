//! # irle
//!
//! Incrementally revisable run-length encoding of a BWT.
//!
//! External-memory BWT construction builds each pile over many passes. A run
//! that ends at a pass boundary may still grow in the next pass, so instead of
//! rewriting the whole file the writer leaves a *placeholder* for it and hands
//! the driver an [`IncrementalToken`](crate::IncrementalToken) addressing that
//! placeholder. A later [`push_existing_run`](crate::BwtWrite::push_existing_run)
//! extends the placeholder in place until its expected length is reached.
//!
//! ## Record format
//!
//! Short token (1 byte, bit 7 clear):
//!
//! | Bits | Name   | Description                         |
//! | ---- | ------ | ----------------------------------- |
//! | 0-3  | code   | Symbol code (position in `$ACGNT`)  |
//! | 4-6  | length | Run length minus one (1..=8)        |
//! | 7    | -      | Always 0                            |
//!
//! Placeholder record (9 bytes, bit 7 of the first byte set):
//!
//! | Offset | Size | Name      | Description                                  | Type   |
//! | ------ | ---- | --------- | -------------------------------------------- | ------ |
//! | 0      | 1    | head      | `0x80`, open bit `0x40`, symbol code in 0-3  | uint8  |
//! | 1      | 4    | length    | Symbols known so far                         | uint32 |
//! | 5      | 4    | remaining | Symbols still expected (0 once resolved)     | uint32 |
//!
//! Long runs are split into short tokens exactly like the [`rle`](crate::rle)
//! encoding, with chunks of 8. Consecutive records with the same symbol belong
//! to the same run.
//!
//! While no placeholder is open, the writer compacts and writes out settled
//! runs whenever the image reaches its buffer capacity. Placeholder offsets
//! are positions in the final file.
//!
//! When the writer is finished with no open placeholder left, the image is
//! compacted into short tokens only, so a file completed over several passes
//! is byte-identical to one written in a single pass. Otherwise the image is
//! persisted unchanged and a continuation writer can pick it up with
//! [`IncrementalRunLengthWriter::reopen`].

mod reader;
mod writer;

pub use reader::{Decoder, Placeholder, Record};
pub use writer::IncrementalRunLengthWriter;

use crate::alphabet::Symbol;

/// Longest run a single short token can hold
pub const MAX_SHORT_RUN: u64 = 8;

/// Size of a placeholder record in bytes
pub const PLACEHOLDER_SIZE: usize = 9;

/// Marks the first byte of a placeholder record
pub(crate) const PLACEHOLDER_FLAG: u8 = 0x80;

/// Set while the placeholder still expects more symbols
pub(crate) const OPEN_FLAG: u8 = 0x40;

/// Mask selecting the symbol code of a record head
pub(crate) const CODE_MASK: u8 = 0x0F;

/// Encodes a short token for `length` symbols, `length` in `1..=MAX_SHORT_RUN`
pub(crate) fn short_token(symbol: Symbol, length: u64) -> u8 {
    debug_assert!((1..=MAX_SHORT_RUN).contains(&length));
    (((length - 1) as u8) << 4) | symbol.code()
}

/// Appends the short tokens for a run of `length` symbols
pub(crate) fn encode_short_run(out: &mut Vec<u8>, symbol: Symbol, length: u64) {
    if length == 0 {
        return;
    }
    let full = short_token(symbol, MAX_SHORT_RUN);
    for _ in 0..(length - 1) / MAX_SHORT_RUN {
        out.push(full);
    }
    out.push(short_token(symbol, (length - 1) % MAX_SHORT_RUN + 1));
}
