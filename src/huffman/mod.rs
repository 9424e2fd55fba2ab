//! # huffman
//!
//! Bit-packed encoding of a BWT as (symbol, run length) pairs.
//!
//! ## File layout
//!
//! | Bytes | Name        | Description                              |
//! | ----- | ----------- | ---------------------------------------- |
//! | 0-3   | magic       | `"BWTH"`                                 |
//! | 4     | format      | Format version, currently 1              |
//! | 5-7   | reserved    | Zero                                     |
//! | 8-15  | num_symbols | Total symbols encoded, little-endian     |
//! | 16-   | body        | Packed codes, most significant bit first |
//!
//! Each maximal run is a symbol code followed by a run-length code.
//!
//! | Symbol | Code   |   | Length | Code                        |
//! | ------ | ------ | - | ------ | --------------------------- |
//! | `A`    | `00`   |   | 1      | `0`                         |
//! | `C`    | `01`   |   | 2      | `10`                        |
//! | `G`    | `10`   |   | 3      | `110`                       |
//! | `T`    | `110`  |   | 4      | `1110`                      |
//! | `N`    | `1110` |   | n > 4  | `1111` + Elias-gamma(n - 4) |
//! | `$`    | `1111` |   |        |                             |
//!
//! The last byte is zero-padded. Decoders stop after `num_symbols` symbols.

mod bits;
mod codes;
mod header;
mod reader;
mod writer;

pub use bits::{BitBuffer, BitReader};
pub use header::{HuffmanHeader, SIZE_HEADER};
pub use reader::Decoder;
pub use writer::HuffmanWriter;

/// Default number of runs buffered before packing
pub const DEFAULT_RUN_BUFFER: usize = 1024;
