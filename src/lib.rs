//! # bwtstore
//!
//! Interchangeable on-disk encodings for the Burrows-Wheeler transform of a
//! large collection of sequences over the alphabet `$ACGNT`.
//!
//! A construction driver writes the BWT one symbol or run at a time through
//! the [`BwtWrite`] trait and never needs to know which encoding is behind it:
//!
//! * [`AsciiWriter`] stores one byte per symbol
//! * [`RunLengthWriter`] stores one byte per run of up to 16 symbols
//! * [`IncrementalRunLengthWriter`] adds placeholder records that a later
//!   construction pass can extend in place
//! * [`HuffmanWriter`] bit-packs (symbol, run length) pairs with static codes
//! * [`ImplicitSapWriter`] wraps any of them and collapses groups of
//!   same-as-previous positions
//!
//! Stored data is read back through [`MmapReader`] or [`decode_bytes`].

mod alphabet;
mod error;
mod reader;
mod writer;

pub mod ascii;
pub mod huffman;
pub mod irle;
pub mod rle;
pub mod sap;

#[cfg(test)]
mod tests;

pub use alphabet::{LetterCount, Symbol, ALPHABET, ALPHABET_SIZE, NOT_IN_ALPHABET};
pub use ascii::AsciiWriter;
pub use error::{Error, HeaderError, ReadError, Result, TokenError, WriteError};
pub use huffman::{HuffmanHeader, HuffmanWriter, DEFAULT_RUN_BUFFER};
pub use irle::{IncrementalRunLengthWriter, Placeholder, Record};
pub use reader::{decode_bytes, decoder, MmapReader, Run, RunDecoder};
pub use rle::RunLengthWriter;
pub use sap::{read_side_channel, ImplicitSapWriter, SapToken, SAP_RECORD_SIZE};
pub use writer::{
    BwtFormat, BwtWrite, BwtWriterBuilder, FileIdAllocator, IncrementalToken,
    DEFAULT_BUFFER_CAPACITY,
};
