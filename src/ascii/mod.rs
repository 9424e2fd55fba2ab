//! # ascii
//!
//! The uncompressed encoding: every symbol of the BWT is stored as its ASCII
//! letter, one byte per symbol, with no header. It is the debug path and the
//! ground truth that the decoded output of every other encoding is compared
//! against.

mod reader;
mod writer;

pub use reader::Decoder;
pub use writer::AsciiWriter;
