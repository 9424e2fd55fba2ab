//! Decoding stored BWT data
//!
//! Every encoding has a [`RunDecoder`] that turns its bytes back into runs.
//! Decoders merge adjacent tokens carrying the same symbol, so a decoded run
//! is maximal unless the encoding itself stores two neighbouring runs of the
//! same symbol separately.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::{
    alphabet::Symbol,
    ascii,
    error::{ReadError, Result},
    huffman, irle, rle, BwtFormat,
};

/// A decoded (symbol, length) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub symbol: Symbol,
    pub length: u64,
}
impl Run {
    #[must_use]
    pub fn new(symbol: Symbol, length: u64) -> Self {
        Self { symbol, length }
    }
}

/// Streams the runs of an encoded BWT
pub trait RunDecoder {
    /// Returns the next run, or `None` at the end of the data
    fn next_run(&mut self) -> Result<Option<Run>>;

    /// Expands all remaining runs into ASCII symbols appended to `out`
    ///
    /// Returns the number of symbols appended.
    fn decode_into(&mut self, out: &mut Vec<u8>) -> Result<u64> {
        let mut total = 0;
        while let Some(run) = self.next_run()? {
            out.resize(out.len() + run.length as usize, run.symbol.to_ascii());
            total += run.length;
        }
        Ok(total)
    }

    /// Collects all remaining runs
    fn collect_runs(&mut self) -> Result<Vec<Run>> {
        let mut runs = Vec::new();
        while let Some(run) = self.next_run()? {
            runs.push(run);
        }
        Ok(runs)
    }
}

/// Builds the decoder matching `format` over an in-memory buffer
pub fn decoder<'a>(format: BwtFormat, buffer: &'a [u8]) -> Result<Box<dyn RunDecoder + 'a>> {
    let decoder: Box<dyn RunDecoder + 'a> = match format {
        BwtFormat::Ascii => Box::new(ascii::Decoder::new(buffer)),
        BwtFormat::RunLength => Box::new(rle::Decoder::new(buffer)),
        BwtFormat::IncrementalRunLength => Box::new(irle::Decoder::new(buffer)),
        BwtFormat::Huffman => Box::new(huffman::Decoder::new(buffer)?),
    };
    Ok(decoder)
}

/// Decodes an in-memory buffer into ASCII symbols appended to `out`
pub fn decode_bytes(format: BwtFormat, buffer: &[u8], out: &mut Vec<u8>) -> Result<u64> {
    decoder(format, buffer)?.decode_into(out)
}

/// A memory-mapped reader for stored BWT files
pub struct MmapReader {
    /// Memory mapped file contents
    mmap: Mmap,
    /// Encoding of the file
    format: BwtFormat,
}
impl MmapReader {
    /// Maps the file at `path` for decoding with `format`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened
    /// * The file is not a regular file
    /// * The file header is invalid (Huffman only)
    pub fn new<P: AsRef<Path>>(path: P, format: BwtFormat) -> Result<Self> {
        // Verify input file is a file before attempting to map
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };

        if format == BwtFormat::Huffman {
            huffman::HuffmanHeader::from_buffer(&mmap)?;
        }

        Ok(Self { mmap, format })
    }

    #[must_use]
    pub fn format(&self) -> BwtFormat {
        self.format
    }

    /// Size of the mapped file in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns a decoder over the mapped bytes
    pub fn decoder(&self) -> Result<Box<dyn RunDecoder + '_>> {
        decoder(self.format, &self.mmap)
    }

    /// Decodes the whole file into ASCII symbols appended to `out`
    pub fn decode_into(&self, out: &mut Vec<u8>) -> Result<u64> {
        self.decoder()?.decode_into(out)
    }
}
