//! Writer contract shared by every BWT encoding
//!
//! The construction driver feeds symbols and runs into a [`BwtWrite`] without
//! knowing which encoding sits behind it. Only the incremental run-length
//! encoding gives [`BwtWrite::push_existing_run`] real revisiting semantics;
//! every other writer treats it as a plain [`BwtWrite::push_run`].

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use auto_impl::auto_impl;

use crate::{
    ascii::AsciiWriter,
    error::{Result, WriteError},
    huffman::{HuffmanWriter, DEFAULT_RUN_BUFFER},
    irle::IncrementalRunLengthWriter,
    rle::RunLengthWriter,
};

/// Default size of the byte buffers used by the buffered writers
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Durable reference to a run that a later construction pass may still extend
///
/// Issued by [`IncrementalRunLengthWriter::pause_run`] and consumed by
/// [`BwtWrite::push_existing_run`] on the writer owning `file_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncrementalToken {
    /// Id of the incremental output file holding the placeholder
    pub file_id: u32,
    /// Byte offset of the placeholder record within that file
    pub offset: u64,
    /// Number of symbols the run still expects
    pub remaining: u32,
}

/// Hands out ids for incremental output files
///
/// Clones share the same counter, so one allocator can be handed to writers
/// constructed on several threads.
#[derive(Debug, Clone, Default)]
pub struct FileIdAllocator {
    next: Arc<AtomicU32>,
}
impl FileIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose first id is `first`
    #[must_use]
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: Arc::new(AtomicU32::new(first)),
        }
    }

    /// Returns a fresh id, never handed out before by this allocator or its clones
    pub fn allocate(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Capability interface implemented by every BWT encoder
///
/// Symbols are passed as ASCII bytes and validated against the alphabet by
/// each writer; a byte outside the alphabet fails the call with
/// `WriteError::InvalidSymbol`.
#[auto_impl(&mut, Box)]
pub trait BwtWrite {
    /// Appends raw symbols to the logical stream
    fn push(&mut self, symbols: &[u8]) -> Result<()>;

    /// Appends `run_length` copies of `symbol`
    ///
    /// Decodes identically to pushing the symbol `run_length` times.
    fn push_run(&mut self, symbol: u8, run_length: u64) -> Result<()>;

    /// Appends a run continuing one written by an earlier construction pass
    ///
    /// Writers without incremental support ignore the token and append the run.
    /// Returns a token when the referenced run is still open afterwards.
    fn push_existing_run(
        &mut self,
        symbol: u8,
        run_length: u64,
        _token: IncrementalToken,
    ) -> Result<Option<IncrementalToken>> {
        self.push_run(symbol, run_length)?;
        Ok(None)
    }

    /// Whether [`BwtWrite::push_existing_run`] extends runs in place
    fn supports_incremental_continuation(&self) -> bool {
        false
    }

    /// Flushes all pending data and closes the stream
    ///
    /// Idempotent. Pushing after `finish` fails with `WriteError::WriterClosed`.
    fn finish(&mut self) -> Result<()>;
}

/// The interchangeable on-disk encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BwtFormat {
    /// One byte per symbol
    Ascii,
    /// Byte-oriented run-length tokens
    RunLength,
    /// Run-length tokens plus revisable placeholder records
    IncrementalRunLength,
    /// Bit-packed static prefix codes for (symbol, run length) pairs
    Huffman,
}

/// Builder for boxed [`BwtWrite`] instances
///
/// # Examples
///
/// ```
/// # use bwtstore::{BwtFormat, BwtWriterBuilder, Result};
/// # use std::io::Cursor;
/// # fn main() -> Result<()> {
/// let mut writer = BwtWriterBuilder::default()
///     .format(BwtFormat::RunLength)
///     .buffer_capacity(4096)
///     .build(Cursor::new(Vec::new()))?;
/// writer.push(b"AAAC$")?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BwtWriterBuilder {
    /// Required encoding
    format: Option<BwtFormat>,
    /// Optional byte buffer capacity, also the settled image size at which
    /// the incremental encoding writes out
    buffer_capacity: Option<usize>,
    /// Optional number of runs the Huffman writer buffers before packing
    huffman_buffer: Option<usize>,
    /// Id source, required by the incremental encoding
    file_ids: Option<FileIdAllocator>,
}
impl BwtWriterBuilder {
    #[must_use]
    pub fn format(mut self, format: BwtFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn huffman_buffer(mut self, runs: usize) -> Self {
        self.huffman_buffer = Some(runs);
        self
    }

    #[must_use]
    pub fn file_ids(mut self, file_ids: FileIdAllocator) -> Self {
        self.file_ids = Some(file_ids);
        self
    }

    /// Builds a writer over any seekable sink
    ///
    /// Seeking is only used by the Huffman encoding, which rewrites its header
    /// once the total symbol count is known.
    pub fn build<W: Write + Seek + 'static>(self, inner: W) -> Result<Box<dyn BwtWrite>> {
        let Some(format) = self.format else {
            return Err(WriteError::MissingFormat.into());
        };
        let capacity = self.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        let writer: Box<dyn BwtWrite> = match format {
            BwtFormat::Ascii => Box::new(AsciiWriter::new(inner)),
            BwtFormat::RunLength => Box::new(RunLengthWriter::with_capacity(inner, capacity)),
            BwtFormat::IncrementalRunLength => {
                let Some(file_ids) = self.file_ids else {
                    return Err(WriteError::MissingFileIdAllocator.into());
                };
                Box::new(IncrementalRunLengthWriter::with_capacity(
                    inner, &file_ids, capacity,
                ))
            }
            BwtFormat::Huffman => Box::new(HuffmanWriter::with_buffer_size(
                inner,
                self.huffman_buffer.unwrap_or(DEFAULT_RUN_BUFFER),
            )?),
        };
        Ok(writer)
    }

    /// Creates the file at `path` and builds a buffered writer over it
    pub fn build_path<P: AsRef<Path>>(self, path: P) -> Result<Box<dyn BwtWrite>> {
        let capacity = self.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        let handle = File::create(path).map(|f| BufWriter::with_capacity(capacity, f))?;
        self.build(handle)
    }
}
