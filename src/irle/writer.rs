use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use super::{
    encode_short_run, reader::Decoder, Record, CODE_MASK, OPEN_FLAG, PLACEHOLDER_FLAG,
    PLACEHOLDER_SIZE,
};
use crate::{
    alphabet::{self, Symbol},
    error::{Result, TokenError, WriteError},
    reader::{Run, RunDecoder},
    BwtWrite, FileIdAllocator, IncrementalToken, DEFAULT_BUFFER_CAPACITY,
};

/// Disposition of the most recent run
///
/// A run is only written to the image once the writer knows what follows it:
/// a different symbol closes it, [`IncrementalRunLengthWriter::pause_run`]
/// turns it into a placeholder, and `finish` closes it for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// No run is waiting
    Empty,
    /// A run has been received but not yet written
    Pending { symbol: Symbol, length: u64 },
    /// The stream has been finished
    Closed,
}

/// Run-length writer whose runs can be extended by later construction passes
///
/// Records are kept in an in-memory image so [`BwtWrite::push_existing_run`]
/// can rewrite placeholder records in place. While no placeholder is open the
/// image is compacted and handed to the underlying writer once it reaches the
/// buffer capacity, keeping only its last run back. From the first open
/// placeholder onwards every record stays in memory: resolving a placeholder
/// changes how the bytes after it compact, so none of them are final yet.
///
/// Token offsets are positions in the final file: the bytes already written
/// followed by the image. A token below the written prefix addresses a
/// placeholder that was resolved and compacted away.
pub struct IncrementalRunLengthWriter<W: Write> {
    /// The underlying writer, taken back by `into_inner`
    inner: Option<W>,
    /// Id distinguishing this output from other incremental outputs
    file_id: u32,
    /// Records not yet handed to `inner`
    image: Vec<u8>,
    /// Image size that triggers a flush while no placeholder is open
    capacity: usize,
    state: RunState,
    /// File offsets of every placeholder record in the image, ascending
    placeholders: Vec<u64>,
    /// Number of placeholders still expecting symbols
    open_placeholders: usize,
    symbols_received: u64,
    /// Bytes handed to `inner`, also the file offset of the image
    bytes_written: u64,
    /// Set once a write to `inner` failed
    poisoned: bool,
}
impl<W: Write> IncrementalRunLengthWriter<W> {
    /// Creates a writer for a new output, taking its id from `file_ids`
    pub fn new(inner: W, file_ids: &FileIdAllocator) -> Self {
        Self::with_capacity(inner, file_ids, DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a writer that flushes settled records once `capacity` bytes
    /// have accumulated
    pub fn with_capacity(inner: W, file_ids: &FileIdAllocator, capacity: usize) -> Self {
        let mut writer = Self::with_image(inner, file_ids.allocate(), Vec::new(), Vec::new(), 0);
        writer.capacity = capacity.max(1);
        writer
    }

    /// Continues an output persisted by an earlier writer
    ///
    /// `image` is the content that writer produced while it still had open
    /// placeholders; tokens it issued for `file_id` resolve against this writer.
    /// New symbols are appended after the existing records.
    pub fn reopen(inner: W, file_id: u32, image: Vec<u8>) -> Result<Self> {
        let mut decoder = Decoder::new(&image);
        let mut placeholders = Vec::new();
        let mut open = 0;
        while let Some(record) = decoder.next_record()? {
            if let Record::Placeholder(p) = record {
                placeholders.push(p.offset);
                if p.open {
                    open += 1;
                }
            }
        }
        log::debug!(
            "reopened incremental file {file_id}: {} bytes, {open} open placeholders",
            image.len()
        );
        Ok(Self::with_image(inner, file_id, image, placeholders, open))
    }

    fn with_image(
        inner: W,
        file_id: u32,
        image: Vec<u8>,
        placeholders: Vec<u64>,
        open_placeholders: usize,
    ) -> Self {
        Self {
            inner: Some(inner),
            file_id,
            image,
            capacity: DEFAULT_BUFFER_CAPACITY,
            state: RunState::Empty,
            placeholders,
            open_placeholders,
            symbols_received: 0,
            bytes_written: 0,
            poisoned: false,
        }
    }

    #[must_use]
    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// Records held in memory, excluding the pending run
    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// The run received but not yet written, if any
    #[must_use]
    pub fn pending_run(&self) -> Option<Run> {
        match self.state {
            RunState::Pending { symbol, length } => Some(Run::new(symbol, length)),
            _ => None,
        }
    }

    #[must_use]
    pub fn open_placeholders(&self) -> usize {
        self.open_placeholders
    }

    #[must_use]
    pub fn symbols_received(&self) -> u64 {
        self.symbols_received
    }

    /// Bytes handed to the underlying writer so far
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finishes the stream and returns the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        self.inner.take().ok_or_else(|| WriteError::WriterClosed.into())
    }

    /// Holds the pending run open for a later pass
    ///
    /// The pending run is written as a placeholder expecting `remaining` more
    /// symbols, and the returned token addresses it. A `remaining` of zero
    /// writes an already resolved placeholder.
    pub fn pause_run(&mut self, remaining: u32) -> Result<IncrementalToken> {
        self.check_usable()?;
        let (symbol, length) = match self.state {
            RunState::Closed => return Err(WriteError::WriterClosed.into()),
            RunState::Empty => return Err(WriteError::NoPendingRun.into()),
            RunState::Pending { symbol, length } => (symbol, length),
        };
        let known = u32::try_from(length).map_err(|_| WriteError::RunTooLong(length))?;
        self.flush_if_full()?;

        let offset = self.bytes_written + self.image.len() as u64;
        let mut record = [0u8; PLACEHOLDER_SIZE];
        record[0] = PLACEHOLDER_FLAG | symbol.code();
        if remaining > 0 {
            record[0] |= OPEN_FLAG;
            self.open_placeholders += 1;
        }
        LittleEndian::write_u32(&mut record[1..5], known);
        LittleEndian::write_u32(&mut record[5..9], remaining);
        self.image.extend_from_slice(&record);
        self.placeholders.push(offset);
        self.state = RunState::Empty;

        log::debug!(
            "file {}: placeholder at {offset} for {known} x {} with {remaining} to go",
            self.file_id,
            symbol.to_ascii() as char
        );
        Ok(IncrementalToken {
            file_id: self.file_id,
            offset,
            remaining,
        })
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        Ok(())
    }

    fn send(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        self.check_usable()?;
        if run_length == 0 {
            return match self.state {
                RunState::Closed => Err(WriteError::WriterClosed.into()),
                _ => Ok(()),
            };
        }
        self.state = match self.state {
            RunState::Closed => return Err(WriteError::WriterClosed.into()),
            RunState::Empty => RunState::Pending {
                symbol,
                length: run_length,
            },
            RunState::Pending { symbol: last, length } if last == symbol => RunState::Pending {
                symbol,
                length: length + run_length,
            },
            RunState::Pending { symbol: last, length } => {
                encode_short_run(&mut self.image, last, length);
                RunState::Pending {
                    symbol,
                    length: run_length,
                }
            }
        };
        self.symbols_received += run_length;
        self.flush_if_full()
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.open_placeholders == 0 && self.image.len() >= self.capacity {
            self.flush_settled()?;
        }
        Ok(())
    }

    /// Writes out every run of a placeholder-free image except the last
    ///
    /// The last run stays in memory since a following record may still merge
    /// into it.
    fn flush_settled(&mut self) -> Result<()> {
        debug_assert_eq!(self.open_placeholders, 0);
        let mut decoder = Decoder::new(&self.image);
        let mut runs = Vec::new();
        while let Some(run) = decoder.next_run()? {
            runs.push(run);
        }
        let Some(last) = runs.pop() else {
            return Ok(());
        };
        if runs.is_empty() {
            return Ok(());
        }
        let mut out = Vec::with_capacity(self.image.len());
        for run in &runs {
            encode_short_run(&mut out, run.symbol, run.length);
        }
        self.write_out(&out)?;

        self.image.clear();
        encode_short_run(&mut self.image, last.symbol, last.length);
        self.placeholders.clear();
        log::debug!(
            "file {}: flushed {} settled bytes, {} written so far",
            self.file_id,
            out.len(),
            self.bytes_written
        );
        Ok(())
    }

    fn write_out(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        if let Err(e) = inner.write_all(bytes) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Extends the placeholder addressed by `token`
    fn resolve(
        &mut self,
        symbol: Symbol,
        run_length: u64,
        token: IncrementalToken,
    ) -> Result<Option<IncrementalToken>> {
        self.check_usable()?;
        if self.state == RunState::Closed {
            return Err(WriteError::WriterClosed.into());
        }
        if token.file_id != self.file_id {
            return Err(TokenError::ForeignToken {
                expected: self.file_id,
                found: token.file_id,
            }
            .into());
        }
        if token.offset < self.bytes_written {
            return Err(TokenError::AlreadyResolved(token.offset).into());
        }
        if self.placeholders.binary_search(&token.offset).is_err() {
            return Err(TokenError::NotAPlaceholder(token.offset).into());
        }

        // offsets in `placeholders` always address a full record of the image
        let start = (token.offset - self.bytes_written) as usize;
        let record = &mut self.image[start..start + PLACEHOLDER_SIZE];
        if record[0] & OPEN_FLAG == 0 {
            return Err(TokenError::AlreadyResolved(token.offset).into());
        }
        let stored = Symbol::from_code(record[0] & CODE_MASK)
            .ok_or(TokenError::NotAPlaceholder(token.offset))?;
        if stored != symbol {
            return Err(TokenError::SymbolMismatch {
                offset: token.offset,
                expected: stored.to_ascii() as char,
                found: symbol.to_ascii() as char,
            }
            .into());
        }
        let remaining = LittleEndian::read_u32(&record[5..9]);
        if remaining != token.remaining {
            return Err(TokenError::StaleToken {
                offset: token.offset,
                expected: remaining,
                found: token.remaining,
            }
            .into());
        }
        if run_length > u64::from(remaining) {
            return Err(TokenError::Overrun {
                offset: token.offset,
                remaining,
                requested: run_length,
            }
            .into());
        }

        let known = u64::from(LittleEndian::read_u32(&record[1..5])) + run_length;
        let known = u32::try_from(known).map_err(|_| WriteError::RunTooLong(known))?;
        let remaining = remaining - run_length as u32;
        LittleEndian::write_u32(&mut record[1..5], known);
        LittleEndian::write_u32(&mut record[5..9], remaining);
        self.symbols_received += run_length;

        if remaining == 0 {
            record[0] &= !OPEN_FLAG;
            self.open_placeholders -= 1;
            log::debug!(
                "file {}: placeholder at {} resolved at {known}",
                self.file_id,
                token.offset
            );
            Ok(None)
        } else {
            Ok(Some(IncrementalToken { remaining, ..token }))
        }
    }

    /// Re-encodes a fully resolved image with short tokens only
    fn compact(&self) -> Result<Vec<u8>> {
        let mut decoder = Decoder::new(&self.image);
        let mut out = Vec::with_capacity(self.image.len());
        while let Some(run) = decoder.next_run()? {
            encode_short_run(&mut out, run.symbol, run.length);
        }
        Ok(out)
    }
}

impl<W: Write> BwtWrite for IncrementalRunLengthWriter<W> {
    fn push(&mut self, symbols: &[u8]) -> Result<()> {
        alphabet::validate(symbols)?;
        for chunk in symbols.chunk_by(|a, b| a == b) {
            self.send(Symbol::from_ascii(chunk[0])?, chunk.len() as u64)?;
        }
        Ok(())
    }

    fn push_run(&mut self, symbol: u8, run_length: u64) -> Result<()> {
        let symbol = Symbol::from_ascii(symbol)?;
        self.send(symbol, run_length)
    }

    fn push_existing_run(
        &mut self,
        symbol: u8,
        run_length: u64,
        token: IncrementalToken,
    ) -> Result<Option<IncrementalToken>> {
        let symbol = Symbol::from_ascii(symbol)?;
        self.resolve(symbol, run_length, token)
    }

    fn supports_incremental_continuation(&self) -> bool {
        true
    }

    fn finish(&mut self) -> Result<()> {
        self.check_usable()?;
        if let RunState::Pending { symbol, length } = self.state {
            encode_short_run(&mut self.image, symbol, length);
            self.state = RunState::Empty;
        }
        if self.state == RunState::Closed {
            return Ok(());
        }

        let compacted;
        let bytes = if self.open_placeholders == 0 {
            compacted = self.compact()?;
            &compacted
        } else {
            log::warn!(
                "file {}: persisting image with {} open placeholders",
                self.file_id,
                self.open_placeholders
            );
            &self.image
        };
        let Some(inner) = self.inner.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        if let Err(e) = inner.write_all(bytes).and_then(|()| inner.flush()) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.bytes_written += bytes.len() as u64;
        log::debug!(
            "file {}: incremental writer finished, {} symbols in {} bytes",
            self.file_id,
            self.symbols_received,
            self.bytes_written
        );
        self.state = RunState::Closed;
        Ok(())
    }
}

impl<W: Write> Drop for IncrementalRunLengthWriter<W> {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!(
                "failed to finish incremental BWT output {}: {e}",
                self.file_id
            );
        }
    }
}
