use std::io::{Seek, SeekFrom, Write};

use super::{
    codes::{encode_length, encode_symbol},
    BitBuffer, HuffmanHeader, DEFAULT_RUN_BUFFER,
};
use crate::{
    alphabet::{self, Symbol},
    error::{Result, WriteError},
    BwtWrite,
};

/// Writer packing (symbol, run length) pairs into static prefix codes
///
/// Runs are collected into a buffer and bit-packed whenever it fills. The
/// header is written up front with a zero count and rewritten by `finish`, so
/// the sink must be seekable.
pub struct HuffmanWriter<W: Write + Seek> {
    /// The underlying writer, taken back by `into_inner`
    inner: Option<W>,
    /// Position of the header within `inner`
    header_pos: u64,
    /// Runs waiting to be packed
    runs: Vec<(Symbol, u64)>,
    /// Number of runs that triggers packing
    run_capacity: usize,
    /// Packed bits not yet handed to `inner`
    bits: BitBuffer,
    /// Symbol of the pending run
    last: Option<Symbol>,
    /// Length of the pending run
    run_length: u64,
    symbols_received: u64,
    bytes_written: u64,
    closed: bool,
    /// Set once a write to `inner` failed
    poisoned: bool,
}
impl<W: Write + Seek> HuffmanWriter<W> {
    /// Creates a writer and reserves the header at the current sink position
    pub fn new(inner: W) -> Result<Self> {
        Self::with_buffer_size(inner, DEFAULT_RUN_BUFFER)
    }

    pub fn with_buffer_size(mut inner: W, runs: usize) -> Result<Self> {
        let header_pos = inner.stream_position()?;
        HuffmanHeader::new(0).write_bytes(&mut inner)?;
        let run_capacity = runs.max(1);
        Ok(Self {
            inner: Some(inner),
            header_pos,
            runs: Vec::with_capacity(run_capacity),
            run_capacity,
            bits: BitBuffer::new(),
            last: None,
            run_length: 0,
            symbols_received: 0,
            bytes_written: 0,
            closed: false,
            poisoned: false,
        })
    }

    /// Symbols accepted so far
    #[must_use]
    pub fn symbols_received(&self) -> u64 {
        self.symbols_received
    }

    /// Body bytes handed to the underlying writer so far, header excluded
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finishes the stream and returns the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        self.inner.take().ok_or_else(|| WriteError::WriterClosed.into())
    }

    fn send(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if self.closed {
            return Err(WriteError::WriterClosed.into());
        }
        if run_length == 0 {
            return Ok(());
        }
        self.symbols_received += run_length;
        match self.last {
            Some(last) if last == symbol => self.run_length += run_length,
            _ => {
                self.queue_pending()?;
                self.last = Some(symbol);
                self.run_length = run_length;
            }
        }
        Ok(())
    }

    fn queue_pending(&mut self) -> Result<()> {
        if let Some(symbol) = self.last.take() {
            let run_length = std::mem::take(&mut self.run_length);
            self.runs.push((symbol, run_length));
            if self.runs.len() >= self.run_capacity {
                self.process_buffer()?;
            }
        }
        Ok(())
    }

    /// Packs the buffered runs and hands the completed bytes to the sink
    fn process_buffer(&mut self) -> Result<()> {
        if self.runs.is_empty() {
            return Ok(());
        }
        for &(symbol, run_length) in &self.runs {
            encode_symbol(&mut self.bits, symbol);
            encode_length(&mut self.bits, run_length);
        }
        log::debug!(
            "huffman writer packed {} runs, {} bits held back",
            self.runs.len(),
            self.bits.pending_bits()
        );
        self.runs.clear();
        self.drain()
    }

    fn drain(&mut self) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        match self.bits.drain_to(inner) {
            Ok(n) => {
                self.bytes_written += n as u64;
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(e.into())
            }
        }
    }

    fn rewrite_header(&mut self) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        let header = HuffmanHeader::new(self.symbols_received);
        if let Err(e) = write_header_at(inner, self.header_pos, header) {
            self.poisoned = true;
            return Err(e);
        }
        Ok(())
    }
}

/// Overwrites the header at `pos` and returns to the end of the stream
fn write_header_at<W: Write + Seek>(
    inner: &mut W,
    pos: u64,
    header: HuffmanHeader,
) -> Result<()> {
    let end = inner.stream_position()?;
    inner.seek(SeekFrom::Start(pos))?;
    header.write_bytes(inner)?;
    inner.seek(SeekFrom::Start(end))?;
    inner.flush()?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn bits_per_symbol(bytes: u64, symbols: u64) -> f64 {
    if symbols == 0 {
        return 0.0;
    }
    (bytes * 8) as f64 / symbols as f64
}

impl<W: Write + Seek> BwtWrite for HuffmanWriter<W> {
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

    fn finish(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if self.closed {
            return Ok(());
        }
        self.queue_pending()?;
        self.process_buffer()?;
        self.bits.finish();
        self.drain()?;
        self.rewrite_header()?;
        self.closed = true;
        log::debug!(
            "huffman writer finished: {} symbols in {} bytes ({:.3} bits per symbol)",
            self.symbols_received,
            self.bytes_written,
            bits_per_symbol(self.bytes_written, self.symbols_received)
        );
        Ok(())
    }
}

impl<W: Write + Seek> Drop for HuffmanWriter<W> {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!("failed to finish huffman BWT output: {e}");
        }
    }
}
