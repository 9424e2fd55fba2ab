use std::io::Write;

use super::{token, MAX_TOKEN_RUN};
use crate::{
    alphabet::{self, Symbol},
    error::{Result, WriteError},
    BwtWrite, DEFAULT_BUFFER_CAPACITY,
};

/// Run-length writer producing one byte per token
///
/// The pending run is only encoded once a different symbol arrives or the
/// writer is finished, so pushing a symbol `n` times and pushing a run of `n`
/// produce the same bytes.
pub struct RunLengthWriter<W: Write> {
    /// The underlying writer, taken back by `into_inner`
    inner: Option<W>,
    /// Encoded tokens not yet handed to `inner`
    buffer: Vec<u8>,
    /// Buffer size that triggers a write to `inner`
    capacity: usize,
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
impl<W: Write> RunLengthWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(inner: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Some(inner),
            buffer: Vec::with_capacity(capacity),
            capacity,
            last: None,
            run_length: 0,
            symbols_received: 0,
            bytes_written: 0,
            closed: false,
            poisoned: false,
        }
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
                self.encode_pending()?;
                self.last = Some(symbol);
                self.run_length = run_length;
            }
        }
        Ok(())
    }

    fn encode_pending(&mut self) -> Result<()> {
        if let Some(symbol) = self.last.take() {
            let run_length = std::mem::take(&mut self.run_length);
            self.encode_run(symbol, run_length)?;
        }
        Ok(())
    }

    fn encode_run(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        if run_length == 0 {
            return Ok(());
        }
        let full = token(symbol, MAX_TOKEN_RUN);
        for _ in 0..(run_length - 1) / MAX_TOKEN_RUN {
            self.emit(full)?;
        }
        self.emit(token(symbol, (run_length - 1) % MAX_TOKEN_RUN + 1))
    }

    fn emit(&mut self, byte: u8) -> Result<()> {
        self.buffer.push(byte);
        if self.buffer.len() >= self.capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let Some(inner) = self.inner.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        if let Err(e) = inner.write_all(&self.buffer) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.bytes_written += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }
}

impl<W: Write> BwtWrite for RunLengthWriter<W> {
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
        self.encode_pending()?;
        self.flush_buffer()?;
        if let Some(inner) = self.inner.as_mut() {
            if let Err(e) = inner.flush() {
                self.poisoned = true;
                return Err(e.into());
            }
        }
        self.closed = true;
        log::debug!(
            "run-length writer finished: {} symbols in {} bytes",
            self.symbols_received,
            self.bytes_written
        );
        Ok(())
    }
}

impl<W: Write> Drop for RunLengthWriter<W> {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!("failed to finish run-length BWT output: {e}");
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{tests::FlakySink, Error};

    fn encode(runs: &[(u8, u64)]) -> Result<Vec<u8>> {
        let mut writer = RunLengthWriter::new(Vec::new());
        for &(symbol, n) in runs {
            writer.push_run(symbol, n)?;
        }
        writer.into_inner()
    }

    #[test]
    fn test_token_layout() -> Result<()> {
        assert_eq!(encode(&[(b'A', 1)])?, vec![0x01]);
        assert_eq!(encode(&[(b'A', 16)])?, vec![0xF1]);
        assert_eq!(encode(&[(b'A', 17)])?, vec![0xF1, 0x01]);
        assert_eq!(encode(&[(b'C', 40)])?, vec![0xF2, 0xF2, 0x72]);
        assert_eq!(encode(&[(b'$', 3), (b'T', 2)])?, vec![0x20, 0x15]);
        Ok(())
    }

    #[test]
    fn test_push_merges_runs() -> Result<()> {
        let mut writer = RunLengthWriter::new(Vec::new());
        writer.push(b"AAC")?;
        writer.push(b"CCG")?;
        writer.push_run(b'G', 2)?;
        assert_eq!(writer.into_inner()?, vec![0x11, 0x22, 0x23]);
        Ok(())
    }

    #[test]
    fn test_single_pushes_match_run() -> Result<()> {
        let mut single = RunLengthWriter::new(Vec::new());
        for _ in 0..100 {
            single.push(b"G")?;
        }
        assert_eq!(single.into_inner()?, encode(&[(b'G', 100)])?);
        Ok(())
    }

    #[test]
    fn test_pending_run_waits_for_finish() -> Result<()> {
        let mut writer = RunLengthWriter::with_capacity(Vec::new(), 1);
        writer.push_run(b'A', 5)?;
        assert_eq!(writer.bytes_written(), 0);
        writer.push_run(b'C', 1)?;
        assert_eq!(writer.bytes_written(), 1);
        writer.finish()?;
        assert_eq!(writer.bytes_written(), 2);
        assert_eq!(writer.symbols_received(), 6);
        Ok(())
    }

    #[test]
    fn test_small_capacity_spills() -> Result<()> {
        let mut writer = RunLengthWriter::with_capacity(Vec::new(), 2);
        writer.push_run(b'T', 16 * 5)?;
        writer.push(b"A")?;
        assert_eq!(writer.into_inner()?, vec![0xF5, 0xF5, 0xF5, 0xF5, 0xF5, 0x01]);
        Ok(())
    }

    #[test]
    fn test_invalid_symbol_leaves_state_untouched() -> Result<()> {
        let mut writer = RunLengthWriter::new(Vec::new());
        writer.push(b"AA")?;
        let err = writer.push(b"AAZ").unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::InvalidSymbol(b'Z'))));
        let err = writer.push_run(b'-', 4).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(writer.symbols_received(), 2);
        assert_eq!(writer.into_inner()?, vec![0x11]);
        Ok(())
    }

    #[test]
    fn test_empty_stream() -> Result<()> {
        assert!(encode(&[])?.is_empty());
        assert!(encode(&[(b'A', 0)])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_write_is_not_repeated() -> Result<()> {
        let mut sink = FlakySink::new(1);
        let mut writer = RunLengthWriter::new(&mut sink);
        writer.push(b"AC$")?;
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        assert!(matches!(
            writer.push(b"A").unwrap_err(),
            Error::WriteError(WriteError::Poisoned)
        ));
        assert!(matches!(
            writer.finish().unwrap_err(),
            Error::WriteError(WriteError::Poisoned)
        ));
        drop(writer);

        // only the prefix accepted before the failure, nothing written twice
        assert_eq!(sink.bytes(), &[0x01]);
        Ok(())
    }

    #[test]
    fn test_spill_failure_surfaces_on_push() -> Result<()> {
        let mut sink = FlakySink::new(0);
        let mut writer = RunLengthWriter::with_capacity(&mut sink, 1);
        writer.push(b"A")?;
        let err = writer.push(b"C").unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        assert_eq!(writer.bytes_written(), 0);
        drop(writer);
        assert!(sink.bytes().is_empty());
        Ok(())
    }
}
