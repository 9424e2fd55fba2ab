use std::io::Write;

use crate::{
    alphabet::{self, Symbol},
    error::{Result, WriteError},
    BwtWrite,
};

/// Size of the stack chunk used to expand runs
const RUN_CHUNK: usize = 4096;

/// Writes one byte per symbol
pub struct AsciiWriter<W: Write> {
    /// The underlying writer, taken back by `into_inner`
    inner: Option<W>,
    symbols_received: u64,
    bytes_written: u64,
    closed: bool,
    /// Set once a write to `inner` failed
    poisoned: bool,
}
impl<W: Write> AsciiWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Some(inner),
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

    fn write_out(&mut self, bytes: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        let inner = match self.inner.as_mut() {
            Some(inner) if !self.closed => inner,
            _ => return Err(WriteError::WriterClosed.into()),
        };
        if let Err(e) = inner.write_all(bytes) {
            self.poisoned = true;
            return Err(e.into());
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

impl<W: Write> BwtWrite for AsciiWriter<W> {
    fn push(&mut self, symbols: &[u8]) -> Result<()> {
        alphabet::validate(symbols)?;
        self.write_out(symbols)?;
        self.symbols_received += symbols.len() as u64;
        Ok(())
    }

    fn push_run(&mut self, symbol: u8, run_length: u64) -> Result<()> {
        Symbol::from_ascii(symbol)?;
        if self.closed {
            return Err(WriteError::WriterClosed.into());
        }
        let chunk = [symbol; RUN_CHUNK];
        let mut left = run_length;
        while left > 0 {
            let n = left.min(RUN_CHUNK as u64) as usize;
            self.write_out(&chunk[..n])?;
            self.symbols_received += n as u64;
            left -= n as u64;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if self.closed {
            return Ok(());
        }
        if let Some(inner) = self.inner.as_mut() {
            if let Err(e) = inner.flush() {
                self.poisoned = true;
                return Err(e.into());
            }
        }
        self.closed = true;
        log::debug!("ascii writer finished after {} symbols", self.symbols_received);
        Ok(())
    }
}

impl<W: Write> Drop for AsciiWriter<W> {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!("failed to finish ascii BWT output: {e}");
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{tests::FlakySink, Error, WriteError};

    #[test]
    fn test_push_and_run() -> Result<()> {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.push(b"AC$")?;
        writer.push_run(b'G', 5)?;
        writer.push_run(b'T', 0)?;
        assert_eq!(writer.symbols_received(), 8);
        assert_eq!(writer.bytes_written(), 8);
        assert_eq!(writer.into_inner()?, b"AC$GGGGG");
        Ok(())
    }

    #[test]
    fn test_long_run_spans_chunks() -> Result<()> {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.push_run(b'N', (RUN_CHUNK * 2 + 17) as u64)?;
        let bytes = writer.into_inner()?;
        assert_eq!(bytes.len(), RUN_CHUNK * 2 + 17);
        assert!(bytes.iter().all(|&b| b == b'N'));
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_symbol() -> Result<()> {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.push(b"AC")?;
        let err = writer.push(b"GxT").unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::InvalidSymbol(b'x'))));
        // nothing from the rejected call reaches the output
        assert_eq!(writer.into_inner()?, b"AC");
        Ok(())
    }

    #[test]
    fn test_push_after_finish() -> Result<()> {
        let mut writer = AsciiWriter::new(Vec::new());
        writer.finish()?;
        writer.finish()?;
        let err = writer.push(b"A").unwrap_err();
        assert!(matches!(err, Error::WriteError(WriteError::WriterClosed)));
        Ok(())
    }

    #[test]
    fn test_failed_run_poisons_writer() -> Result<()> {
        let mut sink = FlakySink::new(RUN_CHUNK + 3);
        let mut writer = AsciiWriter::new(&mut sink);
        let err = writer.push_run(b'A', (RUN_CHUNK * 2) as u64).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        assert_eq!(writer.symbols_received(), RUN_CHUNK as u64);
        assert!(matches!(
            writer.push(b"C").unwrap_err(),
            Error::WriteError(WriteError::Poisoned)
        ));
        drop(writer);
        assert_eq!(sink.bytes().len(), RUN_CHUNK + 3);
        Ok(())
    }
}
