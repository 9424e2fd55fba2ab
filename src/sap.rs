//! Same-as-previous (SAP) decorator
//!
//! Within a group of consecutive SAP positions the order of the symbols
//! carries no information, so the decorator only counts them per letter and
//! writes the group as at most one run per letter once the group ends. The
//! boundaries between SAP groups and plain stretches go to a side channel of
//! `(flag, count)` records:
//!
//! | Bytes | Name  | Description                           |
//! | ----- | ----- | ------------------------------------- |
//! | 0     | flag  | 1 for a SAP group, 0 for plain symbols |
//! | 1-8   | count | Symbols in the stretch, little-endian |

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    alphabet::{self, LetterCount, Symbol},
    error::{ReadError, Result, WriteError},
    BwtWrite, IncrementalToken,
};

/// Size of one side channel record in bytes
pub const SAP_RECORD_SIZE: usize = 9;

/// One stretch of the stream as recorded in the side channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SapToken {
    pub same_as_previous: bool,
    pub count: u64,
}
impl SapToken {
    #[must_use]
    pub fn new(same_as_previous: bool, count: u64) -> Self {
        Self {
            same_as_previous,
            count,
        }
    }

    fn to_bytes(self) -> [u8; SAP_RECORD_SIZE] {
        let mut buffer = [0u8; SAP_RECORD_SIZE];
        buffer[0] = u8::from(self.same_as_previous);
        LittleEndian::write_u64(&mut buffer[1..], self.count);
        buffer
    }
}

/// Parses a whole side channel
///
/// # Errors
///
/// Returns `ReadError::InvalidSideChannel` if the buffer ends inside a record.
pub fn read_side_channel(buffer: &[u8]) -> Result<Vec<SapToken>> {
    if buffer.len() % SAP_RECORD_SIZE != 0 {
        return Err(ReadError::InvalidSideChannel(buffer.len()).into());
    }
    Ok(buffer
        .chunks_exact(SAP_RECORD_SIZE)
        .map(|record| SapToken::new(record[0] != 0, LittleEndian::read_u64(&record[1..])))
        .collect())
}

/// Decorator collapsing SAP groups before they reach the wrapped writer
///
/// Plain symbols go through [`BwtWrite::push`] and [`BwtWrite::push_run`];
/// symbols at SAP positions go through [`ImplicitSapWriter::push_sap`] and
/// [`ImplicitSapWriter::push_sap_run`]. Deciding which positions are SAP is
/// up to the caller.
///
/// The last plain run is held back. When a SAP group starts, the final symbol
/// of that run is the group's head: it leaves the plain stretch, leads the
/// group and is counted in the group's side channel record.
///
/// Continuations for an incremental wrapped writer extend runs written by an
/// earlier pass. They bypass the decorator and are absent from the side
/// channel.
pub struct ImplicitSapWriter<T: BwtWrite, S: Write> {
    /// The wrapped writer
    inner: Option<T>,
    /// Destination of the side channel records
    side: Option<S>,
    /// Per-letter counts of the open SAP group
    count_sap: LetterCount,
    /// First symbol of the open SAP group, written ahead of the others
    first_sap: Option<Symbol>,
    /// Last plain run, not yet handed to the wrapped writer
    held: Option<(Symbol, u64)>,
    /// Plain symbols since the last side channel record
    plain: u64,
    closed: bool,
    /// Set once the wrapped writer or the side channel failed
    poisoned: bool,
}
impl<T: BwtWrite, S: Write> ImplicitSapWriter<T, S> {
    pub fn new(inner: T, side: S) -> Self {
        Self {
            inner: Some(inner),
            side: Some(side),
            count_sap: LetterCount::new(),
            first_sap: None,
            held: None,
            plain: 0,
            closed: false,
            poisoned: false,
        }
    }

    /// Whether a SAP group is being counted
    #[must_use]
    pub fn in_sap(&self) -> bool {
        !self.count_sap.is_empty()
    }

    /// Appends symbols at SAP positions
    pub fn push_sap(&mut self, symbols: &[u8]) -> Result<()> {
        alphabet::validate(symbols)?;
        for chunk in symbols.chunk_by(|a, b| a == b) {
            self.count(Symbol::from_ascii(chunk[0])?, chunk.len() as u64)?;
        }
        Ok(())
    }

    /// Appends `run_length` SAP occurrences of `symbol`
    pub fn push_sap_run(&mut self, symbol: u8, run_length: u64) -> Result<()> {
        let symbol = Symbol::from_ascii(symbol)?;
        self.count(symbol, run_length)
    }

    /// Finishes the stream and returns the wrapped writer and side channel
    pub fn into_parts(mut self) -> Result<(T, S)> {
        self.finish()?;
        match (self.inner.take(), self.side.take()) {
            (Some(inner), Some(side)) => Ok((inner, side)),
            _ => Err(WriteError::WriterClosed.into()),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if self.closed {
            return Err(WriteError::WriterClosed.into());
        }
        Ok(())
    }

    fn count(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        self.check_open()?;
        if run_length == 0 {
            return Ok(());
        }
        if self.first_sap.is_none() {
            let head = match self.held.take() {
                Some((held, n)) => {
                    self.forward(held, n - 1)?;
                    self.plain -= 1;
                    self.count_sap.add(held, 1);
                    held
                }
                None => symbol,
            };
            self.flush_plain()?;
            self.first_sap = Some(head);
        }
        self.count_sap.add(symbol, run_length);
        Ok(())
    }

    /// Queues a plain run behind the held one
    fn hold(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        self.check_open()?;
        if run_length == 0 {
            return Ok(());
        }
        self.flush_sap()?;
        self.held = match self.held.take() {
            Some((held, n)) if held == symbol => Some((held, n + run_length)),
            Some((held, n)) => {
                self.forward(held, n)?;
                Some((symbol, run_length))
            }
            None => Some((symbol, run_length)),
        };
        self.plain += run_length;
        Ok(())
    }

    fn forward(&mut self, symbol: Symbol, run_length: u64) -> Result<()> {
        if run_length == 0 {
            return Ok(());
        }
        let inner = self.inner.as_mut().ok_or(WriteError::WriterClosed)?;
        if let Err(e) = inner.push_run(symbol.to_ascii(), run_length) {
            self.poisoned = true;
            return Err(e);
        }
        Ok(())
    }

    /// Writes the open SAP group, first symbol first, then the rest in
    /// alphabet order
    fn flush_sap(&mut self) -> Result<()> {
        let Some(first) = self.first_sap.take() else {
            return Ok(());
        };
        let counts = std::mem::take(&mut self.count_sap);
        self.forward(first, counts.get(first))?;
        for (symbol, n) in counts.iter().filter(|&(s, _)| s != first) {
            self.forward(symbol, n)?;
        }
        self.record(SapToken::new(true, counts.total()))
    }

    fn flush_plain(&mut self) -> Result<()> {
        let n = std::mem::take(&mut self.plain);
        if n == 0 {
            return Ok(());
        }
        self.record(SapToken::new(false, n))
    }

    fn record(&mut self, token: SapToken) -> Result<()> {
        let Some(side) = self.side.as_mut() else {
            return Err(WriteError::WriterClosed.into());
        };
        if let Err(e) = side.write_all(&token.to_bytes()) {
            self.poisoned = true;
            return Err(e.into());
        }
        Ok(())
    }
}

impl<T: BwtWrite, S: Write> BwtWrite for ImplicitSapWriter<T, S> {
    fn push(&mut self, symbols: &[u8]) -> Result<()> {
        alphabet::validate(symbols)?;
        for chunk in symbols.chunk_by(|a, b| a == b) {
            self.hold(Symbol::from_ascii(chunk[0])?, chunk.len() as u64)?;
        }
        Ok(())
    }

    fn push_run(&mut self, symbol: u8, run_length: u64) -> Result<()> {
        let symbol = Symbol::from_ascii(symbol)?;
        self.hold(symbol, run_length)
    }

    fn push_existing_run(
        &mut self,
        symbol: u8,
        run_length: u64,
        token: IncrementalToken,
    ) -> Result<Option<IncrementalToken>> {
        Symbol::from_ascii(symbol)?;
        self.check_open()?;
        if !self.supports_incremental_continuation() {
            self.push_run(symbol, run_length)?;
            return Ok(None);
        }
        let inner = self.inner.as_mut().ok_or(WriteError::WriterClosed)?;
        inner.push_existing_run(symbol, run_length, token)
    }

    fn supports_incremental_continuation(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(T::supports_incremental_continuation)
    }

    fn finish(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned.into());
        }
        if self.closed {
            return Ok(());
        }
        self.flush_sap()?;
        if let Some((symbol, n)) = self.held.take() {
            self.forward(symbol, n)?;
        }
        self.flush_plain()?;
        if let Some(inner) = self.inner.as_mut() {
            if let Err(e) = inner.finish() {
                self.poisoned = true;
                return Err(e);
            }
        }
        if let Some(side) = self.side.as_mut() {
            if let Err(e) = side.flush() {
                self.poisoned = true;
                return Err(e.into());
            }
        }
        self.closed = true;
        log::debug!("SAP decorator finished");
        Ok(())
    }
}

impl<T: BwtWrite, S: Write> Drop for ImplicitSapWriter<T, S> {
    fn drop(&mut self) {
        if self.poisoned {
            return;
        }
        if let Err(e) = self.finish() {
            log::error!("failed to finish SAP-decorated BWT output: {e}");
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::{
        irle::IncrementalRunLengthWriter, rle::RunLengthWriter, tests::FlakySink, Error,
        FileIdAllocator,
    };

    /// Writer recording every call it receives
    #[derive(Default)]
    struct Recorder {
        runs: Vec<(u8, u64)>,
        finished: bool,
    }
    impl BwtWrite for Recorder {
        fn push(&mut self, symbols: &[u8]) -> Result<()> {
            for chunk in symbols.chunk_by(|a, b| a == b) {
                self.runs.push((chunk[0], chunk.len() as u64));
            }
            Ok(())
        }

        fn push_run(&mut self, symbol: u8, run_length: u64) -> Result<()> {
            self.runs.push((symbol, run_length));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_group_flushed_before_plain_run() -> Result<()> {
        let mut recorder = Recorder::default();
        let mut side = Vec::new();
        {
            let mut writer = ImplicitSapWriter::new(&mut recorder, &mut side);
            for _ in 0..4 {
                writer.push_sap_run(b'A', 1)?;
            }
            assert!(writer.in_sap());
            writer.push_run(b'C', 2)?;
            assert!(!writer.in_sap());
            writer.finish()?;
        }
        assert_eq!(recorder.runs, vec![(b'A', 4), (b'C', 2)]);
        assert!(recorder.finished);
        assert_eq!(
            read_side_channel(&side)?,
            vec![SapToken::new(true, 4), SapToken::new(false, 2)]
        );
        Ok(())
    }

    #[test]
    fn test_first_symbol_leads_group() -> Result<()> {
        let mut recorder = Recorder::default();
        {
            let mut writer = ImplicitSapWriter::new(&mut recorder, Vec::new());
            writer.push_sap(b"TTGAT")?;
            writer.push(b"$")?;
        }
        assert_eq!(
            recorder.runs,
            vec![(b'T', 3), (b'A', 1), (b'G', 1), (b'$', 1)]
        );
        Ok(())
    }

    #[test]
    fn test_plain_stretches_share_record() -> Result<()> {
        let mut side = Vec::new();
        {
            let mut writer = ImplicitSapWriter::new(Recorder::default(), &mut side);
            writer.push(b"ACG")?;
            writer.push_run(b'T', 5)?;
            writer.push_sap(b"GG")?;
            writer.push(b"N")?;
            writer.push_sap(b"C")?;
        }
        assert_eq!(
            read_side_channel(&side)?,
            vec![
                SapToken::new(false, 7),
                SapToken::new(true, 3),
                SapToken::new(true, 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_wraps_run_length_writer() -> Result<()> {
        let (bytes, side) = {
            let mut writer = ImplicitSapWriter::new(RunLengthWriter::new(Vec::new()), Vec::new());
            writer.push(b"AA")?;
            writer.push_sap(b"CAC")?;
            let (inner, side) = writer.into_parts()?;
            (inner.into_inner()?, side)
        };
        // one plain A, then the group headed by the second A: A x2, C x2
        assert_eq!(bytes, vec![0x21, 0x12]);
        assert_eq!(
            read_side_channel(&side)?,
            vec![SapToken::new(false, 1), SapToken::new(true, 4)]
        );
        Ok(())
    }

    #[test]
    fn test_held_run_gives_group_its_head() -> Result<()> {
        let mut recorder = Recorder::default();
        let mut side = Vec::new();
        {
            let mut writer = ImplicitSapWriter::new(&mut recorder, &mut side);
            writer.push_run(b'G', 3)?;
            writer.push_sap(b"AG")?;
            writer.push(b"TT")?;
        }
        assert_eq!(
            recorder.runs,
            vec![(b'G', 2), (b'G', 2), (b'A', 1), (b'T', 2)]
        );
        assert_eq!(
            read_side_channel(&side)?,
            vec![
                SapToken::new(false, 2),
                SapToken::new(true, 3),
                SapToken::new(false, 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_continuation_bypasses_side_channel() -> Result<()> {
        let ids = FileIdAllocator::new();
        let mut irle = IncrementalRunLengthWriter::new(Vec::new(), &ids);
        irle.push_run(b'A', 2)?;
        let token = irle.pause_run(3)?;

        let mut side = Vec::new();
        {
            let mut writer = ImplicitSapWriter::new(&mut irle, &mut side);
            assert!(writer.supports_incremental_continuation());
            writer.push(b"C")?;
            writer.push_sap(b"GG")?;
            // lands at the placeholder, not between the group and the T
            assert_eq!(writer.push_existing_run(b'A', 3, token)?, None);
            assert!(writer.in_sap());
            writer.push(b"T")?;
            writer.finish()?;
        }

        // AAAAA C GG T
        assert_eq!(irle.into_inner()?, vec![0x41, 0x02, 0x13, 0x05]);
        assert_eq!(
            read_side_channel(&side)?,
            vec![SapToken::new(true, 3), SapToken::new(false, 1)]
        );
        Ok(())
    }

    #[test]
    fn test_continuation_degrades_to_plain_run() -> Result<()> {
        let mut recorder = Recorder::default();
        let mut side = Vec::new();
        {
            let mut writer = ImplicitSapWriter::new(&mut recorder, &mut side);
            writer.push_sap(b"AA")?;
            let token = IncrementalToken {
                file_id: 0,
                offset: 0,
                remaining: 2,
            };
            assert_eq!(writer.push_existing_run(b'C', 2, token)?, None);
        }
        assert_eq!(recorder.runs, vec![(b'A', 2), (b'C', 2)]);
        assert_eq!(
            read_side_channel(&side)?,
            vec![SapToken::new(true, 2), SapToken::new(false, 2)]
        );
        Ok(())
    }

    #[test]
    fn test_side_channel_failure_poisons_writer() -> Result<()> {
        let mut recorder = Recorder::default();
        let mut side = FlakySink::new(0);
        {
            let mut writer = ImplicitSapWriter::new(&mut recorder, &mut side);
            writer.push(b"AC")?;
            let err = writer.push_sap(b"G").unwrap_err();
            assert!(matches!(err, Error::IoError(_)));
            assert!(matches!(
                writer.push(b"A"),
                Err(Error::WriteError(WriteError::Poisoned))
            ));
        }
        assert_eq!(recorder.runs, vec![(b'A', 1)]);
        assert!(!recorder.finished);
        assert!(side.bytes().is_empty());
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_and_closed() -> Result<()> {
        let mut writer = ImplicitSapWriter::new(Recorder::default(), Vec::new());
        assert!(writer.push_sap(b"AxA").is_err());
        assert!(!writer.in_sap());
        writer.finish()?;
        assert!(matches!(
            writer.push_sap_run(b'A', 1),
            Err(Error::WriteError(WriteError::WriterClosed))
        ));
        assert!(matches!(
            writer.push(b"A"),
            Err(Error::WriteError(WriteError::WriterClosed))
        ));
        Ok(())
    }

    #[test]
    fn test_capability_follows_inner() {
        let writer = ImplicitSapWriter::new(Recorder::default(), Vec::new());
        assert!(!writer.supports_incremental_continuation());
    }

    #[test]
    fn test_partial_side_record() {
        assert!(matches!(
            read_side_channel(&[1, 2, 3]),
            Err(Error::ReadError(ReadError::InvalidSideChannel(3)))
        ));
    }
}
