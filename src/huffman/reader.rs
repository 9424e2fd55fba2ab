use super::{
    codes::{decode_length, decode_symbol},
    BitReader, HuffmanHeader, SIZE_HEADER,
};
use crate::{
    error::{ReadError, Result},
    reader::{Run, RunDecoder},
};

/// Decoder for Huffman-coded BWT files
///
/// Decoding stops after the number of symbols recorded in the header; the
/// padding bits of the last byte and anything after them are ignored.
pub struct Decoder<'a> {
    bits: BitReader<'a>,
    num_symbols: u64,
    decoded: u64,
    /// Run read ahead while looking for a symbol change
    lookahead: Option<Run>,
}
impl<'a> Decoder<'a> {
    /// Parses the header at the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Result<Self> {
        let header = HuffmanHeader::from_buffer(buffer)?;
        Ok(Self {
            bits: BitReader::new(&buffer[SIZE_HEADER..]),
            num_symbols: header.num_symbols,
            decoded: 0,
            lookahead: None,
        })
    }

    /// Total number of symbols recorded in the header
    #[must_use]
    pub fn num_symbols(&self) -> u64 {
        self.num_symbols
    }

    fn next_pair(&mut self) -> Result<Option<Run>> {
        if self.decoded == self.num_symbols {
            return Ok(None);
        }
        let truncated = ReadError::UnexpectedEndOfStream {
            expected: self.num_symbols,
            decoded: self.decoded,
        };
        let Some(symbol) = decode_symbol(&mut self.bits) else {
            return Err(truncated.into());
        };
        let Some(length) = decode_length(&mut self.bits)? else {
            return Err(truncated.into());
        };
        if length > self.num_symbols - self.decoded {
            return Err(ReadError::SymbolCountMismatch {
                expected: self.num_symbols,
            }
            .into());
        }
        self.decoded += length;
        Ok(Some(Run::new(symbol, length)))
    }
}

impl RunDecoder for Decoder<'_> {
    fn next_run(&mut self) -> Result<Option<Run>> {
        let mut run = match self.lookahead.take() {
            Some(run) => run,
            None => match self.next_pair()? {
                Some(run) => run,
                None => return Ok(None),
            },
        };
        while let Some(next) = self.next_pair()? {
            if next.symbol == run.symbol {
                run.length += next.length;
            } else {
                self.lookahead = Some(next);
                break;
            }
        }
        Ok(Some(run))
    }
}
