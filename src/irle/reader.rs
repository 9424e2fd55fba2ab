use byteorder::{ByteOrder, LittleEndian};

use super::{CODE_MASK, OPEN_FLAG, PLACEHOLDER_FLAG, PLACEHOLDER_SIZE};
use crate::{
    alphabet::Symbol,
    error::{ReadError, Result},
    reader::{Run, RunDecoder},
};

/// A placeholder record found in an incremental image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of the record
    pub offset: u64,
    pub symbol: Symbol,
    /// Symbols known so far
    pub length: u32,
    /// Symbols still expected
    pub remaining: u32,
    /// Whether the run may still be extended
    pub open: bool,
}

/// One record of an incremental image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// A closed short token
    Token(Run),
    /// A placeholder, open or resolved
    Placeholder(Placeholder),
}
impl Record {
    #[must_use]
    pub fn symbol(&self) -> Symbol {
        match self {
            Self::Token(run) => run.symbol,
            Self::Placeholder(p) => p.symbol,
        }
    }

    /// Number of symbols this record contributes to the decoded stream
    #[must_use]
    pub fn length(&self) -> u64 {
        match self {
            Self::Token(run) => run.length,
            Self::Placeholder(p) => u64::from(p.length),
        }
    }

    /// Size of the record in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Token(_) => 1,
            Self::Placeholder(_) => PLACEHOLDER_SIZE,
        }
    }
}

/// Parses the record starting at `pos`
pub(crate) fn parse_record(buffer: &[u8], pos: usize) -> Result<Option<Record>> {
    let Some(&head) = buffer.get(pos) else {
        return Ok(None);
    };
    let code = head & CODE_MASK;
    let symbol = Symbol::from_code(code).ok_or(ReadError::InvalidSymbolCode { code, pos })?;
    if head & PLACEHOLDER_FLAG == 0 {
        let length = u64::from((head >> 4) & 0x07) + 1;
        return Ok(Some(Record::Token(Run::new(symbol, length))));
    }
    let Some(body) = buffer.get(pos + 1..pos + PLACEHOLDER_SIZE) else {
        return Err(ReadError::TruncatedRecord(pos).into());
    };
    Ok(Some(Record::Placeholder(Placeholder {
        offset: pos as u64,
        symbol,
        length: LittleEndian::read_u32(&body[0..4]),
        remaining: LittleEndian::read_u32(&body[4..8]),
        open: head & OPEN_FLAG != 0,
    })))
}

/// Decodes an incremental image
///
/// Placeholders contribute the symbols known so far, whether or not they are
/// still open.
pub struct Decoder<'a> {
    buffer: &'a [u8],
    pos: usize,
}
impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    /// Returns the next raw record without merging
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let record = parse_record(self.buffer, self.pos)?;
        if let Some(record) = &record {
            self.pos += record.size();
        }
        Ok(record)
    }

    /// Lists every placeholder that is still open
    pub fn open_placeholders(buffer: &[u8]) -> Result<Vec<Placeholder>> {
        let mut decoder = Decoder::new(buffer);
        let mut open = Vec::new();
        while let Some(record) = decoder.next_record()? {
            if let Record::Placeholder(p) = record {
                if p.open {
                    open.push(p);
                }
            }
        }
        Ok(open)
    }
}

impl RunDecoder for Decoder<'_> {
    fn next_run(&mut self) -> Result<Option<Run>> {
        let Some(first) = self.next_record()? else {
            return Ok(None);
        };
        let symbol = first.symbol();
        let mut length = first.length();
        while let Some(record) = parse_record(self.buffer, self.pos)? {
            if record.symbol() != symbol {
                break;
            }
            length += record.length();
            self.pos += record.size();
        }
        Ok(Some(Run::new(symbol, length)))
    }
}
