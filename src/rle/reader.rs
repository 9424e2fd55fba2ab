use super::CODE_MASK;
use crate::{
    alphabet::Symbol,
    error::{ReadError, Result},
    reader::{Run, RunDecoder},
};

/// Decodes run-length tokens, merging consecutive tokens of the same symbol
pub struct Decoder<'a> {
    buffer: &'a [u8],
    pos: usize,
}
impl<'a> Decoder<'a> {
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }
}

impl RunDecoder for Decoder<'_> {
    fn next_run(&mut self) -> Result<Option<Run>> {
        let Some(&first) = self.buffer.get(self.pos) else {
            return Ok(None);
        };
        let code = first & CODE_MASK;
        let symbol = Symbol::from_code(code).ok_or(ReadError::InvalidSymbolCode {
            code,
            pos: self.pos,
        })?;
        let mut length = 0;
        while let Some(&byte) = self.buffer.get(self.pos) {
            if byte & CODE_MASK != code {
                break;
            }
            length += u64::from(byte >> 4) + 1;
            self.pos += 1;
        }
        Ok(Some(Run::new(symbol, length)))
    }
}
