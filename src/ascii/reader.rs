use crate::{
    alphabet::Symbol,
    error::{ReadError, Result},
    reader::{Run, RunDecoder},
};

/// Reads one-byte-per-symbol data back as runs
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
        let symbol = Symbol::from_ascii(first).map_err(|_| ReadError::InvalidSymbolCode {
            code: first,
            pos: self.pos,
        })?;
        let length = self.buffer[self.pos..]
            .iter()
            .take_while(|&&b| b == first)
            .count();
        self.pos += length;
        Ok(Some(Run::new(symbol, length as u64)))
    }
}
