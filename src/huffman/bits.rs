//! Fixed-width bit accumulation, most significant bit first

use std::io::Write;

/// Width of the accumulator word in bits
const WORD_BITS: u32 = u64::BITS;

/// Packs variable-length codes into bytes
///
/// Codes are appended most significant bit first into a 64-bit word. Whenever
/// the word fills, its eight bytes move to the output buffer and the bits that
/// did not fit start the next word.
#[derive(Debug, Default, Clone)]
pub struct BitBuffer {
    /// Bits not yet moved to `bytes`, left-aligned
    word: u64,
    /// Number of valid bits in `word`
    used: u32,
    /// Completed output bytes
    bytes: Vec<u8>,
}
impl BitBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the `len` low bits of `code`, most significant first
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds 64; the code tables never produce such a code.
    pub fn append(&mut self, code: u64, len: u32) {
        assert!(len <= WORD_BITS, "code of {len} bits exceeds the accumulator");
        if len == 0 {
            return;
        }
        let code = if len == WORD_BITS {
            code
        } else {
            code & ((1 << len) - 1)
        };
        let free = WORD_BITS - self.used;
        if len < free {
            self.word |= code << (free - len);
            self.used += len;
        } else {
            let spill = len - free;
            self.word |= code >> spill;
            self.bytes.extend_from_slice(&self.word.to_be_bytes());
            self.word = if spill == 0 {
                0
            } else {
                code << (WORD_BITS - spill)
            };
            self.used = spill;
        }
    }

    /// Moves the partial word to the output, zero-padding the last byte
    pub fn finish(&mut self) {
        let n = self.used.div_ceil(8) as usize;
        self.bytes.extend_from_slice(&self.word.to_be_bytes()[..n]);
        self.word = 0;
        self.used = 0;
    }

    /// Bits held in the accumulator word
    #[must_use]
    pub fn pending_bits(&self) -> u32 {
        self.used
    }

    /// Completed output bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes the completed bytes to `writer` and forgets them
    ///
    /// Returns the number of bytes written.
    pub fn drain_to<W: Write>(&mut self, writer: &mut W) -> std::io::Result<usize> {
        writer.write_all(&self.bytes)?;
        let n = self.bytes.len();
        self.bytes.clear();
        Ok(n)
    }
}

/// Reads bits most significant first
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Index of the next bit
    pos: usize,
}
impl<'a> BitReader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.pos / 8)?;
        let bit = (byte >> (7 - self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    /// Reads `n` bits into the low end of a word, `n` at most 64
    pub fn read_bits(&mut self, n: u32) -> Option<u64> {
        debug_assert!(n <= WORD_BITS);
        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Some(value)
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }
}
