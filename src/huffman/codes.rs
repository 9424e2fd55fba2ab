//! Static prefix codes of the Huffman format
//!
//! Both tables are format constants: changing either one requires a new
//! format version in the header.

use super::bits::{BitBuffer, BitReader};
use crate::{
    alphabet::{Symbol, ALPHABET_SIZE},
    error::{ReadError, Result},
};

/// A prefix code, `len` low bits of `bits`, most significant first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub len: u32,
}

/// Symbol codes, indexed by symbol code (`$ A C G N T`)
///
/// The nucleotides dominate a BWT; `N` and the terminator are rare.
pub const SYMBOL_CODES: [Code; ALPHABET_SIZE] = [
    Code { bits: 0b1111, len: 4 }, // $
    Code { bits: 0b00, len: 2 },   // A
    Code { bits: 0b01, len: 2 },   // C
    Code { bits: 0b10, len: 2 },   // G
    Code { bits: 0b1110, len: 4 }, // N
    Code { bits: 0b110, len: 3 },  // T
];

/// Run lengths coded directly, indexed by `length - 1`
pub const LENGTH_CODES: [Code; 4] = [
    Code { bits: 0b0, len: 1 },
    Code { bits: 0b10, len: 2 },
    Code { bits: 0b110, len: 3 },
    Code { bits: 0b1110, len: 4 },
];

/// Prefix of every run longer than [`MAX_DIRECT_LENGTH`], followed by the
/// Elias-gamma code of `length - MAX_DIRECT_LENGTH`
pub const LENGTH_ESCAPE: Code = Code {
    bits: 0b1111,
    len: 4,
};

/// Longest run length with a direct code
pub const MAX_DIRECT_LENGTH: u64 = LENGTH_CODES.len() as u64;

pub fn encode_symbol(buf: &mut BitBuffer, symbol: Symbol) {
    let code = SYMBOL_CODES[symbol as usize];
    buf.append(code.bits, code.len);
}

/// Appends the code for a run of `length` symbols, `length` at least 1
pub fn encode_length(buf: &mut BitBuffer, length: u64) {
    debug_assert!(length > 0);
    if length <= MAX_DIRECT_LENGTH {
        let code = LENGTH_CODES[length as usize - 1];
        buf.append(code.bits, code.len);
        return;
    }
    buf.append(LENGTH_ESCAPE.bits, LENGTH_ESCAPE.len);
    let n = length - MAX_DIRECT_LENGTH;
    let width = u64::BITS - n.leading_zeros();
    buf.append(0, width - 1);
    buf.append(n, width);
}

/// Reads one symbol code, or `None` if the stream ends first
pub fn decode_symbol(reader: &mut BitReader<'_>) -> Option<Symbol> {
    let mut bits = 0u64;
    let mut len = 0;
    loop {
        bits = (bits << 1) | u64::from(reader.read_bit()?);
        len += 1;
        if let Some(code) = SYMBOL_CODES
            .iter()
            .position(|c| c.len == len && c.bits == bits)
        {
            return Symbol::from_code(code as u8);
        }
    }
}

/// Reads one run-length code, or `Ok(None)` if the stream ends first
pub fn decode_length(reader: &mut BitReader<'_>) -> Result<Option<u64>> {
    let start = reader.position();
    let mut ones = 0;
    while ones < LENGTH_ESCAPE.len {
        match reader.read_bit() {
            None => return Ok(None),
            Some(false) => return Ok(Some(u64::from(ones) + 1)),
            Some(true) => ones += 1,
        }
    }

    let mut zeros = 0;
    loop {
        match reader.read_bit() {
            None => return Ok(None),
            Some(true) => break,
            Some(false) => zeros += 1,
        }
        if zeros >= u64::BITS {
            return Err(ReadError::InvalidLengthCode(start).into());
        }
    }
    let Some(tail) = reader.read_bits(zeros) else {
        return Ok(None);
    };
    let n = (1u64 << zeros) | tail;
    n.checked_add(MAX_DIRECT_LENGTH)
        .map(Some)
        .ok_or_else(|| ReadError::InvalidLengthCode(start).into())
}
