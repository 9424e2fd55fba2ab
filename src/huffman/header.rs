//! Header of Huffman-coded BWT files
//!
//! The header is written as a placeholder when the writer is created and
//! rewritten in place once the total symbol count is known.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{Read, Write};

use crate::error::{HeaderError, Result};

/// Current magic number: "BWTH" in ASCII (in little-endian byte order)
#[allow(clippy::unreadable_literal)]
const MAGIC: u32 = 0x48545742;

/// Current format version of the Huffman file format
const FORMAT: u8 = 1;

/// Size of the header in bytes
pub const SIZE_HEADER: usize = 16;

/// Reserved bytes in the header
pub const RESERVED: [u8; 3] = [0; 3];

/// Header structure for Huffman-coded BWT files
///
/// The total size of this structure is 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanHeader {
    /// Magic number to identify the file format
    ///
    /// 4 bytes
    pub magic: u32,

    /// Version of the file format
    ///
    /// 1 byte
    pub format: u8,

    /// Reserve bytes for future use
    ///
    /// 3 bytes
    pub reserved: [u8; 3],

    /// Total number of symbols encoded in the file
    ///
    /// 8 bytes
    pub num_symbols: u64,
}
impl HuffmanHeader {
    /// Creates a new header recording `num_symbols` symbols
    #[must_use]
    pub fn new(num_symbols: u64) -> Self {
        Self {
            magic: MAGIC,
            format: FORMAT,
            reserved: RESERVED,
            num_symbols,
        }
    }

    /// Parses a header from a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is incorrect
    /// * The format version is unsupported
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        let magic = LittleEndian::read_u32(&buffer[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        let format = buffer[4];
        if format != FORMAT {
            return Err(HeaderError::InvalidFormatVersion(format).into());
        }
        let mut reserved = [0u8; 3];
        reserved.copy_from_slice(&buffer[5..8]);
        let num_symbols = LittleEndian::read_u64(&buffer[8..16]);
        Ok(Self {
            magic,
            format,
            reserved,
            num_symbols,
        })
    }

    /// Parses a header from the start of an arbitrarily sized buffer
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The buffer is smaller than `SIZE_HEADER`
    /// * The header data is invalid (see `from_bytes` for validation details)
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let mut bytes = [0u8; SIZE_HEADER];
        if buffer.len() < SIZE_HEADER {
            return Err(HeaderError::InvalidSize(buffer.len(), SIZE_HEADER).into());
        }
        bytes.copy_from_slice(&buffer[..SIZE_HEADER]);
        Self::from_bytes(&bytes)
    }

    /// Writes the header to a writer
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails (typically an I/O error).
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER];
        LittleEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4] = self.format;
        buffer[5..8].copy_from_slice(&self.reserved);
        LittleEndian::write_u64(&mut buffer[8..16], self.num_symbols);
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Reads exactly `SIZE_HEADER` bytes from a reader and parses them
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        reader.read_exact(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

#[cfg(test)]
mod testing {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    #[test]
    fn test_layout() -> Result<()> {
        let mut bytes = Vec::new();
        HuffmanHeader::new(0x0102).write_bytes(&mut bytes)?;
        assert_eq!(bytes.len(), SIZE_HEADER);
        assert_eq!(&bytes[0..4], b"BWTH");
        assert_eq!(bytes[4], FORMAT);
        assert_eq!(&bytes[8..10], &[0x02, 0x01]);
        assert_eq!(HuffmanHeader::from_reader(&mut Cursor::new(&bytes))?.num_symbols, 0x0102);
        Ok(())
    }

    #[test]
    fn test_invalid_headers() {
        let mut bytes = Vec::new();
        HuffmanHeader::new(5).write_bytes(&mut bytes).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            HuffmanHeader::from_buffer(&bad_magic),
            Err(Error::HeaderError(HeaderError::InvalidMagicNumber(_)))
        ));

        let mut bad_format = bytes.clone();
        bad_format[4] = 9;
        assert!(matches!(
            HuffmanHeader::from_buffer(&bad_format),
            Err(Error::HeaderError(HeaderError::InvalidFormatVersion(9)))
        ));

        assert!(matches!(
            HuffmanHeader::from_buffer(&bytes[..10]),
            Err(Error::HeaderError(HeaderError::InvalidSize(10, SIZE_HEADER)))
        ));
    }
}
