/// Custom Result type for bwtstore operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the bwtstore library, encompassing all possible error cases
/// that can occur while encoding or decoding a stored BWT.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to file header processing
    HeaderError(#[from] HeaderError),
    /// Errors that occur during read operations
    ReadError(#[from] ReadError),
    /// Errors that occur during write operations
    WriteError(#[from] WriteError),
    /// Misuse of an incremental continuation token
    TokenError(#[from] TokenError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// Generic errors that can occur in any part of the system
    AnyhowError(#[from] anyhow::Error),
}
impl Error {
    /// Checks if the error is a breach of the writer contract by the caller
    ///
    /// Alphabet violations and token misuse point at a bug in the construction
    /// driver rather than at bad input data or a failing device, so they should
    /// abort the construction instead of being retried.
    ///
    /// # Returns
    ///
    /// * `true` for `WriteError::InvalidSymbol` and every `TokenError`
    /// * `false` for all other error types
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::WriteError(WriteError::InvalidSymbol(_)) | Self::TokenError(_)
        )
    }
}

/// Errors specific to processing and validating file headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match the expected value
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0}")]
    InvalidMagicNumber(u32),

    /// The format version in the header is not supported
    ///
    /// # Arguments
    /// * `u8` - The unsupported version number that was found
    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(u8),

    /// The buffer is too small to hold a header
    ///
    /// # Arguments
    /// * First `usize` - The actual number of bytes provided
    /// * Second `usize` - The expected number of bytes
    #[error("Invalid number of bytes provided: {0}. Expected: {1}")]
    InvalidSize(usize, usize),
}

/// Errors that can occur while decoding stored BWT data
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    /// A token carries a symbol code outside the alphabet
    ///
    /// # Fields
    /// * `code` - The symbol code found in the token
    /// * `pos` - The byte position of the token
    #[error("Invalid symbol code {code} in token at byte pos {pos}")]
    InvalidSymbolCode { code: u8, pos: usize },

    /// A multi-byte record was cut short by the end of the buffer
    ///
    /// # Arguments
    /// * `usize` - The byte position where the record started
    #[error("Record starting at byte pos {0} is truncated")]
    TruncatedRecord(usize),

    /// The bit stream ended before the recorded number of symbols was decoded
    ///
    /// # Fields
    /// * `expected` - The total symbol count recorded in the header
    /// * `decoded` - The number of symbols decoded before the stream ran out
    #[error("Stream ended after {decoded} symbols, header records {expected}")]
    UnexpectedEndOfStream { expected: u64, decoded: u64 },

    /// A run-length code in the bit stream cannot be decoded
    ///
    /// # Arguments
    /// * `usize` - The bit position where the code started
    #[error("Invalid run-length code at bit pos {0}")]
    InvalidLengthCode(usize),

    /// A decoded run overshoots the recorded symbol count
    #[error("Decoded run overshoots the recorded symbol count ({expected})")]
    SymbolCountMismatch { expected: u64 },

    /// The SAP side channel is not a whole number of records
    ///
    /// # Arguments
    /// * `usize` - The length of the side channel buffer
    #[error("SAP side channel of {0} bytes is not a whole number of records")]
    InvalidSideChannel(usize),
}

/// Errors that can occur while writing BWT data
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A pushed byte is not a member of the alphabet
    ///
    /// # Arguments
    /// * `u8` - The offending byte
    #[error("Symbol {0:#04x} is not in the alphabet")]
    InvalidSymbol(u8),

    /// Data was pushed after the writer was finished
    #[error("Writer has already been finished")]
    WriterClosed,

    /// An earlier write to the underlying sink failed part way
    ///
    /// The sink holds an unknown prefix of the output, so the writer refuses
    /// further work instead of writing the same bytes twice.
    #[error("Writer is unusable after an earlier I/O failure")]
    Poisoned,

    /// A run was paused while no run was pending
    #[error("No pending run to hold open")]
    NoPendingRun,

    /// A run length does not fit the placeholder length field
    ///
    /// # Arguments
    /// * `u64` - The run length that overflowed
    #[error("Run length {0} does not fit a placeholder record")]
    RunTooLong(u64),

    /// Attempted to build a writer without choosing an encoding
    #[error("Missing format in writer builder")]
    MissingFormat,

    /// Attempted to build an incremental writer without an id allocator
    #[error("Missing file id allocator in writer builder")]
    MissingFileIdAllocator,
}

/// Errors raised when an incremental token does not address a live placeholder
///
/// Each of these indicates a bug in the construction algorithm driving the writer.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// The token was issued for a different output file
    #[error("Token belongs to file {found}, writer owns file {expected}")]
    ForeignToken { expected: u32, found: u32 },

    /// The token offset does not point at a placeholder record
    ///
    /// # Arguments
    /// * `u64` - The offset carried by the token
    #[error("No placeholder record at offset {0}")]
    NotAPlaceholder(u64),

    /// The placeholder addressed by the token has already been closed
    ///
    /// # Arguments
    /// * `u64` - The offset carried by the token
    #[error("Placeholder at offset {0} is already resolved")]
    AlreadyResolved(u64),

    /// The token's remaining length disagrees with the placeholder
    #[error("Stale token for offset {offset}: placeholder expects {expected} more, token says {found}")]
    StaleToken {
        offset: u64,
        expected: u32,
        found: u32,
    },

    /// The continuation carries a different symbol than the placeholder
    #[error("Placeholder at offset {offset} holds {expected:?}, continuation pushed {found:?}")]
    SymbolMismatch {
        offset: u64,
        expected: char,
        found: char,
    },

    /// The continuation is longer than the placeholder's remaining budget
    #[error("Placeholder at offset {offset} expects {remaining} more, continuation pushed {requested}")]
    Overrun {
        offset: u64,
        remaining: u32,
        requested: u64,
    },
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_contract_violations() {
        let err: Error = WriteError::InvalidSymbol(b'x').into();
        assert!(err.is_contract_violation());

        let err: Error = TokenError::AlreadyResolved(9).into();
        assert!(err.is_contract_violation());

        let err: Error = WriteError::WriterClosed.into();
        assert!(!err.is_contract_violation());

        let err: Error = WriteError::Poisoned.into();
        assert!(!err.is_contract_violation());

        let err: Error = std::io::Error::other("disk full").into();
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn test_messages() {
        let err: Error = WriteError::InvalidSymbol(b'x').into();
        assert_eq!(err.to_string(), "Symbol 0x78 is not in the alphabet");
    }
}
