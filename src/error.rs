use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! value_range_error {
    ($what:expr, $value:expr, $min:expr, $max:expr) => {
        crate::Error::ValueRange {
            what: $what,
            value: i64::from($value),
            min: i64::from($min),
            max: i64::from($max),
        }
    };
}

macro_rules! invalid_operation_error {
    ($msg:expr) => {
        crate::Error::InvalidOperation($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidOperation(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Editing Errors
/// - [`Error::ValueRange`] - A field write outside of its legal domain, rejected before mutation
/// - [`Error::InvalidOperation`] - A structurally meaningless request
/// - [`Error::AddressNotFound`] - An address lookup that did not land on an instruction boundary
///
/// ## Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid binary structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the input
/// - [`Error::Parse`] - Invalid assembly text, with its position
///
/// ## I/O and External Errors
/// - [`Error::Format`] - The text sink refused a write
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// None of these are retried internally; they indicate either malformed input or a misuse
/// of the editing API.
///
/// # Examples
///
/// ```rust
/// use dexscope::{debug::DebugRow, Error};
///
/// let mut row = DebugRow::special(0, 0)?;
/// match row.set_packed_offset(246) {
///     Err(Error::ValueRange { min, max, .. }) => assert_eq!((min, max), (0, 245)),
///     other => panic!("unexpected {other:?}"),
/// }
/// # Ok::<(), dexscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A value was written to a field that cannot hold it.
    ///
    /// The target is left untouched. The error names the field together with its legal
    /// inclusive range.
    #[error("{what} out of range: {value} (legal range [{min}, {max}])")]
    ValueRange {
        /// Name of the field that rejected the value
        what: &'static str,
        /// The rejected value
        value: i64,
        /// Lowest accepted value
        min: i64,
        /// Highest accepted value
        max: i64,
    },

    /// The requested operation has no meaning for the target in its current state.
    ///
    /// Examples are setting a non-zero packed offset on a debug row that is not an advance
    /// row, or resolving the covered instructions of a handler whose try item was dropped.
    #[error("Invalid operation - {0}")]
    InvalidOperation(String),

    /// No instruction starts at the given byte address.
    ///
    /// Addresses referenced by try items, handlers, debug rows and branches must land on an
    /// instruction boundary (or the end of the code). A miss indicates corrupted input or a
    /// dangling reference.
    #[error("No instruction starts at address 0x{0:x}")]
    AddressNotFound(u32),

    /// The input is damaged and could not be decoded.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while decoding.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The assembly text could not be parsed.
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
        /// What went wrong
        message: String,
    },

    /// Writing rendered text to the output sink failed.
    #[error("{0}")]
    Format(#[from] std::fmt::Error),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Attach a text position to an error raised while building a method body from text.
    ///
    /// Errors that already carry a position are returned unchanged.
    #[must_use]
    pub fn at(self, line: usize, column: usize) -> Self {
        match self {
            Error::Parse { .. } => self,
            other => Error::Parse {
                line,
                column,
                message: other.to_string(),
            },
        }
    }
}
