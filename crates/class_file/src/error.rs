use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("Invalid magic identifier: 0x{0:X}")]
    MalformedHeader(u32),
    #[error("Malformed constant pool at offset {offset}: {reason}")]
    MalformedConstantPool {
        offset: usize,
        reason: ConstantPoolDefect,
    },
    #[error("Invalid constant pool index {index}: {reason}")]
    InvalidConstantPoolIndex {
        index: u16,
        /// Where the index was read, when it came from the byte stream.
        offset: Option<usize>,
        reason: IndexDefect,
    },
    #[error(
        "Malformed attribute {name} at offset {offset}: declared {declared} bytes, consumed {consumed}"
    )]
    MalformedAttribute {
        name: String,
        offset: usize,
        declared: u32,
        consumed: usize,
    },
}

impl ClassFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassFileError::IOError(_) => ErrorKind::Io,
            ClassFileError::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            ClassFileError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            ClassFileError::MalformedConstantPool { .. } => ErrorKind::MalformedConstantPool,
            ClassFileError::InvalidConstantPoolIndex { .. } => ErrorKind::InvalidConstantPoolIndex,
            ClassFileError::MalformedAttribute { .. } => ErrorKind::MalformedAttribute,
        }
    }

    /// Byte offset the error was detected at, when the error itself knows it.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ClassFileError::TruncatedInput { offset, .. }
            | ClassFileError::MalformedConstantPool { offset, .. }
            | ClassFileError::MalformedAttribute { offset, .. } => Some(*offset),
            ClassFileError::InvalidConstantPoolIndex { offset, .. } => *offset,
            ClassFileError::MalformedHeader(_) => Some(0),
            ClassFileError::IOError(_) => None,
        }
    }

    /// Pins an unplaced constant pool index error to `offset`.
    pub(crate) fn at(self, offset: usize) -> Self {
        match self {
            ClassFileError::InvalidConstantPoolIndex {
                index,
                offset: None,
                reason,
            } => ClassFileError::InvalidConstantPoolIndex {
                index,
                offset: Some(offset),
                reason,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    TruncatedInput,
    MalformedHeader,
    MalformedConstantPool,
    InvalidConstantPoolIndex,
    MalformedAttribute,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Io => "io",
            ErrorKind::TruncatedInput => "truncated input",
            ErrorKind::MalformedHeader => "malformed header",
            ErrorKind::MalformedConstantPool => "malformed constant pool",
            ErrorKind::InvalidConstantPoolIndex => "invalid constant pool index",
            ErrorKind::MalformedAttribute => "malformed attribute",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantPoolDefect {
    UnknownTag(u8),
    /// The pool ended before the declared number of slots was filled.
    CountMismatch { declared: u16, produced: usize },
    /// A double-slot entry was placed in the final slot.
    DoubleSlotOverflow { index: u16 },
    EmptyPool,
}

impl fmt::Display for ConstantPoolDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantPoolDefect::UnknownTag(tag) => write!(f, "invalid cp info tag {tag}"),
            ConstantPoolDefect::CountMismatch { declared, produced } => write!(
                f,
                "declared {declared} slots but only {produced} could be read"
            ),
            ConstantPoolDefect::DoubleSlotOverflow { index } => {
                write!(f, "8-byte constant at index {index} overflows the pool")
            }
            ConstantPoolDefect::EmptyPool => f.write_str("constant_pool_count is 0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexDefect {
    Zero,
    OutOfRange { len: usize },
    Unusable,
    UnexpectedEntry {
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for IndexDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDefect::Zero => f.write_str("index 0 is not a valid reference"),
            IndexDefect::OutOfRange { len } => write!(f, "pool has only {len} slots"),
            IndexDefect::Unusable => f.write_str("refers to the second slot of an 8-byte constant"),
            IndexDefect::UnexpectedEntry { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
        }
    }
}

/// A failed decode of one class file, scoped to the entry it came from.
#[derive(Error, Debug)]
#[error("{entry_name}: {error} (byte offset {offset})")]
pub struct DecodeError {
    pub entry_name: String,
    pub offset: usize,
    #[source]
    pub error: ClassFileError,
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
