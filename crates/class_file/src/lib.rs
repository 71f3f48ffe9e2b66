// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
pub mod constant_pool;
mod cursor;
mod error;
mod names;
mod options;
mod parser;

pub use self::class_file::{
    ClassField, ClassFile, ClassMethod, Code, ConstantValue, ExceptionTableEntry, LocalVariable,
    MAX_PREALLOCATION,
};
pub use access_flags::AccessFlags;
pub use constant_pool::{ConstantPool, ConstantPoolEntry};
pub use cursor::ByteCursor;
pub use error::{ClassFileError, ConstantPoolDefect, DecodeError, ErrorKind, IndexDefect};
pub use names::{canonical_name, canonical_name_from_entry};
pub use options::DecodeOptions;
pub use parser::Parser;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
