// https://docs.oracle.com/javase/8/docs/technotes/guides/jar/jar.html

mod archive;
mod error;

pub use archive::{ClassEntry, EntryOutcome, JarArchive};
pub use error::JarError;
