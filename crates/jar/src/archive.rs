use std::{
    io::Cursor,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use jarscope_class_file::{canonical_name_from_entry, ClassFile, DecodeOptions};
use zip::ZipArchive;

use crate::JarError;

const CLASS_SUFFIX: &str = ".class";
const VERSIONED_PREFIX: &str = "META-INF/versions/";

/// A JAR (or any ZIP) archive held in memory.
///
/// Cloning is cheap: clones share the parsed central directory and read the
/// same buffer through their own cursor.
#[derive(Clone, Debug)]
pub struct JarArchive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
}

/// A `.class` entry of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassEntry {
    pub index: usize,
    pub name: String,
    /// Uncompressed size declared by the archive.
    pub size: u64,
}

/// The result of decoding one entry. A failure never affects its siblings.
#[derive(Debug)]
pub struct EntryOutcome {
    pub entry: ClassEntry,
    pub result: Result<ClassFile, JarError>,
}

impl EntryOutcome {
    /// The self-declared class name, or one derived from the entry path when
    /// the class could not be decoded.
    pub fn class_name(&self) -> String {
        match &self.result {
            Ok(class_file) => class_file.name.clone(),
            Err(_) => canonical_name_from_entry(&self.entry.name),
        }
    }
}

impl<'a> JarArchive<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, JarError> {
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(buf))?,
        })
    }

    /// Number of entries in the archive, directories and resources included.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Lists the non-directory entries whose name ends in `.class`, in
    /// archive order.
    pub fn class_entries(&mut self) -> Result<Vec<ClassEntry>, JarError> {
        let mut entries = Vec::new();
        for index in 0..self.zip.len() {
            let file = self.zip.by_index(index)?;
            if file.is_dir() || !file.name().ends_with(CLASS_SUFFIX) {
                continue;
            }

            entries.push(ClassEntry {
                index,
                name: file.name().to_owned(),
                size: file.size(),
            });
        }

        log::debug!("Found {} class entries", entries.len());
        Ok(entries)
    }

    pub fn decode_entry(
        &mut self,
        entry: &ClassEntry,
        options: &DecodeOptions,
    ) -> Result<ClassFile, JarError> {
        let mut file = self.zip.by_index(entry.index)?;
        let size = file.size();
        let class_file = ClassFile::from_reader(&mut file, size, &entry.name, options)?;

        check_declared_name(&entry.name, &class_file);
        Ok(class_file)
    }

    pub fn decode_by_name(
        &mut self,
        name: &str,
        options: &DecodeOptions,
    ) -> Result<ClassFile, JarError> {
        let index = self
            .zip
            .index_for_name(name)
            .ok_or(zip::result::ZipError::FileNotFound)?;
        let size = self.zip.by_index(index)?.size();

        self.decode_entry(
            &ClassEntry {
                index,
                name: name.to_owned(),
                size,
            },
            options,
        )
    }

    /// Decodes every class entry with up to `concurrency` worker threads.
    /// Outcomes come back in archive order, one per entry.
    pub fn decode_all(
        &self,
        options: &DecodeOptions,
        concurrency: usize,
    ) -> Result<Vec<EntryOutcome>, JarError> {
        let entries = self.clone().class_entries()?;
        let workers = concurrency.clamp(1, entries.len().max(1));
        log::debug!(
            "Decoding {} classes with {} workers",
            entries.len(),
            workers
        );

        let next = AtomicUsize::new(0);
        let mut outcomes = thread::scope(|s| {
            let handles = (0..workers)
                .map(|_| {
                    let mut archive = self.clone();
                    let (next, entries) = (&next, &entries);
                    s.spawn(move || {
                        let mut done = Vec::new();
                        while let Some(entry) = entries.get(next.fetch_add(1, Ordering::Relaxed)) {
                            let result = archive.decode_entry(entry, options);
                            if let Err(e) = &result {
                                log::warn!("Failed to decode {}: {}", entry.name, e);
                            }
                            done.push(EntryOutcome {
                                entry: entry.clone(),
                                result,
                            });
                        }
                        done
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        });

        outcomes.sort_by_key(|outcome| outcome.entry.index);
        Ok(outcomes)
    }
}

fn check_declared_name(entry_name: &str, class_file: &ClassFile) {
    if entry_name.starts_with(VERSIONED_PREFIX) || entry_name.ends_with("module-info.class") {
        return;
    }

    let expected = canonical_name_from_entry(entry_name);
    if class_file.name != expected {
        log::warn!(
            "{} declares class {}, expected {}",
            entry_name,
            class_file.name,
            expected
        );
    }
}
